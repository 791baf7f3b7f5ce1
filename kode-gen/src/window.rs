//! Time window accounting, used to know when codes change and to drive countdowns.

use std::{
    num::NonZeroU64,
    time::{SystemTimeError, UNIX_EPOCH},
};

/// Percentage of the period below which a [`Refresher`] asks for a refresh, even if the window
/// didn't change yet.
pub const REFRESH_THRESHOLD_PERCENT: f64 = 3.0;

/// Source of the current Unix time, in seconds.
pub trait Clock {
    fn unix_time(&self) -> Result<u64, SystemTimeError>;
}

/// The system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_time(&self) -> Result<u64, SystemTimeError> {
        Ok(UNIX_EPOCH.elapsed()?.as_secs())
    }
}

/// A clock that is stuck at a single point in time.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn unix_time(&self) -> Result<u64, SystemTimeError> {
        Ok(self.0)
    }
}

/// Position of a point in time within the windows of a given period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    /// Amount of full periods since the Unix epoch, the TOTP counter.
    pub index: u64,
    /// Seconds until the next window starts, in range `1..=period`.
    pub remaining: u64,
    /// Length of a single window in seconds.
    pub period: NonZeroU64,
}

impl Window {
    #[must_use]
    pub fn at(timestamp: u64, period: NonZeroU64) -> Self {
        Self {
            index: timestamp / period,
            remaining: period.get() - timestamp % period,
            period,
        }
    }

    pub fn now(clock: &impl Clock, period: NonZeroU64) -> Result<Self, SystemTimeError> {
        clock.unix_time().map(|ts| Self::at(ts, period))
    }

    /// Remaining time as share of the period, in range `(0, 100]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn remaining_percentage(&self) -> f64 {
        self.remaining as f64 / self.period.get() as f64 * 100.0
    }
}

/// Seconds left in the current window of the system clock.
pub fn remaining_seconds(period: NonZeroU64) -> Result<u64, SystemTimeError> {
    Window::now(&SystemClock, period).map(|w| w.remaining)
}

/// Percentage of the current window of the system clock that is left.
pub fn remaining_percentage(period: NonZeroU64) -> Result<f64, SystemTimeError> {
    Window::now(&SystemClock, period).map(|w| w.remaining_percentage())
}

/// Decides when a displayed code must be generated again, so periodic callers don't have to
/// recompute the HMAC on every tick.
#[derive(Clone, Debug)]
pub struct Refresher {
    last_index: Option<u64>,
    threshold_hit: bool,
    threshold: f64,
}

impl Default for Refresher {
    fn default() -> Self {
        Self::new(REFRESH_THRESHOLD_PERCENT)
    }
}

impl Refresher {
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            last_index: None,
            threshold_hit: false,
            threshold,
        }
    }

    /// Returns `true` on the first poll, whenever the window changed, and once per window when the
    /// remaining time drops to the threshold.
    pub fn poll(&mut self, window: &Window) -> bool {
        if self.last_index != Some(window.index) {
            self.last_index = Some(window.index);
            self.threshold_hit = window.remaining_percentage() <= self.threshold;
            return true;
        }

        if !self.threshold_hit && window.remaining_percentage() <= self.threshold {
            self.threshold_hit = true;
            return true;
        }

        false
    }

    /// Forget the last state, forcing a refresh on the next poll. Used when the displayed account
    /// changes.
    pub fn reset(&mut self) {
        self.last_index = None;
        self.threshold_hit = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: NonZeroU64 = match NonZeroU64::new(30) {
        Some(v) => v,
        None => unreachable!(),
    };

    #[test]
    fn window_bounds() {
        assert_eq!(
            Window {
                index: 0,
                remaining: 30,
                period: PERIOD
            },
            Window::at(0, PERIOD)
        );
        assert_eq!(1, Window::at(29, PERIOD).remaining);
        assert_eq!(30, Window::at(30, PERIOD).remaining);
        assert_eq!(1, Window::at(30, PERIOD).index);
        assert_eq!(1, Window::at(59, PERIOD).index);
    }

    #[test]
    fn remaining_is_monotonic() {
        let mut previous = Window::at(1_000, PERIOD);

        for ts in 1_001..1_200 {
            let window = Window::at(ts, PERIOD);
            if ts % 30 == 0 {
                assert_eq!(30, window.remaining);
                assert_eq!(previous.index + 1, window.index);
            } else {
                assert_eq!(previous.remaining - 1, window.remaining);
                assert_eq!(previous.index, window.index);
            }
            assert!((1..=30).contains(&window.remaining));
            previous = window;
        }
    }

    #[test]
    fn percentage() {
        let full = Window::at(60, PERIOD).remaining_percentage();
        assert!((full - 100.0).abs() < f64::EPSILON);

        let last = Window::at(89, PERIOD).remaining_percentage();
        assert!(last > 0.0 && last < 4.0);
    }

    #[test]
    fn fixed_clock() {
        let window = Window::now(&FixedClock(59), PERIOD).unwrap();
        assert_eq!(1, window.index);
        assert_eq!(1, window.remaining);
    }

    #[test]
    fn system_clock() {
        let remaining = remaining_seconds(PERIOD).unwrap();
        assert!((1..=30).contains(&remaining));

        let percentage = remaining_percentage(PERIOD).unwrap();
        assert!(percentage > 0.0 && percentage <= 100.0);
    }

    #[test]
    fn refresher_polls() {
        let period = NonZeroU64::new(60).unwrap();
        let mut refresher = Refresher::default();

        assert!(refresher.poll(&Window::at(0, period)));
        assert!(!refresher.poll(&Window::at(1, period)));
        assert!(!refresher.poll(&Window::at(58, period)));
        // 1 of 60 seconds left is below 3%.
        assert!(refresher.poll(&Window::at(59, period)));
        assert!(!refresher.poll(&Window::at(59, period)));
        assert!(refresher.poll(&Window::at(60, period)));
        assert!(!refresher.poll(&Window::at(61, period)));

        refresher.reset();
        assert!(refresher.poll(&Window::at(61, period)));
    }
}
