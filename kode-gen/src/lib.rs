//! # Kode Gen(erator)
//!
//! Generator component of the **Kode** authenticator. It creates time based one-time passwords
//! ([RFC 6238]) for the accounts of [`kode_core`], building on the counter based variant
//! ([RFC 4226]).
//!
//! All functions are synchronous and free of shared state, so codes for different accounts can be
//! generated in parallel from any thread. The only impure input is the wall clock, which can be
//! replaced through the [`Clock`] trait.
//!
//! [RFC 4226]: https://www.rfc-editor.org/rfc/rfc4226
//! [RFC 6238]: https://www.rfc-editor.org/rfc/rfc6238

#![deny(rust_2018_idioms, clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

use std::{
    fmt::{self, Display},
    time::SystemTimeError,
};

pub use kode_core::{Algorithm, DecodeError, DecodeMode, Key, Params};
use kode_core::ExposeSecret;

pub use self::{
    hash::{hmac, HashError},
    window::{
        remaining_percentage, remaining_seconds, Clock, FixedClock, Refresher, SystemClock,
        Window, REFRESH_THRESHOLD_PERCENT,
    },
};

mod hash;
mod window;

/// Highest amount of digits that a 31-bit truncated value can fill.
pub const MAX_DIGITS: u8 = 10;

/// Character that fills the placeholder returned by [`generate`] when no code could be created.
pub const SENTINEL_CHAR: char = '-';

/// Errors that can occur when generating an OTP.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to get a timestamp from the system.
    #[error("failed to get time since unix epoch")]
    Time(#[from] SystemTimeError),
    /// The secret couldn't be decoded.
    #[error("failed to decode the secret")]
    Decode(#[from] DecodeError),
    /// The keyed hash couldn't be computed.
    #[error("failed to compute the HMAC")]
    Hash(#[from] HashError),
    /// The requested amount of digits is out of range.
    #[error("{0} digits are not supported, must be between 1 and {MAX_DIGITS}")]
    Digits(u8),
}

/// Encode a window index or HOTP counter as the 8-byte big-endian message for the HMAC.
#[must_use]
#[inline]
pub fn encode_counter(counter: u64) -> [u8; 8] {
    counter.to_be_bytes()
}

/// Create a counter based OTP for the given key.
pub fn hotp(key: &Key, counter: u64, digits: u8, algorithm: Algorithm) -> Result<OtpCode, Error> {
    if !(1..=MAX_DIGITS).contains(&digits) {
        return Err(Error::Digits(digits));
    }

    let digest = hash::hmac(key.expose_secret(), &encode_counter(counter), algorithm)?;
    let value = u64::from(truncate(&digest)) % 10_u64.pow(u32::from(digits));

    Ok(OtpCode { value, digits })
}

/// Create the time based OTP for a base32 `secret` at the given Unix `timestamp`.
pub fn generate_at(secret: &str, params: &Params, timestamp: u64) -> Result<Totp, Error> {
    let key = Key::decode(secret, params.mode)?;
    let window = Window::at(timestamp, params.period);
    let code = hotp(&key, window.index, params.digits, params.algorithm)?;

    Ok(Totp { code, window })
}

/// Create the time based OTP for the current time of the given `clock`.
pub fn generate_with(clock: &impl Clock, secret: &str, params: &Params) -> Result<Totp, Error> {
    generate_at(secret, params, clock.unix_time()?)
}

/// Create the time based OTP for the current system time.
pub fn try_generate(secret: &str, params: &Params) -> Result<Totp, Error> {
    generate_with(&SystemClock, secret, params)
}

/// Create the time based OTP for the current system time, formatted for display.
///
/// Any failure is logged and turned into a [placeholder](sentinel) of the same width as a real
/// code, so displays always have something to show. Use [`try_generate`] to handle errors.
#[must_use]
pub fn generate(secret: &str, params: &Params) -> String {
    match try_generate(secret, params) {
        Ok(totp) => totp.code.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, digits = params.digits, "failed generating code");
            sentinel(params.digits)
        }
    }
}

/// Placeholder of `digits` dashes, shown instead of a code that couldn't be generated.
#[must_use]
pub fn sentinel(digits: u8) -> String {
    std::iter::repeat(SENTINEL_CHAR)
        .take(usize::from(digits))
        .collect()
}

/// Check whether a display value is the [`sentinel`] instead of a real code.
#[must_use]
pub fn is_sentinel(code: &str) -> bool {
    !code.is_empty() && code.chars().all(|c| c == SENTINEL_CHAR)
}

/// Dynamic truncation, extracting 31 bits from the digest at an offset given by its last nibble.
fn truncate(digest: &[u8]) -> u32 {
    let offset = usize::from(digest[digest.len() - 1] & 0xf);
    let bytes = &digest[offset..offset + 4];

    u32::from_be_bytes([bytes[0] & 0x7f, bytes[1], bytes[2], bytes[3]])
}

/// A generated OTP code that can be used to verify identity against a service.
///
/// The numeric value may have less digits than required and is shifted with zeroes in its final
/// representation. Call `to_string()` on an instance to get the final code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OtpCode {
    /// Numeric value, always below `10^digits`.
    pub value: u64,
    /// The desired amount of digits of the OTP.
    pub digits: u8,
}

impl Display for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0>1$}", self.value, usize::from(self.digits))
    }
}

/// A time based OTP together with the window it is valid in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Totp {
    pub code: OtpCode,
    pub window: Window,
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU64;

    use super::*;

    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn truncate() {
        let bytes = [
            0x1f, 0x86, 0x98, 0x69, 0x0e, 0x02, 0xca, 0x16, 0x61, 0x85, 0x50, 0xef, 0x7f, 0x19,
            0xda, 0x8e, 0x94, 0x5b, 0x55, 0x5a,
        ];

        assert_eq!(0x50ef_7f19, super::truncate(&bytes));
        assert_eq!(872_921, u64::from(super::truncate(&bytes)) % 1_000_000);
    }

    #[test]
    fn truncate_highest_offset() {
        let mut bytes = [0_u8; 20];
        bytes[15..19].copy_from_slice(&[0xff, 0x12, 0x34, 0x56]);
        bytes[19] = 0x0f;

        assert_eq!(0x7f12_3456, super::truncate(&bytes));
    }

    #[test]
    fn truncate_long_digest() {
        let mut bytes = [0xaa_u8; 64];
        bytes[2..6].copy_from_slice(&[0x01, 0x02, 0x03, 0x04]);
        bytes[63] = 0x02;

        assert_eq!(0x0102_0304, super::truncate(&bytes));
    }

    #[test]
    fn counter_encoding() {
        assert_eq!([0; 8], encode_counter(0));
        assert_eq!([0, 0, 0, 0, 0, 0, 0, 1], encode_counter(1));
        assert_eq!(
            [0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef],
            encode_counter(0x0123_4567_89ab_cdef)
        );
        assert_eq!([0xff; 8], encode_counter(u64::MAX));
    }

    #[test]
    fn code_display() {
        let code = OtpCode {
            value: 123,
            digits: 6,
        };
        assert_eq!("000123", code.to_string());
    }

    #[test]
    fn rfc6238_vector() {
        let params = Params {
            digits: 8,
            ..Params::default()
        };
        let totp = generate_at(RFC_SECRET, &params, 59).unwrap();

        assert_eq!("94287082", totp.code.to_string());
        assert_eq!(1, totp.window.index);
        assert_eq!(1, totp.window.remaining);
    }

    #[test]
    fn fixed_clock() {
        let params = Params {
            digits: 8,
            ..Params::default()
        };
        let totp = generate_with(&FixedClock(59), RFC_SECRET, &params).unwrap();

        assert_eq!("94287082", totp.code.to_string());
    }

    #[test]
    fn invalid_digits() {
        let key = Key::new(b"12345678901234567890".to_vec());
        assert!(matches!(
            hotp(&key, 0, 0, Algorithm::Sha1),
            Err(Error::Digits(0))
        ));
        assert!(matches!(
            hotp(&key, 0, 11, Algorithm::Sha1),
            Err(Error::Digits(11))
        ));

        let params = Params {
            digits: 11,
            ..Params::default()
        };
        assert_eq!(sentinel(11), generate(RFC_SECRET, &params));
    }

    #[test]
    fn strict_failure_yields_sentinel() {
        let params = Params {
            period: NonZeroU64::new(30).unwrap(),
            digits: 8,
            algorithm: Algorithm::Sha256,
            mode: DecodeMode::Strict,
        };

        assert!(matches!(
            try_generate("not base32!", &params),
            Err(Error::Decode(_))
        ));
        assert_eq!("--------", generate("not base32!", &params));
    }

    #[test]
    fn sentinel_detection() {
        assert_eq!("------", sentinel(6));
        assert!(is_sentinel("------"));
        assert!(!is_sentinel("012345"));
        assert!(!is_sentinel("--1---"));
        assert!(!is_sentinel(""));
    }

    #[test]
    fn generate_is_formatted() {
        let code = generate("JBSWY3DPEHPK3PXP", &Params::default());
        assert_eq!(6, code.len());
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }
}
