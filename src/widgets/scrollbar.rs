use tui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

pub struct ScrollBar {
    value: usize,
    max: usize,
}

impl Default for ScrollBar {
    fn default() -> Self {
        Self { value: 0, max: 1 }
    }
}

impl ScrollBar {
    /// Set the scroll position `value` out of `max`. A `max` of zero draws the bar at the top.
    pub fn data(mut self, value: usize, max: usize) -> Self {
        self.value = value.min(max);
        self.max = max;
        self
    }

    fn bar_range(&self, area: Rect) -> (u16, u16) {
        let bar_height = 2.max(area.height / 8).min(area.height);
        let start = if self.max == 0 {
            area.y
        } else {
            area.y + (self.value * usize::from(area.height - bar_height) / self.max) as u16
        };

        (start, start + bar_height)
    }
}

impl Widget for ScrollBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (start, end) = self.bar_range(area);

        for x in area.left()..area.right() {
            for y in area.top()..area.bottom() {
                buf.get_mut(x, y).set_bg(if (start..end).contains(&y) {
                    Color::White
                } else {
                    Color::DarkGray
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_positions() {
        let area = Rect::new(0, 0, 2, 16);

        assert_eq!((0, 2), ScrollBar::default().data(0, 0).bar_range(area));
        assert_eq!((0, 2), ScrollBar::default().data(0, 4).bar_range(area));
        assert_eq!((14, 16), ScrollBar::default().data(4, 4).bar_range(area));
        assert_eq!((14, 16), ScrollBar::default().data(9, 4).bar_range(area));
    }
}
