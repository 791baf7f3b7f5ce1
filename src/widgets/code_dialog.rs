use tui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

/// Popup with the current code of the selected account. Placeholder codes, that signal a failed
/// generation, are drawn in red.
pub struct CodeDialog<'a> {
    title: &'a str,
    code: &'a str,
}

impl<'a> CodeDialog<'a> {
    pub fn new(title: &'a str, code: &'a str) -> Self {
        Self { title, code }
    }
}

impl<'a> Widget for CodeDialog<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let area = {
            let mut draw_area = area;
            draw_area.width = 30.min(area.width);
            draw_area.height = 5.min(area.height);
            draw_area.y = area.y + (area.height - draw_area.height) / 2;
            draw_area.x = area.x + (area.width - draw_area.width) / 2;
            draw_area
        };

        Clear.render(area, buf);

        let b = Block::default().borders(Borders::ALL).title(self.title);
        let mut text_area = b.inner(area);
        b.render(area, buf);

        text_area.y += 1;
        text_area.height = 1;

        let style = if kode_gen::is_sentinel(self.code) {
            Style::default().fg(Color::Red)
        } else {
            Style::default()
        };

        Paragraph::new(self.code)
            .style(style)
            .alignment(Alignment::Center)
            .render(text_area, buf);
    }
}
