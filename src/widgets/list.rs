use kode_core::{Account, Settings};
use tui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Paragraph, StatefulWidget, Widget},
};

use super::ScrollBar;

const LIST_ITEM_HEIGHT: usize = 4;

pub struct List<'a> {
    block: Option<Block<'a>>,
    scrollbar: Option<(ScrollBar, u16)>,
    items: &'a [Account],
    settings: &'a Settings,
}

impl<'a> List<'a> {
    pub fn new(items: &'a [Account], settings: &'a Settings) -> Self {
        Self {
            block: None,
            scrollbar: None,
            items,
            settings,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    pub fn scrollbar(mut self, scrollbar: ScrollBar, width: u16) -> Self {
        self.scrollbar = Some((scrollbar, width));
        self
    }
}

impl<'a> StatefulWidget for List<'a> {
    type State = State;

    fn render(mut self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let list_area = match self.block.take() {
            Some(b) => {
                let inner_area = b.inner(area);
                b.render(area, buf);
                inner_area
            }
            None => area,
        };

        if self.items.is_empty() {
            Paragraph::new("No accounts yet, add one with `kode add` or `kode scan`.")
                .style(Style::default().fg(Color::DarkGray))
                .render(list_area, buf);
            return;
        }

        let (scrollbar, scrollbar_width) = match self.scrollbar {
            Some((scrollbar, width)) => (Some(scrollbar), width.min(list_area.width)),
            None => (None, 0),
        };

        state.update_scroll_pos(list_area);

        for (i, item) in self.items.iter().skip(state.scroll_pos).enumerate() {
            let mut area = list_area;
            area.y += (i * LIST_ITEM_HEIGHT) as u16;
            area.height = 1;
            area.width -= scrollbar_width;

            if area.y >= list_area.bottom() || area.width < 2 {
                break;
            }

            // Draw current selection indicator
            if state.position() == i {
                for y in area.y..list_area.bottom().min(area.y + 3) {
                    buf.get_mut(area.x, y).set_bg(Color::Blue);
                }
            }

            area.x += 2;
            area.width -= 2;

            // Draw the account name
            area.y += 1;
            if area.y >= list_area.bottom() {
                break;
            }
            Paragraph::new(item.name.as_str()).render(area, buf);

            // Draw the generation parameters, highlighting per-account overrides
            area.y += 1;
            if area.y >= list_area.bottom() {
                break;
            }
            let params = item.params(self.settings);
            let style = if item.overrides.is_empty() {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::Yellow)
            };
            Paragraph::new(format!(
                "{} · {} digits · {}s",
                params.algorithm, params.digits, params.period
            ))
            .style(style)
            .render(area, buf);

            // Draw the separator
            area.y += 1;
            if area.y >= list_area.bottom() {
                break;
            }

            area.x -= 2;
            area.width += 2;

            (area.left()..area.right()).for_each(|x| {
                buf.get_mut(x, area.y).set_char('─');
            });
        }

        // Draw scroll bar, if set
        if let Some(scrollbar) = scrollbar {
            let mut area = list_area;
            area.x += area.width - scrollbar_width;
            area.width = scrollbar_width;

            scrollbar
                .data(state.selection, self.items.len() - 1)
                .render(area, buf);
        }
    }
}

#[derive(Default)]
pub struct State {
    selection: usize,
    scroll_pos: usize,
}

impl State {
    /// Move the selection up, returning whether it changed.
    pub fn up(&mut self) -> bool {
        if self.selection > 0 {
            self.selection -= 1;
            true
        } else {
            false
        }
    }

    /// Move the selection down, returning whether it changed.
    pub fn down(&mut self, items: &[Account]) -> bool {
        if self.selection + 1 < items.len() {
            self.selection += 1;
            true
        } else {
            false
        }
    }

    pub fn selection(&self) -> usize {
        self.selection
    }

    fn update_scroll_pos(&mut self, area: Rect) {
        while (self.selection + 1).saturating_sub(self.scroll_pos) * LIST_ITEM_HEIGHT
            > usize::from(area.height)
            && self.scroll_pos < self.selection
        {
            self.scroll_pos += 1;
        }

        while self.selection < self.scroll_pos {
            self.scroll_pos -= 1;
        }
    }

    fn position(&self) -> usize {
        self.selection - self.scroll_pos
    }
}
