//! # Entry List Component
//!
//! The left panel: one row per filtered entry, `<icon> <alias>`, showing the
//! window `scroll_offset .. scroll_offset + visible_height`.
//!
//! Expired entries are red; the selection colour says whether this panel
//! has focus. The `top`/`bot` markers on the border are mouse targets.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::{Block, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::core::state::{Panel, SessionState};
use crate::tui::component::Component;
use crate::tui::theme;

pub const TOP_MARKER: &str = "top";
pub const BOTTOM_MARKER: &str = "bot";

pub struct EntryList<'a> {
    pub session: &'a SessionState,
}

impl EntryList<'_> {
    fn title(&self) -> String {
        match &self.session.workspace {
            Some(ws) => format!(" Keystore: {} ", ws.original().display()),
            None => " Keystore ".to_string(),
        }
    }
}

/// Pad `text` with spaces to exactly `width` columns, truncating if needed.
pub fn fit(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push_str(&" ".repeat(width.saturating_sub(out.width())));
    out
}

impl Component for EntryList<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let state = self.session;
        let focused = state.panel == Panel::List;
        let block = Block::bordered()
            .title(self.title())
            .title_top(Line::from(TOP_MARKER).right_aligned())
            .title_bottom(Line::from(BOTTOM_MARKER).right_aligned())
            .border_style(theme::PANEL_BORDER)
            .style(theme::PANEL);
        let inner = block.inner(area);
        let width = usize::from(inner.width);

        let lines: Vec<Line> = state
            .entries
            .filtered()
            .iter()
            .enumerate()
            .skip(state.scroll_offset)
            .take(usize::from(inner.height))
            .map(|(index, entry)| {
                let text = fit(&format!("{} {}", entry.icon(), entry.alias), width);
                let style = match (index == state.selected, focused, entry.is_expired) {
                    (true, true, _) => theme::SELECTED,
                    (true, false, _) => theme::SELECTED_IDLE,
                    (false, _, true) => theme::EXPIRED,
                    (false, _, false) => theme::PANEL,
                };
                Line::styled(text, style)
            })
            .collect();

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}
