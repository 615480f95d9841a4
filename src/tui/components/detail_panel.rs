//! # Detail Panel Component
//!
//! The right panel: the selected entry's field pairs starting at
//! `detail_scroll`.
//!
//! ```text
//! Valid from:                  ← key, underlined (red when expired)
//!   Thu Nov 23 10:00:00 UTC    ← value, indented two columns,
//!   2023 until: ...              word-wrapped to the panel
//! ```
//!
//! An optional search term is highlighted case-insensitively in keys and
//! values alike.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};

use crate::core::state::{Panel, SessionState};
use crate::keystore::entry::VALID_FROM_FIELD;
use crate::tui::component::Component;
use crate::tui::theme;

const VALUE_INDENT: &str = "  ";

/// Split `text` into spans, styling every case-insensitive occurrence of
/// `term` with `hit` and the rest with `base`.
///
/// Both sides are lowered with the full `char::to_lowercase` expansion.
/// Each lowered char remembers the source char it came from, and a match
/// must start and end on source char boundaries, so byte offsets always
/// slice the original text.
pub fn highlight_spans<'a>(text: &'a str, term: Option<&str>, base: Style, hit: Style) -> Vec<Span<'a>> {
    let Some(term) = term.filter(|t| !t.is_empty()) else {
        return vec![Span::styled(text, base)];
    };
    let needle: Vec<char> = term.chars().flat_map(char::to_lowercase).collect();
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    // (index into `chars`, lowered char)
    let lowered: Vec<(usize, char)> = chars
        .iter()
        .enumerate()
        .flat_map(|(i, &(_, c))| c.to_lowercase().map(move |l| (i, l)))
        .collect();
    let byte_after = |source: usize| chars.get(source + 1).map_or(text.len(), |&(b, _)| b);

    let mut spans = Vec::new();
    let mut start = 0; // byte offset of the pending unhighlighted run
    let mut i = 0;
    while i < lowered.len() {
        let end = i + needle.len();
        let matched = end <= lowered.len()
            && lowered[i..end].iter().map(|&(_, c)| c).eq(needle.iter().copied())
            && (i == 0 || lowered[i - 1].0 != lowered[i].0)
            && (end == lowered.len() || lowered[end].0 != lowered[end - 1].0);
        if matched {
            let from = chars[lowered[i].0].0;
            let to = byte_after(lowered[end - 1].0);
            if start < from {
                spans.push(Span::styled(&text[start..from], base));
            }
            spans.push(Span::styled(&text[from..to], hit));
            start = to;
            i = end;
        } else {
            i += 1;
        }
    }
    if start < text.len() {
        spans.push(Span::styled(&text[start..], base));
    }
    spans
}

pub struct DetailPanel<'a> {
    pub session: &'a SessionState,
}

impl DetailPanel<'_> {
    fn lines(&self, width: usize) -> Vec<Line<'static>> {
        let state = self.session;
        let Some(entry) = state.selected_entry() else {
            return Vec::new();
        };
        let term = state.highlight.as_deref();
        let value_width = width.saturating_sub(VALUE_INDENT.len()).max(1);

        let mut lines = Vec::new();
        for (key, value) in entry.details.iter().skip(state.detail_scroll) {
            let key_style = if entry.is_expired && key == VALID_FROM_FIELD {
                theme::DETAIL_KEY_EXPIRED
            } else {
                theme::DETAIL_KEY
            };
            let key_text = format!("{key}:");
            lines.push(Line::from(owned(highlight_spans(
                &key_text,
                term,
                key_style,
                theme::HIGHLIGHT,
            ))));
            for row in textwrap::wrap(value, value_width) {
                let mut spans = vec![Span::styled(VALUE_INDENT, theme::PANEL)];
                spans.extend(owned(highlight_spans(
                    &row,
                    term,
                    theme::PANEL,
                    theme::HIGHLIGHT,
                )));
                lines.push(Line::from(spans));
            }
        }
        lines
    }
}

fn owned(spans: Vec<Span<'_>>) -> Vec<Span<'static>> {
    spans
        .into_iter()
        .map(|s| Span::styled(s.content.into_owned(), s.style))
        .collect()
}

impl Component for DetailPanel<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let border = if self.session.panel == Panel::Detail {
            theme::SELECTED
        } else {
            theme::PANEL_BORDER
        };
        let block = Block::bordered()
            .title(" Details ")
            .border_style(border)
            .style(theme::PANEL);
        let inner = block.inner(area);
        let lines = self.lines(usize::from(inner.width));
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}
