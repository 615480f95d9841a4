//! # Help Popup
//!
//! Key reference shown on F1. Content is taller than most terminals, so it
//! sits in a `ScrollView`; any key other than the scroll keys closes it.

use ratatui::Frame;
use ratatui::layout::{Rect, Size};
use ratatui::text::Line;
use ratatui::widgets::{Clear, Paragraph};
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};

use crate::core::state::Modifier;
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::footer::{FOOTER_SLOTS, command};
use crate::tui::components::{centered, popup_block};
use crate::tui::event::{Direction, Event, MouseAction};
use crate::tui::theme;

const WIDTH: u16 = 64;

const NAVIGATION: &[(&str, &str)] = &[
    ("Up / Down", "Move selection or scroll details"),
    ("PgUp / PgDn", "Move by one page"),
    ("Home / t", "Jump to the first entry"),
    ("End / b", "Jump to the last entry"),
    ("Tab", "Switch between list and details"),
    ("Left / Right", "Focus list / details"),
    ("q / Esc", "Quit (asks to save changes)"),
    ("Shift / Alt", "Hold to switch the function key bank"),
];

fn bank_lines(heading: &str, modifier: Modifier) -> Vec<Line<'static>> {
    let mut lines = vec![Line::styled(heading.to_string(), theme::DETAIL_KEY)];
    lines.extend((0..FOOTER_SLOTS).filter_map(|i| {
        command(i, modifier)
            .map(|c| Line::from(format!("  F{:<4} {}", i + 1, c.description())))
    }));
    lines.push(Line::default());
    lines
}

/// Every line of the help text.
pub fn help_lines() -> Vec<Line<'static>> {
    let mut lines = vec![Line::styled("Navigation", theme::DETAIL_KEY)];
    lines.extend(
        NAVIGATION
            .iter()
            .map(|(key, what)| Line::from(format!("  {key:<14} {what}"))),
    );
    lines.push(Line::default());
    lines.extend(bank_lines("Function keys", Modifier::None));
    lines.extend(bank_lines("Shift + function keys", Modifier::Shift));
    lines.extend(bank_lines("Alt + function keys", Modifier::Alt));
    lines.push(Line::styled("Mouse", theme::DETAIL_KEY));
    lines.push(Line::from("  Click a menu title, a row or a panel; wheel scrolls."));
    lines.push(Line::from("  Click 'top' / 'bot' on the list border to jump."));
    lines
}

#[derive(Default)]
pub struct HelpPopup {
    pub scroll: ScrollViewState,
}

impl HelpPopup {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventHandler for HelpPopup {
    type Event = ();

    fn handle_event(&mut self, event: &Event) -> Option<()> {
        match event {
            Event::Navigate(Direction::Up) | Event::Mouse(_, _, MouseAction::ScrollUp) => {
                self.scroll.scroll_up()
            }
            Event::Navigate(Direction::Down) | Event::Mouse(_, _, MouseAction::ScrollDown) => {
                self.scroll.scroll_down()
            }
            Event::Navigate(Direction::PageUp) => self.scroll.scroll_page_up(),
            Event::Navigate(Direction::PageDown) => self.scroll.scroll_page_down(),
            Event::Resize | Event::ModifierLatch(..) | Event::Unrecognized => {}
            _ => return Some(()),
        }
        None
    }
}

impl Component for HelpPopup {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let lines = help_lines();
        let rect = centered(WIDTH, area.height.saturating_sub(4).max(6), area);
        let block = popup_block("Help");
        let inner = block.inner(rect);
        frame.render_widget(Clear, rect);
        frame.render_widget(block, rect);

        let content_width = inner.width.saturating_sub(1);
        let content = Size::new(content_width, lines.len() as u16);
        let mut view = ScrollView::new(content)
            .vertical_scrollbar_visibility(ScrollbarVisibility::Automatic)
            .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);
        view.render_widget(
            Paragraph::new(lines).style(theme::POPUP),
            Rect::new(0, 0, content.width, content.height),
        );
        frame.render_stateful_widget(view, inner, &mut self.scroll);
    }
}
