//! # Actions
//!
//! Browse-view navigation expressed as values. The TUI turns resolved input
//! events into an `Action`; `update()` applies it to `SessionState`.
//!
//! ```text
//! State + Action  →  update()  →  New State
//! ```
//!
//! No I/O here, so every selection/scroll rule is testable in isolation.
//! Operations that run external tools are not actions; the session
//! controller drives them directly.

use crate::core::state::{Panel, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    PageUp,
    PageDown,
    Top,
    Bottom,
    SwitchPanel,
    Focus(Panel),
    /// Select an absolute row of the filtered list (mouse click).
    SelectRow(usize),
}

/// Apply a navigation action to whichever panel has focus.
pub fn update(state: &mut SessionState, action: Action) {
    let page = state.visible_height.max(1);
    match (state.panel, action) {
        (_, Action::SwitchPanel) => state.panel = state.panel.other(),
        (_, Action::Focus(panel)) => state.panel = panel,
        (_, Action::SelectRow(row)) => state.select(row),

        (Panel::List, Action::Up) => state.select(state.selected.saturating_sub(1)),
        (Panel::List, Action::Down) => state.select(state.selected + 1),
        (Panel::List, Action::PageUp) => state.select(state.selected.saturating_sub(page)),
        (Panel::List, Action::PageDown) => state.select(state.selected + page),
        (Panel::List, Action::Top) => state.select(0),
        (Panel::List, Action::Bottom) => {
            state.select(state.entries.filtered().len().saturating_sub(1))
        }

        (Panel::Detail, Action::Up) => state.detail_scroll = state.detail_scroll.saturating_sub(1),
        (Panel::Detail, Action::Down) => state.detail_scroll += 1,
        (Panel::Detail, Action::PageUp) => {
            state.detail_scroll = state.detail_scroll.saturating_sub(page)
        }
        (Panel::Detail, Action::PageDown) => state.detail_scroll += page,
        (Panel::Detail, Action::Top) => state.detail_scroll = 0,
        (Panel::Detail, Action::Bottom) => state.detail_scroll = state.detail_len(),
    }
    state.clamp();
}
