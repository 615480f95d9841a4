//! # Screen Compositor
//!
//! Lays out and paints the browse view, and maps mouse positions back onto
//! it.
//!
//! ```text
//! row 0        │ menu bar ······················· [Unsaved changes] ·· 12:34 │
//! rows 1..h-2  │ ┌ Keystore: … ───── top┐┌ Details ─────────────────────────┐ │
//!              │ │ ⬚ mykey              ││ Alias name:                      │ │
//!              │ │ ⬔ trustedcert        ││   mykey                          │ │
//!              │ └───────────────── bot┘└──────────────────────────────────┘ │
//! row h-1      │  1Help   2Passwd  3Export …                      10Quit     │
//! ```
//!
//! The list takes the left half; `visible_height` is `h - 4` (menu, footer
//! and the two borders). In dimmed mode the whole frame is repainted with
//! `theme::DIMMED` after drawing, so a modal on top is the only bright
//! surface.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};

use crate::core::menu::{MENU, MenuState};
use crate::tui::Browse;
use crate::tui::component::Component;
use crate::tui::components::entry_list::{BOTTOM_MARKER, TOP_MARKER};
use crate::tui::components::footer::slot_at;
use crate::tui::components::{DetailPanel, Dropdown, EntryList, Footer, MenuBar};
use crate::tui::theme;

/// Rows taken by everything except list content.
pub const CHROME_ROWS: u16 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowseLayout {
    pub menu: Rect,
    pub list: Rect,
    pub detail: Rect,
    pub footer: Rect,
}

impl BrowseLayout {
    pub fn new(area: Rect) -> Self {
        use Constraint::{Length, Min};
        let [menu, body, footer] = Layout::vertical([Length(1), Min(0), Length(1)]).areas(area);
        let [list, detail] =
            Layout::horizontal([Length(body.width / 2), Min(0)]).areas(body);
        Self {
            menu,
            list,
            detail,
            footer,
        }
    }

    /// Entry rows the list can show in `area`.
    pub fn visible_height(area: Rect) -> usize {
        usize::from(area.height.saturating_sub(CHROME_ROWS)).max(1)
    }
}

pub fn draw_browse(frame: &mut Frame, view: &Browse, dimmed: bool) {
    let area = frame.area();
    let layout = BrowseLayout::new(area);
    let state = &view.state;

    MenuBar {
        spec: &MENU,
        menu: view.menu,
        session: state,
        now: view.now(),
    }
    .render(frame, layout.menu);
    EntryList { session: state }.render(frame, layout.list);
    DetailPanel { session: state }.render(frame, layout.detail);
    Footer {
        modifier: state.modifiers.active(),
        flash: view.flash.map(|(slot, _)| slot),
    }
    .render(frame, layout.footer);

    if let MenuState::SubmenuOpen(index, selected) = view.menu {
        Dropdown {
            spec: &MENU,
            index,
            selected,
            session: state,
        }
        .render(frame, area);
    }

    if dimmed {
        frame.buffer_mut().set_style(area, theme::DIMMED);
    }
}

/// What sits under a mouse position in the browse view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    MenuTitle(usize),
    MenuBar,
    TopMarker,
    BottomMarker,
    /// Row of the filtered list, absolute (scroll offset applied).
    ListRow(usize),
    List,
    Detail,
    FooterSlot(usize),
    Nothing,
}

fn contains(rect: Rect, x: u16, y: u16) -> bool {
    x >= rect.x && x < rect.right() && y >= rect.y && y < rect.bottom()
}

/// Columns of a border title right-aligned inside the corners.
fn marker_hit(rect: Rect, marker: &str, x: u16) -> bool {
    let end = rect.right().saturating_sub(1);
    let start = end.saturating_sub(marker.len() as u16);
    x >= start && x < end
}

pub fn hit_test(layout: &BrowseLayout, scroll_offset: usize, x: u16, y: u16) -> Hit {
    if contains(layout.menu, x, y) {
        return MENU
            .title_at(x - layout.menu.x)
            .map_or(Hit::MenuBar, Hit::MenuTitle);
    }
    if contains(layout.footer, x, y) {
        return slot_at(x - layout.footer.x, layout.footer.width)
            .map_or(Hit::Nothing, Hit::FooterSlot);
    }
    let list = layout.list;
    if contains(list, x, y) {
        if y == list.y && marker_hit(list, TOP_MARKER, x) {
            return Hit::TopMarker;
        }
        if y + 1 == list.bottom() && marker_hit(list, BOTTOM_MARKER, x) {
            return Hit::BottomMarker;
        }
        if y > list.y && y + 1 < list.bottom() {
            return Hit::ListRow(scroll_offset + usize::from(y - list.y - 1));
        }
        return Hit::List;
    }
    if contains(layout.detail, x, y) {
        return Hit::Detail;
    }
    Hit::Nothing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::{ModifierFlags, Panel};
    use crate::test_support::{buffer_lines, fixed_now, sample_entries};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn fixed_clock() -> chrono::NaiveDateTime {
        fixed_now().naive_utc()
    }

    fn view() -> Browse {
        let mut view = Browse::new(fixed_clock);
        view.state.entries.replace(sample_entries());
        view.state.set_visible_height(BrowseLayout::visible_height(Rect::new(0, 0, 80, 12)));
        view
    }

    fn draw(view: &Browse, dimmed: bool) -> ratatui::buffer::Buffer {
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();
        terminal.draw(|f| draw_browse(f, view, dimmed)).unwrap();
        terminal.backend().buffer().clone()
    }

    #[test]
    fn test_layout_splits_screen() {
        let layout = BrowseLayout::new(Rect::new(0, 0, 80, 24));
        assert_eq!(layout.menu, Rect::new(0, 0, 80, 1));
        assert_eq!(layout.list, Rect::new(0, 1, 40, 22));
        assert_eq!(layout.detail, Rect::new(40, 1, 40, 22));
        assert_eq!(layout.footer, Rect::new(0, 23, 80, 1));
        assert_eq!(BrowseLayout::visible_height(Rect::new(0, 0, 80, 24)), 20);
    }

    #[test]
    fn test_browse_frame_contents() {
        let lines = buffer_lines(&draw(&view(), false));
        assert!(lines[0].contains("File"));
        assert!(lines[2].contains("mykey"));
        assert!(lines[2].contains("Alias name:"));
        assert!(lines[11].contains("Help"));
    }

    #[test]
    fn test_render_twice_is_identical() {
        let view = view();
        assert_eq!(draw(&view, false), draw(&view, false));
    }

    #[test]
    fn test_dimmed_mode_restyles_everything() {
        let buffer = draw(&view(), true);
        assert_eq!(buffer[(3, 2)].style().fg, theme::DIMMED.fg);
        assert_eq!(buffer[(60, 11)].style().fg, theme::DIMMED.fg);
    }

    #[test]
    fn test_footer_follows_modifier() {
        let mut view = view();
        view.state.modifiers = ModifierFlags {
            shift: true,
            alt: false,
        };
        let lines = buffer_lines(&draw(&view, false));
        assert!(lines[11].contains("GenKey"));
    }

    #[test]
    fn test_open_submenu_is_drawn() {
        let mut view = view();
        view.menu = MenuState::SubmenuOpen(1, Some(0));
        let lines = buffer_lines(&draw(&view, false));
        assert!(lines[2].contains("Open keystore"));
    }

    #[test]
    fn test_clock_is_read_on_every_draw() {
        use std::sync::atomic::{AtomicI64, Ordering};
        static MINUTES: AtomicI64 = AtomicI64::new(0);
        fn ticking() -> chrono::NaiveDateTime {
            fixed_now().naive_utc() + chrono::TimeDelta::minutes(MINUTES.fetch_add(1, Ordering::SeqCst))
        }

        let mut view = view();
        view.clock = ticking;
        let first = buffer_lines(&draw(&view, true));
        let second = buffer_lines(&draw(&view, true));
        assert!(first[0].contains("00:00"));
        assert_ne!(first[0], second[0]);
    }

    #[test]
    fn test_hit_testing() {
        let layout = BrowseLayout::new(Rect::new(0, 0, 80, 24));
        assert_eq!(hit_test(&layout, 0, 9, 0), Hit::MenuTitle(1));
        assert_eq!(hit_test(&layout, 0, 60, 0), Hit::MenuBar);
        assert_eq!(hit_test(&layout, 0, 37, 1), Hit::TopMarker);
        assert_eq!(hit_test(&layout, 0, 37, 22), Hit::BottomMarker);
        assert_eq!(hit_test(&layout, 5, 4, 3), Hit::ListRow(6));
        assert_eq!(hit_test(&layout, 0, 4, 1), Hit::List);
        assert_eq!(hit_test(&layout, 0, 50, 5), Hit::Detail);
        assert_eq!(hit_test(&layout, 0, 0, 23), Hit::FooterSlot(0));
        assert_eq!(hit_test(&layout, 0, 79, 23), Hit::FooterSlot(9));
    }

    #[test]
    fn test_detail_focus_border() {
        let mut view = view();
        view.state.panel = Panel::Detail;
        let buffer = draw(&view, false);
        assert_eq!(buffer[(40, 1)].style().fg, theme::SELECTED.fg);
    }
}
