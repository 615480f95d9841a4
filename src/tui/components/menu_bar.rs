//! # Menu Bar Component
//!
//! Row 0 of the screen and the dropdown hanging from it.
//!
//! ```text
//!   Left   File   Options   Right        [Unsaved changes]              12:34
//!         ┌──────────────┐
//!         │ Open keystore│
//!         │ Save         │   ← disabled items greyed, re-evaluated every frame
//!         │ Quit         │
//!         └──────────────┘
//! ```
//!
//! Both pieces are stateless: the menu state and the session are props.

use chrono::{NaiveDateTime, Timelike};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph};

use crate::core::menu::{MenuSpec, MenuState};
use crate::core::state::SessionState;
use crate::tui::component::Component;
use crate::tui::theme;

const UNSAVED_LABEL: &str = "[Unsaved changes]";

/// `HH:MM`, the colon shown on even seconds only.
pub fn clock_text(now: NaiveDateTime) -> String {
    let colon = if now.second() % 2 == 0 { ':' } else { ' ' };
    format!("{:02}{colon}{:02}", now.hour(), now.minute())
}

pub struct MenuBar<'a> {
    pub spec: &'a MenuSpec,
    pub menu: MenuState,
    pub session: &'a SessionState,
    pub now: NaiveDateTime,
}

impl Component for MenuBar<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(Block::new().style(theme::MENU_BAR), area);

        let active = self.menu.active();
        for (index, (menu, (x, width))) in self
            .spec
            .menus
            .iter()
            .zip(self.spec.title_positions())
            .enumerate()
        {
            let style = if active == Some(index) {
                theme::MENU_ACTIVE
            } else {
                theme::MENU_BAR
            };
            let cell = Rect::new(area.x + x, area.y, width, 1).intersection(area);
            frame.render_widget(Span::styled(format!(" {} ", menu.title), style), cell);
        }

        if self.session.dirty {
            let width = UNSAVED_LABEL.len() as u16;
            let x = area.x + area.width.saturating_sub(width) / 2;
            let cell = Rect::new(x, area.y, width, 1).intersection(area);
            frame.render_widget(Span::styled(UNSAVED_LABEL, theme::UNSAVED), cell);
        }

        let clock = clock_text(self.now);
        let width = clock.len() as u16;
        let cell = Rect::new(
            area.x + area.width.saturating_sub(width + 1),
            area.y,
            width,
            1,
        )
        .intersection(area);
        frame.render_widget(Span::styled(clock, theme::MENU_BAR), cell);
    }
}

/// Where the dropdown of menu `index` is drawn, below its title.
pub fn dropdown_area(spec: &MenuSpec, index: usize, session: &SessionState, screen: Rect) -> Rect {
    let items = spec.items(index);
    let x = spec
        .title_positions()
        .get(index)
        .map_or(0, |&(x, _)| x);
    let label_width = items
        .iter()
        .map(|item| item.label_for(session).chars().count())
        .max()
        .unwrap_or(0) as u16;
    Rect::new(screen.x + x, screen.y + 1, label_width + 4, items.len() as u16 + 2).intersection(screen)
}

/// Index of the dropdown item at screen position `(x, y)`.
pub fn item_at(spec: &MenuSpec, index: usize, session: &SessionState, screen: Rect, x: u16, y: u16) -> Option<usize> {
    let area = dropdown_area(spec, index, session, screen);
    let inside = x > area.x && x + 1 < area.right() && y > area.y && y + 1 < area.bottom();
    inside.then(|| usize::from(y - area.y - 1))
}

pub struct Dropdown<'a> {
    pub spec: &'a MenuSpec,
    pub index: usize,
    pub selected: Option<usize>,
    pub session: &'a SessionState,
}

impl Component for Dropdown<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let rect = dropdown_area(self.spec, self.index, self.session, area);
        let lines: Vec<Line> = self
            .spec
            .items(self.index)
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let style = if self.selected == Some(i) {
                    theme::MENU_ACTIVE
                } else if item.is_disabled(self.session) {
                    theme::MENU_DISABLED
                } else {
                    theme::MENU_BAR
                };
                let width = usize::from(rect.width.saturating_sub(2));
                Line::styled(format!(" {:<w$}", item.label_for(self.session), w = width.saturating_sub(1)), style)
            })
            .collect();
        frame.render_widget(Clear, rect);
        frame.render_widget(
            Paragraph::new(lines).block(Block::bordered().style(theme::MENU_BAR)),
            rect,
        );
    }
}
