//! # Menu State Machine
//!
//! A two-level pull-down menu: a top bar of titles, each with a dropdown of
//! items. Rendering lives in the TUI; this module only holds the spec and
//! the transitions.
//!
//! ```text
//!            F9                    Down / Enter
//!  Closed ────────▶ TopBarFocused(i) ───────────▶ SubmenuOpen(i, Some(0))
//!    ▲ ▲                 │  ◀─▶ Left/Right           │  ◀─▶ Left/Right (selection cleared)
//!    │ │   Esc / F9      │                           │  ▲▼  Up/Down (wrapping)
//!    │ └─────────────────┘                           │
//!    │        Esc / F9 / click outside / Enter on enabled item
//!    └───────────────────────────────────────────────┘
//! ```
//!
//! Disabled predicates are functions of `SessionState`, evaluated on every
//! render and every Enter, never cached.

use crate::core::state::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Filter,
    ClearFilter,
    OpenKeystore,
    Save,
    Quit,
    ToggleMouse,
    SearchContent,
    ClearSearch,
}

pub struct MenuItem {
    pub label: &'static str,
    pub action: MenuAction,
    pub disabled: fn(&SessionState) -> bool,
}

impl MenuItem {
    /// Label as currently displayed; the mouse toggle names what it will do.
    pub fn label_for(&self, state: &SessionState) -> &'static str {
        match self.action {
            MenuAction::ToggleMouse if state.mouse_enabled => "Disable mouse",
            MenuAction::ToggleMouse => "Enable mouse",
            _ => self.label,
        }
    }

    pub fn is_disabled(&self, state: &SessionState) -> bool {
        (self.disabled)(state)
    }
}

pub struct TopMenu {
    pub title: &'static str,
    pub items: &'static [MenuItem],
}

/// Ordered top-level menus.
pub struct MenuSpec {
    pub menus: &'static [TopMenu],
}

fn never(_: &SessionState) -> bool {
    false
}

fn clean(state: &SessionState) -> bool {
    !state.dirty
}

fn default_filter(state: &SessionState) -> bool {
    state.entries.filter().is_default()
}

fn no_highlight(state: &SessionState) -> bool {
    state.highlight.is_none()
}

pub const MENU: MenuSpec = MenuSpec {
    menus: &[
        TopMenu {
            title: "Left",
            items: &[
                MenuItem {
                    label: "Filter",
                    action: MenuAction::Filter,
                    disabled: never,
                },
                MenuItem {
                    label: "Clear filter",
                    action: MenuAction::ClearFilter,
                    disabled: default_filter,
                },
            ],
        },
        TopMenu {
            title: "File",
            items: &[
                MenuItem {
                    label: "Open keystore",
                    action: MenuAction::OpenKeystore,
                    disabled: never,
                },
                MenuItem {
                    label: "Save",
                    action: MenuAction::Save,
                    disabled: clean,
                },
                MenuItem {
                    label: "Quit",
                    action: MenuAction::Quit,
                    disabled: never,
                },
            ],
        },
        TopMenu {
            title: "Options",
            items: &[MenuItem {
                label: "Enable mouse",
                action: MenuAction::ToggleMouse,
                disabled: never,
            }],
        },
        TopMenu {
            title: "Right",
            items: &[
                MenuItem {
                    label: "Search content",
                    action: MenuAction::SearchContent,
                    disabled: never,
                },
                MenuItem {
                    label: "Clear search",
                    action: MenuAction::ClearSearch,
                    disabled: no_highlight,
                },
            ],
        },
    ],
};

/// Columns between consecutive top-bar titles.
pub const MENU_SPACING: u16 = 3;
/// Column of the first top-bar title.
pub const MENU_START_X: u16 = 1;

impl MenuSpec {
    pub fn len(&self) -> usize {
        self.menus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.menus.is_empty()
    }

    pub fn items(&self, index: usize) -> &'static [MenuItem] {
        match self.menus.get(index) {
            Some(menu) => menu.items,
            None => &[],
        }
    }

    /// `(x, width)` of each top-bar title, drawn as ` Title `.
    pub fn title_positions(&self) -> Vec<(u16, u16)> {
        let mut x = MENU_START_X;
        self.menus
            .iter()
            .map(|m| {
                let width = m.title.chars().count() as u16 + 2;
                let pos = (x, width);
                x += width - 2 + MENU_SPACING;
                pos
            })
            .collect()
    }

    /// Index of the title under column `x` on the top row.
    pub fn title_at(&self, x: u16) -> Option<usize> {
        self.title_positions()
            .iter()
            .position(|&(start, width)| x >= start && x < start + width)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuState {
    #[default]
    Closed,
    TopBarFocused(usize),
    SubmenuOpen(usize, Option<usize>),
}

/// Menu-relevant input, already hit-tested by the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuInput {
    Left,
    Right,
    Up,
    Down,
    Enter,
    /// ESC or the close key.
    Close,
    Quit,
    ClickTitle(usize),
    ClickItem(usize),
    ClickOutside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOutcome {
    Stay,
    Closed,
    Execute(MenuAction),
}

fn wrap_next(i: usize, len: usize) -> usize {
    if len == 0 { 0 } else { (i + 1) % len }
}

fn wrap_prev(i: usize, len: usize) -> usize {
    if len == 0 { 0 } else { (i + len - 1) % len }
}

impl MenuState {
    pub fn is_open(self) -> bool {
        self != MenuState::Closed
    }

    /// Index of the highlighted top-level title, if the menu is open.
    pub fn active(self) -> Option<usize> {
        match self {
            MenuState::Closed => None,
            MenuState::TopBarFocused(i) | MenuState::SubmenuOpen(i, _) => Some(i),
        }
    }

    pub fn handle(&mut self, spec: &MenuSpec, input: MenuInput, session: &SessionState) -> MenuOutcome {
        let top = spec.len();
        if input == MenuInput::Quit && self.is_open() {
            *self = MenuState::Closed;
            return MenuOutcome::Execute(MenuAction::Quit);
        }
        match (*self, input) {
            (MenuState::Closed, MenuInput::ClickTitle(i)) if i < top => {
                *self = MenuState::SubmenuOpen(i, None);
                MenuOutcome::Stay
            }
            (MenuState::Closed, _) => MenuOutcome::Stay,

            (_, MenuInput::Close | MenuInput::ClickOutside) => self.close(),

            (MenuState::TopBarFocused(i), MenuInput::Left) => {
                *self = MenuState::TopBarFocused(wrap_prev(i, top));
                MenuOutcome::Stay
            }
            (MenuState::TopBarFocused(i), MenuInput::Right) => {
                *self = MenuState::TopBarFocused(wrap_next(i, top));
                MenuOutcome::Stay
            }
            (MenuState::TopBarFocused(i), MenuInput::Down | MenuInput::Enter) => {
                let first = (!spec.items(i).is_empty()).then_some(0);
                *self = MenuState::SubmenuOpen(i, first);
                MenuOutcome::Stay
            }
            (MenuState::TopBarFocused(i), MenuInput::Up) => {
                let last = spec.items(i).len().checked_sub(1);
                *self = MenuState::SubmenuOpen(i, last);
                MenuOutcome::Stay
            }
            (MenuState::TopBarFocused(_), MenuInput::ClickTitle(j)) if j < top => {
                *self = MenuState::SubmenuOpen(j, None);
                MenuOutcome::Stay
            }

            (MenuState::SubmenuOpen(i, _), MenuInput::Left) => {
                *self = MenuState::SubmenuOpen(wrap_prev(i, top), None);
                MenuOutcome::Stay
            }
            (MenuState::SubmenuOpen(i, _), MenuInput::Right) => {
                *self = MenuState::SubmenuOpen(wrap_next(i, top), None);
                MenuOutcome::Stay
            }
            (MenuState::SubmenuOpen(i, sel), MenuInput::Down) => {
                let n = spec.items(i).len();
                let next = match sel {
                    None => 0,
                    Some(s) => wrap_next(s, n),
                };
                *self = MenuState::SubmenuOpen(i, (n > 0).then_some(next));
                MenuOutcome::Stay
            }
            (MenuState::SubmenuOpen(i, sel), MenuInput::Up) => {
                let n = spec.items(i).len();
                let prev = match sel {
                    None => n.saturating_sub(1),
                    Some(s) => wrap_prev(s, n),
                };
                *self = MenuState::SubmenuOpen(i, (n > 0).then_some(prev));
                MenuOutcome::Stay
            }
            (MenuState::SubmenuOpen(i, Some(s)), MenuInput::Enter) => self.execute(spec, i, s, session),
            (MenuState::SubmenuOpen(i, _), MenuInput::ClickItem(k)) => {
                if k < spec.items(i).len() {
                    *self = MenuState::SubmenuOpen(i, Some(k));
                    self.execute(spec, i, k, session)
                } else {
                    MenuOutcome::Stay
                }
            }
            (MenuState::SubmenuOpen(i, _), MenuInput::ClickTitle(j)) => {
                if j == i {
                    self.close()
                } else if j < top {
                    *self = MenuState::SubmenuOpen(j, None);
                    MenuOutcome::Stay
                } else {
                    MenuOutcome::Stay
                }
            }
            _ => MenuOutcome::Stay,
        }
    }

    fn close(&mut self) -> MenuOutcome {
        *self = MenuState::Closed;
        MenuOutcome::Closed
    }

    fn execute(&mut self, spec: &MenuSpec, menu: usize, item: usize, session: &SessionState) -> MenuOutcome {
        match spec.items(menu).get(item) {
            Some(entry) if !entry.is_disabled(session) => {
                *self = MenuState::Closed;
                MenuOutcome::Execute(entry.action)
            }
            _ => MenuOutcome::Stay,
        }
    }
}
