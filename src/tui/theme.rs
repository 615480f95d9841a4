//! Colours and styles shared by the browse view and the modals.

use ratatui::style::{Color, Modifier, Style};

pub const MENU_BAR: Style = Style::new().fg(Color::Black).bg(Color::Cyan);
pub const MENU_ACTIVE: Style = Style::new().fg(Color::White).bg(Color::Black);
pub const MENU_DISABLED: Style = Style::new().fg(Color::DarkGray).bg(Color::Cyan);
pub const UNSAVED: Style = Style::new()
    .fg(Color::Red)
    .bg(Color::Cyan)
    .add_modifier(Modifier::BOLD);

pub const PANEL: Style = Style::new().fg(Color::White).bg(Color::Blue);
pub const PANEL_BORDER: Style = Style::new().fg(Color::Cyan).bg(Color::Blue);
pub const EXPIRED: Style = Style::new().fg(Color::LightRed).bg(Color::Blue);
/// Selection in the focused panel.
pub const SELECTED: Style = Style::new().fg(Color::Black).bg(Color::Cyan);
/// Selection when the other panel has focus.
pub const SELECTED_IDLE: Style = Style::new().fg(Color::Black).bg(Color::Gray);
pub const DETAIL_KEY: Style = Style::new()
    .fg(Color::Yellow)
    .bg(Color::Blue)
    .add_modifier(Modifier::UNDERLINED);
pub const DETAIL_KEY_EXPIRED: Style = Style::new()
    .fg(Color::LightRed)
    .bg(Color::Blue)
    .add_modifier(Modifier::UNDERLINED);
pub const HIGHLIGHT: Style = Style::new().fg(Color::Black).bg(Color::Yellow);

pub const FOOTER_NUMBER: Style = Style::new().fg(Color::White).bg(Color::Black);
pub const FOOTER_LABEL: Style = Style::new().fg(Color::Black).bg(Color::Cyan);
pub const FOOTER_FLASH: Style = Style::new()
    .fg(Color::White)
    .bg(Color::Cyan)
    .add_modifier(Modifier::BOLD);

pub const POPUP: Style = Style::new().fg(Color::Black).bg(Color::Gray);
pub const POPUP_ERROR: Style = Style::new().fg(Color::White).bg(Color::Red);
pub const FIELD: Style = Style::new().fg(Color::White).bg(Color::Blue);
pub const FIELD_FOCUSED: Style = Style::new().fg(Color::Black).bg(Color::Cyan);
pub const CHOICE_SELECTED: Style = Style::new().fg(Color::White).bg(Color::Blue);
pub const PLACEHOLDER: Style = Style::new()
    .fg(Color::DarkGray)
    .bg(Color::Cyan)
    .add_modifier(Modifier::DIM);
pub const BUTTON: Style = Style::new().fg(Color::White).bg(Color::Blue);
pub const BUTTON_FOCUSED: Style = Style::new()
    .fg(Color::Black)
    .bg(Color::Cyan)
    .add_modifier(Modifier::BOLD);
pub const INLINE_ERROR: Style = Style::new()
    .fg(Color::Red)
    .bg(Color::Gray)
    .add_modifier(Modifier::BOLD);

/// Applied over the whole browse view while a modal has focus.
pub const DIMMED: Style = Style::new()
    .fg(Color::DarkGray)
    .add_modifier(Modifier::DIM);
