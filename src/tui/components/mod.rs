//! # TUI Components
//!
//! Every widget drawn on screen lives here.
//!
//! ## Component Architecture
//!
//! Components in this directory follow two patterns:
//!
//! ### Stateless Components (Props-Based Rendering)
//!
//! Views over `SessionState` borrowed for one frame:
//! - `MenuBar` / `Dropdown`: top row and the open submenu
//! - `EntryList`: left panel
//! - `DetailPanel`: right panel
//! - `Footer`: function-key legend
//!
//! ### Stateful Components (Event-Driven)
//!
//! Modals that own their state and report an outcome through
//! `EventHandler`:
//! - `FormState`: the generic input form
//! - `FilePicker`: directory browser
//! - `MessageBox`, `ConfirmDialog`, `SelectList`: small dialogs
//! - `HelpPopup`: scrollable key reference
//!
//! ## Module Structure
//!
//! ```text
//! components/
//! ├── mod.rs           (this file, shared popup helpers)
//! ├── menu_bar.rs      (menu titles, clock, dropdown)
//! ├── entry_list.rs    (alias list)
//! ├── detail_panel.rs  (field/value pairs)
//! ├── footer.rs        (F-key banks)
//! ├── form.rs          (form engine)
//! ├── file_picker.rs   (file browser)
//! ├── dialog.rs        (message / confirm / select)
//! └── help.rs          (help popup)
//! ```

pub mod detail_panel;
pub mod dialog;
pub mod entry_list;
pub mod file_picker;
pub mod footer;
pub mod form;
pub mod help;
pub mod menu_bar;

pub use detail_panel::DetailPanel;
pub use dialog::{ConfirmDialog, Confirmation, MessageBox, SelectList, Selection};
pub use entry_list::EntryList;
pub use file_picker::{FilePicker, PickerOutcome};
pub use footer::{Command, Footer};
pub use form::{FieldSpec, FormOutcome, FormSpec, FormState, FormValues};
pub use help::HelpPopup;
pub use menu_bar::{Dropdown, MenuBar};

use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::Block;

use crate::tui::theme;

/// A `width` x `height` rectangle centered in `area`, clamped to fit.
pub fn centered(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

/// Border shared by every popup: centered title, `esc` hint bottom right.
pub fn popup_block(title: &str) -> Block<'static> {
    Block::bordered()
        .title_top(Line::from(format!(" {title} ")).centered())
        .title_bottom(Line::from("┤esc├").right_aligned())
        .border_style(theme::POPUP)
        .style(theme::POPUP)
}
