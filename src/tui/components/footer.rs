//! # Footer Component
//!
//! The function-key legend on the last row. Which bank is shown depends on
//! the modifier currently held, so the legend always tells the truth about
//! what the next function key will do.
//!
//! ```text
//!  1Help   2Passwd 3Export 4Search 5Filter 6Rename 7Save   8Delete 9PullDn10Quit
//!  ^^ number (inverse)  ^^^^^^ label
//! ```

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};

use crate::core::state::Modifier;
use crate::tui::component::Component;
use crate::tui::theme;

pub const FOOTER_SLOTS: usize = 10;

/// What a function key does in the browse view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    ChangePassword,
    Export,
    Search,
    Filter,
    Rename,
    Save,
    Delete,
    PullDown,
    Quit,
    GenerateKeyPair,
    ImportKeyPair,
    ImportCertificate,
    ImportFromUrl,
    Open,
    ClearFilter,
    ClearSearch,
    ToggleMouse,
}

impl Command {
    /// Long form used by the help popup.
    pub fn description(self) -> &'static str {
        match self {
            Command::Help => "Show this help",
            Command::ChangePassword => "Change store password",
            Command::Export => "Export the selected entry",
            Command::Search => "Highlight text in the details",
            Command::Filter => "Filter the entry list",
            Command::Rename => "Rename the selected entry",
            Command::Save => "Save changes to the keystore",
            Command::Delete => "Delete the selected entry",
            Command::PullDown => "Open the menu bar",
            Command::Quit => "Quit",
            Command::GenerateKeyPair => "Generate key pair",
            Command::ImportKeyPair => "Import key pair (PKCS #12 / PKCS #8)",
            Command::ImportCertificate => "Import certificate file",
            Command::ImportFromUrl => "Import certificate from a TLS endpoint",
            Command::Open => "Open keystore",
            Command::ClearFilter => "Clear filter",
            Command::ClearSearch => "Clear search highlight",
            Command::ToggleMouse => "Enable / disable mouse",
        }
    }
}

type Bank = [Option<(&'static str, Command)>; FOOTER_SLOTS];

const PLAIN: Bank = [
    Some(("Help", Command::Help)),
    Some(("Passwd", Command::ChangePassword)),
    Some(("Export", Command::Export)),
    Some(("Search", Command::Search)),
    Some(("Filter", Command::Filter)),
    Some(("Rename", Command::Rename)),
    Some(("Save", Command::Save)),
    Some(("Delete", Command::Delete)),
    Some(("PullDn", Command::PullDown)),
    Some(("Quit", Command::Quit)),
];

const SHIFT: Bank = [
    Some(("Help", Command::Help)),
    Some(("GenKeyPair", Command::GenerateKeyPair)),
    Some(("ImpKeyPair", Command::ImportKeyPair)),
    Some(("ImpCert", Command::ImportCertificate)),
    Some(("ImpFromWeb", Command::ImportFromUrl)),
    None,
    None,
    None,
    Some(("PullDn", Command::PullDown)),
    Some(("Quit", Command::Quit)),
];

const ALT: Bank = [
    Some(("Help", Command::Help)),
    Some(("Open", Command::Open)),
    Some(("ClrFilter", Command::ClearFilter)),
    Some(("ClrSearch", Command::ClearSearch)),
    Some(("Mouse", Command::ToggleMouse)),
    None,
    None,
    None,
    Some(("PullDn", Command::PullDown)),
    Some(("Quit", Command::Quit)),
];

fn bank(modifier: Modifier) -> &'static Bank {
    match modifier {
        Modifier::None => &PLAIN,
        Modifier::Shift => &SHIFT,
        Modifier::Alt => &ALT,
    }
}

/// Command bound to `index` in the bank for `modifier`. Empty slots and
/// out-of-range indices have none.
pub fn command(index: usize, modifier: Modifier) -> Option<Command> {
    bank(modifier).get(index).copied().flatten().map(|(_, c)| c)
}

pub fn label(index: usize, modifier: Modifier) -> &'static str {
    bank(modifier)
        .get(index)
        .copied()
        .flatten()
        .map_or("", |(l, _)| l)
}

/// Footer slot under column `x`.
pub fn slot_at(x: u16, width: u16) -> Option<usize> {
    let slot = (width / FOOTER_SLOTS as u16).max(1);
    let index = usize::from(x / slot);
    (index < FOOTER_SLOTS).then_some(index)
}

pub struct Footer {
    pub modifier: Modifier,
    /// Slot to draw emphasised (just pressed).
    pub flash: Option<usize>,
}

impl Component for Footer {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let slot = usize::from(area.width) / FOOTER_SLOTS;
        let mut spans = Vec::with_capacity(FOOTER_SLOTS * 2);
        for index in 0..FOOTER_SLOTS {
            let number = format!("{:>2}", index + 1);
            let text = label(index, self.modifier);
            let style = if self.flash == Some(index) {
                theme::FOOTER_FLASH
            } else {
                theme::FOOTER_LABEL
            };
            let label_width = slot.saturating_sub(2);
            let text: String = text.chars().take(label_width).collect();
            spans.push(Span::styled(number, theme::FOOTER_NUMBER));
            spans.push(Span::styled(format!("{text:<label_width$}"), style));
        }
        frame.render_widget(Line::from(spans).style(theme::FOOTER_LABEL), area);
    }
}
