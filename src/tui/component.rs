use ratatui::Frame;
use ratatui::layout::Rect;

use crate::tui::event::Event;

/// A reusable UI component.
///
/// Components receive data via struct fields, may keep presentation state
/// (scroll offsets, paging windows) and render to a `Frame` within a given
/// `Rect`. `render` takes `&mut self` so that state can be updated during
/// the render pass, like ratatui's `StatefulWidget`.
pub trait Component {
    fn render(&mut self, frame: &mut Frame, area: Rect);
}

/// A component that handles resolved input events.
///
/// Modal overlays implement both traits; `Screen::run_modal` drives them
/// until `handle_event` yields a value.
pub trait EventHandler {
    /// The type of high-level event this component emits.
    type Event;

    fn handle_event(&mut self, event: &Event) -> Option<Self::Event>;
}

/// Draws the surface that sits behind a modal.
///
/// Implemented by the browse view and handed to every modal loop, so a
/// modal can repaint what is under it without owning it.
pub trait Renderer {
    fn render(&self, frame: &mut Frame, dimmed: bool);
}
