//! # Screen
//!
//! The terminal plus the input resolver: the one place that draws and the
//! one place that reads input. Modal loops run here, on the main thread,
//! repainting the browse view dimmed underneath the overlay.
//!
//! ```text
//!  run_modal(backdrop, modal)
//!    loop ┬─ draw: backdrop.render(dimmed) → modal.render()
//!         └─ next_event → modal.handle_event → Some(out)? return out
//! ```

use std::io;
use std::time::Duration;

use ratatui::backend::Backend;
use ratatui::layout::Rect;
use ratatui::{Frame, Terminal};

use crate::core::state::ModifierFlags;
use crate::tui::component::{Component, EventHandler, Renderer};
use crate::tui::event::{Event, InputResolver, InputSource};

pub struct Screen<B: Backend, S: InputSource> {
    terminal: Terminal<B>,
    resolver: InputResolver<S>,
    poll_timeout: Duration,
    /// Area of the last drawn frame.
    area: Rect,
}

impl<B: Backend, S: InputSource> Screen<B, S> {
    pub fn new(terminal: Terminal<B>, resolver: InputResolver<S>, poll_timeout: Duration) -> Self {
        Self {
            terminal,
            resolver,
            poll_timeout,
            area: Rect::default(),
        }
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    /// Current terminal size, which may differ from the last drawn frame.
    pub fn size(&self) -> io::Result<Rect> {
        let size = self
            .terminal
            .size()
            .map_err(|e| io::Error::other(e.to_string()))?;
        Ok(Rect::new(0, 0, size.width, size.height))
    }

    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    pub fn resolver_mut(&mut self) -> &mut InputResolver<S> {
        &mut self.resolver
    }

    pub fn modifiers(&mut self) -> ModifierFlags {
        self.resolver.modifiers()
    }

    pub fn draw(&mut self, render: impl FnOnce(&mut Frame)) -> io::Result<()> {
        let mut area = self.area;
        self.terminal
            .draw(|frame| {
                area = frame.area();
                render(frame);
            })
            .map_err(|e| io::Error::other(e.to_string()))?;
        self.area = area;
        Ok(())
    }

    pub fn next_event(&mut self, timeout: Duration) -> io::Result<Option<Event>> {
        self.resolver.next_event(timeout)
    }

    /// Paint the backdrop dimmed with `overlay` on top, without waiting for input.
    pub fn draw_overlay<C: Component + ?Sized>(
        &mut self,
        backdrop: &dyn Renderer,
        overlay: &mut C,
    ) -> io::Result<()> {
        self.draw(|frame| {
            backdrop.render(frame, true);
            let area = frame.area();
            overlay.render(frame, area);
        })
    }

    /// Drive `modal` until it produces its outcome.
    pub fn run_modal<M>(&mut self, backdrop: &dyn Renderer, modal: &mut M) -> io::Result<M::Event>
    where
        M: Component + EventHandler,
    {
        loop {
            self.draw_overlay(backdrop, modal)?;
            if let Some(event) = self.next_event(self.poll_timeout)?
                && let Some(outcome) = modal.handle_event(&event)
            {
                return Ok(outcome);
            }
        }
    }
}
