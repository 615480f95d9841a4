//! # Dialogs
//!
//! Small modals: a message box acknowledged by any key, a Yes/No
//! confirmation that defaults to No, and a single-choice selection list.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Clear, Paragraph, Wrap};
use unicode_width::UnicodeWidthStr;

use crate::tui::component::{Component, EventHandler};
use crate::tui::components::{centered, popup_block};
use crate::tui::event::{Direction, Event, MouseAction};
use crate::tui::theme;

const MIN_WIDTH: u16 = 30;
const MAX_WIDTH: u16 = 70;

/// True for events a person produces on purpose (not resizes or latch changes).
fn is_keypress(event: &Event) -> bool {
    !matches!(
        event,
        Event::Resize
            | Event::ModifierLatch(..)
            | Event::Unrecognized
            | Event::Mouse(_, _, MouseAction::ScrollUp | MouseAction::ScrollDown)
    )
}

fn box_width(text_width: usize, area: Rect) -> u16 {
    (text_width as u16 + 6).clamp(MIN_WIDTH, MAX_WIDTH).min(area.width)
}

pub struct MessageBox {
    pub title: String,
    pub text: String,
    pub style: Style,
}

impl MessageBox {
    pub fn info(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            style: theme::POPUP,
        }
    }

    pub fn error(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            style: theme::POPUP_ERROR,
            ..Self::info(title, text)
        }
    }
}

impl Component for MessageBox {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let longest = self.text.lines().map(|l| l.width()).max().unwrap_or(0);
        let width = box_width(longest.max(self.title.width()), area);
        let inner_width = usize::from(width.saturating_sub(4)).max(1);
        let rows: usize = self
            .text
            .lines()
            .map(|l| textwrap::wrap(l, inner_width).len().max(1))
            .sum();
        let height = (rows as u16 + 4).min(area.height);
        let rect = centered(width, height, area);
        let block = popup_block(&self.title).style(self.style);
        let inner = block.inner(rect);
        frame.render_widget(Clear, rect);
        frame.render_widget(block, rect);
        let body = Rect::new(inner.x + 1, inner.y + 1, inner.width.saturating_sub(2), inner.height.saturating_sub(1));
        frame.render_widget(
            Paragraph::new(self.text.as_str())
                .style(self.style)
                .wrap(Wrap { trim: false }),
            body,
        );
    }
}

impl EventHandler for MessageBox {
    type Event = ();

    fn handle_event(&mut self, event: &Event) -> Option<()> {
        is_keypress(event).then_some(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Yes,
    No,
    /// ESC: the whole operation is abandoned.
    Escaped,
}

pub struct ConfirmDialog {
    pub title: String,
    pub question: String,
    yes: bool,
}

impl ConfirmDialog {
    pub fn new(title: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            question: question.into(),
            yes: false,
        }
    }

    pub fn yes_selected(&self) -> bool {
        self.yes
    }
}

impl EventHandler for ConfirmDialog {
    type Event = Confirmation;

    fn handle_event(&mut self, event: &Event) -> Option<Confirmation> {
        match event {
            Event::Navigate(Direction::Left | Direction::Right) | Event::PanelSwitch => {
                self.yes = !self.yes;
                None
            }
            Event::Printable('y' | 'Y') => Some(Confirmation::Yes),
            Event::Printable('n' | 'N') => Some(Confirmation::No),
            Event::Submit if self.yes => Some(Confirmation::Yes),
            Event::Submit => Some(Confirmation::No),
            Event::Cancel => Some(Confirmation::Escaped),
            _ => None,
        }
    }
}

impl Component for ConfirmDialog {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let width = box_width(self.question.width(), area);
        let rect = centered(width, 7, area);
        let block = popup_block(&self.title);
        let inner = block.inner(rect);
        frame.render_widget(Clear, rect);
        frame.render_widget(block, rect);

        let button = |label: &'static str, on: bool| {
            Span::styled(label, if on { theme::BUTTON_FOCUSED } else { theme::BUTTON })
        };
        let lines = vec![
            Line::default(),
            Line::from(self.question.as_str()).centered(),
            Line::default(),
            Line::from(vec![
                button(" Yes ", self.yes),
                Span::raw("    "),
                button(" No ", !self.yes),
            ])
            .centered(),
        ];
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Chosen(usize),
    Cancelled,
}

pub struct SelectList {
    pub title: String,
    pub options: Vec<String>,
    selected: usize,
}

impl SelectList {
    pub fn new<S: AsRef<str>>(title: impl Into<String>, options: &[S]) -> Self {
        Self {
            title: title.into(),
            options: options.iter().map(|o| o.as_ref().to_string()).collect(),
            selected: 0,
        }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }
}

impl EventHandler for SelectList {
    type Event = Selection;

    fn handle_event(&mut self, event: &Event) -> Option<Selection> {
        let last = self.options.len().saturating_sub(1);
        match event {
            Event::Navigate(Direction::Up) => self.selected = self.selected.saturating_sub(1),
            Event::Navigate(Direction::Down) | Event::PanelSwitch => {
                self.selected = (self.selected + 1).min(last)
            }
            Event::Navigate(Direction::Home | Direction::PageUp) => self.selected = 0,
            Event::Navigate(Direction::End | Direction::PageDown) => self.selected = last,
            Event::Submit if !self.options.is_empty() => return Some(Selection::Chosen(self.selected)),
            Event::Cancel => return Some(Selection::Cancelled),
            _ => {}
        }
        None
    }
}

impl Component for SelectList {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let longest = self.options.iter().map(|o| o.width()).max().unwrap_or(0);
        let width = box_width(longest.max(self.title.width()), area);
        let height = (self.options.len() as u16 + 4).min(area.height);
        let rect = centered(width, height, area);
        let block = popup_block(&self.title);
        let inner = block.inner(rect);
        frame.render_widget(Clear, rect);
        frame.render_widget(block, rect);

        let row_width = usize::from(inner.width.saturating_sub(2));
        let lines: Vec<Line> = std::iter::once(Line::default())
            .chain(self.options.iter().enumerate().map(|(i, option)| {
                let style = if i == self.selected {
                    theme::FIELD_FOCUSED
                } else {
                    theme::POPUP
                };
                Line::from(vec![
                    Span::raw(" "),
                    Span::styled(format!("{option:<row_width$}"), style),
                ])
            }))
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }
}
