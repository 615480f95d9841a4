//! # Input Resolver
//!
//! Turns raw terminal input into the small set of logical `Event`s the
//! session understands.
//!
//! Function keys with modifiers arrive in several shapes depending on the
//! terminal:
//!
//! ```text
//!  F(2) + SHIFT modifier            ─┐
//!  F(14)   (shifted F-key range)     ├─▶ FunctionKey(1, Shift)
//!  Esc '[' '1' ';' '2' 'Q'  (split)  │
//!  F(2) while the Shift latch is set ┘
//! ```
//!
//! ## Escape capture
//!
//! A bare `Esc` may be the first byte of a sequence the terminal layer did
//! not decode. Everything arriving within a short window is captured and
//! matched; on no match the captured input goes back to the front of the
//! queue in its original order and the `Esc` itself resolves to `Cancel`.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, ModifierKeyCode,
    MouseButton, MouseEventKind,
};
use log::{debug, info};

use crate::core::state::{Modifier, ModifierFlags};
use crate::tui::modifiers::{LatchReader, LatchReport, LatchReporter, ModifierId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Home,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseAction {
    Click,
    ScrollUp,
    ScrollDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Navigate(Direction),
    PanelSwitch,
    /// Zero-based function key index plus the modifier bank.
    FunctionKey(usize, Modifier),
    ModifierLatch(ModifierId, bool),
    Printable(char),
    Mouse(u16, u16, MouseAction),
    Submit,
    Backspace,
    /// ESC with nothing decodable after it.
    Cancel,
    Resize,
    Unrecognized,
}

/// Where raw terminal events come from.
pub trait InputSource {
    fn poll(&mut self, timeout: Duration) -> io::Result<bool>;
    fn read(&mut self) -> io::Result<CtEvent>;
}

/// The real terminal, through crossterm.
pub struct TerminalInput;

impl InputSource for TerminalInput {
    fn poll(&mut self, timeout: Duration) -> io::Result<bool> {
        event::poll(timeout)
    }

    fn read(&mut self) -> io::Result<CtEvent> {
        event::read()
    }
}

/// F1..F4 final bytes in `CSI 1;m P..S` / `SS3 m P..S`.
const SS3_FINALS: [char; 4] = ['P', 'Q', 'R', 'S'];
/// `CSI n;m ~` codes for F1..F10.
const TILDE_CODES: [u16; 10] = [11, 12, 13, 14, 15, 17, 18, 19, 20, 21];

fn modifier_param(param: &str) -> Option<Modifier> {
    // xterm: 1 + (shift=1 | alt=2 | ctrl=4)
    match param.parse::<u8>().ok()? {
        2 | 4 => Some(Modifier::Shift),
        3 => Some(Modifier::Alt),
        _ => None,
    }
}

/// Decode a modified function key from the bytes following ESC.
///
/// Recognised forms: `[1;mP` .. `[1;mS`, `Om P` .. `OmS`, `[n;m~`.
pub fn decode_modified_fkey(tail: &str) -> Option<(usize, Modifier)> {
    if let Some(csi) = tail.strip_prefix('[') {
        let final_char = csi.chars().last()?;
        let body = &csi[..csi.len() - final_char.len_utf8()];
        let (first, param) = body.split_once(';')?;
        let modifier = modifier_param(param)?;
        if final_char == '~' {
            let code: u16 = first.parse().ok()?;
            let index = TILDE_CODES.iter().position(|&c| c == code)?;
            return Some((index, modifier));
        }
        if first == "1" {
            let index = SS3_FINALS.iter().position(|&c| c == final_char)?;
            return Some((index, modifier));
        }
        return None;
    }
    if let Some(ss3) = tail.strip_prefix('O') {
        let final_char = ss3.chars().last()?;
        let param = &ss3[..ss3.len() - final_char.len_utf8()];
        let modifier = modifier_param(param)?;
        let index = SS3_FINALS.iter().position(|&c| c == final_char)?;
        return Some((index, modifier));
    }
    None
}

/// Length (in captured chars) of the escape sequence at the start of
/// `chars`, if it looks complete.
fn sequence_len(chars: &[char]) -> Option<usize> {
    match chars.first()? {
        '[' => chars
            .iter()
            .skip(1)
            .position(|c| ('@'..='~').contains(c))
            .map(|i| i + 2),
        'O' => chars
            .iter()
            .skip(1)
            .position(|c| !c.is_ascii_digit())
            .map(|i| i + 2),
        _ => None,
    }
}

fn key_char(event: &CtEvent) -> Option<char> {
    match event {
        CtEvent::Key(KeyEvent {
            code: KeyCode::Char(c),
            kind: KeyEventKind::Press,
            ..
        }) => Some(*c),
        _ => None,
    }
}

pub struct InputResolver<S: InputSource> {
    source: S,
    /// Input read but not yet resolved; always consumed before `source`.
    pending: VecDeque<CtEvent>,
    latch: LatchReader,
    reporter: Option<LatchReporter>,
    footer_slots: usize,
    escape_window: Duration,
    /// Captured escape groups and how often each was seen.
    seen: HashMap<String, usize>,
}

impl<S: InputSource> InputResolver<S> {
    pub fn new(source: S, latch: LatchReader, footer_slots: usize, escape_window: Duration) -> Self {
        Self {
            source,
            pending: VecDeque::new(),
            latch,
            reporter: None,
            footer_slots,
            escape_window,
            seen: HashMap::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: LatchReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Raw events waiting to be resolved.
    pub fn pending(&self) -> &VecDeque<CtEvent> {
        &self.pending
    }

    /// Current latch state. Never blocks.
    pub fn modifiers(&mut self) -> ModifierFlags {
        self.latch.sample()
    }

    /// How often each escape group has been captured.
    pub fn seen_sequences(&self) -> &HashMap<String, usize> {
        &self.seen
    }

    /// Wait up to `timeout` for the next logical event.
    ///
    /// Raw events that resolve to nothing (key releases, focus changes)
    /// are skipped without waiting again.
    pub fn next_event(&mut self, timeout: Duration) -> io::Result<Option<Event>> {
        let mut wait = timeout;
        loop {
            let raw = match self.pending.pop_front() {
                Some(raw) => raw,
                None => {
                    if !self.source.poll(wait)? {
                        return Ok(None);
                    }
                    self.source.read()?
                }
            };
            if let Some(event) = self.resolve(raw)? {
                return Ok(Some(event));
            }
            wait = Duration::ZERO;
        }
    }

    /// Resolve one raw event. May read further input (escape capture).
    pub fn resolve(&mut self, raw: CtEvent) -> io::Result<Option<Event>> {
        match raw {
            CtEvent::Key(key) => self.resolve_key(key),
            CtEvent::Mouse(mouse) => Ok(match mouse.kind {
                MouseEventKind::Down(MouseButton::Left) => {
                    Some(Event::Mouse(mouse.column, mouse.row, MouseAction::Click))
                }
                MouseEventKind::ScrollUp => {
                    Some(Event::Mouse(mouse.column, mouse.row, MouseAction::ScrollUp))
                }
                MouseEventKind::ScrollDown => {
                    Some(Event::Mouse(mouse.column, mouse.row, MouseAction::ScrollDown))
                }
                _ => None,
            }),
            CtEvent::Paste(text) => {
                // Re-deliver as typed characters, in front of anything queued
                for c in text.chars().rev().filter(|c| !c.is_control()) {
                    self.pending
                        .push_front(CtEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)));
                }
                Ok(None)
            }
            CtEvent::Resize(_, _) => Ok(Some(Event::Resize)),
            CtEvent::FocusLost => {
                self.report(LatchReport::ReleaseAll);
                Ok(None)
            }
            CtEvent::FocusGained => Ok(None),
        }
    }

    fn report(&self, report: LatchReport) {
        if let Some(reporter) = &self.reporter {
            reporter.report(report);
        }
    }

    fn resolve_key(&mut self, key: KeyEvent) -> io::Result<Option<Event>> {
        if let KeyCode::Modifier(code) = key.code {
            let id = match code {
                ModifierKeyCode::LeftShift | ModifierKeyCode::RightShift => ModifierId::Shift,
                ModifierKeyCode::LeftAlt | ModifierKeyCode::RightAlt => ModifierId::Alt,
                _ => return Ok(None),
            };
            let pressed = key.kind != KeyEventKind::Release;
            self.report(LatchReport::Set(id, pressed));
            return Ok((key.kind != KeyEventKind::Repeat).then_some(Event::ModifierLatch(id, pressed)));
        }
        if key.kind == KeyEventKind::Release {
            return Ok(None);
        }

        let event = match key.code {
            KeyCode::Esc => self.capture_escape()?,
            KeyCode::F(n) => self.function_key(n, key.modifiers),
            KeyCode::Up => Event::Navigate(Direction::Up),
            KeyCode::Down => Event::Navigate(Direction::Down),
            KeyCode::Left => Event::Navigate(Direction::Left),
            KeyCode::Right => Event::Navigate(Direction::Right),
            KeyCode::PageUp => Event::Navigate(Direction::PageUp),
            KeyCode::PageDown => Event::Navigate(Direction::PageDown),
            KeyCode::Home => Event::Navigate(Direction::Home),
            KeyCode::End => Event::Navigate(Direction::End),
            KeyCode::Tab => Event::PanelSwitch,
            KeyCode::BackTab => Event::Navigate(Direction::Up),
            KeyCode::Enter => Event::Submit,
            KeyCode::Backspace => Event::Backspace,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                // Raw mode turns the interrupt into a key; exit goes through the save flow
                info!("Interrupt key ignored");
                Event::Unrecognized
            }
            KeyCode::Char(_) if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
                Event::Unrecognized
            }
            KeyCode::Char(c) => Event::Printable(c),
            _ => Event::Unrecognized,
        };
        Ok(Some(event))
    }

    fn function_key(&mut self, n: u8, modifiers: KeyModifiers) -> Event {
        let (index, implied) = match n {
            1..=12 => (usize::from(n) - 1, None),
            13..=24 => (usize::from(n) - 13, Some(Modifier::Shift)),
            _ => return Event::Unrecognized,
        };
        let modifier = implied.unwrap_or_else(|| {
            if modifiers.contains(KeyModifiers::SHIFT) {
                Modifier::Shift
            } else if modifiers.contains(KeyModifiers::ALT) {
                Modifier::Alt
            } else {
                self.latch.sample().active()
            }
        });
        self.checked_fkey(index, modifier)
    }

    fn checked_fkey(&self, index: usize, modifier: Modifier) -> Event {
        if index < self.footer_slots {
            Event::FunctionKey(index, modifier)
        } else {
            debug!("Function key {} outside footer", index + 1);
            Event::Unrecognized
        }
    }

    fn capture_escape(&mut self) -> io::Result<Event> {
        let mut captured: Vec<CtEvent> = self.pending.drain(..).collect();
        let deadline = Instant::now() + self.escape_window;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !self.source.poll(remaining)? {
                break;
            }
            captured.push(self.source.read()?);
        }
        if captured.is_empty() {
            return Ok(Event::Cancel);
        }

        let chars: Vec<char> = captured.iter().map_while(key_char).collect();
        let decoded = sequence_len(&chars).and_then(|len| {
            let group: String = chars[..len].iter().collect();
            *self.seen.entry(group.clone()).or_insert(0) += 1;
            decode_modified_fkey(&group).map(|hit| (len, group, hit))
        });

        match decoded {
            Some((len, group, (index, modifier))) => {
                debug!("Escape sequence {group:?} decoded as F{} {:?}", index + 1, modifier);
                self.pending.extend(captured.into_iter().skip(len));
                Ok(self.checked_fkey(index, modifier))
            }
            None => {
                debug!("Escape followed by {} unmatched events, re-queued", captured.len());
                self.pending.extend(captured);
                Ok(Event::Cancel)
            }
        }
    }
}
