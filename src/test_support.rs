//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::cell::RefCell;
use std::rc::Rc;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use crossterm::event::{Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::keystore::{Entry, Invocation, ToolOutput, ToolRunner, parse_listing};
use crate::tui::event::InputSource;

pub const SAMPLE_LISTING: &str = "
Keystore type: PKCS12
Keystore provider: SUN

Your keystore contains 2 entries

Alias name: mykey
Creation date: Nov 23, 2023
Entry type: PrivateKeyEntry
Certificate chain length: 1
Certificate[1]:
Owner: CN=Test, OU=Unit, O=Org, L=City, ST=State, C=US
Issuer: CN=Test, OU=Unit, O=Org, L=City, ST=State, C=US
Serial number: 12345678
Valid from: Thu Nov 23 10:00:00 UTC 2023 until: Thu Nov 23 10:00:00 CET 2034
Certificate fingerprints:
\t SHA1: AA:BB:CC
\t SHA256: 11:22:33

*******************************************


Alias name: trustedcert
Creation date: Nov 23, 2019
Entry type: trustedCertEntry

Owner: CN=CA, O=Org, C=US
Issuer: CN=CA, O=Org, C=US
Serial number: 87654321
Valid from: Sat Nov 23 10:00:00 UTC 2019 until: Mon Nov 23 10:00:00 UTC 2020
";

const WIDER_LISTING: &str = "
Keystore type: JKS
Keystore provider: SUN

Your keystore contains 5 entries

Alias name: mykey
Entry type: PrivateKeyEntry
Valid from: Thu Nov 23 10:00:00 UTC 2023 until: Thu Nov 23 10:00:00 UTC 2034

Alias name: trustedcert
Entry type: trustedCertEntry
Valid from: Sat Nov 23 10:00:00 UTC 2019 until: Mon Nov 23 10:00:00 UTC 2020

Alias name: backupkey
Entry type: PrivateKeyEntry
Valid from: Sat Nov 23 10:00:00 CEST 2019 until: Mon Nov 23 10:00:00 CEST 2020

Alias name: rootca
Entry type: trustedCertEntry
Valid from: Sat Nov 23 10:00:00 WET 2019 until: Sun Nov 23 10:00:00 WEST 2059

Alias name: aes
Entry type: SecretKeyEntry
";

/// The instant all expiry tests are evaluated at.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

/// Five entries covering every kind/expiry combination.
pub fn sample_entries() -> Vec<Entry> {
    parse_listing(WIDER_LISTING, fixed_now()).unwrap()
}

/// Replays canned outputs in order and records every invocation.
///
/// `calls` is shared so a test can keep a handle after boxing the runner.
pub struct ScriptedRunner {
    outputs: RefCell<VecDeque<ToolOutput>>,
    pub calls: Rc<RefCell<Vec<Invocation>>>,
}

impl ScriptedRunner {
    pub fn new(outputs: Vec<ToolOutput>) -> Self {
        Self {
            outputs: RefCell::new(outputs.into()),
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|inv| format!("{} {}", inv.program, inv.args.first().cloned().unwrap_or_default()))
            .collect()
    }
}

impl ToolRunner for ScriptedRunner {
    fn invoke(&self, invocation: &Invocation) -> io::Result<ToolOutput> {
        self.calls.borrow_mut().push(invocation.clone());
        Ok(self
            .outputs
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| ToolOutput::ok("")))
    }
}

/// Consecutive empty polls after which a script counts as stuck.
const MAX_IDLE_POLLS: usize = 200;

/// Terminal input that has already "arrived": everything is buffered, so
/// `poll` never waits.
///
/// A loop that keeps polling an exhausted script gets an error instead of
/// spinning forever, so a flow waiting for input it will never get fails
/// its test.
#[derive(Default)]
pub struct ScriptedInput {
    pub queue: VecDeque<CtEvent>,
    idle_polls: usize,
}

impl ScriptedInput {
    pub fn keys(codes: &[KeyCode]) -> Self {
        Self {
            queue: codes.iter().map(|c| key(*c)).collect(),
            ..Self::default()
        }
    }

    /// ESC followed by the characters of `tail`, as a terminal that
    /// splits an escape sequence would deliver it.
    pub fn escape_sequence(tail: &str) -> Self {
        let mut queue: VecDeque<CtEvent> = VecDeque::new();
        queue.push_back(key(KeyCode::Esc));
        queue.extend(tail.chars().map(|c| key(KeyCode::Char(c))));
        Self {
            queue,
            ..Self::default()
        }
    }

    pub fn push(&mut self, event: CtEvent) {
        self.queue.push_back(event);
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self, _timeout: Duration) -> io::Result<bool> {
        if !self.queue.is_empty() {
            self.idle_polls = 0;
            return Ok(true);
        }
        self.idle_polls += 1;
        if self.idle_polls > MAX_IDLE_POLLS {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "script exhausted"));
        }
        Ok(false)
    }

    fn read(&mut self) -> io::Result<CtEvent> {
        self.queue
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
    }
}

pub fn key(code: KeyCode) -> CtEvent {
    CtEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

pub fn key_with(code: KeyCode, modifiers: KeyModifiers) -> CtEvent {
    CtEvent::Key(KeyEvent::new(code, modifiers))
}

pub fn key_kind(code: KeyCode, kind: KeyEventKind) -> CtEvent {
    CtEvent::Key(KeyEvent::new_with_kind(code, KeyModifiers::NONE, kind))
}

/// Render a buffer as one string per row.
pub fn buffer_lines(buffer: &ratatui::buffer::Buffer) -> Vec<String> {
    let width = buffer.area.width as usize;
    buffer
        .content()
        .chunks(width)
        .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
        .collect()
}
