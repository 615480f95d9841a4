use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use crossterm::event::{Event as CtEvent, KeyCode, KeyEvent, KeyModifiers};
use keyzerchief::core::config::ResolvedConfig;
use keyzerchief::keystore::{
    FilterState, Invocation, KeystoreError, SystemRunner, ToolOutput, ToolRunner, Workspace,
    apply_filter, load, parse_listing,
};
use keyzerchief::tui::Session;
use keyzerchief::tui::components::footer::FOOTER_SLOTS;
use keyzerchief::tui::event::{InputResolver, InputSource};
use keyzerchief::tui::modifiers::LatchReader;
use keyzerchief::tui::screen::Screen;
use ratatui::Terminal;
use ratatui::backend::TestBackend;

// ============================================================================
// Fakes
// ============================================================================

const LISTING: &str = "
Keystore type: PKCS12

Your keystore contains 2 entries

Alias name: server
Entry type: PrivateKeyEntry
Owner: CN=server
Valid from: Thu Nov 23 10:00:00 UTC 2023 until: Thu Nov 23 10:00:00 UTC 2099

Alias name: oldroot
Entry type: trustedCertEntry
Owner: CN=Old Root
Valid from: Sat Nov 23 10:00:00 UTC 2009 until: Mon Nov 23 10:00:00 UTC 2015
";

const AFTER_DELETE: &str = "
Keystore type: PKCS12

Your keystore contains 1 entry

Alias name: oldroot
Entry type: trustedCertEntry
Valid from: Sat Nov 23 10:00:00 UTC 2009 until: Mon Nov 23 10:00:00 UTC 2015
";

/// Plays keytool: lists entries, and a delete rewrites the working copy so
/// the session sees unsaved changes.
struct FakeKeytool {
    password: &'static str,
    deleted: RefCell<bool>,
    calls: Rc<RefCell<Vec<Invocation>>>,
}

impl FakeKeytool {
    fn new(password: &'static str) -> Self {
        Self {
            password,
            deleted: RefCell::new(false),
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl ToolRunner for FakeKeytool {
    fn invoke(&self, invocation: &Invocation) -> io::Result<ToolOutput> {
        self.calls.borrow_mut().push(invocation.clone());
        if invocation.value_of("-storepass") != Some(self.password) {
            return Ok(ToolOutput::failed(
                1,
                "keytool error: java.io.IOException: keystore password was incorrect",
            ));
        }
        match invocation.args.first().map(String::as_str) {
            Some("-list") if *self.deleted.borrow() => Ok(ToolOutput::ok(AFTER_DELETE)),
            Some("-list") => Ok(ToolOutput::ok(LISTING)),
            Some("-delete") => {
                let keystore = invocation.value_of("-keystore").unwrap_or_default();
                fs::write(keystore, b"store without server")?;
                *self.deleted.borrow_mut() = true;
                Ok(ToolOutput::ok(""))
            }
            _ => Ok(ToolOutput::failed(1, "unexpected command")),
        }
    }
}

#[derive(Default)]
struct Keys {
    queue: VecDeque<CtEvent>,
    idle: usize,
}

impl Keys {
    fn new(events: Vec<CtEvent>) -> Self {
        Self {
            queue: events.into(),
            idle: 0,
        }
    }
}

impl InputSource for Keys {
    fn poll(&mut self, _timeout: Duration) -> io::Result<bool> {
        if !self.queue.is_empty() {
            return Ok(true);
        }
        self.idle += 1;
        if self.idle > 100 {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no more keys"));
        }
        Ok(false)
    }

    fn read(&mut self) -> io::Result<CtEvent> {
        self.queue
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more keys"))
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn key(code: KeyCode) -> CtEvent {
    CtEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

fn fixed_clock() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap()
}

fn session(keystore: &Path, keys: Vec<CtEvent>, runner: FakeKeytool) -> Session<TestBackend, Keys> {
    let resolver = InputResolver::new(Keys::new(keys), LatchReader::detached(), FOOTER_SLOTS, Duration::ZERO);
    let terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
    let screen = Screen::new(terminal, resolver, Duration::ZERO);
    let config = ResolvedConfig {
        initial_keystore: Some(keystore.to_path_buf()),
        ..ResolvedConfig::default()
    };
    Session::new(screen, Box::new(runner), config).with_clock(fixed_clock)
}

// ============================================================================
// Keystore layer
// ============================================================================

#[test]
fn test_listing_filters_by_expiry_and_kind() {
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let entries = parse_listing(LISTING, now).unwrap();
    assert_eq!(entries.len(), 2);

    let valid_only = FilterState {
        expired: false,
        ..FilterState::default()
    };
    let names: Vec<String> = apply_filter(&entries, &valid_only)
        .into_iter()
        .map(|e| e.alias)
        .collect();
    assert_eq!(names, vec!["server"]);

    let certificates_only = FilterState {
        keys: false,
        ..FilterState::default()
    };
    let names: Vec<String> = apply_filter(&entries, &certificates_only)
        .into_iter()
        .map(|e| e.alias)
        .collect();
    assert_eq!(names, vec!["oldroot"]);
}

#[test]
fn test_load_targets_the_working_copy() {
    let dir = tempfile::tempdir().unwrap();
    let original = dir.path().join("store.p12");
    fs::write(&original, b"original").unwrap();

    let mut workspace = Workspace::open(&original).unwrap();
    workspace.set_password("changeit");
    let runner = FakeKeytool::new("changeit");
    let entries = load(&runner, &workspace.keytool("keytool")).unwrap();
    assert_eq!(entries.len(), 2);

    let calls = runner.calls.borrow();
    let keystore = calls[0].value_of("-keystore").unwrap();
    assert_eq!(Path::new(keystore), workspace.working());
    assert_ne!(Path::new(keystore), original.as_path());
    assert!(!workspace.is_dirty());
}

#[test]
fn test_wrong_password_is_a_tool_failure() {
    let dir = tempfile::tempdir().unwrap();
    let original = dir.path().join("store.jks");
    fs::write(&original, b"original").unwrap();

    let workspace = Workspace::open(&original).unwrap();
    let runner = FakeKeytool::new("changeit");
    let result = load(&runner, &workspace.keytool("keytool"));
    assert!(matches!(result, Err(KeystoreError::Tool(_))));
}

#[test]
fn test_missing_program_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let original = dir.path().join("store.jks");
    fs::write(&original, b"original").unwrap();

    let workspace = Workspace::open(&original).unwrap();
    let result = load(&SystemRunner, &workspace.keytool("keyzerchief-no-such-keytool"));
    assert!(result.is_err());
}

#[test]
fn test_working_copy_is_removed_on_drop() {
    let dir = tempfile::tempdir().unwrap();
    let original = dir.path().join("store.jks");
    fs::write(&original, b"original").unwrap();

    let workspace = Workspace::open(&original).unwrap();
    let working = workspace.working().to_path_buf();
    assert!(working.exists());
    drop(workspace);
    assert!(!working.exists());
    assert_eq!(fs::read(&original).unwrap(), b"original");
}

// ============================================================================
// Whole session
// ============================================================================

#[test]
fn test_delete_then_save_on_quit() {
    let dir = tempfile::tempdir().unwrap();
    let original = dir.path().join("store.jks");
    fs::write(&original, b"original").unwrap();

    let keys = vec![
        // Password prompt: the empty password is rejected first
        CtEvent::Paste("changeit".to_string()),
        key(KeyCode::Down),
        key(KeyCode::Enter),
        // Delete "server", dismiss the result
        key(KeyCode::F(8)),
        key(KeyCode::Char('y')),
        key(KeyCode::Enter),
        // Quit and save
        key(KeyCode::Char('q')),
        key(KeyCode::Char('y')),
    ];
    let runner = FakeKeytool::new("changeit");
    let calls = runner.calls.clone();
    let mut s = session(&original, keys, runner);

    assert_eq!(s.start().unwrap(), ExitCode::SUCCESS);
    assert_eq!(fs::read(&original).unwrap(), b"store without server");
    let aliases: Vec<&str> = s
        .view()
        .state
        .entries
        .all()
        .iter()
        .map(|e| e.alias.as_str())
        .collect();
    assert_eq!(aliases, vec!["oldroot"]);

    let commands: Vec<String> = calls
        .borrow()
        .iter()
        .map(|c| c.args[0].clone())
        .collect();
    assert_eq!(commands, vec!["-list", "-list", "-delete", "-list"]);
}

#[test]
fn test_quit_without_saving_keeps_original() {
    let dir = tempfile::tempdir().unwrap();
    let original = dir.path().join("store.jks");
    fs::write(&original, b"original").unwrap();

    let keys = vec![
        key(KeyCode::F(8)),
        key(KeyCode::Char('y')),
        key(KeyCode::Enter),
        key(KeyCode::Char('q')),
        key(KeyCode::Char('n')),
    ];
    let mut s = session(&original, keys, FakeKeytool::new(""));

    assert_eq!(s.start().unwrap(), ExitCode::SUCCESS);
    assert_eq!(fs::read(&original).unwrap(), b"original");
}
