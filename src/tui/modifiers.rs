//! # Modifier Latch
//!
//! Tracks whether Shift/Alt are *held*, which ordinary key events cannot
//! tell us. Two writers feed one table:
//!
//! - the monitor thread samples the physical keyboard every tick through a
//!   `KeyState` (backed by `device_query`), which works on any terminal as
//!   long as the keyboard can be read (X11/Wayland-XWayland, macOS, Windows);
//! - terminals speaking the keyboard enhancement protocol also report bare
//!   modifier presses, which the resolver forwards as `LatchReport`s.
//!
//! ```text
//!  main thread                         "modifier-monitor" thread
//!  ───────────                         ─────────────────────────
//!  InputResolver ── LatchReport ──▶ mpsc ──▶ apply ───────┐
//!                                   KeyState::held() ─────┤ every tick
//!                                                         ▼
//!       ┌── try_lock ◀──────────── Arc<Mutex<LatchTable>>
//!  LatchReader (never waits; falls back to the last snapshot)
//! ```
//!
//! A modifier counts as held when either source says so. The monitor thread
//! never touches the screen or the entry model.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use device_query::{DeviceQuery, DeviceState, Keycode};
use log::{debug, info, warn};

use crate::core::state::ModifierFlags;

/// Something that can say which modifiers are physically down right now.
pub trait KeyState {
    fn held(&mut self) -> ModifierFlags;
}

/// The real keyboard, read through `device_query`.
pub struct DeviceKeys {
    state: DeviceState,
}

impl DeviceKeys {
    /// `None` when the keyboard cannot be queried (no display, no
    /// accessibility permission).
    pub fn open() -> Option<Self> {
        DeviceState::checked_new().map(|state| Self { state })
    }
}

impl KeyState for DeviceKeys {
    fn held(&mut self) -> ModifierFlags {
        let keys = self.state.get_keys();
        ModifierFlags {
            shift: keys
                .iter()
                .any(|k| matches!(k, Keycode::LShift | Keycode::RShift)),
            alt: keys
                .iter()
                .any(|k| matches!(k, Keycode::LAlt | Keycode::RAlt)),
        }
    }
}

/// Opens the key-state source on the monitor thread itself, so the source
/// does not have to be `Send`.
pub type KeyStateOpener = Box<dyn FnOnce() -> Option<Box<dyn KeyState>> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierId {
    Shift,
    Alt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchReport {
    Set(ModifierId, bool),
    /// Focus lost: releases may never arrive, so drop everything.
    ReleaseAll,
}

/// Logical modifier → held, from reports and from the last keyboard sample.
#[derive(Debug, Default)]
pub struct LatchTable {
    held: HashMap<ModifierId, bool>,
    sampled: ModifierFlags,
}

impl LatchTable {
    /// Store a keyboard sample. Returns whether it changed.
    pub fn set_sampled(&mut self, flags: ModifierFlags) -> bool {
        let changed = self.sampled != flags;
        self.sampled = flags;
        changed
    }

    pub fn apply(&mut self, report: LatchReport) {
        match report {
            LatchReport::Set(id, pressed) => {
                self.held.insert(id, pressed);
            }
            LatchReport::ReleaseAll => {
                self.held.clear();
                self.sampled = ModifierFlags::default();
            }
        }
    }

    pub fn is_held(&self, id: ModifierId) -> bool {
        self.held.get(&id).copied().unwrap_or(false)
    }

    pub fn snapshot(&self) -> ModifierFlags {
        ModifierFlags {
            shift: self.is_held(ModifierId::Shift) || self.sampled.shift,
            alt: self.is_held(ModifierId::Alt) || self.sampled.alt,
        }
    }
}

/// Main-thread view of the latch table.
pub struct LatchReader {
    table: Arc<Mutex<LatchTable>>,
    last: ModifierFlags,
}

impl LatchReader {
    pub fn new(table: Arc<Mutex<LatchTable>>) -> Self {
        Self {
            table,
            last: ModifierFlags::default(),
        }
    }

    /// A reader over a table nobody writes to.
    pub fn detached() -> Self {
        Self::new(Arc::new(Mutex::new(LatchTable::default())))
    }

    /// Current flags, or the previous sample if the table is busy.
    pub fn sample(&mut self) -> ModifierFlags {
        match self.table.try_lock() {
            Ok(table) => self.last = table.snapshot(),
            Err(TryLockError::Poisoned(poisoned)) => self.last = poisoned.into_inner().snapshot(),
            Err(TryLockError::WouldBlock) => {}
        }
        self.last
    }
}

/// Sending half handed to the resolver.
#[derive(Clone)]
pub struct LatchReporter {
    tx: Sender<LatchReport>,
}

impl LatchReporter {
    pub fn report(&self, report: LatchReport) {
        // Monitor gone means we are shutting down
        let _ = self.tx.send(report);
    }
}

pub struct ModifierMonitor {
    table: Arc<Mutex<LatchTable>>,
    tx: Sender<LatchReport>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ModifierMonitor {
    /// Spawn the monitor thread over the real keyboard.
    pub fn start(tick: Duration) -> io::Result<Self> {
        Self::start_with(
            tick,
            Box::new(|| DeviceKeys::open().map(|keys| Box::new(keys) as Box<dyn KeyState>)),
        )
    }

    /// Spawn the monitor thread. `tick` is both the keyboard sampling
    /// period and the bound on how long it waits between stop-flag checks.
    pub fn start_with(tick: Duration, open_keys: KeyStateOpener) -> io::Result<Self> {
        let table = Arc::new(Mutex::new(LatchTable::default()));
        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel::<LatchReport>();

        let thread_table = Arc::clone(&table);
        let thread_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("modifier-monitor".to_string())
            .spawn(move || {
                let mut keys = open_keys();
                if keys.is_none() {
                    warn!("Keyboard state unavailable, modifier latch relies on terminal reports");
                }
                while !thread_stop.load(Ordering::Relaxed) {
                    let report = match rx.recv_timeout(tick) {
                        Ok(report) => Some(report),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    };
                    let sample = keys.as_mut().map(|k| k.held());
                    let mut table = match thread_table.lock() {
                        Ok(table) => table,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    if let Some(report) = report {
                        debug!("Modifier latch: {:?}", report);
                        table.apply(report);
                    }
                    if let Some(flags) = sample
                        && table.set_sampled(flags)
                    {
                        debug!("Modifier keys held: {:?}", flags);
                    }
                }
            })?;
        info!("Modifier monitor started (tick {:?})", tick);

        Ok(Self {
            table,
            tx,
            stop,
            handle: Some(handle),
        })
    }

    pub fn reader(&self) -> LatchReader {
        LatchReader::new(Arc::clone(&self.table))
    }

    pub fn reporter(&self) -> LatchReporter {
        LatchReporter {
            tx: self.tx.clone(),
        }
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("Modifier monitor thread panicked");
        }
    }
}

impl Drop for ModifierMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
