//! # TUI Adapter
//!
//! The ratatui-specific layer. Reads the terminal, resolves input, renders
//! the browse view and drives every modal flow.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Loop
//!
//! ```text
//!  ┌─▶ sync view (modifier latch, visible height, flash expiry)
//!  │   draw browse view
//!  │   next_event(min(poll timeout, flash remaining))
//!  │     ├─ None          → redraw (clock / footer refresh)
//!  │     ├─ menu open     → MenuState::handle → maybe a flow
//!  │     └─ browse input  → core::action::update, or a flow
//!  └────────────────────────────────────────────────┘
//! ```
//!
//! Flows (forms, confirmations, external tool calls) run synchronously on
//! this thread through `Screen::run_modal`, with the browse view painted
//! dimmed underneath. The only other thread is the modifier monitor.
//!
//! A `SteadyBlock` cursor style is used instead of a blinking cursor because
//! ratatui's `set_cursor_position` resets the terminal's blink timer on every
//! `draw()` call, making blinking cursors appear erratic during continuous redraws.

pub mod component;
pub mod components;
pub mod event;
mod flows;
pub mod modifiers;
pub mod screen;
pub mod theme;
pub mod ui;

use std::io::{self, stdout};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime};
use crossterm::cursor::SetCursorStyle;
use crossterm::event::{
    DisableBracketedPaste, DisableFocusChange, DisableMouseCapture, EnableBracketedPaste,
    EnableFocusChange, EnableMouseCapture, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use log::{debug, info, warn};
use ratatui::Frame;
use ratatui::backend::Backend;

use crate::core::action::{Action, update};
use crate::core::config::ResolvedConfig;
use crate::core::menu::{MENU, MenuAction, MenuInput, MenuOutcome, MenuState};
use crate::core::state::{Modifier, Panel, SessionState};
use crate::keystore::{SystemRunner, ToolRunner};
use crate::tui::component::Renderer;
use crate::tui::components::footer::{self, Command, FOOTER_SLOTS};
use crate::tui::components::menu_bar::item_at;
use crate::tui::event::{Direction, Event, InputResolver, InputSource, MouseAction, TerminalInput};
use crate::tui::modifiers::ModifierMonitor;
use crate::tui::screen::Screen;
use crate::tui::ui::{BrowseLayout, Hit, hit_test};

/// Everything drawn in the browse view.
pub struct Browse {
    pub state: SessionState,
    pub menu: MenuState,
    /// Footer slot being flashed and when the flash ends.
    pub flash: Option<(usize, Instant)>,
    /// Read on every draw, so the menu bar clock keeps running under modals.
    pub clock: fn() -> NaiveDateTime,
}

impl Browse {
    pub fn new(clock: fn() -> NaiveDateTime) -> Self {
        Self {
            state: SessionState::new(),
            menu: MenuState::Closed,
            flash: None,
            clock,
        }
    }

    pub fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    pub fn expire_flash(&mut self, now: Instant) {
        if self.flash.is_some_and(|(_, until)| until <= now) {
            self.flash = None;
        }
    }

    fn flash_remaining(&self, now: Instant) -> Option<Duration> {
        self.flash.map(|(_, until)| until.saturating_duration_since(now))
    }
}

impl Renderer for Browse {
    fn render(&self, frame: &mut Frame, dimmed: bool) {
        ui::draw_browse(frame, self, dimmed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// The session controller: owns the screen, the browse view and the
/// external tool runner.
pub struct Session<B: Backend, S: InputSource> {
    screen: Screen<B, S>,
    view: Browse,
    runner: Box<dyn ToolRunner>,
    config: ResolvedConfig,
    /// Switches terminal mouse reporting; absent when not on a real terminal.
    mouse_capture: Option<fn(bool) -> io::Result<()>>,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl<B: Backend, S: InputSource> Session<B, S> {
    pub fn new(screen: Screen<B, S>, runner: Box<dyn ToolRunner>, config: ResolvedConfig) -> Self {
        Self {
            screen,
            view: Browse::new(local_now),
            runner,
            config,
            mouse_capture: None,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.view.clock = clock;
        self
    }

    pub fn view(&self) -> &Browse {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut Browse {
        &mut self.view
    }

    pub fn screen(&self) -> &Screen<B, S> {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut Screen<B, S> {
        &mut self.screen
    }

    /// Open the startup keystore, then run until the user quits.
    pub fn start(&mut self) -> io::Result<ExitCode> {
        self.sync_view()?;
        let initial = self.config.initial_keystore.clone();
        if !self.open_keystore(initial)? {
            info!("No keystore opened, exiting");
            return Ok(ExitCode::from(1));
        }
        self.run_loop()?;
        Ok(ExitCode::SUCCESS)
    }

    pub fn run_loop(&mut self) -> io::Result<()> {
        while self.step()? == Flow::Continue {}
        info!("Session ended");
        Ok(())
    }

    /// One frame: draw, wait for at most one event, handle it.
    pub fn step(&mut self) -> io::Result<Flow> {
        self.draw()?;
        let now = Instant::now();
        let timeout = self
            .view
            .flash_remaining(now)
            .map_or(self.config.poll_timeout, |left| left.min(self.config.poll_timeout));
        match self.screen.next_event(timeout)? {
            Some(event) => self.handle_event(event),
            None => Ok(Flow::Continue),
        }
    }

    fn sync_view(&mut self) -> io::Result<()> {
        self.view.expire_flash(Instant::now());
        self.view.state.modifiers = self.screen.modifiers();
        let area = self.screen.size()?;
        self.view
            .state
            .set_visible_height(BrowseLayout::visible_height(area));
        Ok(())
    }

    pub fn draw(&mut self) -> io::Result<()> {
        self.sync_view()?;
        let view = &self.view;
        self.screen.draw(|frame| view.render(frame, false))
    }

    pub fn handle_event(&mut self, event: Event) -> io::Result<Flow> {
        if matches!(event, Event::Mouse(..)) && !self.view.state.mouse_enabled {
            return Ok(Flow::Continue);
        }
        if self.view.menu.is_open() {
            return self.handle_menu_event(event);
        }
        let action = match event {
            Event::Navigate(direction) => match direction {
                Direction::Up => Action::Up,
                Direction::Down => Action::Down,
                Direction::PageUp => Action::PageUp,
                Direction::PageDown => Action::PageDown,
                Direction::Home => Action::Top,
                Direction::End => Action::Bottom,
                Direction::Left => Action::Focus(Panel::List),
                Direction::Right => Action::Focus(Panel::Detail),
            },
            Event::PanelSwitch => Action::SwitchPanel,
            Event::Printable('t') => Action::Top,
            Event::Printable('b') => Action::Bottom,
            Event::Printable('q' | 'Q') | Event::Cancel => return self.quit(),
            Event::FunctionKey(index, modifier) => return self.function_key(index, modifier),
            Event::Mouse(x, y, action) => return self.handle_mouse(x, y, action),
            Event::ModifierLatch(id, pressed) => {
                debug!("Latch {:?} {}", id, if pressed { "held" } else { "released" });
                return Ok(Flow::Continue);
            }
            _ => return Ok(Flow::Continue),
        };
        update(&mut self.view.state, action);
        Ok(Flow::Continue)
    }

    fn function_key(&mut self, index: usize, modifier: Modifier) -> io::Result<Flow> {
        self.view.flash = Some((index, Instant::now() + self.config.flash));
        match footer::command(index, modifier) {
            Some(command) => {
                debug!("F{} {:?} → {:?}", index + 1, modifier, command);
                self.run_command(command)
            }
            None => Ok(Flow::Continue),
        }
    }

    fn handle_mouse(&mut self, x: u16, y: u16, action: MouseAction) -> io::Result<Flow> {
        let state = &mut self.view.state;
        match action {
            MouseAction::ScrollUp => update(state, Action::Up),
            MouseAction::ScrollDown => update(state, Action::Down),
            MouseAction::Click => {
                let layout = BrowseLayout::new(self.screen.area());
                match hit_test(&layout, state.scroll_offset, x, y) {
                    Hit::MenuTitle(index) => {
                        self.view.menu.handle(&MENU, MenuInput::ClickTitle(index), state);
                    }
                    Hit::TopMarker => {
                        update(state, Action::Focus(Panel::List));
                        update(state, Action::Top);
                    }
                    Hit::BottomMarker => {
                        update(state, Action::Focus(Panel::List));
                        update(state, Action::Bottom);
                    }
                    Hit::ListRow(row) => {
                        update(state, Action::Focus(Panel::List));
                        if row < state.entries.filtered().len() {
                            update(state, Action::SelectRow(row));
                        }
                    }
                    Hit::List => update(state, Action::Focus(Panel::List)),
                    Hit::Detail => update(state, Action::Focus(Panel::Detail)),
                    Hit::FooterSlot(index) => {
                        let modifier = state.modifiers.active();
                        return self.function_key(index, modifier);
                    }
                    Hit::MenuBar | Hit::Nothing => {}
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn handle_menu_event(&mut self, event: Event) -> io::Result<Flow> {
        let input = match event {
            Event::Navigate(Direction::Left) => MenuInput::Left,
            Event::Navigate(Direction::Right) => MenuInput::Right,
            Event::Navigate(Direction::Up) => MenuInput::Up,
            Event::Navigate(Direction::Down) => MenuInput::Down,
            Event::Submit => MenuInput::Enter,
            Event::Cancel | Event::FunctionKey(8, _) => MenuInput::Close,
            Event::FunctionKey(9, _) => MenuInput::Quit,
            Event::Mouse(x, y, MouseAction::Click) => {
                let area = self.screen.area();
                if y == area.y {
                    match MENU.title_at(x) {
                        Some(index) => MenuInput::ClickTitle(index),
                        None => return Ok(Flow::Continue),
                    }
                } else if let MenuState::SubmenuOpen(index, _) = self.view.menu
                    && let Some(item) = item_at(&MENU, index, &self.view.state, area, x, y)
                {
                    MenuInput::ClickItem(item)
                } else {
                    MenuInput::ClickOutside
                }
            }
            _ => return Ok(Flow::Continue),
        };
        match self.view.menu.handle(&MENU, input, &self.view.state) {
            MenuOutcome::Execute(action) => {
                info!("Menu action {:?}", action);
                self.run_menu_action(action)
            }
            MenuOutcome::Stay | MenuOutcome::Closed => Ok(Flow::Continue),
        }
    }

    fn run_menu_action(&mut self, action: MenuAction) -> io::Result<Flow> {
        let command = match action {
            MenuAction::Filter => Command::Filter,
            MenuAction::ClearFilter => Command::ClearFilter,
            MenuAction::OpenKeystore => Command::Open,
            MenuAction::Save => Command::Save,
            MenuAction::Quit => Command::Quit,
            MenuAction::ToggleMouse => Command::ToggleMouse,
            MenuAction::SearchContent => Command::Search,
            MenuAction::ClearSearch => Command::ClearSearch,
        };
        self.run_command(command)
    }

    fn run_command(&mut self, command: Command) -> io::Result<Flow> {
        match command {
            Command::Help => self.show_help()?,
            Command::ChangePassword => self.change_password()?,
            Command::Export => self.export_entry()?,
            Command::Search => self.search()?,
            Command::Filter => self.filter()?,
            Command::Rename => self.rename_entry()?,
            Command::Save => self.save()?,
            Command::Delete => self.delete_entry()?,
            Command::PullDown => self.view.menu = MenuState::TopBarFocused(0),
            Command::Quit => return self.quit(),
            Command::GenerateKeyPair => self.generate_key_pair()?,
            Command::ImportKeyPair => self.import_key_pair()?,
            Command::ImportCertificate => self.import_certificate()?,
            Command::ImportFromUrl => self.import_from_url()?,
            Command::Open => {
                self.open_keystore(None)?;
            }
            Command::ClearFilter => self.clear_filter(),
            Command::ClearSearch => self.clear_search(),
            Command::ToggleMouse => self.toggle_mouse()?,
        }
        Ok(Flow::Continue)
    }
}

fn set_mouse_capture(enabled: bool) -> io::Result<()> {
    if enabled {
        execute!(stdout(), EnableMouseCapture)
    } else {
        execute!(stdout(), DisableMouseCapture)
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> io::Result<Self> {
        // Bare Shift/Alt presses only arrive with REPORT_ALL_KEYS_AS_ESCAPE_CODES;
        // terminals without the protocol ignore the request
        execute!(
            stdout(),
            EnableMouseCapture,
            EnableBracketedPaste,
            EnableFocusChange,
            SetCursorStyle::SteadyBlock,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                    | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
            )
        )?;
        info!("Terminal modes enabled (mouse, bracketed paste, focus, keyboard enhancement)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(
            stdout(),
            PopKeyboardEnhancementFlags,
            DisableMouseCapture,
            DisableBracketedPaste,
            DisableFocusChange
        );
    }
}

/// Run a full session on the real terminal.
pub fn run(config: ResolvedConfig) -> io::Result<ExitCode> {
    let mut monitor = ModifierMonitor::start(config.modifier_tick)?;
    let resolver = InputResolver::new(
        TerminalInput,
        monitor.reader(),
        FOOTER_SLOTS,
        config.escape_window,
    )
    .with_reporter(monitor.reporter());

    let terminal = ratatui::init();
    let guard = TerminalModeGuard::new();
    if let Err(e) = &guard {
        warn!("Could not enable terminal modes: {e}");
    }

    let screen = Screen::new(terminal, resolver, config.poll_timeout);
    let mut session = Session::new(screen, Box::new(SystemRunner), config);
    session.mouse_capture = Some(set_mouse_capture);
    let result = session.start();

    drop(session);
    drop(guard);
    ratatui::restore();
    monitor.stop();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::{ToolOutput, Workspace};
    use crate::test_support::{SAMPLE_LISTING, ScriptedInput, ScriptedRunner, fixed_now, key};
    use crate::tui::modifiers::LatchReader;
    use crossterm::event::{Event as CtEvent, KeyCode, MouseButton, MouseEvent, MouseEventKind};
    use crossterm::event::KeyModifiers;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn fixed_clock() -> NaiveDateTime {
        fixed_now().naive_utc()
    }

    pub(super) fn session(keys: &[CtEvent], outputs: Vec<ToolOutput>) -> Session<TestBackend, ScriptedInput> {
        let mut input = ScriptedInput::default();
        for k in keys {
            input.push(k.clone());
        }
        let resolver = InputResolver::new(input, LatchReader::detached(), FOOTER_SLOTS, Duration::ZERO);
        let terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let screen = Screen::new(terminal, resolver, Duration::ZERO);
        Session::new(screen, Box::new(ScriptedRunner::new(outputs)), ResolvedConfig::default())
            .with_clock(fixed_clock)
    }

    /// A session with an open workspace over a temp keystore and the sample listing loaded.
    pub(super) fn open_session(
        dir: &tempfile::TempDir,
        keys: &[CtEvent],
        outputs: Vec<ToolOutput>,
    ) -> (Session<TestBackend, ScriptedInput>, std::rc::Rc<std::cell::RefCell<Vec<crate::keystore::Invocation>>>) {
        let original = dir.path().join("store.jks");
        std::fs::write(&original, b"keystore bytes").unwrap();
        let runner = ScriptedRunner::new(outputs);
        let calls = runner.calls.clone();
        let mut s = session(keys, Vec::new());
        s.runner = Box::new(runner);
        s.view.state.workspace = Some(Workspace::open(&original).unwrap());
        s.view
            .state
            .replace_entries(crate::keystore::parse_listing(SAMPLE_LISTING, fixed_now()).unwrap(), None);
        (s, calls)
    }

    pub(super) fn click(x: u16, y: u16) -> CtEvent {
        CtEvent::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: x,
            row: y,
            modifiers: KeyModifiers::NONE,
        })
    }

    pub(super) fn run_all(s: &mut Session<TestBackend, ScriptedInput>) -> Flow {
        loop {
            if s.screen.resolver_mut().source_mut().queue.is_empty()
                && s.screen.resolver_mut().pending().is_empty()
            {
                return Flow::Continue;
            }
            if s.step().unwrap() == Flow::Quit {
                return Flow::Quit;
            }
        }
    }

    #[test]
    fn test_navigation_keys_move_selection() {
        let dir = tempfile::tempdir().unwrap();
        let (mut s, _) = open_session(&dir, &[key(KeyCode::Down)], Vec::new());
        run_all(&mut s);
        assert_eq!(s.view.state.selected_alias().as_deref(), Some("trustedcert"));

        s.screen.resolver_mut().source_mut().push(key(KeyCode::Char('t')));
        run_all(&mut s);
        assert_eq!(s.view.state.selected, 0);
        assert!(s.view.state.invariants_hold());
    }

    #[test]
    fn test_tab_and_arrows_switch_panel() {
        let dir = tempfile::tempdir().unwrap();
        let (mut s, _) = open_session(&dir, &[key(KeyCode::Tab)], Vec::new());
        run_all(&mut s);
        assert_eq!(s.view.state.panel, Panel::Detail);
        s.screen.resolver_mut().source_mut().push(key(KeyCode::Left));
        run_all(&mut s);
        assert_eq!(s.view.state.panel, Panel::List);
    }

    #[test]
    fn test_quit_when_clean_needs_no_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let (mut s, _) = open_session(&dir, &[key(KeyCode::Char('q'))], Vec::new());
        assert_eq!(run_all(&mut s), Flow::Quit);
    }

    #[test]
    fn test_f9_opens_menu_and_escape_closes_it() {
        let dir = tempfile::tempdir().unwrap();
        let (mut s, _) = open_session(&dir, &[key(KeyCode::F(9))], Vec::new());
        run_all(&mut s);
        assert_eq!(s.view.menu, MenuState::TopBarFocused(0));
        s.screen.resolver_mut().source_mut().push(key(KeyCode::Esc));
        run_all(&mut s);
        assert_eq!(s.view.menu, MenuState::Closed);
    }

    #[test]
    fn test_f10_inside_menu_quits() {
        let dir = tempfile::tempdir().unwrap();
        let (mut s, _) = open_session(&dir, &[key(KeyCode::F(9)), key(KeyCode::F(10))], Vec::new());
        assert_eq!(run_all(&mut s), Flow::Quit);
    }

    #[test]
    fn test_function_key_flashes_footer_slot() {
        let dir = tempfile::tempdir().unwrap();
        let (mut s, _) = open_session(&dir, &[key(KeyCode::F(9))], Vec::new());
        run_all(&mut s);
        assert_eq!(s.view.flash.map(|(slot, _)| slot), Some(8));
        s.view.expire_flash(Instant::now() + Duration::from_secs(1));
        assert!(s.view.flash.is_none());
    }

    #[test]
    fn test_mouse_clicks() {
        let dir = tempfile::tempdir().unwrap();
        // Row 3 is the second list entry; column 50 is the detail panel
        let (mut s, _) = open_session(&dir, &[click(4, 3)], Vec::new());
        run_all(&mut s);
        assert_eq!(s.view.state.selected, 1);

        s.screen.resolver_mut().source_mut().push(click(50, 5));
        run_all(&mut s);
        assert_eq!(s.view.state.panel, Panel::Detail);

        s.screen.resolver_mut().source_mut().push(click(9, 0));
        run_all(&mut s);
        assert_eq!(s.view.menu, MenuState::SubmenuOpen(1, None));

        s.screen.resolver_mut().source_mut().push(click(60, 15));
        run_all(&mut s);
        assert_eq!(s.view.menu, MenuState::Closed);
    }

    #[test]
    fn test_mouse_ignored_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let (mut s, _) = open_session(&dir, &[click(4, 3)], Vec::new());
        s.view.state.mouse_enabled = false;
        run_all(&mut s);
        assert_eq!(s.view.state.selected, 0);
    }

    #[test]
    fn test_unbound_slot_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let (mut s, calls) = open_session(
            &dir,
            &[crate::test_support::key_with(KeyCode::F(6), KeyModifiers::SHIFT)],
            Vec::new(),
        );
        assert_eq!(run_all(&mut s), Flow::Continue);
        assert!(calls.borrow().is_empty());
    }
}
