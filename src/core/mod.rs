//! # Core Session Logic
//!
//! Everything the browse session decides, independent of how it is drawn.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • SessionState         │
//!                    │  • Action + update()    │
//!                    │  • Menu state machine   │
//!                    │  • Resolved config      │
//!                    │                         │
//!                    │  No terminal. No I/O.   │
//!                    └───────────┬─────────────┘
//!                                │
//!                                ▼
//!                         ┌────────────┐
//!                         │    TUI     │
//!                         │  Adapter   │
//!                         │ (ratatui)  │
//!                         └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`state`]: `SessionState` and the selection invariants
//! - [`action`]: navigation `Action`s and the `update()` reducer
//! - [`menu`]: `MenuSpec`, `MenuState` and its transitions
//! - [`config`]: compiled defaults resolved with the CLI argument

pub mod action;
pub mod config;
pub mod menu;
pub mod state;
