//! # Keystore
//!
//! The Entry Model and everything that touches the keystore file.
//!
//! ```text
//!  Workspace ──(working copy path, password)──▶ Keytool / Openssl builders
//!                                                   │ Invocation
//!                                                   ▼
//!                                              ToolRunner ──▶ ToolOutput
//!                                                   │
//!                       parse_listing ◀─── stdout ──┘
//!                             │
//!                        Vec<Entry> ──▶ apply_filter(FilterState)
//! ```
//!
//! Nothing here knows about the terminal.

pub mod commands;
pub mod entry;
pub mod error;
pub mod filter;
pub mod pem;
pub mod runner;
pub mod validate;
pub mod workspace;

pub use entry::{Entry, EntryKind, find_index_by_alias, load, parse_listing};
pub use error::{KeystoreError, ToolFailure};
pub use filter::{FilterState, apply_filter};
pub use runner::{Invocation, SystemRunner, ToolOutput, ToolRunner};
pub use workspace::Workspace;
