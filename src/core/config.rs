//! # Configuration
//!
//! keyzerchief reads no config file and no environment variables: every
//! setting is a compiled default, and the only runtime input is the
//! optional keystore path from the command line.
//!
//! Settings are still gathered in one `ResolvedConfig` so the rest of the
//! program never reaches for a constant directly.

use std::path::PathBuf;
use std::time::Duration;

use log::debug;

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_KEYTOOL: &str = "keytool";
pub const DEFAULT_OPENSSL: &str = "openssl";

/// Upper bound on one input poll; the clock and footer refresh at least this often.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(250);
/// How long bytes following an ESC are collected before matching.
pub const DEFAULT_ESCAPE_WINDOW: Duration = Duration::from_millis(25);
/// Tick of the background modifier monitor.
pub const DEFAULT_MODIFIER_TICK: Duration = Duration::from_millis(20);
/// How long a pressed footer key stays highlighted.
pub const DEFAULT_FLASH: Duration = Duration::from_millis(200);

pub const DEFAULT_MAX_FIELD_LEN: usize = 60;
pub const DEFAULT_FORM_WIDTH: u16 = 75;
pub const DEFAULT_KEYSTORE_EXTENSIONS: &[&str] = &["jks", "p12", "pfx", "keystore"];

const LOG_FILE: &str = "keyzerchief.log";

// ============================================================================
// Resolved Config
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub initial_keystore: Option<PathBuf>,
    pub keytool: String,
    pub openssl: String,
    pub poll_timeout: Duration,
    pub escape_window: Duration,
    pub modifier_tick: Duration,
    pub flash: Duration,
    pub max_field_len: usize,
    pub form_width: u16,
    pub keystore_extensions: Vec<String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        resolve(None)
    }
}

/// Collapse compiled defaults and the CLI argument into the final config.
pub fn resolve(cli_keystore: Option<PathBuf>) -> ResolvedConfig {
    let config = ResolvedConfig {
        initial_keystore: cli_keystore,
        keytool: DEFAULT_KEYTOOL.to_string(),
        openssl: DEFAULT_OPENSSL.to_string(),
        poll_timeout: DEFAULT_POLL_TIMEOUT,
        escape_window: DEFAULT_ESCAPE_WINDOW,
        modifier_tick: DEFAULT_MODIFIER_TICK,
        flash: DEFAULT_FLASH,
        max_field_len: DEFAULT_MAX_FIELD_LEN,
        form_width: DEFAULT_FORM_WIDTH,
        keystore_extensions: DEFAULT_KEYSTORE_EXTENSIONS
            .iter()
            .map(|s| s.to_string())
            .collect(),
    };
    debug!("Config: {:?}", config);
    config
}

/// Where the session log goes: the user cache dir, else the temp dir.
pub fn log_path() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("keyzerchief"))
        .unwrap_or_else(std::env::temp_dir)
        .join(LOG_FILE)
}
