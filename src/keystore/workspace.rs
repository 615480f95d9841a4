//! # Working Copy
//!
//! Every edit goes to a private temp copy of the keystore. The original is
//! only overwritten by an explicit, confirmed save. The copy is deleted when
//! the `Workspace` is dropped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use tempfile::NamedTempFile;
use zeroize::Zeroizing;

use crate::keystore::commands::Keytool;

pub struct Workspace {
    original: PathBuf,
    working: NamedTempFile,
    password: Zeroizing<String>,
}

impl Workspace {
    /// Copy `original` into a fresh temp file. Fails if the original is
    /// missing or unreadable.
    pub fn open(original: &Path) -> io::Result<Self> {
        let suffix = original
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_else(|| ".jks".to_string());
        let working = tempfile::Builder::new()
            .prefix("keyzerchief-")
            .suffix(&suffix)
            .tempfile()?;
        fs::copy(original, working.path())?;
        info!(
            "Opened {} (working copy {})",
            original.display(),
            working.path().display()
        );
        Ok(Self {
            original: original.to_path_buf(),
            working,
            password: Zeroizing::new(String::new()),
        })
    }

    pub fn original(&self) -> &Path {
        &self.original
    }

    pub fn working(&self) -> &Path {
        self.working.path()
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn set_password(&mut self, password: &str) {
        self.password = Zeroizing::new(password.to_string());
    }

    pub fn keytool<'a>(&'a self, program: &'a str) -> Keytool<'a> {
        Keytool::new(program, self.working(), &self.password)
    }

    /// Byte-wise comparison of working copy and original. Anything
    /// unreadable counts as dirty.
    pub fn is_dirty(&self) -> bool {
        match (fs::read(self.working()), fs::read(&self.original)) {
            (Ok(working), Ok(original)) => working != original,
            (Err(e), _) | (_, Err(e)) => {
                warn!("Dirty check failed, assuming unsaved changes: {e}");
                true
            }
        }
    }

    /// Write the working copy over the original.
    pub fn save(&self) -> io::Result<()> {
        fs::copy(self.working(), &self.original)?;
        info!("Saved working copy to {}", self.original.display());
        Ok(())
    }
}
