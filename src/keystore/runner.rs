//! # External Tool Boundary
//!
//! Every keystore mutation is delegated to `keytool` or `openssl`. The core
//! only sees `invoke(args) -> (exit code, stdout, stderr)`; it never parses
//! operation-specific output beyond success, failure and a message.
//!
//! `ToolRunner` is the seam: `SystemRunner` spawns real processes, tests
//! substitute a scripted runner.

use std::fmt;
use std::io;
use std::process::{Command, Stdio};

use log::{debug, info, warn};

use crate::keystore::error::{KeystoreError, ToolFailure};

/// Flags whose following argument is a secret.
const SECRET_FLAGS: &[&str] = &[
    "-storepass",
    "-keypass",
    "-srcstorepass",
    "-deststorepass",
    "-srckeypass",
    "-destkeypass",
    "-new",
];

/// A program plus its argument vector. No shell is involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// True if `flag` appears as an argument.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    /// The argument directly following `flag`, if any.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// Command line safe for logs: password values become `***`.
    pub fn redacted(&self) -> String {
        let mut parts = vec![self.program.clone()];
        let mut hide_next = false;
        for arg in &self.args {
            if hide_next {
                parts.push("***".to_string());
                hide_next = false;
            } else if arg.starts_with("pass:") {
                parts.push("pass:***".to_string());
            } else {
                hide_next = SECRET_FLAGS.contains(&arg.as_str());
                parts.push(arg.clone());
            }
        }
        parts.join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// The text worth showing to the user: stdout first, stderr as fallback.
    pub fn message(&self) -> &str {
        let out = self.stdout.trim();
        if out.is_empty() { self.stderr.trim() } else { out }
    }
}

pub trait ToolRunner {
    fn invoke(&self, invocation: &Invocation) -> io::Result<ToolOutput>;
}

/// Runs programs from `PATH` with stdin closed.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn invoke(&self, invocation: &Invocation) -> io::Result<ToolOutput> {
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .output()?;
        Ok(ToolOutput {
            // Killed by a signal: no code, report as generic failure
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Invoke and convert a non-zero exit into `KeystoreError::Tool`.
pub fn run_checked(
    runner: &dyn ToolRunner,
    invocation: &Invocation,
) -> Result<ToolOutput, KeystoreError> {
    info!("Running {}", invocation.redacted());
    let output = runner.invoke(invocation)?;
    if output.success() {
        debug!("{} succeeded", invocation.program);
        Ok(output)
    } else {
        warn!(
            "{} failed with status {}: {}",
            invocation.program,
            output.status,
            output.message()
        );
        Err(KeystoreError::Tool(ToolFailure {
            program: invocation.program.clone(),
            status: output.status,
            message: output.message().to_string(),
        }))
    }
}
