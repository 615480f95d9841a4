use std::fmt;
use std::io;

/// A non-zero exit from an external program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFailure {
    pub program: String,
    pub status: i32,
    /// Trimmed stdout, or stderr when stdout was empty.
    pub message: String,
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{} exited with status {}", self.program, self.status)
        } else {
            write!(f, "{} exited with status {}: {}", self.program, self.status, self.message)
        }
    }
}

#[derive(Debug)]
pub enum KeystoreError {
    Io(io::Error),
    Tool(ToolFailure),
    Parse(String),
}

impl fmt::Display for KeystoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeystoreError::Io(e) => write!(f, "keystore I/O error: {e}"),
            KeystoreError::Tool(failure) => write!(f, "{failure}"),
            KeystoreError::Parse(msg) => write!(f, "unexpected listing output: {msg}"),
        }
    }
}

impl std::error::Error for KeystoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KeystoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for KeystoreError {
    fn from(e: io::Error) -> Self {
        KeystoreError::Io(e)
    }
}

impl From<ToolFailure> for KeystoreError {
    fn from(failure: ToolFailure) -> Self {
        KeystoreError::Tool(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_failure_display_includes_message() {
        let failure = ToolFailure {
            program: "keytool".to_string(),
            status: 1,
            message: "keytool error: alias <x> does not exist".to_string(),
        };
        let text = KeystoreError::from(failure).to_string();
        assert!(text.contains("status 1"));
        assert!(text.contains("alias <x> does not exist"));
    }

    #[test]
    fn test_tool_failure_display_without_message() {
        let failure = ToolFailure {
            program: "openssl".to_string(),
            status: 2,
            message: String::new(),
        };
        assert_eq!(failure.to_string(), "openssl exited with status 2");
    }
}
