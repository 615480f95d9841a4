//! Checks applied to submitted form values before anything is invoked.
//!
//! A `ValidationError` never leaves its flow: the form is shown again with
//! the message inline.

use std::fmt;
use std::path::Path;

use chrono::NaiveDate;

pub const MIN_KEY_SIZE: u32 = 512;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const DEFAULT_TLS_PORT: u16 = 443;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ValidationError {}

pub fn key_size(text: &str) -> Result<u32, ValidationError> {
    match text.trim().parse::<u32>() {
        Ok(size) if size >= MIN_KEY_SIZE => Ok(size),
        _ => Err(ValidationError::new(format!(
            "Key size must be a number of at least {MIN_KEY_SIZE}."
        ))),
    }
}

/// Parse a `YYYY-MM-DD` range. Returns the start date and the length in days.
pub fn validity(start: &str, end: &str) -> Result<(NaiveDate, i64), ValidationError> {
    let parse = |s: &str| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d");
    let (Ok(start), Ok(end)) = (parse(start), parse(end)) else {
        return Err(ValidationError::new("Enter validity dates as YYYY-MM-DD."));
    };
    let days = (end - start).num_days();
    if days <= 0 {
        return Err(ValidationError::new("Validity end must be after the start date."));
    }
    Ok((start, days))
}

pub fn alias(text: &str) -> Result<String, ValidationError> {
    let alias = text.trim();
    if alias.is_empty() {
        Err(ValidationError::new("Alias cannot be empty."))
    } else {
        Ok(alias.to_string())
    }
}

/// Join non-empty `(attribute, value)` pairs into an X.500 name.
pub fn distinguished_name(parts: &[(&str, &str)]) -> Result<String, ValidationError> {
    let components: Vec<String> = parts
        .iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(attr, v)| format!("{attr}={}", v.trim()))
        .collect();
    if components.is_empty() {
        Err(ValidationError::new(
            "Provide at least one distinguished name component.",
        ))
    } else {
        Ok(components.join(", "))
    }
}

pub fn new_password(password: &str, confirm: &str) -> Result<(), ValidationError> {
    if password != confirm {
        return Err(ValidationError::new("Passwords do not match."));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::new(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters."
        )));
    }
    Ok(())
}

/// `https://host:port/path`, `host:port` or `host` → `(host, port)`.
pub fn endpoint(url: &str) -> Result<(String, u16), ValidationError> {
    let rest = url.trim();
    let rest = rest.split_once("://").map_or(rest, |(_, r)| r);
    let rest = rest.split('/').next().unwrap_or_default();
    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| ValidationError::new(format!("Invalid port: {port}")))?;
            (host, port)
        }
        None => (rest, DEFAULT_TLS_PORT),
    };
    if host.is_empty() {
        return Err(ValidationError::new("Enter a host name, e.g. example.com:443"));
    }
    Ok((host.to_string(), port))
}

/// Alias derived from a file name: its stem.
pub fn alias_from_file(path: &str) -> Result<String, ValidationError> {
    let path = path.trim();
    if path.is_empty() {
        return Err(ValidationError::new("Choose a file."));
    }
    Path::new(path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| ValidationError::new(format!("Not a file name: {path}")))
}

/// Existing regular file.
pub fn existing_file(path: &str) -> Result<(), ValidationError> {
    if Path::new(path.trim()).is_file() {
        Ok(())
    } else {
        Err(ValidationError::new(format!("File not found: {}", path.trim())))
    }
}

pub fn target_file(path: &str) -> Result<String, ValidationError> {
    let path = path.trim();
    if path.is_empty() {
        return Err(ValidationError::new("Enter a file name to export to."));
    }
    if Path::new(path).is_dir() {
        return Err(ValidationError::new(format!("{path} is a directory.")));
    }
    Ok(path.to_string())
}
