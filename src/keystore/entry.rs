//! # Entry Model
//!
//! Turns the verbose listing printed by `keytool -list -v` into `Entry`
//! records.
//!
//! ```text
//! Keystore type: PKCS12            ┐
//! Your keystore contains 2 entries ┘ header (entry count cross-checked)
//!
//! Alias name: mykey                ─ starts a record
//! Entry type: PrivateKeyEntry      ┐
//! Valid from: ... until: ...       ┘ "key: value" pairs, split at the first colon
//! ```
//!
//! Entries are immutable once parsed. A reload replaces the whole list.

use chrono::{DateTime, FixedOffset, Utc};
use log::{debug, warn};

use crate::keystore::commands::Keytool;
use crate::keystore::error::KeystoreError;
use crate::keystore::runner::{ToolRunner, run_checked};

pub const ALIAS_FIELD: &str = "Alias name";
pub const ENTRY_TYPE_FIELD: &str = "Entry type";
pub const VALID_FROM_FIELD: &str = "Valid from";

/// Fields shown first in the detail panel, in this order.
const PRIORITY_FIELDS: [&str; 4] = [ALIAS_FIELD, ENTRY_TYPE_FIELD, "Creation date", VALID_FROM_FIELD];

/// Timezone abbreviations keytool prints that chrono cannot parse.
const TZ_OFFSETS: &[(&str, &str)] = &[
    ("UTC", "+0000"),
    ("GMT", "+0000"),
    ("WET", "+0000"),
    ("WEST", "+0100"),
    ("CET", "+0100"),
    ("CEST", "+0200"),
];

const UNTIL_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    PrivateKey,
    TrustedCert,
    Other,
}

impl EntryKind {
    pub fn from_type(entry_type: &str) -> Self {
        let lower = entry_type.to_lowercase();
        if lower.contains("privatekeyentry") {
            EntryKind::PrivateKey
        } else if lower.contains("trustedcertentry") {
            EntryKind::TrustedCert
        } else {
            EntryKind::Other
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            EntryKind::PrivateKey => "⬚",
            EntryKind::TrustedCert => "⬔",
            EntryKind::Other => "☠",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub alias: String,
    pub entry_type: String,
    pub kind: EntryKind,
    /// Display pairs, priority fields first.
    pub details: Vec<(String, String)>,
    pub valid_until: Option<DateTime<FixedOffset>>,
    pub is_key: bool,
    pub is_cert: bool,
    pub is_expired: bool,
}

impl Entry {
    /// Build an entry from the raw pairs of one listing record.
    pub fn from_fields(fields: Vec<(String, String)>, now: DateTime<Utc>) -> Self {
        let lookup = |name: &str| {
            fields
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };
        let alias = lookup(ALIAS_FIELD);
        let entry_type = lookup(ENTRY_TYPE_FIELD);
        let lower = entry_type.to_lowercase();

        let valid_until = fields
            .iter()
            .find(|(k, _)| k == VALID_FROM_FIELD)
            .and_then(|(_, v)| parse_valid_until(v));
        let is_expired = valid_until.is_some_and(|until| until.with_timezone(&Utc) < now);

        Self {
            kind: EntryKind::from_type(&entry_type),
            is_key: lower.contains("key"),
            is_cert: lower.contains("cert"),
            details: order_details(fields),
            alias,
            entry_type,
            valid_until,
            is_expired,
        }
    }

    pub fn icon(&self) -> &'static str {
        self.kind.icon()
    }
}

/// Priority fields (first occurrence each) followed by everything else in
/// listing order.
fn order_details(fields: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut taken = vec![false; fields.len()];
    let mut ordered = Vec::with_capacity(fields.len());
    for name in PRIORITY_FIELDS {
        if let Some(i) = fields.iter().position(|(k, _)| k == name) {
            taken[i] = true;
            ordered.push(fields[i].clone());
        }
    }
    ordered.extend(
        fields
            .into_iter()
            .zip(taken)
            .filter(|(_, t)| !t)
            .map(|(pair, _)| pair),
    );
    ordered
}

fn tz_offset(token: &str) -> &str {
    let numeric = (token.starts_with('+') || token.starts_with('-'))
        && token.len() == 5
        && token[1..].chars().all(|c| c.is_ascii_digit());
    if numeric {
        return token;
    }
    TZ_OFFSETS
        .iter()
        .find(|(abbr, _)| *abbr == token)
        .map(|(_, offset)| *offset)
        .unwrap_or("+0000")
}

/// Extract the "until" timestamp from a `Valid from` value.
///
/// Returns `None` for anything unparseable; callers treat that as
/// "not expired".
pub fn parse_valid_until(valid_from: &str) -> Option<DateTime<FixedOffset>> {
    let (_, until) = valid_from.split_once("until:")?;
    let mut parts: Vec<&str> = until.split_whitespace().collect();
    if parts.len() < 2 {
        return None;
    }
    let tz = parts.len() - 2;
    parts[tz] = tz_offset(parts[tz]);
    match DateTime::parse_from_str(&parts.join(" "), UNTIL_FORMAT) {
        Ok(dt) => Some(dt),
        Err(e) => {
            debug!("Unparseable validity end {until:?}: {e}");
            None
        }
    }
}

fn declared_count(line: &str) -> Option<usize> {
    line.strip_prefix("Your keystore contains ")?
        .split_whitespace()
        .next()?
        .parse()
        .ok()
}

/// Parse verbose listing output into entries.
pub fn parse_listing(output: &str, now: DateTime<Utc>) -> Result<Vec<Entry>, KeystoreError> {
    let mut declared = None;
    let mut records: Vec<Vec<(String, String)>> = Vec::new();

    for raw in output.lines() {
        let line = raw.trim();
        if let Some(alias) = line.strip_prefix("Alias name:") {
            let alias = alias.trim();
            if alias.is_empty() {
                return Err(KeystoreError::Parse("record without an alias".to_string()));
            }
            records.push(vec![(ALIAS_FIELD.to_string(), alias.to_string())]);
            continue;
        }
        match records.last_mut() {
            None => {
                if declared.is_none() {
                    declared = declared_count(line);
                }
            }
            Some(record) => {
                if let Some((key, value)) = line.split_once(':') {
                    let key = key.trim();
                    if !key.is_empty() {
                        record.push((key.to_string(), value.trim().to_string()));
                    }
                }
            }
        }
    }

    if let Some(expected) = declared
        && expected != records.len()
    {
        warn!("Listing declares {expected} entries, parsed {}", records.len());
        return Err(KeystoreError::Parse(format!(
            "listing declares {expected} entries but {} were found",
            records.len()
        )));
    }

    Ok(records
        .into_iter()
        .map(|fields| Entry::from_fields(fields, now))
        .collect())
}

/// Run the verbose listing and parse it.
pub fn load(runner: &dyn ToolRunner, keytool: &Keytool<'_>) -> Result<Vec<Entry>, KeystoreError> {
    let output = run_checked(runner, &keytool.list_verbose())?;
    let entries = parse_listing(&output.stdout, Utc::now())?;
    debug!("Loaded {} entries", entries.len());
    Ok(entries)
}

/// Position of `alias` in `entries`; 0 when absent or `None`.
pub fn find_index_by_alias(entries: &[Entry], alias: Option<&str>) -> usize {
    match alias {
        Some(alias) if !alias.is_empty() => {
            entries.iter().position(|e| e.alias == alias).unwrap_or(0)
        }
        _ => 0,
    }
}
