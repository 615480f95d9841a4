use crate::keystore::entry::Entry;

/// Declarative filter over the entry list. The default lets everything through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub name: String,
    pub partial_name: bool,
    pub valid: bool,
    pub expired: bool,
    pub keys: bool,
    pub certificates: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            name: String::new(),
            partial_name: true,
            valid: true,
            expired: true,
            keys: true,
            certificates: true,
        }
    }
}

impl FilterState {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        if !self.name.is_empty() {
            let needle = self.name.to_lowercase();
            let alias = entry.alias.to_lowercase();
            let hit = if self.partial_name {
                alias.contains(&needle)
            } else {
                alias == needle
            };
            if !hit {
                return false;
            }
        }
        if !self.expired && entry.is_expired {
            return false;
        }
        if !self.valid && !entry.is_expired {
            return false;
        }
        if !self.keys && entry.is_key {
            return false;
        }
        if !self.certificates && entry.is_cert {
            return false;
        }
        true
    }
}

/// Entries passing `filter`, in source order.
pub fn apply_filter(entries: &[Entry], filter: &FilterState) -> Vec<Entry> {
    entries.iter().filter(|e| filter.matches(e)).cloned().collect()
}
