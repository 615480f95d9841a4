//! # Session State
//!
//! Everything the browse view needs, in one value owned by the session
//! controller. No terminal types here.
//!
//! ```text
//! SessionState
//! ├── workspace: Option<Workspace>   // original + working copy + password
//! ├── entries: EntryView             // full listing, filter, filtered list
//! ├── dirty: bool                    // working copy != original
//! ├── panel: Panel                   // which panel has focus
//! ├── selected / scroll_offset       // left panel cursor and window
//! ├── detail_scroll                  // first field pair shown on the right
//! ├── visible_height                 // rows available to the list
//! ├── highlight: Option<String>      // search term for the detail panel
//! ├── modifiers: ModifierFlags       // last sampled Shift/Alt latch
//! └── mouse_enabled: bool
//! ```
//!
//! Selection invariants, re-established by `clamp()` after every change:
//!
//! - `selected < filtered.len()`, or `selected == 0` for an empty list
//! - `scroll_offset <= selected < scroll_offset + visible_height`

use log::debug;

use crate::keystore::{Entry, FilterState, Workspace, apply_filter, find_index_by_alias};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Panel {
    #[default]
    List,
    Detail,
}

impl Panel {
    pub fn other(self) -> Self {
        match self {
            Panel::List => Panel::Detail,
            Panel::Detail => Panel::List,
        }
    }
}

/// Which function-key bank is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Modifier {
    #[default]
    None,
    Shift,
    Alt,
}

/// Held/not-held state of the tracked modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModifierFlags {
    pub shift: bool,
    pub alt: bool,
}

impl ModifierFlags {
    /// Shift wins when both are held.
    pub fn active(self) -> Modifier {
        if self.shift {
            Modifier::Shift
        } else if self.alt {
            Modifier::Alt
        } else {
            Modifier::None
        }
    }
}

/// The full listing plus its filtered view.
///
/// The filtered list is recomputed only by `replace` and `set_filter`.
#[derive(Debug, Default)]
pub struct EntryView {
    all: Vec<Entry>,
    filtered: Vec<Entry>,
    filter: FilterState,
    recomputes: usize,
}

impl EntryView {
    pub fn all(&self) -> &[Entry] {
        &self.all
    }

    pub fn filtered(&self) -> &[Entry] {
        &self.filtered
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// How many times the filtered list has been rebuilt.
    pub fn recomputes(&self) -> usize {
        self.recomputes
    }

    pub fn replace(&mut self, entries: Vec<Entry>) {
        self.all = entries;
        self.recompute();
    }

    pub fn set_filter(&mut self, filter: FilterState) {
        self.filter = filter;
        self.recompute();
    }

    fn recompute(&mut self) {
        self.filtered = apply_filter(&self.all, &self.filter);
        self.recomputes += 1;
        debug!(
            "Filtered {} of {} entries",
            self.filtered.len(),
            self.all.len()
        );
    }
}

pub struct SessionState {
    pub workspace: Option<Workspace>,
    pub entries: EntryView,
    pub dirty: bool,
    pub panel: Panel,
    pub selected: usize,
    pub scroll_offset: usize,
    pub detail_scroll: usize,
    pub visible_height: usize,
    pub highlight: Option<String>,
    pub modifiers: ModifierFlags,
    pub mouse_enabled: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            entries: EntryView::default(),
            dirty: false,
            panel: Panel::List,
            selected: 0,
            scroll_offset: 0,
            detail_scroll: 0,
            visible_height: 1,
            highlight: None,
            modifiers: ModifierFlags::default(),
            mouse_enabled: true,
        }
    }

    pub fn selected_entry(&self) -> Option<&Entry> {
        self.entries.filtered().get(self.selected)
    }

    pub fn selected_alias(&self) -> Option<String> {
        self.selected_entry().map(|e| e.alias.clone())
    }

    /// Number of field pairs of the selected entry.
    pub fn detail_len(&self) -> usize {
        self.selected_entry().map_or(0, |e| e.details.len())
    }

    /// Move the selection, resetting the detail scroll when it changes.
    pub fn select(&mut self, index: usize) {
        if index != self.selected {
            self.detail_scroll = 0;
        }
        self.selected = index;
        self.clamp();
    }

    pub fn select_alias(&mut self, alias: Option<&str>) {
        let index = find_index_by_alias(self.entries.filtered(), alias);
        self.selected = index;
        self.detail_scroll = 0;
        self.clamp();
    }

    pub fn set_visible_height(&mut self, height: usize) {
        self.visible_height = height.max(1);
        self.clamp();
    }

    /// Swap in a freshly loaded listing, keeping `alias` selected if present.
    pub fn replace_entries(&mut self, entries: Vec<Entry>, alias: Option<&str>) {
        self.entries.replace(entries);
        self.select_alias(alias);
    }

    /// Change the filter, keeping the current entry selected if it survives.
    pub fn set_filter(&mut self, filter: FilterState) {
        let alias = self.selected_alias();
        self.entries.set_filter(filter);
        self.select_alias(alias.as_deref());
    }

    pub fn refresh_dirty(&mut self) {
        self.dirty = self.workspace.as_ref().is_some_and(Workspace::is_dirty);
    }

    /// Re-establish the selection and scroll invariants.
    pub fn clamp(&mut self) {
        let len = self.entries.filtered().len();
        let height = self.visible_height.max(1);
        if len == 0 {
            self.selected = 0;
            self.scroll_offset = 0;
        } else {
            self.selected = self.selected.min(len - 1);
            if self.selected < self.scroll_offset {
                self.scroll_offset = self.selected;
            } else if self.selected >= self.scroll_offset + height {
                self.scroll_offset = self.selected + 1 - height;
            }
            // No blank rows below the last entry when the list could fill them
            self.scroll_offset = self.scroll_offset.min(len.saturating_sub(height));
        }
        self.detail_scroll = self.detail_scroll.min(self.detail_len().saturating_sub(1));
    }

    /// True when every selection invariant holds.
    pub fn invariants_hold(&self) -> bool {
        let len = self.entries.filtered().len();
        if len == 0 {
            return self.selected == 0;
        }
        self.selected < len
            && self.scroll_offset <= self.selected
            && self.selected < self.scroll_offset + self.visible_height.max(1)
    }
}
