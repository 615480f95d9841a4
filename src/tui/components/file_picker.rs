//! # File Picker
//!
//! Directory browser used to open a keystore and to fill file fields.
//!
//! ```text
//! ┌──────────── Open keystore: /home/me/certs ────────────┐
//! │ ..                                                     │
//! │ backup/                                  2026-01-02 09:14 │
//! │ store.jks                     2.1 KiB    2026-03-04 10:00 │
//! └────────────────────────────────────────────────────┤esc├┘
//! ```
//!
//! Listing order: `..`, directories, then files with an allowed extension,
//! each group sorted case-insensitively.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::{debug, warn};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Clear, Paragraph};

use crate::tui::component::{Component, EventHandler};
use crate::tui::components::entry_list::fit;
use crate::tui::components::{centered, popup_block};
use crate::tui::event::{Direction, Event};
use crate::tui::theme;

const PARENT: &str = "..";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub size: Option<u64>,
    pub modified: Option<DateTime<Local>>,
}

impl PickerEntry {
    fn display_name(&self) -> String {
        if self.is_dir && self.name != PARENT {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerOutcome {
    Chosen(PathBuf),
    Cancelled,
}

/// `true` when `path` has one of `extensions` (case-insensitive), or when
/// no extensions are configured.
pub fn extension_allowed(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(&ext))
        })
}

/// Read `dir` into picker order.
pub fn read_entries(dir: &Path, extensions: &[String]) -> io::Result<Vec<PickerEntry>> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for item in fs::read_dir(dir)? {
        let item = item?;
        let path = item.path();
        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                debug!("Skipping {}: {e}", path.display());
                continue;
            }
        };
        let entry = PickerEntry {
            name: item.file_name().to_string_lossy().into_owned(),
            is_dir: metadata.is_dir(),
            size: metadata.is_file().then(|| metadata.len()),
            modified: metadata.modified().ok().map(DateTime::<Local>::from),
            path,
        };
        if entry.is_dir {
            dirs.push(entry);
        } else if extension_allowed(&entry.path, extensions) {
            files.push(entry);
        }
    }
    let by_name = |a: &PickerEntry, b: &PickerEntry| a.name.to_lowercase().cmp(&b.name.to_lowercase());
    dirs.sort_by(by_name);
    files.sort_by(by_name);

    let mut entries = Vec::with_capacity(dirs.len() + files.len() + 1);
    if let Some(parent) = dir.parent() {
        entries.push(PickerEntry {
            name: PARENT.to_string(),
            path: parent.to_path_buf(),
            is_dir: true,
            size: None,
            modified: None,
        });
    }
    entries.extend(dirs);
    entries.extend(files);
    Ok(entries)
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

pub struct FilePicker {
    title: String,
    dir: PathBuf,
    extensions: Vec<String>,
    entries: Vec<PickerEntry>,
    selected: usize,
    offset: usize,
    /// Rows shown at the last render, for paging.
    page: usize,
    error: Option<String>,
}

impl FilePicker {
    pub fn open(title: impl Into<String>, dir: &Path, extensions: &[String]) -> io::Result<Self> {
        let dir = dir.canonicalize()?;
        let entries = read_entries(&dir, extensions)?;
        Ok(Self {
            title: title.into(),
            dir,
            extensions: extensions.to_vec(),
            entries,
            selected: 0,
            offset: 0,
            page: 10,
            error: None,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entries(&self) -> &[PickerEntry] {
        &self.entries
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    fn change_dir(&mut self, dir: PathBuf) {
        match read_entries(&dir, &self.extensions) {
            Ok(entries) => {
                debug!("Picker entered {}", dir.display());
                self.dir = dir;
                self.entries = entries;
                self.selected = 0;
                self.offset = 0;
                self.error = None;
            }
            Err(e) => {
                warn!("Cannot read {}: {e}", dir.display());
                self.error = Some(format!("Cannot open {}: {e}", dir.display()));
            }
        }
    }

    fn move_to(&mut self, index: usize) {
        self.selected = index.min(self.entries.len().saturating_sub(1));
    }
}

impl EventHandler for FilePicker {
    type Event = PickerOutcome;

    fn handle_event(&mut self, event: &Event) -> Option<PickerOutcome> {
        let page = self.page.max(1);
        match event {
            Event::Navigate(Direction::Up) => self.move_to(self.selected.saturating_sub(1)),
            Event::Navigate(Direction::Down) => self.move_to(self.selected + 1),
            Event::Navigate(Direction::PageUp) => self.move_to(self.selected.saturating_sub(page)),
            Event::Navigate(Direction::PageDown) => self.move_to(self.selected + page),
            Event::Navigate(Direction::Home) => self.move_to(0),
            Event::Navigate(Direction::End) => self.move_to(usize::MAX),
            Event::Backspace => {
                if let Some(parent) = self.dir.parent() {
                    let parent = parent.to_path_buf();
                    self.change_dir(parent);
                }
            }
            Event::Submit => {
                let entry = self.entries.get(self.selected)?.clone();
                if entry.is_dir {
                    self.change_dir(entry.path);
                } else {
                    return Some(PickerOutcome::Chosen(entry.path));
                }
            }
            Event::Cancel => return Some(PickerOutcome::Cancelled),
            _ => {}
        }
        None
    }
}

impl Component for FilePicker {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let width = (area.width * 4 / 5).max(area.width.min(40));
        let height = (area.height * 4 / 5).max(area.height.min(8));
        let rect = centered(width, height, area);
        let block = popup_block(&format!("{}: {}", self.title, self.dir.display()));
        let inner = block.inner(rect);
        frame.render_widget(Clear, rect);
        frame.render_widget(block, rect);

        let reserved = u16::from(self.error.is_some());
        self.page = usize::from(inner.height.saturating_sub(reserved)).max(1);
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + self.page {
            self.offset = self.selected + 1 - self.page;
        }

        let row_width = usize::from(inner.width.saturating_sub(2));
        let meta_width = 30.min(row_width / 2);
        let name_width = row_width.saturating_sub(meta_width);
        let mut lines: Vec<Line> = self
            .entries
            .iter()
            .enumerate()
            .skip(self.offset)
            .take(self.page)
            .map(|(i, entry)| {
                let size = entry.size.map(human_size).unwrap_or_default();
                let modified = entry
                    .modified
                    .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                let meta = format!("{size:>10}  {modified:>16}");
                let text = format!(
                    "{}{}",
                    fit(&entry.display_name(), name_width),
                    fit(&meta, meta_width)
                );
                let style = if i == self.selected {
                    theme::FIELD_FOCUSED
                } else {
                    theme::POPUP
                };
                Line::from(vec![Span::raw(" "), Span::styled(text, style)])
            })
            .collect();
        if let Some(error) = &self.error {
            lines.push(Line::styled(error.clone(), theme::INLINE_ERROR));
        }
        frame.render_widget(Paragraph::new(lines), inner);
    }
}
