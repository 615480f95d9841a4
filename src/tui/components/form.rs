//! # Modal Form Engine
//!
//! A vertical form of labelled fields with an OK/Cancel row, built from a
//! `FormSpec` per invocation and discarded afterwards.
//!
//! ```text
//! ┌──────────────── Generate Key Pair ────────────────┐
//! │                                                   │
//! │          Algorithm:  RSA   DSA  [ EC ]            │   Left/Right cycle
//! │                                                   │
//! │  EC parameter set: < SEC   Edwards                │   paged window
//! │                                                   │
//! │        Named curve:  prime256v1                   │
//! │                                                   │
//! │                                                   │   inline error
//! │                  [ OK ]    Cancel                 │
//! └───────────────────────────────────────────────┤esc├┘
//! ```
//!
//! ## Visibility
//!
//! A field with `visible_when(key, expected)` exists only while the field
//! named `key` holds one of `expected`. Hidden fields are skipped by
//! navigation, not drawn, and left out of the submitted values.
//!
//! ## Outcomes
//!
//! `handle_event` yields `Submit` (visible values, trimmed), `Cancel`
//! (ESC or the Cancel button) or `BrowseFile` (Enter on a file field; the
//! caller runs the picker and calls `set_value`). Everything else keeps
//! the form open.

use std::collections::BTreeMap;

use ratatui::Frame;
use ratatui::layout::{Position, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph};
use unicode_width::UnicodeWidthStr;
use zeroize::Zeroize;

use crate::core::config::{DEFAULT_FORM_WIDTH, DEFAULT_MAX_FIELD_LEN};
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::{centered, popup_block};
use crate::tui::event::{Direction, Event};
use crate::tui::theme;

const FILE_PLACEHOLDER: &str = "Type path or press enter to browse";
const OK_LABEL: &str = " OK ";
const CANCEL_LABEL: &str = " Cancel ";
const BUTTON_SPACING: u16 = 4;
const YES: &str = "Yes";
const NO: &str = "No";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Stored in clear, drawn as one `*` per character.
    Masked,
    Choice(Vec<String>),
    File,
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub default: String,
    pub placeholder: Option<&'static str>,
    /// May be submitted empty.
    pub optional: bool,
    pub visible_when: Option<(&'static str, &'static [&'static str])>,
}

impl FieldSpec {
    fn new(key: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            label,
            kind,
            default: String::new(),
            placeholder: None,
            optional: false,
            visible_when: None,
        }
    }

    pub fn text(key: &'static str, label: &'static str) -> Self {
        Self::new(key, label, FieldKind::Text)
    }

    pub fn masked(key: &'static str, label: &'static str) -> Self {
        Self::new(key, label, FieldKind::Masked)
    }

    pub fn file(key: &'static str, label: &'static str) -> Self {
        Self::new(key, label, FieldKind::File)
    }

    pub fn choice<S: AsRef<str>>(key: &'static str, label: &'static str, options: &[S]) -> Self {
        let options = options.iter().map(|o| o.as_ref().to_string()).collect();
        Self::new(key, label, FieldKind::Choice(options))
    }

    pub fn yes_no(key: &'static str, label: &'static str, value: bool) -> Self {
        Self::choice(key, label, &[YES, NO]).default(if value { YES } else { NO })
    }

    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default = value.into();
        self
    }

    pub fn placeholder(mut self, text: &'static str) -> Self {
        self.placeholder = Some(text);
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn visible_when(mut self, key: &'static str, expected: &'static [&'static str]) -> Self {
        self.visible_when = Some((key, expected));
        self
    }

    fn options(&self) -> &[String] {
        match &self.kind {
            FieldKind::Choice(options) => options,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone)]
pub struct FormSpec {
    pub title: String,
    pub fields: Vec<FieldSpec>,
}

impl FormSpec {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }
}

/// Submitted values of the visible fields, by field key. Wiped on drop.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FormValues(BTreeMap<&'static str, String>);

impl FormValues {
    /// Value of `key`, or `""` when the field was hidden or absent.
    pub fn get(&self, key: &str) -> &str {
        self.0.get(key).map_or("", String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// True when a Yes/No field reads `Yes`.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key) == YES
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }
}

impl Drop for FormValues {
    fn drop(&mut self) {
        for value in self.0.values_mut() {
            value.zeroize();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Field(usize),
    Ok,
    Cancel,
}

#[derive(Debug, PartialEq, Eq)]
pub enum FormOutcome {
    Submit(FormValues),
    Cancel,
    /// Enter on the file field at this index.
    BrowseFile(usize),
}

/// Visible option range `[start, end)` of a choice field `width` columns
/// wide, keeping `selected` inside and moving as little as possible from
/// the previous window start `offset`.
///
/// Options are drawn ` opt ` with one column between them; a truncated
/// edge costs two columns for its `<`/`>` marker.
pub fn choice_window(options: &[String], selected: usize, offset: usize, width: usize) -> (usize, usize) {
    let n = options.len();
    if n == 0 {
        return (0, 0);
    }
    let selected = selected.min(n - 1);
    let span = |s: usize, e: usize| -> usize {
        let cells: usize = options[s..e].iter().map(|o| o.width() + 2).sum();
        let gaps = e - s - 1;
        let markers = if s > 0 { 2 } else { 0 } + if e < n { 2 } else { 0 };
        cells + gaps + markers
    };

    let mut start = offset.min(selected);
    loop {
        let mut end = start + 1;
        while end < n && span(start, end + 1) <= width {
            end += 1;
        }
        if end > selected {
            return (start, end);
        }
        start += 1;
    }
}

pub struct FormState {
    spec: FormSpec,
    values: Vec<String>,
    choice_offsets: Vec<usize>,
    focus: Focus,
    error: Option<String>,
    max_width: u16,
    max_len: usize,
}

impl FormState {
    pub fn new(spec: FormSpec) -> Self {
        let values = spec
            .fields
            .iter()
            .map(|field| match &field.kind {
                FieldKind::Choice(options) if !options.contains(&field.default) => {
                    options.first().cloned().unwrap_or_default()
                }
                _ => field.default.clone(),
            })
            .collect();
        let mut form = Self {
            choice_offsets: vec![0; spec.fields.len()],
            spec,
            values,
            focus: Focus::Ok,
            error: None,
            max_width: DEFAULT_FORM_WIDTH,
            max_len: DEFAULT_MAX_FIELD_LEN,
        };
        form.focus = form
            .visible_fields()
            .first()
            .map_or(Focus::Ok, |&i| Focus::Field(i));
        form
    }

    pub fn with_limits(mut self, max_width: u16, max_len: usize) -> Self {
        self.max_width = max_width;
        self.max_len = max_len;
        self
    }

    pub fn title(&self) -> &str {
        &self.spec.title
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn field(&self, index: usize) -> Option<&FieldSpec> {
        self.spec.fields.get(index)
    }

    fn index_of(&self, key: &str) -> Option<usize> {
        self.spec.fields.iter().position(|f| f.key == key)
    }

    /// Current raw value of the field `key`, visible or not.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.index_of(key).map(|i| self.values[i].as_str())
    }

    pub fn set_value(&mut self, index: usize, value: impl Into<String>) {
        if let Some(slot) = self.values.get_mut(index) {
            slot.zeroize();
            *slot = value.into();
        }
    }

    pub fn is_visible(&self, index: usize) -> bool {
        match self.spec.fields.get(index).and_then(|f| f.visible_when) {
            None => index < self.spec.fields.len(),
            Some((key, expected)) => self
                .value(key)
                .is_some_and(|current| expected.contains(&current)),
        }
    }

    pub fn visible_fields(&self) -> Vec<usize> {
        (0..self.spec.fields.len())
            .filter(|&i| self.is_visible(i))
            .collect()
    }

    /// Visible fields' values, trimmed.
    pub fn values(&self) -> FormValues {
        FormValues(
            self.visible_fields()
                .into_iter()
                .map(|i| (self.spec.fields[i].key, self.values[i].trim().to_string()))
                .collect(),
        )
    }

    fn step_field(&mut self, forward: bool) {
        let visible = self.visible_fields();
        let Focus::Field(current) = self.focus else {
            return;
        };
        let position = visible.iter().position(|&i| i == current).unwrap_or(0);
        self.focus = if forward {
            visible
                .get(position + 1)
                .map_or(Focus::Ok, |&i| Focus::Field(i))
        } else {
            Focus::Field(visible[position.saturating_sub(1)])
        };
    }

    fn cycle_choice(&mut self, index: usize, forward: bool) {
        let options = self.spec.fields[index].options();
        if options.is_empty() {
            return;
        }
        let n = options.len();
        let current = options
            .iter()
            .position(|o| *o == self.values[index])
            .unwrap_or(0);
        let next = if forward { (current + 1) % n } else { (current + n - 1) % n };
        self.values[index] = options[next].clone();
    }

    fn submit(&mut self) -> Option<FormOutcome> {
        let missing = self.visible_fields().into_iter().find(|&i| {
            let field = &self.spec.fields[i];
            !field.optional && self.values[i].trim().is_empty()
        });
        if let Some(i) = missing {
            self.error = Some(format!("{} is required.", self.spec.fields[i].label));
            self.focus = Focus::Field(i);
            return None;
        }
        Some(FormOutcome::Submit(self.values()))
    }

    fn handle_field(&mut self, index: usize, event: &Event) -> Option<FormOutcome> {
        let is_choice = matches!(self.spec.fields[index].kind, FieldKind::Choice(_));
        let is_file = self.spec.fields[index].kind == FieldKind::File;
        match event {
            Event::Navigate(Direction::Up) => self.step_field(false),
            Event::Navigate(Direction::Down) | Event::PanelSwitch => self.step_field(true),
            Event::Navigate(Direction::Left) if is_choice => self.cycle_choice(index, false),
            Event::Navigate(Direction::Right) if is_choice => self.cycle_choice(index, true),
            Event::Submit if is_file => return Some(FormOutcome::BrowseFile(index)),
            Event::Submit => self.step_field(true),
            Event::Backspace if !is_choice => {
                self.values[index].pop();
            }
            Event::Printable(c) if !is_choice => {
                if self.values[index].chars().count() < self.max_len {
                    self.values[index].push(*c);
                }
            }
            _ => {}
        }
        None
    }
}

impl Drop for FormState {
    fn drop(&mut self) {
        for value in &mut self.values {
            value.zeroize();
        }
    }
}

impl EventHandler for FormState {
    type Event = FormOutcome;

    fn handle_event(&mut self, event: &Event) -> Option<FormOutcome> {
        if *event == Event::Cancel {
            return Some(FormOutcome::Cancel);
        }
        match (self.focus, event) {
            (Focus::Field(index), _) => self.handle_field(index, event),
            (
                Focus::Ok | Focus::Cancel,
                Event::Navigate(Direction::Left | Direction::Right) | Event::PanelSwitch,
            ) => {
                self.focus = if self.focus == Focus::Ok { Focus::Cancel } else { Focus::Ok };
                None
            }
            (Focus::Ok | Focus::Cancel, Event::Navigate(Direction::Up)) => {
                if let Some(&last) = self.visible_fields().last() {
                    self.focus = Focus::Field(last);
                }
                None
            }
            (Focus::Ok, Event::Submit) => self.submit(),
            (Focus::Cancel, Event::Submit) => Some(FormOutcome::Cancel),
            _ => None,
        }
    }
}

/// Right end of `text` that fits in `width` columns.
fn tail_fit(text: &str, width: usize) -> String {
    let mut used = 0;
    let mut out: Vec<char> = Vec::new();
    for c in text.chars().rev() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        out.push(c);
    }
    out.into_iter().rev().collect()
}

impl Component for FormState {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let visible = self.visible_fields();
        let width = self.max_width.min(area.width);
        let height = (2 * visible.len() as u16 + 6).min(area.height);
        let rect = centered(width, height, area);
        let block = popup_block(&self.spec.title);
        let inner = block.inner(rect);
        frame.render_widget(Clear, rect);
        frame.render_widget(block, rect);

        let label_col = self
            .spec
            .fields
            .iter()
            .map(|f| f.label.width() + 1)
            .max()
            .unwrap_or(0) as u16;
        let value_x = inner.x + label_col + 2;
        let value_width = inner.width.saturating_sub(label_col + 3);
        let mut cursor: Option<Position> = None;

        for (row, &index) in visible.iter().enumerate() {
            let y = inner.y + 1 + 2 * row as u16;
            if y >= inner.bottom() {
                break;
            }
            let field = &self.spec.fields[index];
            let focused = self.focus == Focus::Field(index);
            let label = format!("{}:", field.label);
            let label_x = inner.x + 1 + label_col - label.width() as u16;
            frame.render_widget(
                Span::raw(label.clone()),
                Rect::new(label_x, y, label.width() as u16, 1).intersection(inner),
            );
            let value_area = Rect::new(value_x, y, value_width, 1).intersection(inner);

            match &field.kind {
                FieldKind::Choice(options) => {
                    let selected = options
                        .iter()
                        .position(|o| *o == self.values[index])
                        .unwrap_or(0);
                    let (start, end) = choice_window(
                        options,
                        selected,
                        self.choice_offsets[index],
                        usize::from(value_width),
                    );
                    self.choice_offsets[index] = start;
                    let mut spans: Vec<Span> = Vec::new();
                    if start > 0 {
                        spans.push(Span::raw("< "));
                    }
                    for (i, option) in options.iter().enumerate().take(end).skip(start) {
                        if i > start {
                            spans.push(Span::raw(" "));
                        }
                        let style = match (i == selected, focused) {
                            (true, true) => theme::FIELD_FOCUSED,
                            (true, false) => theme::CHOICE_SELECTED,
                            _ => Style::default(),
                        };
                        spans.push(Span::styled(format!(" {option} "), style));
                    }
                    if end < options.len() {
                        spans.push(Span::raw(" >"));
                    }
                    frame.render_widget(Line::from(spans), value_area);
                }
                kind => {
                    let value = &self.values[index];
                    let shown = if *kind == FieldKind::Masked {
                        "*".repeat(value.chars().count())
                    } else {
                        value.clone()
                    };
                    let placeholder = field.placeholder.or((*kind == FieldKind::File).then_some(FILE_PLACEHOLDER));
                    let field_width = usize::from(value_width);
                    let (text, style) = match placeholder {
                        Some(p) if value.is_empty() => (p.to_string(), theme::PLACEHOLDER),
                        _ if focused => (tail_fit(&shown, field_width.saturating_sub(1)), theme::FIELD_FOCUSED),
                        _ => (tail_fit(&shown, field_width), theme::FIELD),
                    };
                    if focused {
                        let typed = if value.is_empty() { 0 } else { text.width() as u16 };
                        cursor = Some(Position::new(value_area.x + typed, y));
                    }
                    let padded = format!("{text:<field_width$}");
                    frame.render_widget(Span::styled(padded, style), value_area);
                }
            }
        }

        let error_y = inner.y + 1 + 2 * visible.len() as u16;
        if let Some(error) = &self.error
            && error_y < inner.bottom()
        {
            frame.render_widget(
                Line::styled(error.clone(), theme::INLINE_ERROR).centered(),
                Rect::new(inner.x, error_y, inner.width, 1),
            );
        }

        let button_y = error_y + 1;
        if button_y < inner.bottom() {
            let total = (OK_LABEL.len() + CANCEL_LABEL.len()) as u16 + BUTTON_SPACING;
            let x = inner.x + inner.width.saturating_sub(total) / 2;
            let style = |focus| {
                if self.focus == focus {
                    theme::BUTTON_FOCUSED
                } else {
                    theme::BUTTON
                }
            };
            let buttons = Line::from(vec![
                Span::styled(OK_LABEL, style(Focus::Ok)),
                Span::raw(" ".repeat(usize::from(BUTTON_SPACING))),
                Span::styled(CANCEL_LABEL, style(Focus::Cancel)),
            ]);
            frame.render_widget(buttons, Rect::new(x, button_y, total, 1).intersection(inner));
        }

        if let Some(position) = cursor {
            frame.set_cursor_position(position);
        }
    }
}
