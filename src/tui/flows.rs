//! # Keystore Flows
//!
//! Every operation reachable from the footer or the menu, as a sequence of
//! modals over the dimmed browse view.
//!
//! ```text
//!  form ──submit──▶ validate ──err──▶ same form, inline message
//!    │                 │
//!   esc                ok
//!    ▼                 ▼
//!  nothing     "Working..." ─▶ ToolRunner ─┬─ ok  ─▶ reload, select, message
//!                                          └─ err ─▶ error popup, list untouched
//! ```
//!
//! Each flow runs to completion on the main thread. Temp files used for
//! conversions are `NamedTempFile`s owned by the flow, so every return path
//! removes them.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Days;
use log::{debug, error, info, warn};
use ratatui::backend::Backend;
use tempfile::NamedTempFile;
use zeroize::Zeroizing;

use crate::core::state::Panel;
use crate::keystore::commands::{KeyPairRequest, Keytool, Openssl};
use crate::keystore::runner::run_checked;
use crate::keystore::validate::{self, ValidationError};
use crate::keystore::{Entry, EntryKind, FilterState, Invocation, KeystoreError, Workspace, entry, pem};
use crate::tui::{Flow, Session};
use crate::tui::components::{
    ConfirmDialog, Confirmation, FieldSpec, FilePicker, FormOutcome, FormSpec, FormState,
    FormValues, HelpPopup, MessageBox, PickerOutcome, SelectList, Selection,
};
use crate::tui::event::InputSource;

const ALGORITHMS: [&str; 3] = ["RSA", "DSA", "EC"];
const EC_PARAMETER_SETS: [&str; 4] = ["ANSI X9.62", "NIST", "SEC", "Edwards"];
const VERSIONS: [&str; 2] = ["Version 1", "Version 3"];
const DEFAULT_KEY_SIZE: &str = "2048";
const DEFAULT_CURVE: &str = "prime256v1";
const DEFAULT_VALIDITY_DAYS: u64 = 365;

const KEY_PAIR_FORMATS: [&str; 4] = ["PKCS #12", "PKCS #8", "PVK", "OpenSSL"];
const ENCODINGS: [&str; 2] = ["PEM", "DER"];

/// Distinguished name attributes in prompt order.
const DN_FIELDS: [(&str, &str); 6] = [
    ("CN", "Common name (CN)"),
    ("OU", "Organization unit (OU)"),
    ("O", "Organization name (O)"),
    ("L", "Locality name (L)"),
    ("ST", "State name (ST)"),
    ("C", "Country (C)"),
];

fn signature_algorithms(algorithm: &str) -> &'static [&'static str] {
    match algorithm {
        "DSA" => &["SHA256withDSA", "SHA1withDSA"],
        "EC" => &["SHA256withECDSA", "SHA384withECDSA", "SHA512withECDSA"],
        _ => &["SHA256withRSA", "SHA384withRSA", "SHA512withRSA", "SHA1withRSA"],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportKind {
    Certificate,
    Chain,
    PublicKey,
    KeyPair,
}

impl ExportKind {
    fn label(self) -> &'static str {
        match self {
            ExportKind::Certificate => "Certificate",
            ExportKind::Chain => "Certificate Chain",
            ExportKind::PublicKey => "Public Key",
            ExportKind::KeyPair => "Key Pair",
        }
    }

    /// What can be exported from an entry of `kind`.
    fn offered(kind: EntryKind) -> &'static [ExportKind] {
        match kind {
            EntryKind::PrivateKey => &[ExportKind::KeyPair, ExportKind::Chain, ExportKind::PublicKey],
            EntryKind::TrustedCert => &[ExportKind::Certificate, ExportKind::PublicKey],
            EntryKind::Other => &[],
        }
    }
}

fn temp_file(suffix: &str) -> io::Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix("keyzerchief-")
        .suffix(suffix)
        .tempfile()
}

fn alias_taken(entries: &[Entry], alias: &str) -> Result<(), ValidationError> {
    if entries.iter().any(|e| e.alias == alias) {
        Err(ValidationError::new(format!("Alias {alias} already exists.")))
    } else {
        Ok(())
    }
}

impl<B: Backend, S: InputSource> Session<B, S> {
    // ========================================================================
    // Modal helpers
    // ========================================================================

    fn form(&self, spec: FormSpec) -> FormState {
        FormState::new(spec).with_limits(self.config.form_width, self.config.max_field_len)
    }

    fn show_info(&mut self, title: &str, text: impl Into<String>) -> io::Result<()> {
        let mut popup = MessageBox::info(title, text);
        self.screen.run_modal(&self.view, &mut popup)
    }

    fn show_error(&mut self, title: &str, text: impl Into<String>) -> io::Result<()> {
        let mut popup = MessageBox::error(title, text);
        self.screen.run_modal(&self.view, &mut popup)
    }

    /// Paint the "Working..." popup before a blocking tool call.
    fn working(&mut self) -> io::Result<()> {
        let mut popup = MessageBox::info("Working", "Working...");
        self.screen.draw_overlay(&self.view, &mut popup)
    }

    fn keytool(&self) -> Option<Keytool<'_>> {
        self.view
            .state
            .workspace
            .as_ref()
            .map(|ws| ws.keytool(&self.config.keytool))
    }

    fn pick_file(&mut self, title: &str, dir: &Path, extensions: &[String]) -> io::Result<Option<PathBuf>> {
        let mut picker = match FilePicker::open(title, dir, extensions) {
            Ok(picker) => picker,
            Err(e) => {
                warn!("Cannot list {}: {e}", dir.display());
                self.show_error(title, format!("Cannot read {}: {e}", dir.display()))?;
                return Ok(None);
            }
        };
        match self.screen.run_modal(&self.view, &mut picker)? {
            PickerOutcome::Chosen(path) => Ok(Some(path)),
            PickerOutcome::Cancelled => Ok(None),
        }
    }

    /// Run `form` until it is submitted or cancelled, serving file fields
    /// with the picker.
    fn show_form(&mut self, form: &mut FormState) -> io::Result<Option<FormValues>> {
        loop {
            match self.screen.run_modal(&self.view, form)? {
                FormOutcome::Submit(values) => return Ok(Some(values)),
                FormOutcome::Cancel => {
                    debug!("Form {:?} cancelled", form.title());
                    return Ok(None);
                }
                FormOutcome::BrowseFile(index) => {
                    let Some(field) = form.field(index) else {
                        continue;
                    };
                    let label = field.label;
                    let current = form.value(field.key).unwrap_or_default().trim().to_string();
                    let start = Path::new(&current)
                        .parent()
                        .filter(|dir| dir.is_dir())
                        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
                    if let Some(path) = self.pick_file(label, &start, &[])? {
                        form.set_value(index, path.to_string_lossy());
                    }
                }
            }
        }
    }

    /// Show `form` until `accept` takes its values or the user escapes.
    fn ask<T>(
        &mut self,
        form: &mut FormState,
        mut accept: impl FnMut(&FormValues) -> Result<T, ValidationError>,
    ) -> io::Result<Option<T>> {
        while let Some(values) = self.show_form(form)? {
            match accept(&values) {
                Ok(accepted) => return Ok(Some(accepted)),
                Err(e) => {
                    debug!("Form {:?} rejected: {e}", form.title());
                    form.set_error(e.0);
                }
            }
        }
        Ok(None)
    }

    // ========================================================================
    // Tool calls
    // ========================================================================

    /// Reload the listing, keeping `alias` selected. On failure the
    /// previous list stays.
    fn reload(&mut self, alias: Option<&str>) -> io::Result<bool> {
        let Some(keytool) = self.keytool() else {
            return Ok(false);
        };
        let result = entry::load(self.runner.as_ref(), &keytool);
        self.view.state.refresh_dirty();
        match result {
            Ok(entries) => {
                self.view.state.replace_entries(entries, alias);
                Ok(true)
            }
            Err(e) => {
                error!("Reload failed: {e}");
                self.show_error("Reload failed", e.to_string())?;
                Ok(false)
            }
        }
    }

    /// Run one tool call behind the "Working..." popup; failures are shown.
    fn run_tool(&mut self, invocation: &Invocation) -> io::Result<Option<String>> {
        self.working()?;
        let result = run_checked(self.runner.as_ref(), invocation);
        // A failing tool may still have rewritten the working copy
        self.view.state.refresh_dirty();
        match result {
            Ok(output) => Ok(Some(output.stdout)),
            Err(e) => {
                self.show_error("Error", e.to_string())?;
                Ok(None)
            }
        }
    }

    /// Apply a change to the working copy, then reload and report.
    fn mutate(&mut self, invocation: &Invocation, select: Option<&str>, done: &str) -> io::Result<bool> {
        if self.run_tool(invocation)?.is_none() {
            return Ok(false);
        }
        if self.reload(select)? {
            info!("{done}");
            self.show_info("Success", done)?;
        }
        Ok(true)
    }

    // ========================================================================
    // Open / save / quit
    // ========================================================================

    /// Open a keystore, from `path` when it names a file, otherwise from
    /// the picker. Returns whether a keystore is open afterwards.
    pub(super) fn open_keystore(&mut self, path: Option<PathBuf>) -> io::Result<bool> {
        if self.view.state.dirty && !self.confirm_save()? {
            info!("Open aborted at the save prompt");
            return Ok(self.view.state.workspace.is_some());
        }
        let extensions = self.config.keystore_extensions.clone();
        let mut candidate = match path {
            Some(path) if path.is_file() => Some(path),
            Some(path) => {
                warn!("{} is not a readable file", path.display());
                None
            }
            None => None,
        };
        loop {
            let path = match candidate.take() {
                Some(path) => path,
                None => match self.pick_file("Open keystore", Path::new("."), &extensions)? {
                    Some(path) => path,
                    None => {
                        info!("Open cancelled");
                        return Ok(self.view.state.workspace.is_some());
                    }
                },
            };
            let mut workspace = match Workspace::open(&path) {
                Ok(workspace) => workspace,
                Err(e) => {
                    warn!("Cannot open {}: {e}", path.display());
                    self.show_error("Open keystore", format!("Cannot open {}: {e}", path.display()))?;
                    continue;
                }
            };
            let Some(entries) = self.unlock(&mut workspace)? else {
                return Ok(self.view.state.workspace.is_some());
            };
            info!("Keystore {} open with {} entries", path.display(), entries.len());
            let state = &mut self.view.state;
            state.workspace = Some(workspace);
            state.highlight = None;
            state.panel = Panel::List;
            state.entries.set_filter(FilterState::default());
            state.replace_entries(entries, None);
            state.refresh_dirty();
            return Ok(true);
        }
    }

    /// Find the store password: empty first, then ask until keytool accepts it.
    fn unlock(&mut self, workspace: &mut Workspace) -> io::Result<Option<Vec<Entry>>> {
        let program = self.config.keytool.clone();
        match entry::load(self.runner.as_ref(), &workspace.keytool(&program)) {
            Ok(entries) => return Ok(Some(entries)),
            Err(e) => debug!("Empty store password not accepted: {e}"),
        }
        let mut form = self.form(
            FormSpec::new("Keystore password")
                .field(FieldSpec::masked("password", "Password").optional()),
        );
        while let Some(values) = self.show_form(&mut form)? {
            workspace.set_password(values.get("password"));
            match entry::load(self.runner.as_ref(), &workspace.keytool(&program)) {
                Ok(entries) => return Ok(Some(entries)),
                Err(KeystoreError::Tool(failure)) => {
                    warn!("Password rejected for {}", workspace.original().display());
                    debug!("{failure}");
                    form.set_error("Wrong password");
                }
                Err(e) => {
                    error!("Cannot list {}: {e}", workspace.original().display());
                    self.show_error("Open keystore", e.to_string())?;
                    return Ok(None);
                }
            }
        }
        Ok(None)
    }

    /// Ask to write the working copy back. `false` means the user escaped.
    pub(super) fn confirm_save(&mut self) -> io::Result<bool> {
        let Some(original) = self
            .view
            .state
            .workspace
            .as_ref()
            .map(|ws| ws.original().display().to_string())
        else {
            return Ok(true);
        };
        let mut dialog = ConfirmDialog::new("Save", format!("Save changes to {original}?"));
        match self.screen.run_modal(&self.view, &mut dialog)? {
            Confirmation::Yes => self.write_back(),
            Confirmation::No => {
                info!("Changes to {original} discarded");
                Ok(true)
            }
            Confirmation::Escaped => Ok(false),
        }
    }

    fn write_back(&mut self) -> io::Result<bool> {
        let result = match &self.view.state.workspace {
            Some(ws) => ws.save(),
            None => return Ok(true),
        };
        self.view.state.refresh_dirty();
        match result {
            Ok(()) => Ok(true),
            Err(e) => {
                error!("Save failed: {e}");
                self.show_error("Save failed", e.to_string())?;
                Ok(false)
            }
        }
    }

    pub(super) fn save(&mut self) -> io::Result<()> {
        self.view.state.refresh_dirty();
        if !self.view.state.dirty {
            return self.show_info("Save", "Nothing to save.");
        }
        self.confirm_save()?;
        Ok(())
    }

    pub(super) fn quit(&mut self) -> io::Result<Flow> {
        self.view.state.refresh_dirty();
        if self.view.state.dirty && !self.confirm_save()? {
            info!("Quit cancelled");
            return Ok(Flow::Continue);
        }
        Ok(Flow::Quit)
    }

    // ========================================================================
    // Entry operations
    // ========================================================================

    pub(super) fn generate_key_pair(&mut self) -> io::Result<()> {
        let mut algorithm_form = self.form(
            FormSpec::new("Generate Key Pair")
                .field(FieldSpec::choice("algorithm", "Algorithm", &ALGORITHMS))
                .field(
                    FieldSpec::text("key_size", "Key size")
                        .default(DEFAULT_KEY_SIZE)
                        .visible_when("algorithm", &["RSA", "DSA"]),
                )
                .field(
                    FieldSpec::choice("ec_params", "EC parameter set", &EC_PARAMETER_SETS)
                        .visible_when("algorithm", &["EC"]),
                )
                .field(
                    FieldSpec::text("named_curve", "Named curve")
                        .default(DEFAULT_CURVE)
                        .visible_when("algorithm", &["EC"]),
                ),
        );
        let Some((algorithm, key_size, named_curve)) = self.ask(&mut algorithm_form, |v| {
            let algorithm = v.get("algorithm").to_string();
            if algorithm == "EC" {
                Ok((algorithm, None, Some(v.get("named_curve").to_string())))
            } else {
                Ok((algorithm, Some(validate::key_size(v.get("key_size"))?), None))
            }
        })?
        else {
            return Ok(());
        };

        let now = self.view.now();
        let today = now.date();
        let until = today + Days::new(DEFAULT_VALIDITY_DAYS);
        let serial = format!("{:X}", now.and_utc().timestamp_millis());
        let default_alias = format!(
            "{}-{}",
            algorithm.to_lowercase(),
            now.format("%Y%m%d%H%M%S")
        );
        let mut options_form = self.form(
            FormSpec::new("Certificate Options")
                .field(FieldSpec::choice("version", "Version", &VERSIONS).default("Version 3"))
                .field(FieldSpec::choice(
                    "sigalg",
                    "Signature algorithm",
                    signature_algorithms(&algorithm),
                ))
                .field(FieldSpec::text("valid_from", "Validity start").default(today.format("%Y-%m-%d").to_string()))
                .field(FieldSpec::text("valid_until", "Validity end").default(until.format("%Y-%m-%d").to_string()))
                .field(FieldSpec::text("serial", "Serial number").default(serial).optional())
                .field(FieldSpec::text("alias", "Alias").default(default_alias)),
        );
        let existing = self.view.state.entries.all().to_vec();
        let Some((version3, sigalg, start, days, serial, alias)) = self.ask(&mut options_form, |v| {
            let (start, days) = validate::validity(v.get("valid_from"), v.get("valid_until"))?;
            let alias = validate::alias(v.get("alias"))?;
            alias_taken(&existing, &alias)?;
            Ok((
                v.get("version") == "Version 3",
                v.get("sigalg").to_string(),
                start,
                days,
                v.get("serial").to_string(),
                alias,
            ))
        })?
        else {
            return Ok(());
        };

        let dn_spec = DN_FIELDS
            .iter()
            .fold(FormSpec::new("Distinguished Name"), |spec, &(key, label)| {
                spec.field(FieldSpec::text(key, label).optional())
            });
        let mut dn_form = self.form(dn_spec);
        let Some(dname) = self.ask(&mut dn_form, |v| {
            let parts: Vec<(&str, &str)> = DN_FIELDS.iter().map(|(key, _)| (*key, v.get(key))).collect();
            validate::distinguished_name(&parts)
        })?
        else {
            return Ok(());
        };

        let request = KeyPairRequest {
            alias: alias.clone(),
            algorithm,
            key_size,
            named_curve,
            dname,
            validity_days: days,
            start_date: start.format("%Y/%m/%d 00:00:00").to_string(),
            sigalg,
            version3,
        };
        let Some(invocation) = self.keytool().map(|kt| kt.generate_key_pair(&request)) else {
            return Ok(());
        };
        let mut done = format!("Successfully generated: {alias}");
        if !serial.is_empty() {
            done.push_str(&format!("\nRequested serial number: {serial}"));
        }
        self.mutate(&invocation, Some(&alias), &done)?;
        Ok(())
    }

    pub(super) fn import_key_pair(&mut self) -> io::Result<()> {
        let mut list = SelectList::new("Import Key Pair", &KEY_PAIR_FORMATS);
        match self.screen.run_modal(&self.view, &mut list)? {
            Selection::Chosen(0) => self.import_pkcs12(),
            Selection::Chosen(1) => self.import_pkcs8(),
            Selection::Chosen(i) => {
                let format = KEY_PAIR_FORMATS.get(i).copied().unwrap_or("This");
                info!("Unsupported key pair format {format}");
                self.show_error("Import Key Pair", format!("{format} import is not supported."))
            }
            Selection::Cancelled => Ok(()),
        }
    }

    fn import_pkcs12(&mut self) -> io::Result<()> {
        let mut form = self.form(
            FormSpec::new("Import PKCS #12")
                .field(FieldSpec::file("file", "Key pair file"))
                .field(FieldSpec::masked("password", "Decryption password").optional()),
        );
        let Some((file, alias, password)) = self.ask(&mut form, |v| {
            validate::existing_file(v.get("file"))?;
            let alias = validate::alias_from_file(v.get("file"))?;
            Ok((PathBuf::from(v.get("file")), alias, Zeroizing::new(v.get("password").to_string())))
        })?
        else {
            return Ok(());
        };
        let Some(invocation) = self.keytool().map(|kt| kt.import_pkcs12(&file, &password, &alias)) else {
            return Ok(());
        };
        self.mutate(&invocation, Some(&alias), &format!("Successfully imported: {alias}"))?;
        Ok(())
    }

    fn import_pkcs8(&mut self) -> io::Result<()> {
        let mut form = self.form(
            FormSpec::new("Import PKCS #8")
                .field(FieldSpec::file("certs", "Certificates file"))
                .field(FieldSpec::file("key", "PKCS8 key file"))
                .field(FieldSpec::yes_no("encrypted", "Encrypted key?", false))
                .field(FieldSpec::masked("password", "Decryption password").visible_when("encrypted", &["Yes"])),
        );
        let Some((certs, key, alias, key_password)) = self.ask(&mut form, |v| {
            validate::existing_file(v.get("certs"))?;
            validate::existing_file(v.get("key"))?;
            let alias = validate::alias_from_file(v.get("key"))?;
            let key_password = v.flag("encrypted").then(|| Zeroizing::new(v.get("password").to_string()));
            Ok((PathBuf::from(v.get("certs")), PathBuf::from(v.get("key")), alias, key_password))
        })?
        else {
            return Ok(());
        };

        let bundle = match temp_file(".p12") {
            Ok(file) => file,
            Err(e) => return self.show_error("Import PKCS #8", format!("Cannot create a temp file: {e}")),
        };
        let openssl = Openssl::new(&self.config.openssl);
        let Some((convert, import)) = self.keytool().map(|kt| {
            (
                openssl.pkcs8_to_pkcs12(
                    &certs,
                    &key,
                    bundle.path(),
                    &alias,
                    kt.storepass,
                    key_password.as_ref().map(|pw| pw.as_str()),
                ),
                kt.import_pkcs12(bundle.path(), kt.storepass, &alias),
            )
        }) else {
            return Ok(());
        };
        if self.run_tool(&convert)?.is_some() {
            self.mutate(&import, Some(&alias), &format!("Successfully imported: {alias}"))?;
        }
        drop(bundle);
        Ok(())
    }

    pub(super) fn import_certificate(&mut self) -> io::Result<()> {
        let mut form = self.form(
            FormSpec::new("Import Certificate").field(FieldSpec::file("file", "Certificate file")),
        );
        let Some((file, alias)) = self.ask(&mut form, |v| {
            validate::existing_file(v.get("file"))?;
            Ok((PathBuf::from(v.get("file")), validate::alias_from_file(v.get("file"))?))
        })?
        else {
            return Ok(());
        };
        let Some(invocation) = self.keytool().map(|kt| kt.import_certificate(&alias, &file)) else {
            return Ok(());
        };
        self.mutate(&invocation, Some(&alias), &format!("Successfully imported: {alias}"))?;
        Ok(())
    }

    pub(super) fn import_from_url(&mut self) -> io::Result<()> {
        let mut form = self.form(
            FormSpec::new("Import From Web")
                .field(FieldSpec::text("url", "Url").placeholder("example:443")),
        );
        let Some((host, port)) = self.ask(&mut form, |v| validate::endpoint(v.get("url")))? else {
            return Ok(());
        };
        let fetch = Openssl::new(&self.config.openssl).fetch_certificates(&host, port);
        let Some(stdout) = self.run_tool(&fetch)? else {
            return Ok(());
        };
        let Some(block) = pem::certificate_blocks(&stdout).first().map(|b| b.to_string()) else {
            warn!("No certificate in the reply from {host}:{port}");
            return self.show_error("Error", format!("No certificate received from {host}:{port}."));
        };

        let mut certificate = match temp_file(".pem") {
            Ok(file) => file,
            Err(e) => return self.show_error("Error", format!("Cannot create a temp file: {e}")),
        };
        if let Err(e) = writeln!(certificate, "{block}").and_then(|()| certificate.flush()) {
            return self.show_error("Error", format!("Cannot write the certificate: {e}"));
        }
        let Some(import) = self.keytool().map(|kt| kt.import_certificate(&host, certificate.path())) else {
            return Ok(());
        };
        self.mutate(&import, Some(&host), &format!("Successfully imported: {host}"))?;
        Ok(())
    }

    pub(super) fn delete_entry(&mut self) -> io::Result<()> {
        let Some(alias) = self.view.state.selected_alias() else {
            return Ok(());
        };
        let mut dialog = ConfirmDialog::new("Delete", format!("Delete entry {alias}?"));
        if self.screen.run_modal(&self.view, &mut dialog)? != Confirmation::Yes {
            return Ok(());
        }
        // Keep the cursor on the neighbour that takes the deleted row's place
        let filtered = self.view.state.entries.filtered();
        let selected = self.view.state.selected;
        let neighbour = filtered
            .get(selected + 1)
            .or_else(|| selected.checked_sub(1).and_then(|i| filtered.get(i)))
            .map(|e| e.alias.clone());
        let Some(invocation) = self.keytool().map(|kt| kt.delete(&alias)) else {
            return Ok(());
        };
        self.mutate(&invocation, neighbour.as_deref(), &format!("Deleted: {alias}"))?;
        Ok(())
    }

    pub(super) fn rename_entry(&mut self) -> io::Result<()> {
        let Some(current) = self.view.state.selected_alias() else {
            return Ok(());
        };
        let mut form = self.form(
            FormSpec::new("Rename Entry").field(FieldSpec::text("alias", "New alias").default(current.clone())),
        );
        let existing = self.view.state.entries.all().to_vec();
        let Some(new_alias) = self.ask(&mut form, |v| {
            let alias = validate::alias(v.get("alias"))?;
            if alias == current {
                return Err(ValidationError::new("The new alias is the same as the current one."));
            }
            alias_taken(&existing, &alias)?;
            Ok(alias)
        })?
        else {
            return Ok(());
        };
        let Some(invocation) = self.keytool().map(|kt| kt.change_alias(&current, &new_alias)) else {
            return Ok(());
        };
        self.mutate(&invocation, Some(&new_alias), &format!("Renamed {current} to {new_alias}"))?;
        Ok(())
    }

    pub(super) fn change_password(&mut self) -> io::Result<()> {
        if self.view.state.workspace.is_none() {
            return Ok(());
        }
        let mut form = self.form(
            FormSpec::new("Change Store Password")
                .field(FieldSpec::masked("new", "New password"))
                .field(FieldSpec::masked("confirm", "Confirm new password")),
        );
        let Some(new_password) = self.ask(&mut form, |v| {
            validate::new_password(v.get("new"), v.get("confirm"))?;
            Ok(Zeroizing::new(v.get("new").to_string()))
        })?
        else {
            return Ok(());
        };

        let Some(change) = self.keytool().map(|kt| kt.store_password(&new_password)) else {
            return Ok(());
        };
        if self.run_tool(&change)?.is_none() {
            return Ok(());
        }
        let key_aliases: Vec<String> = self
            .view
            .state
            .entries
            .all()
            .iter()
            .filter(|e| e.is_key)
            .map(|e| e.alias.clone())
            .collect();
        let Some(workspace) = self.view.state.workspace.as_mut() else {
            return Ok(());
        };
        let old_password = Zeroizing::new(workspace.password().to_string());
        workspace.set_password(&new_password);
        info!("Store password changed for {}", workspace.original().display());

        let keytool = workspace.keytool(&self.config.keytool);
        let skipped: Vec<String> = key_aliases
            .into_iter()
            .filter(|alias| {
                let rekey = keytool.key_password(alias, &old_password, &new_password);
                match run_checked(self.runner.as_ref(), &rekey) {
                    Ok(_) => false,
                    Err(e) => {
                        warn!("Key password of {alias} left unchanged: {e}");
                        true
                    }
                }
            })
            .collect();

        let selected = self.view.state.selected_alias();
        if self.reload(selected.as_deref())? {
            let mut done = "Store password changed.".to_string();
            if !skipped.is_empty() {
                done.push_str(&format!("\nKey password unchanged for: {}", skipped.join(", ")));
            }
            self.show_info("Success", done)?;
        }
        Ok(())
    }

    pub(super) fn export_entry(&mut self) -> io::Result<()> {
        let Some((alias, kind)) = self
            .view
            .state
            .selected_entry()
            .map(|e| (e.alias.clone(), e.kind))
        else {
            return Ok(());
        };
        let offered = ExportKind::offered(kind);
        if offered.is_empty() {
            return self.show_error("Export", format!("Entries like {alias} cannot be exported."));
        }
        let labels: Vec<&str> = offered.iter().map(|k| k.label()).collect();
        let mut list = SelectList::new(format!("Export {alias}"), &labels);
        let Selection::Chosen(choice) = self.screen.run_modal(&self.view, &mut list)? else {
            return Ok(());
        };
        match offered.get(choice) {
            Some(ExportKind::Certificate) => self.export_certificate(&alias),
            Some(ExportKind::Chain) => self.export_chain(&alias),
            Some(ExportKind::PublicKey) => self.export_public_key(&alias),
            Some(ExportKind::KeyPair) => self.export_key_pair(&alias),
            None => Ok(()),
        }
    }

    fn export_target(&mut self, title: &str, default: String) -> io::Result<Option<String>> {
        let mut form = self.form(FormSpec::new(title).field(FieldSpec::file("file", "Export file").default(default)));
        self.ask(&mut form, |v| validate::target_file(v.get("file")))
    }

    fn export_certificate(&mut self, alias: &str) -> io::Result<()> {
        let mut form = self.form(
            FormSpec::new("Export Certificate")
                .field(FieldSpec::choice("encoding", "Encoding", &ENCODINGS))
                .field(FieldSpec::file("file", "Export file").default(format!("{alias}.pem"))),
        );
        let Some((pem, file)) = self.ask(&mut form, |v| {
            Ok((v.get("encoding") == "PEM", validate::target_file(v.get("file"))?))
        })?
        else {
            return Ok(());
        };
        let Some(invocation) = self
            .keytool()
            .map(|kt| kt.export_certificate(alias, Path::new(&file), pem))
        else {
            return Ok(());
        };
        if self.run_tool(&invocation)?.is_some() {
            self.show_info("Success", format!("Exported {alias} to {file}"))?;
        }
        Ok(())
    }

    fn export_chain(&mut self, alias: &str) -> io::Result<()> {
        let Some(file) = self.export_target("Export Certificate Chain", format!("{alias}-chain.pem"))? else {
            return Ok(());
        };
        let Some(invocation) = self.keytool().map(|kt| kt.list_chain_rfc(alias)) else {
            return Ok(());
        };
        let Some(stdout) = self.run_tool(&invocation)? else {
            return Ok(());
        };
        let blocks = pem::certificate_blocks(&stdout);
        if blocks.is_empty() {
            return self.show_error("Error", format!("No certificates found for {alias}."));
        }
        let mut text = blocks.join("\n");
        text.push('\n');
        match fs::write(&file, text) {
            Ok(()) => self.show_info(
                "Success",
                format!("Exported {} certificates of {alias} to {file}", blocks.len()),
            ),
            Err(e) => {
                error!("Cannot write {file}: {e}");
                self.show_error("Error", format!("Cannot write {file}: {e}"))
            }
        }
    }

    fn export_public_key(&mut self, alias: &str) -> io::Result<()> {
        let Some(file) = self.export_target("Export Public Key", format!("{alias}.pub.pem"))? else {
            return Ok(());
        };
        let certificate = match temp_file(".pem") {
            Ok(temp) => temp,
            Err(e) => return self.show_error("Error", format!("Cannot create a temp file: {e}")),
        };
        let Some(export) = self
            .keytool()
            .map(|kt| kt.export_certificate(alias, certificate.path(), true))
        else {
            return Ok(());
        };
        let extract = Openssl::new(&self.config.openssl).public_key(certificate.path(), Path::new(&file));
        if self.run_tool(&export)?.is_some() && self.run_tool(&extract)?.is_some() {
            self.show_info("Success", format!("Exported the public key of {alias} to {file}"))?;
        }
        Ok(())
    }

    fn export_key_pair(&mut self, alias: &str) -> io::Result<()> {
        let mut form = self.form(
            FormSpec::new("Export Key Pair")
                .field(FieldSpec::masked("password", "Export password"))
                .field(FieldSpec::masked("confirm", "Confirm password"))
                .field(FieldSpec::file("file", "Export file").default(format!("{alias}.p12"))),
        );
        let Some((password, file)) = self.ask(&mut form, |v| {
            validate::new_password(v.get("password"), v.get("confirm"))?;
            Ok((Zeroizing::new(v.get("password").to_string()), validate::target_file(v.get("file"))?))
        })?
        else {
            return Ok(());
        };
        let Some(invocation) = self
            .keytool()
            .map(|kt| kt.export_key_pair(alias, Path::new(&file), &password))
        else {
            return Ok(());
        };
        if self.run_tool(&invocation)?.is_some() {
            self.show_info("Success", format!("Exported key pair {alias} to {file}"))?;
        }
        Ok(())
    }

    // ========================================================================
    // View options
    // ========================================================================

    pub(super) fn filter(&mut self) -> io::Result<()> {
        let current = self.view.state.entries.filter().clone();
        let mut form = self.form(
            FormSpec::new("Filter")
                .field(FieldSpec::text("name", "Name").default(current.name).optional())
                .field(FieldSpec::yes_no("partial_name", "Partial name", current.partial_name))
                .field(FieldSpec::yes_no("valid", "Valid", current.valid))
                .field(FieldSpec::yes_no("expired", "Expired", current.expired))
                .field(FieldSpec::yes_no("keys", "Keys", current.keys))
                .field(FieldSpec::yes_no("certificates", "Certificates", current.certificates)),
        );
        let Some(values) = self.show_form(&mut form)? else {
            return Ok(());
        };
        let filter = FilterState {
            name: values.get("name").to_string(),
            partial_name: values.flag("partial_name"),
            valid: values.flag("valid"),
            expired: values.flag("expired"),
            keys: values.flag("keys"),
            certificates: values.flag("certificates"),
        };
        debug!("Filter set to {filter:?}");
        self.view.state.set_filter(filter);
        Ok(())
    }

    pub(super) fn clear_filter(&mut self) {
        debug!("Filter cleared");
        self.view.state.set_filter(FilterState::default());
    }

    pub(super) fn search(&mut self) -> io::Result<()> {
        let current = self.view.state.highlight.clone().unwrap_or_default();
        let mut form = self.form(
            FormSpec::new("Search").field(FieldSpec::text("term", "Search term").default(current).optional()),
        );
        let Some(values) = self.show_form(&mut form)? else {
            return Ok(());
        };
        let term = values.get("term");
        self.view.state.highlight = (!term.is_empty()).then(|| term.to_string());
        Ok(())
    }

    pub(super) fn clear_search(&mut self) {
        self.view.state.highlight = None;
    }

    pub(super) fn toggle_mouse(&mut self) -> io::Result<()> {
        let enabled = !self.view.state.mouse_enabled;
        self.view.state.mouse_enabled = enabled;
        info!("Mouse {}", if enabled { "enabled" } else { "disabled" });
        if let Some(capture) = self.mouse_capture
            && let Err(e) = capture(enabled)
        {
            warn!("Could not switch mouse capture: {e}");
        }
        Ok(())
    }

    pub(super) fn show_help(&mut self) -> io::Result<()> {
        let mut help = HelpPopup::new();
        self.screen.run_modal(&self.view, &mut help)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::{ToolOutput, ToolRunner};
    use crate::test_support::{SAMPLE_LISTING, buffer_lines, key, key_with};
    use crate::tui::tests::{open_session, run_all, session};
    use crossterm::event::{Event as CtEvent, KeyCode, KeyModifiers};

    const TWO_CERTS: &str = "CONNECTED(00000003)\n-----BEGIN CERTIFICATE-----\nAAA\n-----END CERTIFICATE-----\n 1 s:CN=CA\n-----BEGIN CERTIFICATE-----\nBBB\n-----END CERTIFICATE-----\n---\n";

    fn enter() -> CtEvent {
        key(KeyCode::Enter)
    }

    fn down() -> CtEvent {
        key(KeyCode::Down)
    }

    fn paste(text: &str) -> CtEvent {
        CtEvent::Paste(text.to_string())
    }

    fn shift(n: u8) -> CtEvent {
        key_with(KeyCode::F(n), KeyModifiers::SHIFT)
    }

    fn listing() -> ToolOutput {
        ToolOutput::ok(SAMPLE_LISTING)
    }

    #[test]
    fn test_delete_confirmed_runs_keytool_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let keys = [key(KeyCode::F(8)), key(KeyCode::Char('y')), enter()];
        let (mut s, calls) = open_session(&dir, &keys, vec![ToolOutput::ok(""), listing()]);
        run_all(&mut s);
        let calls = calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].args[0], "-delete");
        assert_eq!(calls[0].value_of("-alias"), Some("mykey"));
        assert!(calls[1].has_flag("-v"));
    }

    #[test]
    fn test_delete_defaults_to_no() {
        let dir = tempfile::tempdir().unwrap();
        let (mut s, calls) = open_session(&dir, &[key(KeyCode::F(8)), enter()], Vec::new());
        run_all(&mut s);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_tool_failure_keeps_entries() {
        let dir = tempfile::tempdir().unwrap();
        let keys = [key(KeyCode::F(8)), key(KeyCode::Char('y')), enter()];
        let failure = ToolOutput::failed(1, "keytool error: java.lang.Exception: boom");
        let (mut s, calls) = open_session(&dir, &keys, vec![failure]);
        run_all(&mut s);
        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(s.view.state.entries.all().len(), 2);
    }

    #[test]
    fn test_unparseable_reload_keeps_list_and_selection() {
        let dir = tempfile::tempdir().unwrap();
        let keys = [down(), key(KeyCode::F(8)), key(KeyCode::Char('y'))];
        let garbled = "Keystore type: PKCS12\n\nYour keystore contains 3 entries\n\nAlias name: mykey\nEntry type: PrivateKeyEntry\n";
        let outputs = vec![ToolOutput::ok(""), ToolOutput::ok(garbled)];
        let (mut s, calls) = open_session(&dir, &keys, outputs);

        assert_eq!(s.step().unwrap(), Flow::Continue);
        assert_eq!(s.view.state.selected, 1);
        // The error popup waits for a key the script never sends
        let err = s.step().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);

        let lines = buffer_lines(s.screen().terminal().backend().buffer());
        assert!(lines.iter().any(|l| l.contains("Reload failed")));
        assert_eq!(calls.borrow().len(), 2);
        let aliases: Vec<&str> = s.view.state.entries.all().iter().map(|e| e.alias.as_str()).collect();
        assert_eq!(aliases, vec!["mykey", "trustedcert"]);
        assert_eq!(s.view.state.selected, 1);
    }

    /// Rewrites the working copy, then fails, as keytool can.
    struct PartialWriteRunner;

    impl ToolRunner for PartialWriteRunner {
        fn invoke(&self, invocation: &Invocation) -> io::Result<ToolOutput> {
            if let Some(keystore) = invocation.value_of("-keystore") {
                fs::write(keystore, b"half written")?;
            }
            Ok(ToolOutput::failed(1, "keytool error: java.io.IOException: disk full"))
        }
    }

    #[test]
    fn test_failed_tool_call_recomputes_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let keys = [key(KeyCode::F(8)), key(KeyCode::Char('y')), enter()];
        let (mut s, _) = open_session(&dir, &keys, Vec::new());
        s.runner = Box::new(PartialWriteRunner);
        assert!(!s.view.state.dirty);

        run_all(&mut s);
        assert!(s.view.state.dirty);
        assert_eq!(s.view.state.entries.all().len(), 2);
    }

    #[test]
    fn test_rename_rejects_unchanged_alias() {
        let dir = tempfile::tempdir().unwrap();
        let keys = [key(KeyCode::F(6)), enter(), enter(), key(KeyCode::Esc)];
        let (mut s, calls) = open_session(&dir, &keys, Vec::new());
        run_all(&mut s);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_rename_runs_changealias() {
        let dir = tempfile::tempdir().unwrap();
        let mut keys = vec![key(KeyCode::F(6))];
        keys.extend(std::iter::repeat_n(key(KeyCode::Backspace), 5));
        keys.extend([paste("newkey"), enter(), enter(), enter()]);
        let (mut s, calls) = open_session(&dir, &keys, vec![ToolOutput::ok(""), listing()]);
        run_all(&mut s);
        let calls = calls.borrow();
        assert_eq!(calls[0].args[0], "-changealias");
        assert_eq!(calls[0].value_of("-alias"), Some("mykey"));
        assert_eq!(calls[0].value_of("-destalias"), Some("newkey"));
    }

    #[test]
    fn test_filter_form_hides_expired() {
        let dir = tempfile::tempdir().unwrap();
        let keys = [
            key(KeyCode::F(5)),
            down(),
            down(),
            down(),
            key(KeyCode::Right),
            down(),
            down(),
            down(),
            enter(),
        ];
        let (mut s, _) = open_session(&dir, &keys, Vec::new());
        run_all(&mut s);
        assert!(!s.view.state.entries.filter().expired);
        let aliases: Vec<&str> = s
            .view
            .state
            .entries
            .filtered()
            .iter()
            .map(|e| e.alias.as_str())
            .collect();
        assert_eq!(aliases, vec!["mykey"]);

        s.screen_mut()
            .resolver_mut()
            .source_mut()
            .push(key_with(KeyCode::F(3), KeyModifiers::ALT));
        run_all(&mut s);
        assert!(s.view.state.entries.filter().is_default());
    }

    #[test]
    fn test_search_sets_and_clears_highlight() {
        let dir = tempfile::tempdir().unwrap();
        let keys = [key(KeyCode::F(4)), paste("owner"), enter(), enter()];
        let (mut s, _) = open_session(&dir, &keys, Vec::new());
        run_all(&mut s);
        assert_eq!(s.view.state.highlight.as_deref(), Some("owner"));

        s.screen_mut()
            .resolver_mut()
            .source_mut()
            .push(key_with(KeyCode::F(4), KeyModifiers::ALT));
        run_all(&mut s);
        assert_eq!(s.view.state.highlight, None);
    }

    #[test]
    fn test_generate_rsa_key_pair() {
        let dir = tempfile::tempdir().unwrap();
        let mut keys = vec![shift(2)];
        keys.extend(std::iter::repeat_n(enter(), 3));
        keys.extend(std::iter::repeat_n(enter(), 7));
        keys.push(paste("Test"));
        keys.extend(std::iter::repeat_n(enter(), 7));
        keys.push(enter());
        let (mut s, calls) = open_session(&dir, &keys, vec![ToolOutput::ok(""), listing()]);
        run_all(&mut s);

        let calls = calls.borrow();
        let generate = &calls[0];
        assert_eq!(generate.args[0], "-genkeypair");
        assert_eq!(generate.value_of("-alias"), Some("rsa-20260101000000"));
        assert_eq!(generate.value_of("-keyalg"), Some("RSA"));
        assert_eq!(generate.value_of("-keysize"), Some("2048"));
        assert_eq!(generate.value_of("-dname"), Some("CN=Test"));
        assert_eq!(generate.value_of("-validity"), Some("365"));
        assert_eq!(generate.value_of("-startdate"), Some("2026/01/01 00:00:00"));
        assert_eq!(generate.value_of("-sigalg"), Some("SHA256withRSA"));
        assert!(generate.has_flag("-ext"));
    }

    #[test]
    fn test_generate_ec_uses_group_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut keys = vec![shift(2), key(KeyCode::Right), key(KeyCode::Right)];
        keys.extend(std::iter::repeat_n(enter(), 4));
        keys.extend(std::iter::repeat_n(enter(), 7));
        keys.push(paste("Test"));
        keys.extend(std::iter::repeat_n(enter(), 8));
        let (mut s, calls) = open_session(&dir, &keys, vec![ToolOutput::ok(""), listing()]);
        run_all(&mut s);

        let calls = calls.borrow();
        assert_eq!(calls[0].value_of("-keyalg"), Some("EC"));
        assert_eq!(calls[0].value_of("-groupname"), Some("secp256r1"));
        assert!(!calls[0].has_flag("-keysize"));
        assert_eq!(calls[0].value_of("-sigalg"), Some("SHA256withECDSA"));
    }

    #[test]
    fn test_import_certificate_uses_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("server.pem");
        fs::write(&cert, "pem").unwrap();
        let keys = [shift(4), paste(&cert.to_string_lossy()), down(), enter(), enter()];
        let (mut s, calls) = open_session(&dir, &keys, vec![ToolOutput::ok(""), listing()]);
        run_all(&mut s);
        let calls = calls.borrow();
        assert_eq!(calls[0].args[0], "-importcert");
        assert_eq!(calls[0].value_of("-alias"), Some("server"));
        assert_eq!(calls[0].value_of("-file"), Some(cert.to_string_lossy().as_ref()));
    }

    #[test]
    fn test_import_from_url_imports_first_block() {
        let dir = tempfile::tempdir().unwrap();
        let keys = [shift(5), paste("https://example.com:8443/x"), down(), enter(), enter()];
        let outputs = vec![ToolOutput::ok(TWO_CERTS), ToolOutput::ok(""), listing()];
        let (mut s, calls) = open_session(&dir, &keys, outputs);
        run_all(&mut s);

        let calls = calls.borrow();
        assert_eq!(calls[0].program, "openssl");
        assert_eq!(calls[0].value_of("-connect"), Some("example.com:8443"));
        assert_eq!(calls[1].value_of("-alias"), Some("example.com"));
        let temp = calls[1].value_of("-file").unwrap();
        assert!(!Path::new(temp).exists());
    }

    #[test]
    fn test_import_from_url_without_certificate() {
        let dir = tempfile::tempdir().unwrap();
        let keys = [shift(5), paste("example.com"), down(), enter(), enter()];
        let (mut s, calls) = open_session(&dir, &keys, vec![ToolOutput::ok("connect: refused")]);
        run_all(&mut s);
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn test_import_pkcs8_converts_then_imports() {
        let dir = tempfile::tempdir().unwrap();
        let certs = dir.path().join("chain.pem");
        let key_file = dir.path().join("web.key");
        fs::write(&certs, "c").unwrap();
        fs::write(&key_file, "k").unwrap();
        let keys = [
            shift(3),
            down(),
            enter(),
            paste(&certs.to_string_lossy()),
            down(),
            paste(&key_file.to_string_lossy()),
            down(),
            down(),
            enter(),
            enter(),
        ];
        let outputs = vec![ToolOutput::ok(""), ToolOutput::ok(""), listing()];
        let (mut s, calls) = open_session(&dir, &keys, outputs);
        run_all(&mut s);

        let calls = calls.borrow();
        assert_eq!(calls[0].program, "openssl");
        assert_eq!(calls[0].value_of("-name"), Some("web"));
        assert!(!calls[0].has_flag("-passin"));
        assert_eq!(calls[1].args[0], "-importkeystore");
        let bundle = calls[1].value_of("-srckeystore").unwrap();
        assert_eq!(calls[0].value_of("-out"), Some(bundle));
        assert!(!Path::new(bundle).exists());
    }

    #[test]
    fn test_unsupported_key_pair_format() {
        let dir = tempfile::tempdir().unwrap();
        let keys = [shift(3), down(), down(), enter(), enter()];
        let (mut s, calls) = open_session(&dir, &keys, Vec::new());
        run_all(&mut s);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_change_password_rekeys_key_entries() {
        let dir = tempfile::tempdir().unwrap();
        let keys = [
            key(KeyCode::F(2)),
            paste("secret1"),
            down(),
            paste("secret1"),
            down(),
            enter(),
            enter(),
        ];
        let outputs = vec![ToolOutput::ok(""), ToolOutput::ok(""), listing()];
        let (mut s, calls) = open_session(&dir, &keys, outputs);
        run_all(&mut s);

        let calls = calls.borrow();
        assert_eq!(calls[0].args[0], "-storepasswd");
        assert_eq!(calls[0].value_of("-new"), Some("secret1"));
        assert_eq!(calls[1].args[0], "-keypasswd");
        assert_eq!(calls[1].value_of("-alias"), Some("mykey"));
        assert_eq!(calls[1].value_of("-storepass"), Some("secret1"));
        assert_eq!(calls[1].value_of("-keypass"), Some(""));
        assert_eq!(calls.len(), 3);
        assert_eq!(s.view.state.workspace.as_ref().unwrap().password(), "secret1");
    }

    #[test]
    fn test_change_password_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let keys = [
            key(KeyCode::F(2)),
            paste("secret1"),
            down(),
            paste("secret2"),
            down(),
            enter(),
            key(KeyCode::Esc),
        ];
        let (mut s, calls) = open_session(&dir, &keys, Vec::new());
        run_all(&mut s);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_export_certificate_as_pem() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.pem");
        let mut keys = vec![down(), key(KeyCode::F(3)), enter(), down()];
        keys.extend(std::iter::repeat_n(key(KeyCode::Backspace), 20));
        keys.extend([paste(&target.to_string_lossy()), down(), enter(), enter()]);
        let (mut s, calls) = open_session(&dir, &keys, vec![ToolOutput::ok("")]);
        run_all(&mut s);

        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args[0], "-exportcert");
        assert_eq!(calls[0].value_of("-alias"), Some("trustedcert"));
        assert!(calls[0].has_flag("-rfc"));
    }

    #[test]
    fn test_export_chain_writes_pem_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("chain.pem");
        let mut keys = vec![key(KeyCode::F(3)), down(), enter()];
        keys.extend(std::iter::repeat_n(key(KeyCode::Backspace), 20));
        keys.extend([paste(&target.to_string_lossy()), down(), enter(), enter()]);
        let (mut s, _) = open_session(&dir, &keys, vec![ToolOutput::ok(TWO_CERTS)]);
        run_all(&mut s);

        let written = fs::read_to_string(&target).unwrap();
        assert_eq!(written.matches("-----BEGIN CERTIFICATE-----").count(), 2);
        assert!(!written.contains("CONNECTED"));
    }

    #[test]
    fn test_quit_when_dirty_escape_cancels_then_no_discards() {
        let dir = tempfile::tempdir().unwrap();
        let (mut s, _) = open_session(&dir, &[key(KeyCode::Char('q')), key(KeyCode::Esc)], Vec::new());
        let working = s.view.state.workspace.as_ref().unwrap().working().to_path_buf();
        fs::write(&working, b"changed").unwrap();
        assert_eq!(run_all(&mut s), Flow::Continue);
        assert!(s.view.state.dirty);

        let input = s.screen_mut().resolver_mut().source_mut();
        input.push(key(KeyCode::Char('q')));
        input.push(key(KeyCode::Char('n')));
        assert_eq!(run_all(&mut s), Flow::Quit);
        assert_eq!(fs::read(dir.path().join("store.jks")).unwrap(), b"keystore bytes");
    }

    #[test]
    fn test_quit_when_dirty_yes_saves() {
        let dir = tempfile::tempdir().unwrap();
        let (mut s, _) = open_session(&dir, &[key(KeyCode::Char('q')), key(KeyCode::Char('y'))], Vec::new());
        let working = s.view.state.workspace.as_ref().unwrap().working().to_path_buf();
        fs::write(&working, b"changed").unwrap();
        assert_eq!(run_all(&mut s), Flow::Quit);
        assert_eq!(fs::read(dir.path().join("store.jks")).unwrap(), b"changed");
        assert!(!s.view.state.dirty);
    }

    #[test]
    fn test_open_retries_wrong_password() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.jks");
        fs::write(&path, b"bytes").unwrap();
        let mut keys = vec![paste("wrong"), down(), enter(), key(KeyCode::Up)];
        keys.extend(std::iter::repeat_n(key(KeyCode::Backspace), 5));
        keys.extend([paste("right1"), down(), enter()]);
        let rejected = || ToolOutput::failed(1, "keytool error: password was incorrect");
        let mut s = session(&keys, Vec::new());
        let runner = crate::test_support::ScriptedRunner::new(vec![rejected(), rejected(), listing()]);
        let calls = runner.calls.clone();
        s.runner = Box::new(runner);

        assert!(s.open_keystore(Some(path.clone())).unwrap());
        let workspace = s.view.state.workspace.as_ref().unwrap();
        assert_eq!(workspace.password(), "right1");
        assert_eq!(workspace.original(), path);
        assert_eq!(calls.borrow()[2].value_of("-storepass"), Some("right1"));
        assert_eq!(s.view.state.entries.all().len(), 2);
        assert!(!s.view.state.dirty);
    }

    #[test]
    fn test_start_without_keystore_exits_with_one() {
        let mut s = session(&[key(KeyCode::Esc)], Vec::new());
        let code = s.start().unwrap();
        assert_eq!(code, std::process::ExitCode::from(1));
        assert!(s.view.state.workspace.is_none());
    }

    #[test]
    fn test_toggle_mouse() {
        let dir = tempfile::tempdir().unwrap();
        let keys = [key_with(KeyCode::F(5), KeyModifiers::ALT)];
        let (mut s, _) = open_session(&dir, &keys, Vec::new());
        run_all(&mut s);
        assert!(!s.view.state.mouse_enabled);
    }

    #[test]
    fn test_help_closes_on_any_key() {
        let dir = tempfile::tempdir().unwrap();
        let keys = [key(KeyCode::F(1)), down(), key(KeyCode::Char('x'))];
        let (mut s, calls) = open_session(&dir, &keys, Vec::new());
        assert_eq!(run_all(&mut s), Flow::Continue);
        assert!(calls.borrow().is_empty());
    }
}
