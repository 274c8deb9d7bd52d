//! The editing session
//!
//! [`EditorSession`] is the single owner of the annotation store, the
//! interaction controller and the loaded document. Synchronous edits go
//! straight through it. The three slow operations (URL load, PDF export,
//! remote save) are split in two: `begin_*` hands out a self-contained task
//! the caller can await anywhere, and `complete_*` applies its outcome unless
//! a newer task of the same kind has superseded it.

use std::sync::Arc;

use annotate_core::{
    annotations_file_name, composite_with, from_json, signed_file_name, to_json,
    AnnotationStore, CompositeOptions, InteractionController, PdfInfo, SavePayload, Snapshot,
};
use chrono::Utc;
use reqwest::{Client, Url};
use tracing::{debug, error, info, warn};

use crate::config::EditorConfig;
use crate::error::SessionError;
use crate::loader::{build_client, fetch_pdf, parse_pdf_url, LoadedPdf};
use crate::remote::RemoteStore;
use crate::tasks::{TaskOutcome, TaskSlot, TaskState, TaskTicket};

/// A file ready for download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// Transient, user-visible message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(err: &SessionError) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: err.to_string(),
        }
    }
}

/// Top-level action handler: turn an action's result into a notification.
/// Errors are logged here and nowhere else.
pub fn handle_action<T>(
    action: &str,
    result: Result<T, SessionError>,
    on_success: impl FnOnce(&T) -> String,
) -> (Option<T>, Notification) {
    match result {
        Ok(value) => {
            let notification = Notification::success(on_success(&value));
            info!(action, message = %notification.message, "action succeeded");
            (Some(value), notification)
        }
        Err(err) => {
            if err.is_input_error() {
                warn!(action, error = %err, "action rejected");
            } else {
                error!(action, error = %err, "action failed");
            }
            (None, Notification::error(&err))
        }
    }
}

/// Fetch a PDF by URL
#[derive(Debug)]
pub struct LoadTask {
    ticket: TaskTicket,
    client: Client,
    url: Url,
}

impl LoadTask {
    pub async fn run(self) -> TaskOutcome<LoadedPdf> {
        let LoadTask { ticket, client, url } = self;
        TaskOutcome::run(ticket, async move { fetch_pdf(&client, &url).await }).await
    }
}

/// Composite the snapshot taken at `begin_export` onto the document
#[derive(Debug)]
pub struct ExportTask {
    ticket: TaskTicket,
    source: Arc<[u8]>,
    snapshot: Snapshot,
    options: CompositeOptions,
    file_name: String,
}

impl ExportTask {
    pub async fn run(self) -> TaskOutcome<ExportedFile> {
        let ExportTask {
            ticket,
            source,
            snapshot,
            options,
            file_name,
        } = self;
        TaskOutcome::run(ticket, async move {
            let bytes =
                tokio::task::spawn_blocking(move || composite_with(&source, &snapshot, &options))
                    .await
                    .map_err(|e| SessionError::TaskFailed(e.to_string()))??;
            Ok(ExportedFile {
                file_name,
                mime_type: "application/pdf",
                bytes,
            })
        })
        .await
    }
}

/// POST the annotation payload to the configured endpoint
#[derive(Debug)]
pub struct SaveTask {
    ticket: TaskTicket,
    remote: RemoteStore,
    payload: SavePayload,
}

impl SaveTask {
    pub fn payload(&self) -> &SavePayload {
        &self.payload
    }

    pub async fn run(self) -> TaskOutcome<()> {
        let SaveTask {
            ticket,
            remote,
            payload,
        } = self;
        TaskOutcome::run(ticket, async move { remote.save(&payload).await }).await
    }
}

pub struct EditorSession {
    config: EditorConfig,
    client: Client,
    remote: RemoteStore,
    store: AnnotationStore,
    controller: InteractionController,
    document: Option<LoadedPdf>,
    export_options: CompositeOptions,
    load: TaskSlot,
    export: TaskSlot,
    save: TaskSlot,
}

impl EditorSession {
    pub fn new(config: EditorConfig) -> Result<Self, SessionError> {
        let client = build_client(&config.fetch)?;
        let remote = RemoteStore::new(client.clone(), &config.remote)?;
        let controller =
            InteractionController::new(config.interaction.settings(), config.viewer.viewport());
        Ok(Self {
            config,
            client,
            remote,
            store: AnnotationStore::new(),
            controller,
            document: None,
            export_options: CompositeOptions::default(),
            load: TaskSlot::new(),
            export: TaskSlot::new(),
            save: TaskSlot::new(),
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn document(&self) -> Option<&LoadedPdf> {
        self.document.as_ref()
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    /// Controller and store together, for tool and gesture events
    pub fn editor(&mut self) -> (&mut InteractionController, &mut AnnotationStore) {
        (&mut self.controller, &mut self.store)
    }

    pub fn set_export_options(&mut self, options: CompositeOptions) {
        self.export_options = options;
    }

    pub fn load_state(&self) -> &TaskState {
        self.load.state()
    }

    pub fn export_state(&self) -> &TaskState {
        self.export.state()
    }

    pub fn save_state(&self) -> &TaskState {
        self.save.state()
    }

    fn current_document(&self) -> Result<&LoadedPdf, SessionError> {
        self.document.as_ref().ok_or(SessionError::NoDocument)
    }

    /// Replace the document. Annotations belong to the old one and are dropped.
    fn install_document(&mut self, pdf: LoadedPdf) -> PdfInfo {
        let info = pdf.info.clone();
        self.store.clear();
        self.controller.reset_for_document(info.page_count);
        info!(file_name = %pdf.file_name, pages = info.page_count, "document installed");
        self.document = Some(pdf);
        info
    }

    // ---- loading ----

    /// Accept a locally selected file. Supersedes any URL load in flight.
    pub fn load_bytes(
        &mut self,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<PdfInfo, SessionError> {
        let pdf = LoadedPdf::from_upload(file_name, bytes)?;
        self.load.cancel();
        Ok(self.install_document(pdf))
    }

    pub fn begin_load_url(&mut self, input: &str) -> Result<LoadTask, SessionError> {
        let url = parse_pdf_url(input)?;
        Ok(LoadTask {
            ticket: self.load.begin(),
            client: self.client.clone(),
            url,
        })
    }

    /// Apply a finished load. `None` means the task was superseded.
    pub fn complete_load(
        &mut self,
        outcome: TaskOutcome<LoadedPdf>,
    ) -> Option<Result<PdfInfo, SessionError>> {
        if !self.load.finish(&outcome.ticket, &outcome.result) {
            debug!(generation = outcome.ticket.generation(), "dropping stale load");
            return None;
        }
        Some(outcome.result.map(|pdf| self.install_document(pdf)))
    }

    pub fn cancel_load(&mut self) -> bool {
        self.load.cancel()
    }

    // ---- exporting ----

    pub fn begin_export(&mut self) -> Result<ExportTask, SessionError> {
        let document = self.current_document()?;
        let source = Arc::clone(&document.bytes);
        let file_name = signed_file_name(&document.file_name);
        Ok(ExportTask {
            ticket: self.export.begin(),
            source,
            snapshot: self.store.snapshot(),
            options: self.export_options.clone(),
            file_name,
        })
    }

    pub fn complete_export(
        &mut self,
        outcome: TaskOutcome<ExportedFile>,
    ) -> Option<Result<ExportedFile, SessionError>> {
        if !self.export.finish(&outcome.ticket, &outcome.result) {
            debug!(generation = outcome.ticket.generation(), "dropping stale export");
            return None;
        }
        Some(outcome.result)
    }

    pub fn cancel_export(&mut self) -> bool {
        self.export.cancel()
    }

    /// JSON export is cheap and runs inline
    pub fn export_json(&self) -> Result<ExportedFile, SessionError> {
        let document = self.current_document()?;
        let json = to_json(
            &document.file_name,
            &document.source,
            &self.store.snapshot(),
            document.page_count(),
        )?;
        Ok(ExportedFile {
            file_name: annotations_file_name(&document.file_name),
            mime_type: "application/json",
            bytes: json.into_bytes(),
        })
    }

    /// Replace the annotation set with one previously exported as JSON
    pub fn import_json(&mut self, json: &str) -> Result<usize, SessionError> {
        self.current_document()?;
        let store = AnnotationStore::from_document(&from_json(json)?)?;
        let count = store.len();
        self.controller.replace_annotations(&mut self.store, store);
        info!(annotations = count, "annotations imported");
        Ok(count)
    }

    // ---- remote save ----

    pub fn begin_save(&mut self) -> Result<SaveTask, SessionError> {
        if !self.remote.is_configured() {
            return Err(SessionError::RemoteNotConfigured);
        }
        let document = self.current_document()?;
        let payload = SavePayload::new(
            &document.file_name,
            &document.source,
            &self.store.snapshot(),
            document.page_count(),
            Utc::now(),
        );
        Ok(SaveTask {
            ticket: self.save.begin(),
            remote: self.remote.clone(),
            payload,
        })
    }

    pub fn complete_save(&mut self, outcome: TaskOutcome<()>) -> Option<Result<(), SessionError>> {
        if !self.save.finish(&outcome.ticket, &outcome.result) {
            debug!(generation = outcome.ticket.generation(), "dropping stale save");
            return None;
        }
        Some(outcome.result)
    }

    // ---- document-level edits ----

    /// Remove every annotation. Requires explicit confirmation from the user.
    pub fn clear_all(&mut self, confirmed: bool) -> bool {
        if !self.controller.clear_all(&mut self.store, confirmed) {
            return false;
        }
        info!("all annotations cleared");
        true
    }
}
