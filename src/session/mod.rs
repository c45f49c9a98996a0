//! The single active document and everything the user does to it
//!
//! Lifecycle: `Empty -> Loading -> Ready`, `Loading -> Error`, and a new
//! load from either `Ready` or `Error`. Validation of an upload happens
//! synchronously in [`DocumentSession::start_load`]; the engine scan and
//! structural parse run on a loader thread and are committed by
//! [`DocumentSession::poll`].

use std::sync::Arc;

use log::{debug, info, warn};

use crate::catalog::FieldRecord;
use crate::forms::{DocumentModel, LopdfModel};
use crate::notification::NotificationManager;
use crate::pdf::{DocumentInfo, RenderEngine, default_engine};
use crate::settings::Settings;

mod loader;
mod save;
mod upload;

pub use loader::LoadedDocument;
use loader::{LoadResult, PendingLoad};
pub use save::{
    Artifact, ArtifactKind, GUIDE_FILE_NAME, ORIGINAL_FILE_NAME, RENAMED_FILE_NAME, SaveFailure,
    SaveOutcome, modification_guide,
};
pub use upload::{DEFAULT_MAX_UPLOAD_BYTES, PDF_CONTENT_TYPE, Upload};

pub const MIN_SCALE: f32 = 0.5;
pub const MAX_SCALE: f32 = 3.0;
pub const SCALE_STEP: f32 = 0.25;
pub const DEFAULT_SCALE: f32 = 1.0;

/// Load failures that halt the load and leave the session in `Error`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("not a PDF: {0}")]
    InvalidFormat(String),

    #[error("file is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("could not render document: {0}")]
    RenderFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenameError {
    #[error("no document is ready")]
    NotReady,

    #[error("no field with id {0}")]
    UnknownField(usize),

    #[error("field name cannot be empty")]
    EmptyName,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Empty,
    Loading,
    Ready,
    Error(String),
}

/// Outcome of [`DocumentSession::start_load`] when validation passed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStart {
    Started,
    /// Another load is still in flight; the upload was ignored
    Busy,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_upload_bytes: usize,
    pub default_scale: f32,
    pub show_overlay: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            default_scale: DEFAULT_SCALE,
            show_overlay: true,
        }
    }
}

impl From<&Settings> for SessionConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            max_upload_bytes: settings.max_upload_bytes(),
            default_scale: clamp_scale(settings.default_scale).unwrap_or(DEFAULT_SCALE),
            show_overlay: settings.show_overlay,
        }
    }
}

fn clamp_scale(scale: f32) -> Option<f32> {
    scale.is_finite().then(|| scale.clamp(MIN_SCALE, MAX_SCALE))
}

pub struct DocumentSession {
    engine: Arc<dyn RenderEngine>,
    model: Arc<dyn DocumentModel>,
    config: SessionConfig,

    state: SessionState,
    document: Option<LoadedDocument>,
    pending: Option<PendingLoad>,
    current_page: usize,
    scale: f32,
    selected_field: Option<usize>,
    show_overlay: bool,
    /// Bumped whenever a new document is committed or cleared
    epoch: u64,
    pub notifications: NotificationManager,
}

impl DocumentSession {
    pub fn new(
        engine: Arc<dyn RenderEngine>,
        model: Arc<dyn DocumentModel>,
        config: SessionConfig,
    ) -> Self {
        Self {
            engine,
            model,
            state: SessionState::Empty,
            document: None,
            pending: None,
            current_page: 1,
            scale: config.default_scale,
            selected_field: None,
            show_overlay: config.show_overlay,
            epoch: 0,
            notifications: NotificationManager::new(),
            config,
        }
    }

    /// Production engine and lopdf document model
    pub fn with_defaults(config: SessionConfig) -> Self {
        Self::new(default_engine(), Arc::new(LopdfModel), config)
    }

    // Lifecycle

    /// Validate the upload and hand it to the loader thread.
    ///
    /// Every accepted upload starts from a fresh session: the previous
    /// document, zoom, overlay toggle and notices are dropped. Validation
    /// failures then move the session to `Error`. While a load is in flight
    /// nothing is checked and [`LoadStart::Busy`] is returned.
    pub fn start_load(&mut self, upload: Upload) -> Result<LoadStart, LoadError> {
        if self.is_loading() {
            warn!("Ignoring upload while another load is in flight");
            return Ok(LoadStart::Busy);
        }

        self.clear_document();
        self.restore_view_defaults();

        if let Err(e) = upload::validate(&upload, self.config.max_upload_bytes) {
            self.fail(&e);
            return Err(e);
        }

        info!(
            "Loading {} ({} bytes)",
            upload.file_name.as_deref().unwrap_or("document"),
            upload.bytes.len()
        );
        let bytes: Arc<[u8]> = Arc::from(upload.bytes);
        self.pending = Some(loader::spawn_load(
            Arc::clone(&self.engine),
            Arc::clone(&self.model),
            bytes,
            upload.file_name,
        ));
        self.state = SessionState::Loading;
        Ok(LoadStart::Started)
    }

    /// Commit a finished load, if any. Returns true when the state changed.
    pub fn poll(&mut self) -> bool {
        let Some(pending) = &self.pending else {
            return false;
        };
        match pending.rx.try_recv() {
            Ok(result) => {
                self.pending = None;
                self.commit(result);
                true
            }
            Err(flume::TryRecvError::Empty) => false,
            Err(flume::TryRecvError::Disconnected) => {
                self.pending = None;
                self.commit(Err(LoadError::RenderFailure(
                    "loader stopped unexpectedly".to_string(),
                )));
                true
            }
        }
    }

    /// Validate, load and commit in one blocking call
    pub fn load_document(&mut self, upload: Upload) -> Result<(), LoadError> {
        if self.start_load(upload)? == LoadStart::Busy {
            return Ok(());
        }
        self.wait_for_load()
    }

    /// Block until the in-flight load, if any, is committed
    pub fn wait_for_load(&mut self) -> Result<(), LoadError> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        let result = pending.rx.recv().unwrap_or_else(|_| {
            Err(LoadError::RenderFailure(
                "loader stopped unexpectedly".to_string(),
            ))
        });
        let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);
        self.commit(result);
        outcome
    }

    fn commit(&mut self, result: LoadResult) {
        match result {
            Ok(document) => {
                if let Some(detail) = &document.parse_failure {
                    self.notifications.warn(format!(
                        "Form structure could not be read ({detail}); fields are read-only"
                    ));
                }
                info!(
                    "Document ready: {} pages, {} fields",
                    document.page_count(),
                    document.fields.len()
                );
                self.document = Some(document);
                self.state = SessionState::Ready;
                self.current_page = 1;
                self.selected_field = None;
                self.epoch += 1;
            }
            Err(e) => self.fail(&e),
        }
    }

    fn fail(&mut self, error: &LoadError) {
        warn!("Load failed: {error}");
        self.notifications.error(error.to_string());
        self.clear_document();
        self.state = SessionState::Error(error.to_string());
    }

    fn clear_document(&mut self) {
        if self.document.take().is_some() {
            self.epoch += 1;
        }
        self.current_page = 1;
        self.selected_field = None;
    }

    /// Back to `Empty` with default page, zoom and overlay
    pub fn reset(&mut self) {
        debug!("Session reset");
        self.pending = None;
        self.clear_document();
        self.epoch += 1;
        self.state = SessionState::Empty;
        self.restore_view_defaults();
    }

    fn restore_view_defaults(&mut self) {
        self.scale = self.config.default_scale;
        self.show_overlay = self.config.show_overlay;
        self.notifications.clear();
    }

    fn ready_document(&self, operation: &str) -> Option<&LoadedDocument> {
        if self.is_loading() {
            debug!("Ignoring {operation} while loading");
            return None;
        }
        self.document.as_ref()
    }

    // Navigation

    /// Clamp to `[1, total_pages]`
    pub fn set_page(&mut self, page: usize) {
        let Some(document) = self.ready_document("set_page") else {
            return;
        };
        self.current_page = page.clamp(1, document.page_count().max(1));
    }

    pub fn next_page(&mut self) {
        self.set_page(self.current_page.saturating_add(1));
    }

    pub fn prev_page(&mut self) {
        self.set_page(self.current_page.saturating_sub(1));
    }

    // Zoom

    /// Clamp to `[0.5, 3.0]`; non-finite input is ignored
    pub fn set_scale(&mut self, scale: f32) {
        if self.is_loading() {
            debug!("Ignoring set_scale while loading");
            return;
        }
        if let Some(scale) = clamp_scale(scale) {
            self.scale = scale;
        }
    }

    pub fn zoom_in(&mut self) {
        self.set_scale(self.scale + SCALE_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_scale(self.scale - SCALE_STEP);
    }

    // Fields

    pub fn select_field(&mut self, id: Option<usize>) {
        self.selected_field = id;
    }

    /// Select the next (or previous) field on the current page, wrapping
    pub fn cycle_selection(&mut self, forward: bool) {
        let ids: Vec<usize> = self.fields_on_current_page().map(|f| f.id).collect();
        if ids.is_empty() {
            self.selected_field = None;
            return;
        }
        let position = self
            .selected_field
            .and_then(|id| ids.iter().position(|candidate| *candidate == id));
        let next = match (position, forward) {
            (None, true) => 0,
            (None, false) => ids.len() - 1,
            (Some(i), true) => (i + 1) % ids.len(),
            (Some(i), false) => (i + ids.len() - 1) % ids.len(),
        };
        self.selected_field = Some(ids[next]);
    }

    /// Set one record's name to the trimmed input.
    ///
    /// Editable records store the fully qualified name the document will
    /// hold after saving, so a bare partial name typed for a nested field
    /// keeps its parent prefix. Names the document would refuse are kept as
    /// typed and surface when saving.
    pub fn rename_field(&mut self, id: usize, name: &str) -> Result<(), RenameError> {
        if self.is_loading() {
            return Err(RenameError::NotReady);
        }
        let document = self.document.as_mut().ok_or(RenameError::NotReady)?;
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(RenameError::EmptyName);
        }
        let record = document
            .fields
            .get_mut(id)
            .ok_or(RenameError::UnknownField(id))?;

        let qualified = match &record.handle {
            Some(handle) => handle.qualify(trimmed).unwrap_or_else(|e| {
                debug!("Keeping {trimmed:?} as typed: {e}");
                trimmed.to_string()
            }),
            None => trimmed.to_string(),
        };
        debug!("Field #{id} renamed {:?} -> {qualified:?}", record.name);
        record.name = qualified;
        Ok(())
    }

    pub fn toggle_overlay(&mut self) {
        self.show_overlay = !self.show_overlay;
    }

    /// Records whose name differs from the one in the document
    pub fn changed_fields(&self) -> Vec<&FieldRecord> {
        self.fields().iter().filter(|f| f.is_renamed()).collect()
    }

    // Save

    /// Produce the document to hand back to the user.
    ///
    /// `None` only when no document is ready. Unchanged sessions get the
    /// original bytes; otherwise renames are written through the field
    /// handles, and any failure there falls back to the original bytes plus
    /// a rename guide.
    pub fn save(&mut self) -> Option<SaveOutcome> {
        let document = self.ready_document("save")?;
        let changed = document.fields.iter().filter(|f| f.is_renamed()).count();

        if changed == 0 {
            info!("No field changes, returning original document");
            let outcome = SaveOutcome {
                document: Artifact::original(&document.bytes),
                guide: None,
                warning: None,
                changed,
            };
            self.notifications
                .info("No field changes detected; original document kept");
            return Some(outcome);
        }

        let outcome = match save::apply_renames(document.form.as_deref(), &document.fields) {
            Ok(bytes) => SaveOutcome {
                document: Artifact::renamed(bytes),
                guide: None,
                warning: None,
                changed,
            },
            Err(failure) => {
                warn!("Save fell back to the original document: {failure}");
                SaveOutcome {
                    document: Artifact::original(&document.bytes),
                    guide: Some(Artifact::guide(modification_guide(&document.fields))),
                    warning: Some(failure),
                    changed,
                }
            }
        };

        match &outcome.warning {
            None => self
                .notifications
                .info(format!("Renamed {changed} field(s)")),
            Some(failure) => self.notifications.warn(format!(
                "Could not rename fields in the document ({failure}); wrote a guide instead"
            )),
        }
        Some(outcome)
    }

    // Accessors

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == SessionState::Loading
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    pub fn document(&self) -> Option<&LoadedDocument> {
        self.document.as_ref()
    }

    pub fn document_info(&self) -> Option<&DocumentInfo> {
        self.document.as_ref().map(|d| &d.info)
    }

    pub fn bytes(&self) -> Option<Arc<[u8]>> {
        self.document.as_ref().map(|d| Arc::clone(&d.bytes))
    }

    pub fn fields(&self) -> &[FieldRecord] {
        self.document.as_ref().map_or(&[], |d| d.fields.as_slice())
    }

    pub fn field(&self, id: usize) -> Option<&FieldRecord> {
        self.fields().get(id)
    }

    pub fn fields_on_current_page(&self) -> impl Iterator<Item = &FieldRecord> {
        crate::catalog::fields_on_page(self.fields(), self.current_page)
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.document.as_ref().map_or(0, LoadedDocument::page_count)
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn selected_field(&self) -> Option<usize> {
        self.selected_field
    }

    pub fn show_overlay(&self) -> bool {
        self.show_overlay
    }

    /// Changes whenever the loaded document is replaced or cleared
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn engine(&self) -> Arc<dyn RenderEngine> {
        Arc::clone(&self.engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> DocumentSession {
        DocumentSession::with_defaults(SessionConfig::default())
    }

    #[test]
    fn starts_empty_with_defaults() {
        let session = session();
        assert_eq!(session.state(), &SessionState::Empty);
        assert_eq!(session.current_page(), 1);
        assert_eq!(session.scale(), DEFAULT_SCALE);
        assert!(session.show_overlay());
        assert_eq!(session.total_pages(), 0);
        assert!(session.fields().is_empty());
    }

    #[test]
    fn scale_is_clamped_and_non_finite_ignored() {
        let mut session = session();
        session.set_scale(5.0);
        assert_eq!(session.scale(), MAX_SCALE);
        session.set_scale(0.1);
        assert_eq!(session.scale(), MIN_SCALE);
        session.set_scale(f32::NAN);
        assert_eq!(session.scale(), MIN_SCALE);
        session.set_scale(f32::INFINITY);
        assert_eq!(session.scale(), MIN_SCALE);
    }

    #[test]
    fn zoom_steps_stop_at_bounds() {
        let mut session = session();
        for _ in 0..20 {
            session.zoom_in();
        }
        assert_eq!(session.scale(), MAX_SCALE);
        session.zoom_out();
        assert_eq!(session.scale(), MAX_SCALE - SCALE_STEP);
    }

    #[test]
    fn rename_without_document_is_rejected() {
        let mut session = session();
        assert_eq!(session.rename_field(0, "x"), Err(RenameError::NotReady));
        assert!(session.save().is_none());
    }

    #[test]
    fn invalid_upload_moves_to_error() {
        let mut session = session();
        let err = session.load_document(Upload::pdf(b"abc".to_vec())).unwrap_err();
        assert!(matches!(err, LoadError::InvalidFormat(_)));
        assert!(matches!(session.state(), SessionState::Error(_)));
        assert!(session.document().is_none());
    }

    #[test]
    fn settings_feed_config() {
        let settings = Settings {
            max_upload_mib: 2,
            default_scale: 9.0,
            ..Settings::default()
        };
        let config = SessionConfig::from(&settings);
        assert_eq!(config.max_upload_bytes, 2 * 1024 * 1024);
        assert_eq!(config.default_scale, MAX_SCALE);
    }
}
