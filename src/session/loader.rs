//! Background document loading
//!
//! The engine scan and the structural parse run on one loader thread. The
//! result travels back over a flume channel and is committed by the session
//! in a single assignment.

use std::sync::Arc;

use flume::Receiver;
use log::{debug, info, warn};

use super::LoadError;
use crate::catalog::{FieldRecord, build_catalog};
use crate::forms::{DocumentModel, FormDocument, ModelFault};
use crate::pdf::{DocumentInfo, RenderEngine, scan_document};

/// Everything a successful load produces
pub struct LoadedDocument {
    pub bytes: Arc<[u8]>,
    pub file_name: Option<String>,
    pub info: DocumentInfo,
    pub(crate) form: Option<Box<dyn FormDocument>>,
    pub fields: Vec<FieldRecord>,
    /// Set when the structural parse failed and the catalog is annotation-only
    pub parse_failure: Option<String>,
}

impl LoadedDocument {
    pub fn page_count(&self) -> usize {
        self.info.page_count
    }

    pub fn has_form(&self) -> bool {
        self.form.is_some()
    }
}

impl std::fmt::Debug for LoadedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedDocument")
            .field("bytes", &self.bytes.len())
            .field("file_name", &self.file_name)
            .field("pages", &self.info.page_count)
            .field("fields", &self.fields.len())
            .field("has_form", &self.form.is_some())
            .finish_non_exhaustive()
    }
}

pub(crate) type LoadResult = Result<LoadedDocument, LoadError>;

/// A load running on the loader thread
pub(crate) struct PendingLoad {
    pub(crate) rx: Receiver<LoadResult>,
}

pub(crate) fn spawn_load(
    engine: Arc<dyn RenderEngine>,
    model: Arc<dyn DocumentModel>,
    bytes: Arc<[u8]>,
    file_name: Option<String>,
) -> PendingLoad {
    let (tx, rx) = flume::bounded(1);
    std::thread::spawn(move || {
        let result = load_blocking(engine.as_ref(), model.as_ref(), bytes, file_name);
        if tx.send(result).is_err() {
            debug!("Load finished after the session stopped waiting");
        }
    });
    PendingLoad { rx }
}

/// Engine scan first; any failure there aborts the load. A failed
/// structural parse degrades the catalog instead.
pub(crate) fn load_blocking(
    engine: &dyn RenderEngine,
    model: &dyn DocumentModel,
    bytes: Arc<[u8]>,
    file_name: Option<String>,
) -> LoadResult {
    let info = {
        let rendered = engine
            .open(&bytes)
            .map_err(|e| LoadError::RenderFailure(e.to_string()))?;
        scan_document(rendered.as_ref()).map_err(|e| LoadError::RenderFailure(e.to_string()))?
    };
    info!(
        "Engine reports {} pages and {} widgets",
        info.page_count,
        info.annotations.len()
    );

    let (form, parse_failure) = match model.load(&bytes) {
        Ok(form) => (Some(form), None),
        Err(ModelFault::NoForm) => {
            debug!("Document has no AcroForm; catalog is annotation-only");
            (None, None)
        }
        Err(e) => {
            warn!("Structural parse failed, falling back to annotations: {e}");
            (None, Some(e.to_string()))
        }
    };

    let structural = form.as_ref().map(|f| f.fields()).unwrap_or_default();
    let mut fields = build_catalog(&info.annotations, &structural);
    for record in &mut fields {
        record.page = record.page.clamp(1, info.page_count);
    }

    Ok(LoadedDocument {
        bytes,
        file_name,
        info,
        form,
        fields,
        parse_failure,
    })
}
