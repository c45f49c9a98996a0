//! Rendering engine abstraction
//!
//! The engine turns raw bytes into page geometry, widget annotations and
//! raster surfaces. Opened documents are not required to be `Send`; every
//! thread that needs one opens its own from the shared bytes.

use std::sync::Arc;

use log::debug;

use super::types::RasterSurface;
use super::widgets::WidgetScanner;
use crate::catalog::AnnotationInfo;
use crate::geometry::PageViewport;

/// Errors from the rendering engine
#[derive(Debug, thiserror::Error)]
pub enum EngineFault {
    #[cfg(feature = "pdf")]
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error("PDF structure: {0}")]
    Structure(#[from] lopdf::Error),

    #[error("page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },

    #[error("{detail}")]
    Generic { detail: String },
}

impl EngineFault {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Factory for [`RenderedDocument`]s
pub trait RenderEngine: Send + Sync {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn RenderedDocument>, EngineFault>;
}

/// An opened document; pages are 1-based
pub trait RenderedDocument {
    fn page_count(&self) -> usize;

    /// Page size in points at scale 1.0
    fn viewport(&self, page: usize) -> Result<PageViewport, EngineFault>;

    /// Widget annotations placed on the page
    fn annotations(&self, page: usize) -> Result<Vec<AnnotationInfo>, EngineFault>;

    /// Rasterize the page at the given zoom
    fn render(&self, page: usize, scale: f32) -> Result<RasterSurface, EngineFault>;
}

/// Page geometry and widgets gathered once per load
#[derive(Clone, Debug, Default)]
pub struct DocumentInfo {
    pub page_count: usize,
    /// Viewport of page `n` lives at index `n - 1`
    pub viewports: Vec<PageViewport>,
    pub annotations: Vec<AnnotationInfo>,
}

impl DocumentInfo {
    pub fn viewport(&self, page: usize) -> Option<PageViewport> {
        page.checked_sub(1).and_then(|i| self.viewports.get(i)).copied()
    }
}

/// Walk every page once, collecting viewports and widget annotations
pub fn scan_document(doc: &dyn RenderedDocument) -> Result<DocumentInfo, EngineFault> {
    let page_count = doc.page_count();
    if page_count == 0 {
        return Err(EngineFault::generic("document has no pages"));
    }

    let mut viewports = Vec::with_capacity(page_count);
    let mut annotations = Vec::new();
    for page in 1..=page_count {
        viewports.push(doc.viewport(page)?);
        let widgets = doc.annotations(page)?;
        debug!("Page {page}: {} widget annotations", widgets.len());
        annotations.extend(widgets);
    }

    Ok(DocumentInfo {
        page_count,
        viewports,
        annotations,
    })
}

pub(crate) fn check_page(page: usize, count: usize) -> Result<usize, EngineFault> {
    if page == 0 || page > count {
        Err(EngineFault::PageOutOfRange { page, count })
    } else {
        Ok(page - 1)
    }
}

/// Engine that reads structure with lopdf and renders blank page surfaces.
///
/// Used when the crate is built without MuPDF; overlays still line up because
/// surfaces have the exact size a real raster would have.
#[derive(Debug, Default, Clone, Copy)]
pub struct OutlineEngine;

impl RenderEngine for OutlineEngine {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn RenderedDocument>, EngineFault> {
        Ok(Box::new(OutlineDocument {
            widgets: WidgetScanner::load(bytes)?,
        }))
    }
}

struct OutlineDocument {
    widgets: WidgetScanner,
}

impl RenderedDocument for OutlineDocument {
    fn page_count(&self) -> usize {
        self.widgets.page_count()
    }

    fn viewport(&self, page: usize) -> Result<PageViewport, EngineFault> {
        self.widgets.viewport(page)
    }

    fn annotations(&self, page: usize) -> Result<Vec<AnnotationInfo>, EngineFault> {
        self.widgets.annotations(page)
    }

    fn render(&self, page: usize, scale: f32) -> Result<RasterSurface, EngineFault> {
        let viewport = self.widgets.viewport(page)?;
        Ok(RasterSurface::blank(page, scale, &viewport))
    }
}

/// Engine used by the application: MuPDF when available
pub fn default_engine() -> Arc<dyn RenderEngine> {
    #[cfg(feature = "pdf")]
    {
        Arc::new(super::mupdf_engine::MupdfEngine)
    }
    #[cfg(not(feature = "pdf"))]
    {
        Arc::new(OutlineEngine)
    }
}
