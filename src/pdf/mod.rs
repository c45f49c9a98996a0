//! PDF rendering and structure scanning

mod cache;
mod engine;
#[cfg(feature = "pdf")]
mod mupdf_engine;
pub(crate) mod objects;
mod request;
mod service;
mod types;
mod widgets;
mod worker;

pub use cache::{CacheKey, PageCache};
pub use engine::{
    DocumentInfo, EngineFault, OutlineEngine, RenderEngine, RenderedDocument, default_engine,
    scan_document,
};
#[cfg(feature = "pdf")]
pub use mupdf_engine::MupdfEngine;
pub use request::{RenderRequest, RenderResponse, RenderTarget, RequestId};
pub use service::{RenderEvent, RenderService};
pub use types::*;
pub use widgets::WidgetScanner;

/// Render threads per document
pub const DEFAULT_WORKERS: usize = 2;

/// Rendered surfaces kept per document
pub const DEFAULT_CACHE_SIZE: usize = 8;
