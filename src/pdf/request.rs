//! Render request and response types

use std::sync::Arc;

use super::engine::EngineFault;
use super::types::RasterSurface;

/// Unique identifier for render requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// What a render was requested for; results are checked against the latest
/// target before they are applied
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderTarget {
    /// Page number (1-based)
    pub page: usize,
    pub scale: f32,
    /// Bumped on every current-page request
    pub generation: u64,
}

/// Request sent to render workers
#[derive(Debug)]
pub enum RenderRequest {
    Page { id: RequestId, target: RenderTarget },

    /// Shutdown the worker
    Shutdown,
}

/// Response from render workers
#[derive(Debug)]
pub enum RenderResponse {
    Page {
        id: RequestId,
        target: RenderTarget,
        surface: Arc<RasterSurface>,
    },

    Error {
        id: RequestId,
        target: RenderTarget,
        error: EngineFault,
    },
}

impl RenderResponse {
    pub fn target(&self) -> RenderTarget {
        match self {
            RenderResponse::Page { target, .. } | RenderResponse::Error { target, .. } => *target,
        }
    }
}
