//! Core types for page rendering

use crate::geometry::PageViewport;

/// Rendered page raster.
///
/// The pixel dimensions are authoritative for overlay placement; they may
/// differ slightly from `viewport * scale` because of rounding in the engine.
#[derive(Clone)]
pub struct RasterSurface {
    /// Page number (1-based)
    pub page: usize,
    /// Zoom the page was rendered at
    pub scale: f32,
    /// Surface width in pixels
    pub width_px: u32,
    /// Surface height in pixels
    pub height_px: u32,
    /// Raw RGB pixel data (3 bytes per pixel)
    pub pixels: Vec<u8>,
}

impl RasterSurface {
    /// White surface with the size a raster of `viewport` at `scale` would have
    #[must_use]
    pub fn blank(page: usize, scale: f32, viewport: &PageViewport) -> Self {
        let width_px = (viewport.width * scale).round().max(1.0) as u32;
        let height_px = (viewport.height * scale).round().max(1.0) as u32;
        Self {
            page,
            scale,
            width_px,
            height_px,
            pixels: vec![0xFF; width_px as usize * height_px as usize * 3],
        }
    }

    /// Surface size as floats, for the geometry transform
    #[must_use]
    pub fn size(&self) -> (f32, f32) {
        (self.width_px as f32, self.height_px as f32)
    }

    /// True if this surface was rendered for the given page and zoom
    #[must_use]
    pub fn matches(&self, page: usize, scale: f32) -> bool {
        self.page == page && scale_key(self.scale) == scale_key(scale)
    }
}

impl std::fmt::Debug for RasterSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterSurface")
            .field("page", &self.page)
            .field("scale", &self.scale)
            .field("width_px", &self.width_px)
            .field("height_px", &self.height_px)
            .finish_non_exhaustive()
    }
}

/// Scale stored as millionths for stable hashing and comparison
#[must_use]
pub fn scale_key(scale: f32) -> u32 {
    (scale * 1_000_000.0).round() as u32
}
