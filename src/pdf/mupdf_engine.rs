//! MuPDF-backed rendering engine
//!
//! MuPDF rasterizes pages. Widget annotations and viewports come from the
//! lopdf scanner so that rectangles and page sizes share one coordinate basis.

use mupdf::{Colorspace, Document, Matrix, Pixmap};

use super::engine::{EngineFault, RenderEngine, RenderedDocument, check_page};
use super::types::RasterSurface;
use super::widgets::WidgetScanner;
use crate::catalog::AnnotationInfo;
use crate::geometry::PageViewport;

const PDF_MAGIC: &str = "application/pdf";

#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfEngine;

impl RenderEngine for MupdfEngine {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn RenderedDocument>, EngineFault> {
        let doc = Document::from_bytes(bytes, PDF_MAGIC)?;
        let page_count = usize::try_from(doc.page_count()?).unwrap_or(0);
        let widgets = WidgetScanner::load(bytes)?;
        Ok(Box::new(MupdfDocument {
            doc,
            page_count,
            widgets,
        }))
    }
}

struct MupdfDocument {
    doc: Document,
    page_count: usize,
    widgets: WidgetScanner,
}

impl RenderedDocument for MupdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn viewport(&self, page: usize) -> Result<PageViewport, EngineFault> {
        self.widgets.viewport(page)
    }

    fn annotations(&self, page: usize) -> Result<Vec<AnnotationInfo>, EngineFault> {
        self.widgets.annotations(page)
    }

    fn render(&self, page: usize, scale: f32) -> Result<RasterSurface, EngineFault> {
        let index = check_page(page, self.page_count)?;
        let mupdf_page = self.doc.load_page(index as i32)?;

        let transform = Matrix::new_scale(scale, scale);
        let rgb = Colorspace::device_rgb();
        let pixmap = mupdf_page.to_pixmap(&transform, &rgb, false, true)?;

        Ok(RasterSurface {
            page,
            scale,
            width_px: pixmap.width(),
            height_px: pixmap.height(),
            pixels: pixmap_to_rgb(&pixmap)?,
        })
    }
}

fn pixmap_to_rgb(pixmap: &Pixmap) -> Result<Vec<u8>, EngineFault> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(EngineFault::generic(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    let expected_min = stride.saturating_mul(height);
    if samples.len() < expected_min || row_bytes > stride {
        return Err(EngineFault::generic("Pixmap buffer size mismatch"));
    }

    let mut out = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row_start = y * stride;
        let row = &samples[row_start..row_start + row_bytes];
        if n == 3 {
            out.extend_from_slice(row);
        } else {
            for px in row.chunks_exact(n) {
                out.extend_from_slice(&px[..3]);
            }
        }
    }

    Ok(out)
}
