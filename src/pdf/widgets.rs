//! Widget annotation scanning with lopdf
//!
//! Reads each page's `/Annots`, keeps `/Widget` annotations that resolve to a
//! named field, and reports their rectangles relative to the origin of the
//! visible page area (CropBox within MediaBox) together with the page viewport.

use log::trace;
use lopdf::{Document, ObjectId};

use super::engine::{EngineFault, check_page};
use super::objects;
use crate::catalog::AnnotationInfo;
use crate::geometry::PageViewport;

pub struct WidgetScanner {
    doc: Document,
    pages: Vec<ObjectId>,
}

impl WidgetScanner {
    pub fn load(bytes: &[u8]) -> Result<Self, EngineFault> {
        let doc = Document::load_mem(bytes)?;
        Ok(Self::from_document(doc))
    }

    pub fn from_document(doc: Document) -> Self {
        let pages = doc.get_pages().into_values().collect();
        Self { doc, pages }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_id(&self, page: usize) -> Result<ObjectId, EngineFault> {
        let index = check_page(page, self.pages.len())?;
        Ok(self.pages[index])
    }

    pub fn viewport(&self, page: usize) -> Result<PageViewport, EngineFault> {
        let page_id = self.page_id(page)?;
        Ok(objects::page_viewport(&self.doc, page_id))
    }

    pub fn annotations(&self, page: usize) -> Result<Vec<AnnotationInfo>, EngineFault> {
        let page_id = self.page_id(page)?;
        let doc = &self.doc;
        let viewport = objects::page_viewport(doc, page_id);
        let (origin_x, origin_y) = objects::view_box(doc, page_id)
            .map(|[x0, y0, ..]| (x0, y0))
            .unwrap_or((0.0, 0.0));

        let page_dict = doc.get_dictionary(page_id)?;
        let Some(annots) = page_dict
            .get(b"Annots")
            .ok()
            .and_then(|a| objects::array(doc, a))
        else {
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        for annot in annots {
            let Some(widget) = objects::dict(doc, annot) else {
                continue;
            };
            let is_widget = widget
                .get(b"Subtype")
                .map(|s| objects::is_name(objects::resolve(doc, s), b"Widget"))
                .unwrap_or(false);
            if !is_widget {
                continue;
            }

            let Some(name) = objects::qualified_name(doc, widget) else {
                trace!("Skipping unnamed widget on page {page}");
                continue;
            };
            let Some([x0, y0, x1, y1]) = widget.get(b"Rect").ok().and_then(|r| objects::rect(doc, r))
            else {
                trace!("Skipping widget {name:?} without /Rect");
                continue;
            };

            out.push(AnnotationInfo {
                name,
                rect: [x0 - origin_x, y0 - origin_y, x1 - origin_x, y1 - origin_y],
                page,
                type_hint: objects::field_type(doc, widget),
                viewport,
            });
        }

        Ok(out)
    }
}
