//! Screen-space overlay boxes for the fields of one rendered page

use crate::catalog::{FieldRecord, FieldType, Placement};
use crate::geometry::{ScreenPoint, ScreenRect, SurfaceOffset, project};
use crate::pdf::RasterSurface;

/// One field drawn on top of the page raster
#[derive(Clone, Debug, PartialEq)]
pub struct Overlay {
    pub field_id: usize,
    pub rect: ScreenRect,
    pub label: String,
    pub field_type: FieldType,
    pub placement: Placement,
    pub selected: bool,
    pub editable: bool,
}

/// Place every record on `surface`, in catalog order.
///
/// Callers pass only the records of the page the surface was rendered for.
pub fn compute_overlays<'a>(
    fields: impl IntoIterator<Item = &'a FieldRecord>,
    surface: &RasterSurface,
    offset: SurfaceOffset,
    selected: Option<usize>,
) -> Vec<Overlay> {
    fields
        .into_iter()
        .map(|field| Overlay {
            field_id: field.id,
            rect: project(
                &field.bounds,
                field.viewport.as_ref(),
                surface.size(),
                surface.scale,
                offset,
            ),
            label: field.name.clone(),
            field_type: field.field_type,
            placement: field.placement,
            selected: selected == Some(field.id),
            editable: field.is_editable(),
        })
        .collect()
}

/// Field under `point`. Later overlays are drawn on top, so they win.
pub fn hit_test(overlays: &[Overlay], point: ScreenPoint) -> Option<usize> {
    overlays
        .iter()
        .rev()
        .find(|overlay| overlay.rect.contains(point))
        .map(|overlay| overlay.field_id)
}
