//! Field catalog: reconciles structural form fields with widget geometry
//!
//! Two independent passes describe the same fields. The document model lists
//! structural fields (name, type, a handle for renaming) and the rendering
//! engine lists widget annotations per page (name, rectangle, viewport). The
//! catalog merges them by name into one page-indexed list of [`FieldRecord`]s.

use std::collections::HashMap;
use std::fmt;

use log::{debug, warn};

use crate::forms::SharedHandle;
use crate::geometry::{FieldBounds, PageViewport};

/// Closed set of field kinds shown in the UI
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum FieldType {
    Text,
    Checkbox,
    RadioGroup,
    Dropdown,
    #[default]
    Unknown,
}

impl FieldType {
    pub fn display_name(&self) -> &'static str {
        match self {
            FieldType::Text => "Text Field",
            FieldType::Checkbox => "Checkbox",
            FieldType::RadioGroup => "Radio Button",
            FieldType::Dropdown => "Dropdown",
            FieldType::Unknown => "Unknown",
        }
    }

    /// Single-cell marker used by the terminal front end
    pub fn marker(&self) -> char {
        match self {
            FieldType::Text => 'T',
            FieldType::Checkbox => 'X',
            FieldType::RadioGroup => 'O',
            FieldType::Dropdown => 'V',
            FieldType::Unknown => '?',
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Widget annotation reported by the rendering engine for one page
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationInfo {
    /// Fully qualified field name
    pub name: String,
    /// Raw `[x0, y0, x1, y1]` rectangle relative to the page origin
    pub rect: [f32; 4],
    /// 1-based page number
    pub page: usize,
    pub type_hint: FieldType,
    pub viewport: PageViewport,
}

/// Structural field reported by the document model
#[derive(Clone, Debug)]
pub struct StructuralFieldInfo {
    pub name: String,
    pub field_type: FieldType,
    pub handle: SharedHandle,
}

/// How a record's geometry was resolved
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Paired with a widget of the same name
    Matched,
    /// Paired, but several structural fields share the name and the widget
    /// count does not line up, so the geometry may belong to a sibling
    Ambiguous,
    /// No widget found; placed on a default grid
    Synthesized,
    /// Built from a widget alone because no structural fields were available
    AnnotationOnly,
}

/// One reconciled form field
#[derive(Clone, Debug)]
pub struct FieldRecord {
    /// 0-based position in the catalog; the only stable identity
    pub id: usize,
    pub name: String,
    pub original_name: String,
    pub field_type: FieldType,
    pub bounds: FieldBounds,
    /// 1-based page number
    pub page: usize,
    /// `None` for synthesized placements, which forces the fallback transform
    pub viewport: Option<PageViewport>,
    /// `None` when there is no structural counterpart; such records are read-only
    pub handle: Option<SharedHandle>,
    pub placement: Placement,
}

impl FieldRecord {
    pub fn is_renamed(&self) -> bool {
        self.name != self.original_name
    }

    pub fn is_editable(&self) -> bool {
        self.handle.is_some()
    }
}

// Synthesized placement grid, in points
const GRID_COLUMNS: usize = 3;
const GRID_LEFT: f32 = 36.0;
const GRID_TOP: f32 = 720.0;
const GRID_COLUMN_WIDTH: f32 = 180.0;
const GRID_ROW_HEIGHT: f32 = 36.0;
const GRID_FIELD_WIDTH: f32 = 160.0;
const GRID_FIELD_HEIGHT: f32 = 24.0;

/// Deterministic, non-overlapping default placement for the n-th of `total`
/// unplaced fields.
///
/// Rows sit 36 points apart while they fit between the grid top and the page
/// bottom; longer lists squeeze the row pitch and box height together so the
/// boxes never overlap.
pub fn synthesized_bounds(index: usize, total: usize) -> FieldBounds {
    let rows = total.max(index + 1).div_ceil(GRID_COLUMNS);
    let pitch = GRID_ROW_HEIGHT.min(GRID_TOP / rows as f32);
    let height = GRID_FIELD_HEIGHT * pitch / GRID_ROW_HEIGHT;

    let column = index % GRID_COLUMNS;
    let row = index / GRID_COLUMNS;
    FieldBounds::new(
        GRID_LEFT + column as f32 * GRID_COLUMN_WIDTH,
        (GRID_TOP - (row + 1) as f32 * pitch).max(0.0),
        GRID_FIELD_WIDTH,
        height,
    )
}

/// Reconcile widget annotations with structural fields.
///
/// The structural list drives the order and carries the mutation handles.
/// The k-th structural field named N is paired with the k-th widget named N in
/// page order. Record ids are 0-based indices in the resulting order, which is
/// fully determined by the inputs.
pub fn build_catalog(
    annotations: &[AnnotationInfo],
    structural: &[StructuralFieldInfo],
) -> Vec<FieldRecord> {
    if structural.is_empty() {
        debug!(
            "No structural fields, building catalog from {} widgets",
            annotations.len()
        );
        return annotation_only(annotations);
    }

    let mut ordered: Vec<&AnnotationInfo> = annotations.iter().collect();
    ordered.sort_by_key(|a| a.page);

    let mut widgets_by_name: HashMap<&str, Vec<&AnnotationInfo>> = HashMap::new();
    for annotation in ordered {
        widgets_by_name
            .entry(annotation.name.as_str())
            .or_default()
            .push(annotation);
    }

    let mut fields_per_name: HashMap<&str, usize> = HashMap::new();
    for field in structural {
        *fields_per_name.entry(field.name.as_str()).or_default() += 1;
    }

    let unplaced = structural
        .iter()
        .filter(|field| !widgets_by_name.contains_key(field.name.as_str()))
        .count();

    let mut seen_per_name: HashMap<&str, usize> = HashMap::new();
    let mut synthesized = 0usize;
    let mut records = Vec::with_capacity(structural.len());

    for (id, field) in structural.iter().enumerate() {
        let name = field.name.as_str();
        let ordinal = {
            let seen = seen_per_name.entry(name).or_default();
            let current = *seen;
            *seen += 1;
            current
        };

        let widget = widgets_by_name
            .get(name)
            .and_then(|widgets| widgets.get(ordinal).or_else(|| widgets.first()).copied());

        let record = match widget {
            Some(widget) => {
                let field_count = fields_per_name.get(name).copied().unwrap_or(1);
                let widget_count = widgets_by_name.get(name).map_or(0, Vec::len);
                let placement = if field_count > 1 && field_count != widget_count {
                    warn!(
                        "Field name {name:?} is shared by {field_count} fields and {widget_count} widgets; placement of #{id} is a guess"
                    );
                    Placement::Ambiguous
                } else {
                    Placement::Matched
                };

                FieldRecord {
                    id,
                    name: field.name.clone(),
                    original_name: field.name.clone(),
                    field_type: resolve_type(field.field_type, widget.type_hint),
                    bounds: FieldBounds::from_rect(widget.rect),
                    page: widget.page,
                    viewport: Some(widget.viewport),
                    handle: Some(field.handle.clone()),
                    placement,
                }
            }
            None => {
                debug!("Field {name:?} has no widget, synthesizing placement");
                let bounds = synthesized_bounds(synthesized, unplaced);
                synthesized += 1;
                FieldRecord {
                    id,
                    name: field.name.clone(),
                    original_name: field.name.clone(),
                    field_type: field.field_type,
                    bounds,
                    page: 1,
                    viewport: None,
                    handle: Some(field.handle.clone()),
                    placement: Placement::Synthesized,
                }
            }
        };

        records.push(record);
    }

    records
}

fn annotation_only(annotations: &[AnnotationInfo]) -> Vec<FieldRecord> {
    annotations
        .iter()
        .enumerate()
        .map(|(id, annotation)| FieldRecord {
            id,
            name: annotation.name.clone(),
            original_name: annotation.name.clone(),
            field_type: annotation.type_hint,
            bounds: FieldBounds::from_rect(annotation.rect),
            page: annotation.page,
            viewport: Some(annotation.viewport),
            handle: None,
            placement: Placement::AnnotationOnly,
        })
        .collect()
}

fn resolve_type(structural: FieldType, hint: FieldType) -> FieldType {
    if structural == FieldType::Unknown {
        hint
    } else {
        structural
    }
}

/// Records that belong to the given 1-based page
pub fn fields_on_page(fields: &[FieldRecord], page: usize) -> impl Iterator<Item = &FieldRecord> {
    fields.iter().filter(move |field| field.page == page)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::forms::{FieldHandle, ModelFault};

    #[derive(Debug)]
    struct NullHandle;

    impl FieldHandle for NullHandle {
        fn current_name(&self) -> Result<String, ModelFault> {
            Ok(String::new())
        }

        fn rename(&self, _new_name: &str) -> Result<(), ModelFault> {
            Ok(())
        }
    }

    fn structural(name: &str, field_type: FieldType) -> StructuralFieldInfo {
        StructuralFieldInfo {
            name: name.to_string(),
            field_type,
            handle: Arc::new(NullHandle),
        }
    }

    fn widget(name: &str, page: usize, rect: [f32; 4]) -> AnnotationInfo {
        AnnotationInfo {
            name: name.to_string(),
            rect,
            page,
            type_hint: FieldType::Text,
            viewport: PageViewport::new(600.0, 800.0),
        }
    }

    #[test]
    fn matches_by_exact_name() {
        let records = build_catalog(
            &[widget("name_field", 1, [100.0, 500.0, 300.0, 530.0])],
            &[structural("name_field", FieldType::Text)],
        );

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id, 0);
        assert_eq!(record.bounds, FieldBounds::new(100.0, 500.0, 200.0, 30.0));
        assert_eq!(record.page, 1);
        assert_eq!(record.placement, Placement::Matched);
        assert!(record.is_editable());
    }

    #[test]
    fn structural_order_drives_ids() {
        let records = build_catalog(
            &[
                widget("b", 2, [0.0, 0.0, 10.0, 10.0]),
                widget("a", 1, [0.0, 0.0, 10.0, 10.0]),
            ],
            &[
                structural("b", FieldType::Text),
                structural("a", FieldType::Checkbox),
            ],
        );

        let names: Vec<_> = records.iter().map(|r| (r.id, r.name.as_str(), r.page)).collect();
        assert_eq!(names, vec![(0, "b", 2), (1, "a", 1)]);
    }

    #[test]
    fn unmatched_fields_get_distinct_grid_slots() {
        for count in [4, 60, 70, 200] {
            let fields: Vec<_> = (0..count)
                .map(|i| structural(&format!("f{i}"), FieldType::Text))
                .collect();
            let records = build_catalog(&[], &fields);

            assert!(records.iter().all(|r| r.placement == Placement::Synthesized));
            assert!(records.iter().all(|r| r.viewport.is_none() && r.page == 1));
            assert!(records.iter().all(|r| r.bounds.y >= 0.0 && r.bounds.height > 0.0));
            for (i, a) in records.iter().enumerate() {
                for b in &records[i + 1..] {
                    let overlap_x = a.bounds.x < b.bounds.x + b.bounds.width
                        && b.bounds.x < a.bounds.x + a.bounds.width;
                    let overlap_y = a.bounds.y < b.bounds.top() && b.bounds.y < a.bounds.top();
                    assert!(!(overlap_x && overlap_y), "{} overlaps {}", a.name, b.name);
                }
            }
        }
    }

    #[test]
    fn short_lists_keep_the_standard_grid() {
        assert_eq!(synthesized_bounds(0, 4), FieldBounds::new(36.0, 684.0, 160.0, 24.0));
        assert_eq!(synthesized_bounds(4, 5), FieldBounds::new(216.0, 648.0, 160.0, 24.0));
    }

    #[test]
    fn empty_structural_list_builds_read_only_records() {
        let records = build_catalog(
            &[
                widget("first", 1, [0.0, 0.0, 10.0, 10.0]),
                widget("second", 2, [5.0, 5.0, 15.0, 25.0]),
            ],
            &[],
        );

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| !r.is_editable()));
        assert!(records.iter().all(|r| r.placement == Placement::AnnotationOnly));
        assert_eq!(records[1].bounds, FieldBounds::new(5.0, 5.0, 10.0, 20.0));
    }

    #[test]
    fn duplicate_names_pair_in_page_order() {
        let records = build_catalog(
            &[
                widget("dup", 2, [0.0, 0.0, 20.0, 20.0]),
                widget("dup", 1, [0.0, 0.0, 10.0, 10.0]),
            ],
            &[
                structural("dup", FieldType::Text),
                structural("dup", FieldType::Text),
            ],
        );

        assert_eq!(records[0].page, 1);
        assert_eq!(records[1].page, 2);
        assert!(records.iter().all(|r| r.placement == Placement::Matched));
    }

    #[test]
    fn duplicate_names_with_missing_widgets_are_ambiguous() {
        let records = build_catalog(
            &[widget("dup", 1, [0.0, 0.0, 10.0, 10.0])],
            &[
                structural("dup", FieldType::Text),
                structural("dup", FieldType::Text),
            ],
        );

        assert!(records.iter().all(|r| r.placement == Placement::Ambiguous));
    }

    #[test]
    fn radio_group_with_many_widgets_uses_first_widget() {
        let records = build_catalog(
            &[
                widget("choice", 1, [10.0, 10.0, 20.0, 20.0]),
                widget("choice", 1, [30.0, 10.0, 40.0, 20.0]),
            ],
            &[structural("choice", FieldType::RadioGroup)],
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].placement, Placement::Matched);
        assert_eq!(records[0].bounds.x, 10.0);
    }

    #[test]
    fn unknown_structural_type_takes_widget_hint() {
        let mut annotation = widget("sig", 1, [0.0, 0.0, 1.0, 1.0]);
        annotation.type_hint = FieldType::Checkbox;
        let records = build_catalog(&[annotation], &[structural("sig", FieldType::Unknown)]);
        assert_eq!(records[0].field_type, FieldType::Checkbox);
    }
}
