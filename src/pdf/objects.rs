//! Small helpers for reading form-related objects out of a lopdf document

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};

use crate::catalog::FieldType;
use crate::geometry::PageViewport;

/// Upper bound on reference chains and parent walks; guards against cycles
const MAX_DEPTH: usize = 32;

// Field flags (PDF 32000-1, table 226)
const FF_RADIO: i64 = 1 << 15;
const FF_PUSHBUTTON: i64 = 1 << 16;

/// Follow indirect references until a direct object is reached
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    let mut current = obj;
    for _ in 0..MAX_DEPTH {
        match current {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(next) => current = next,
                Err(_) => return current,
            },
            _ => return current,
        }
    }
    current
}

pub(crate) fn dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    resolve(doc, obj).as_dict().ok()
}

pub(crate) fn array<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Vec<Object>> {
    resolve(doc, obj).as_array().ok()
}

pub(crate) fn number(doc: &Document, obj: &Object) -> Option<f32> {
    match resolve(doc, obj) {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value),
        _ => None,
    }
}

pub(crate) fn integer(doc: &Document, obj: &Object) -> Option<i64> {
    match resolve(doc, obj) {
        Object::Integer(value) => Some(*value),
        Object::Real(value) => Some(*value as i64),
        _ => None,
    }
}

/// Read a `[x0 y0 x1 y1]` rectangle
pub(crate) fn rect(doc: &Document, obj: &Object) -> Option<[f32; 4]> {
    let items = array(doc, obj)?;
    if items.len() != 4 {
        return None;
    }
    let mut out = [0.0f32; 4];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = number(doc, item)?;
    }
    Some(out)
}

fn parent<'a>(doc: &'a Document, node: &'a Dictionary) -> Option<&'a Dictionary> {
    node.get(b"Parent").ok().and_then(|p| dict(doc, p))
}

/// Look up a key on the node or the nearest ancestor that defines it
pub(crate) fn inherited<'a>(
    doc: &'a Document,
    node: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = Some(node);
    for _ in 0..MAX_DEPTH {
        let d = current?;
        if let Ok(value) = d.get(key) {
            return Some(resolve(doc, value));
        }
        current = parent(doc, d);
    }
    None
}

/// Decode a PDF text string (UTF-16BE with BOM, or PDFDocEncoding).
///
/// PDFDocEncoding is approximated as Latin-1, which agrees for every
/// printable ASCII byte.
pub(crate) fn text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Encode a name as a PDF text string, using UTF-16BE only when needed
pub(crate) fn encode_text_string(value: &str) -> Object {
    if value.is_ascii() {
        return Object::String(value.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// The node's own `/T` entry
pub(crate) fn partial_name(doc: &Document, node: &Dictionary) -> Option<String> {
    match node.get(b"T").ok().map(|t| resolve(doc, t)) {
        Some(Object::String(bytes, _)) => Some(text_string(bytes)),
        _ => None,
    }
}

/// Fully qualified name: partial names from the root field down, joined by `.`
pub(crate) fn qualified_name(doc: &Document, node: &Dictionary) -> Option<String> {
    let mut parts = Vec::new();
    let mut current = Some(node);
    for _ in 0..MAX_DEPTH {
        let Some(d) = current else {
            break;
        };
        if let Some(part) = partial_name(doc, d) {
            parts.push(part);
        }
        current = parent(doc, d);
    }

    if parts.is_empty() {
        return None;
    }
    parts.reverse();
    Some(parts.join("."))
}

/// Classify a field (or widget) from its inherited `/FT` and `/Ff`
pub(crate) fn field_type(doc: &Document, node: &Dictionary) -> FieldType {
    let flags = inherited(doc, node, b"Ff")
        .and_then(|f| integer(doc, f))
        .unwrap_or(0);

    match inherited(doc, node, b"FT") {
        Some(Object::Name(kind)) => match kind.as_slice() {
            b"Tx" => FieldType::Text,
            b"Ch" => FieldType::Dropdown,
            b"Btn" if flags & FF_PUSHBUTTON != 0 => FieldType::Unknown,
            b"Btn" if flags & FF_RADIO != 0 => FieldType::RadioGroup,
            b"Btn" => FieldType::Checkbox,
            _ => FieldType::Unknown,
        },
        _ => FieldType::Unknown,
    }
}

pub(crate) fn is_name(obj: &Object, expected: &[u8]) -> bool {
    matches!(obj, Object::Name(name) if name.as_slice() == expected)
}

/// Page MediaBox as `[x0, y0, x1, y1]`, inherited through the page tree
pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> Option<[f32; 4]> {
    let page = doc.get_dictionary(page_id).ok()?;
    let value = inherited(doc, page, b"MediaBox")?;
    rect(doc, value)
}

fn normalized([x0, y0, x1, y1]: [f32; 4]) -> [f32; 4] {
    [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)]
}

/// Visible page area: CropBox clipped to the MediaBox, normalized.
///
/// Falls back to the MediaBox when there is no CropBox or the two do not
/// overlap. Rasterizers show exactly this box.
pub(crate) fn view_box(doc: &Document, page_id: ObjectId) -> Option<[f32; 4]> {
    let media = normalized(media_box(doc, page_id)?);
    let crop = doc
        .get_dictionary(page_id)
        .ok()
        .and_then(|page| inherited(doc, page, b"CropBox"))
        .and_then(|value| rect(doc, value))
        .map(normalized);

    let Some(crop) = crop else {
        return Some(media);
    };
    let clipped = [
        crop[0].max(media[0]),
        crop[1].max(media[1]),
        crop[2].min(media[2]),
        crop[3].min(media[3]),
    ];
    if clipped[2] > clipped[0] && clipped[3] > clipped[1] {
        Some(clipped)
    } else {
        Some(media)
    }
}

/// Viewport for a page at scale 1.0; Letter when no usable box is present
pub(crate) fn page_viewport(doc: &Document, page_id: ObjectId) -> PageViewport {
    view_box(doc, page_id)
        .map(|[x0, y0, x1, y1]| PageViewport::new(x1 - x0, y1 - y0))
        .filter(PageViewport::is_usable)
        .unwrap_or(PageViewport::LETTER)
}
