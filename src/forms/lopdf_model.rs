//! lopdf-backed document model
//!
//! Walks `/Root /AcroForm /Fields`, reports every terminal field with its
//! fully qualified name, and renames fields by rewriting their `/T` entry.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info};
use lopdf::{Document, Object, ObjectId};

use super::{DocumentModel, FieldHandle, FormDocument, ModelFault, SharedHandle};
use crate::catalog::{FieldType, StructuralFieldInfo};
use crate::pdf::objects;

const MAX_FIELD_DEPTH: usize = 32;

type SharedDocument = Arc<Mutex<Document>>;

fn lock(doc: &SharedDocument) -> MutexGuard<'_, Document> {
    doc.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Loads [`LopdfForm`]s from raw bytes
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfModel;

impl DocumentModel for LopdfModel {
    fn load(&self, bytes: &[u8]) -> Result<Box<dyn FormDocument>, ModelFault> {
        Ok(Box::new(LopdfForm::load(bytes)?))
    }
}

/// Parsed document plus the terminal fields discovered in it
pub struct LopdfForm {
    doc: SharedDocument,
    fields: Vec<StructuralFieldInfo>,
}

impl LopdfForm {
    pub fn load(bytes: &[u8]) -> Result<Self, ModelFault> {
        let document = Document::load_mem(bytes)?;
        let terminals = collect_terminal_fields(&document)?;
        info!("Document model found {} form fields", terminals.len());

        let doc = Arc::new(Mutex::new(document));
        let fields = terminals
            .into_iter()
            .map(|terminal| StructuralFieldInfo {
                name: terminal.name,
                field_type: terminal.field_type,
                handle: Arc::new(LopdfFieldHandle {
                    doc: Arc::clone(&doc),
                    field_id: terminal.id,
                    parent_prefix: terminal.parent_prefix,
                }) as SharedHandle,
            })
            .collect();

        Ok(Self { doc, fields })
    }
}

impl FormDocument for LopdfForm {
    fn fields(&self) -> Vec<StructuralFieldInfo> {
        self.fields.clone()
    }

    fn save(&self) -> Result<Vec<u8>, ModelFault> {
        let mut snapshot = lock(&self.doc).clone();
        let mut out = Vec::new();
        snapshot
            .save_to(&mut out)
            .map_err(|e| ModelFault::generic(format!("failed to serialize document: {e}")))?;
        Ok(out)
    }
}

/// Handle to one field dictionary inside a shared document
#[derive(Debug)]
pub struct LopdfFieldHandle {
    doc: SharedDocument,
    field_id: ObjectId,
    /// Qualified name of the parent field, if the field is nested
    parent_prefix: Option<String>,
}

impl LopdfFieldHandle {
    /// Partial name to store so the qualified name becomes `new_name`.
    ///
    /// A nested field keeps its parent; the parent prefix may be typed out or
    /// left off.
    fn partial_for(&self, new_name: &str) -> Result<String, ModelFault> {
        let partial = match &self.parent_prefix {
            Some(prefix) => new_name
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
                .unwrap_or(new_name),
            None => new_name,
        };

        if partial.is_empty() {
            return Err(ModelFault::InvalidName {
                name: new_name.to_string(),
                reason: "name is empty",
            });
        }
        if partial.contains('.') {
            return Err(ModelFault::InvalidName {
                name: new_name.to_string(),
                reason: "partial field names cannot contain '.'",
            });
        }
        Ok(partial.to_string())
    }
}

impl FieldHandle for LopdfFieldHandle {
    fn current_name(&self) -> Result<String, ModelFault> {
        let doc = lock(&self.doc);
        let dict = doc.get_dictionary(self.field_id)?;
        objects::qualified_name(&doc, dict)
            .ok_or_else(|| ModelFault::generic(format!("field {:?} has no name", self.field_id)))
    }

    fn qualify(&self, new_name: &str) -> Result<String, ModelFault> {
        let partial = self.partial_for(new_name)?;
        Ok(match &self.parent_prefix {
            Some(prefix) => format!("{prefix}.{partial}"),
            None => partial,
        })
    }

    fn rename(&self, new_name: &str) -> Result<(), ModelFault> {
        let partial = self.partial_for(new_name)?;
        let mut doc = lock(&self.doc);
        let dict = doc.get_dictionary_mut(self.field_id)?;
        dict.set("T", objects::encode_text_string(&partial));
        debug!("Renamed field {:?} to {partial:?}", self.field_id);
        Ok(())
    }
}

struct TerminalField {
    id: ObjectId,
    name: String,
    field_type: FieldType,
    parent_prefix: Option<String>,
}

fn collect_terminal_fields(doc: &Document) -> Result<Vec<TerminalField>, ModelFault> {
    let root = doc
        .trailer
        .get(b"Root")
        .ok()
        .and_then(|root| objects::dict(doc, root))
        .ok_or_else(|| ModelFault::generic("document has no catalog"))?;

    let Some(acro_form) = root.get(b"AcroForm").ok().and_then(|f| objects::dict(doc, f)) else {
        return Err(ModelFault::NoForm);
    };

    let mut out = Vec::new();
    if let Some(fields) = acro_form
        .get(b"Fields")
        .ok()
        .and_then(|f| objects::array(doc, f))
    {
        for field in fields {
            if let Object::Reference(id) = field {
                visit_field(doc, *id, None, 0, &mut out);
            }
        }
    }
    Ok(out)
}

fn visit_field(
    doc: &Document,
    id: ObjectId,
    prefix: Option<&str>,
    depth: usize,
    out: &mut Vec<TerminalField>,
) {
    if depth > MAX_FIELD_DEPTH {
        return;
    }
    let Ok(node) = doc.get_dictionary(id) else {
        return;
    };

    let qualified = match (prefix, objects::partial_name(doc, node)) {
        (Some(prefix), Some(partial)) => Some(format!("{prefix}.{partial}")),
        (None, Some(partial)) => Some(partial),
        (Some(prefix), None) => Some(prefix.to_string()),
        (None, None) => None,
    };

    // Kids carrying /T are child fields; kids without it are widgets of this field.
    let child_fields: Vec<ObjectId> = node
        .get(b"Kids")
        .ok()
        .and_then(|kids| objects::array(doc, kids))
        .map(|kids| {
            kids.iter()
                .filter_map(|kid| match kid {
                    Object::Reference(kid_id) => Some(*kid_id),
                    _ => None,
                })
                .filter(|kid_id| {
                    doc.get_dictionary(*kid_id)
                        .map(|kid| kid.has(b"T"))
                        .unwrap_or(false)
                })
                .collect()
        })
        .unwrap_or_default();

    if !child_fields.is_empty() {
        for kid in child_fields {
            visit_field(doc, kid, qualified.as_deref(), depth + 1, out);
        }
        return;
    }

    if let Some(name) = qualified {
        out.push(TerminalField {
            id,
            name,
            field_type: objects::field_type(doc, node),
            parent_prefix: prefix.map(str::to_string),
        });
    }
}

#[cfg(test)]
mod tests {
    use lopdf::dictionary;

    use super::*;
    use crate::test_utils::fixtures::nested_form;

    #[test]
    fn lists_terminal_fields_with_qualified_names() {
        let form = LopdfForm::load(&nested_form()).unwrap();
        let fields = form.fields();

        let names: Vec<_> = fields
            .iter()
            .map(|f| (f.name.as_str(), f.field_type))
            .collect();
        assert_eq!(
            names,
            vec![("address.city", FieldType::Text), ("agree", FieldType::Checkbox)]
        );
    }

    #[test]
    fn rename_keeps_parent_prefix() {
        let form = LopdfForm::load(&nested_form()).unwrap();
        let city = form.fields()[0].handle.clone();

        city.rename("address.town").unwrap();
        assert_eq!(city.current_name().unwrap(), "address.town");

        city.rename("village").unwrap();
        assert_eq!(city.current_name().unwrap(), "address.village");
    }

    #[test]
    fn qualify_matches_what_rename_stores() {
        let form = LopdfForm::load(&nested_form()).unwrap();
        let city = form.fields()[0].handle.clone();

        assert_eq!(city.qualify("village").unwrap(), "address.village");
        assert_eq!(city.qualify("address.town").unwrap(), "address.town");
        assert_eq!(city.current_name().unwrap(), "address.city");

        city.rename("village").unwrap();
        assert_eq!(city.current_name().unwrap(), city.qualify("village").unwrap());
    }

    #[test]
    fn rename_rejects_dotted_partial_names() {
        let form = LopdfForm::load(&nested_form()).unwrap();
        let agree = form.fields()[1].handle.clone();

        let err = agree.rename("terms.accepted").unwrap_err();
        assert!(matches!(err, ModelFault::InvalidName { .. }));
        assert_eq!(agree.current_name().unwrap(), "agree");
    }

    #[test]
    fn saved_bytes_reparse_with_new_names() {
        let form = LopdfForm::load(&nested_form()).unwrap();
        form.fields()[1].handle.rename("consent").unwrap();

        let saved = form.save().unwrap();
        let reloaded = LopdfForm::load(&saved).unwrap();
        let names: Vec<_> = reloaded.fields().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["address.city".to_string(), "consent".to_string()]);
    }

    #[test]
    fn document_without_acroform_is_reported() {
        let mut doc = Document::with_version("1.5");
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog" });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        assert!(matches!(LopdfForm::load(&bytes), Err(ModelFault::NoForm)));
    }
}
