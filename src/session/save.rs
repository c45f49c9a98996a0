//! Persisting renames: artifacts, the rename pass and the fallback guide

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::catalog::FieldRecord;
use crate::forms::{FormDocument, ModelFault, SharedHandle};

pub const ORIGINAL_FILE_NAME: &str = "original-form.pdf";
pub const RENAMED_FILE_NAME: &str = "renamed-form.pdf";
pub const GUIDE_FILE_NAME: &str = "field-modification-guide.txt";

/// Why renames could not be written into the document
#[derive(Debug, thiserror::Error)]
pub enum SaveFailure {
    #[error("the document's form structure could not be parsed")]
    NoFormDocument,

    #[error("field {name:?} has no structural counterpart and cannot be renamed")]
    NotEditable { name: String },

    #[error("renaming {name:?} failed: {source}")]
    Rename {
        name: String,
        #[source]
        source: ModelFault,
    },

    #[error("serializing the renamed document failed: {0}")]
    Serialize(#[source] ModelFault),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Input bytes, untouched
    Original,
    /// Document with field names rewritten
    Renamed,
    /// Plain-text instructions for renaming by hand
    Guide,
}

/// A file ready to be written out
#[derive(Clone, Debug)]
pub struct Artifact {
    pub file_name: &'static str,
    pub kind: ArtifactKind,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn original(bytes: &[u8]) -> Self {
        Self {
            file_name: ORIGINAL_FILE_NAME,
            kind: ArtifactKind::Original,
            bytes: bytes.to_vec(),
        }
    }

    pub fn renamed(bytes: Vec<u8>) -> Self {
        Self {
            file_name: RENAMED_FILE_NAME,
            kind: ArtifactKind::Renamed,
            bytes,
        }
    }

    pub fn guide(text: String) -> Self {
        Self {
            file_name: GUIDE_FILE_NAME,
            kind: ArtifactKind::Guide,
            bytes: text.into_bytes(),
        }
    }
}

/// What `save` produced. Never an error: failures degrade to the original
/// bytes plus a guide.
#[derive(Debug)]
pub struct SaveOutcome {
    pub document: Artifact,
    pub guide: Option<Artifact>,
    pub warning: Option<SaveFailure>,
    /// Number of records whose name differs from the original
    pub changed: usize,
}

impl SaveOutcome {
    pub fn is_renamed(&self) -> bool {
        self.document.kind == ArtifactKind::Renamed
    }

    /// Write every artifact into `dir`, returning the written paths
    pub fn write_to(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::new();
        for artifact in std::iter::once(&self.document).chain(self.guide.as_ref()) {
            let path = dir.join(artifact.file_name);
            fs::write(&path, &artifact.bytes)?;
            debug!("Wrote {} bytes to {path:?}", artifact.bytes.len());
            written.push(path);
        }
        Ok(written)
    }
}

/// Push every record's desired name through its handle, then serialize.
///
/// Records whose stored name already matches are left alone, so a rename
/// reverted in the UI is also reverted in the document. If any rename or the
/// serialization fails, the renames applied so far are undone and the form
/// document is left as it was.
pub(crate) fn apply_renames(
    form: Option<&dyn FormDocument>,
    fields: &[FieldRecord],
) -> Result<Vec<u8>, SaveFailure> {
    let form = form.ok_or(SaveFailure::NoFormDocument)?;

    let mut applied: Vec<(&SharedHandle, String)> = Vec::new();
    let result = rename_all(fields, &mut applied)
        .and_then(|()| form.save().map_err(SaveFailure::Serialize));

    if result.is_err() {
        roll_back(applied);
    }
    result
}

fn rename_all<'a>(
    fields: &'a [FieldRecord],
    applied: &mut Vec<(&'a SharedHandle, String)>,
) -> Result<(), SaveFailure> {
    for record in fields {
        let Some(handle) = &record.handle else {
            if record.is_renamed() {
                return Err(SaveFailure::NotEditable {
                    name: record.original_name.clone(),
                });
            }
            continue;
        };

        let stored = handle.current_name().map_err(|source| SaveFailure::Rename {
            name: record.original_name.clone(),
            source,
        })?;
        if stored == record.name {
            continue;
        }

        handle
            .rename(&record.name)
            .map_err(|source| SaveFailure::Rename {
                name: record.original_name.clone(),
                source,
            })?;
        info!("Renamed field {stored:?} to {:?}", record.name);
        applied.push((handle, stored));
    }
    Ok(())
}

fn roll_back(applied: Vec<(&SharedHandle, String)>) {
    for (handle, previous) in applied.into_iter().rev() {
        match handle.rename(&previous) {
            Ok(()) => debug!("Restored field name {previous:?}"),
            Err(e) => warn!("Could not restore field name {previous:?}: {e}"),
        }
    }
}

/// Plain-text instructions for renaming the changed fields by hand
pub fn modification_guide(fields: &[FieldRecord]) -> String {
    let changed: Vec<&FieldRecord> = fields.iter().filter(|f| f.is_renamed()).collect();
    let mut out = String::new();

    let _ = writeln!(out, "PDF Field Name Modification Guide");
    let _ = writeln!(out, "=================================");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{} field(s) need to be renamed by hand. The unchanged document was saved as {ORIGINAL_FILE_NAME}.",
        changed.len()
    );
    let _ = writeln!(out);

    for (index, field) in changed.iter().enumerate() {
        let b = &field.bounds;
        let _ = writeln!(
            out,
            "{}. \"{}\" -> \"{}\"",
            index + 1,
            field.original_name,
            field.name
        );
        let _ = writeln!(out, "   Type: {}", field.field_type);
        let _ = writeln!(out, "   Page: {}", field.page);
        let _ = writeln!(out, "   Position: ({}, {})", b.x, b.y);
        let _ = writeln!(out, "   Size: {} x {}", b.width, b.height);
        let _ = writeln!(out);
    }

    let _ = writeln!(
        out,
        "Open the original in a PDF form editor, open each field's properties and change its name as listed."
    );
    out
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::catalog::{FieldType, Placement, StructuralFieldInfo};
    use crate::forms::FieldHandle;
    use crate::geometry::FieldBounds;

    #[derive(Debug)]
    struct RecordingHandle {
        name: Mutex<String>,
        renames: Arc<Mutex<Vec<String>>>,
    }

    impl FieldHandle for RecordingHandle {
        fn current_name(&self) -> Result<String, ModelFault> {
            Ok(self.name.lock().unwrap().clone())
        }

        fn rename(&self, new_name: &str) -> Result<(), ModelFault> {
            *self.name.lock().unwrap() = new_name.to_string();
            self.renames.lock().unwrap().push(new_name.to_string());
            Ok(())
        }
    }

    struct StubForm;

    impl FormDocument for StubForm {
        fn fields(&self) -> Vec<StructuralFieldInfo> {
            vec![]
        }

        fn save(&self) -> Result<Vec<u8>, ModelFault> {
            Ok(b"%PDF-renamed".to_vec())
        }
    }

    struct BrokenForm;

    impl FormDocument for BrokenForm {
        fn fields(&self) -> Vec<StructuralFieldInfo> {
            vec![]
        }

        fn save(&self) -> Result<Vec<u8>, ModelFault> {
            Err(ModelFault::generic("disk full"))
        }
    }

    fn stored_name(record: &FieldRecord) -> String {
        record.handle.as_ref().unwrap().current_name().unwrap()
    }

    fn record(
        id: usize,
        original: &str,
        name: &str,
        renames: &Arc<Mutex<Vec<String>>>,
    ) -> FieldRecord {
        FieldRecord {
            id,
            name: name.to_string(),
            original_name: original.to_string(),
            field_type: FieldType::Text,
            bounds: FieldBounds::new(10.0, 20.0, 100.0, 12.0),
            page: 1,
            viewport: None,
            handle: Some(Arc::new(RecordingHandle {
                name: Mutex::new(original.to_string()),
                renames: Arc::clone(renames),
            })),
            placement: Placement::Matched,
        }
    }

    #[test]
    fn only_changed_names_reach_handles() {
        let renames = Arc::new(Mutex::new(vec![]));
        let fields = vec![
            record(0, "first", "first", &renames),
            record(1, "second", "given_name", &renames),
        ];

        let bytes = apply_renames(Some(&StubForm), &fields).unwrap();

        assert_eq!(bytes, b"%PDF-renamed");
        assert_eq!(*renames.lock().unwrap(), vec!["given_name".to_string()]);
    }

    #[test]
    fn failed_rename_restores_earlier_ones() {
        let renames = Arc::new(Mutex::new(vec![]));
        let mut fields = vec![
            record(0, "first", "alpha", &renames),
            record(1, "second", "beta", &renames),
        ];
        fields[1].handle = None;

        let result = apply_renames(Some(&StubForm), &fields);

        assert!(matches!(result, Err(SaveFailure::NotEditable { .. })));
        assert_eq!(stored_name(&fields[0]), "first");
        assert_eq!(
            *renames.lock().unwrap(),
            vec!["alpha".to_string(), "first".to_string()]
        );
    }

    #[test]
    fn failed_serialization_restores_names() {
        let renames = Arc::new(Mutex::new(vec![]));
        let fields = vec![
            record(0, "first", "alpha", &renames),
            record(1, "second", "beta", &renames),
        ];

        let result = apply_renames(Some(&BrokenForm), &fields);

        assert!(matches!(result, Err(SaveFailure::Serialize(_))));
        assert_eq!(stored_name(&fields[0]), "first");
        assert_eq!(stored_name(&fields[1]), "second");
    }

    #[test]
    fn missing_form_fails() {
        let renames = Arc::new(Mutex::new(vec![]));
        let fields = vec![record(0, "a", "b", &renames)];
        assert!(matches!(
            apply_renames(None, &fields),
            Err(SaveFailure::NoFormDocument)
        ));
    }

    #[test]
    fn renamed_read_only_record_fails() {
        let renames = Arc::new(Mutex::new(vec![]));
        let mut fields = vec![record(0, "a", "b", &renames)];
        fields[0].handle = None;
        assert!(matches!(
            apply_renames(Some(&StubForm), &fields),
            Err(SaveFailure::NotEditable { .. })
        ));
    }

    #[test]
    fn guide_lists_only_changed_fields() {
        let renames = Arc::new(Mutex::new(vec![]));
        let fields = vec![
            record(0, "kept", "kept", &renames),
            record(1, "old_name", "new_name", &renames),
        ];

        let guide = modification_guide(&fields);

        assert!(guide.contains("1 field(s)"));
        assert!(guide.contains("\"old_name\" -> \"new_name\""));
        assert!(guide.contains("Type: Text Field"));
        assert!(guide.contains("Position: (10, 20)"));
        assert!(!guide.contains("\"kept\""));
    }

    #[test]
    fn write_to_creates_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let outcome = SaveOutcome {
            document: Artifact::original(b"%PDF-1.4"),
            guide: Some(Artifact::guide("guide".to_string())),
            warning: None,
            changed: 1,
        };

        let written = outcome.write_to(dir.path()).unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(fs::read(dir.path().join(ORIGINAL_FILE_NAME)).unwrap(), b"%PDF-1.4");
        assert_eq!(fs::read_to_string(dir.path().join(GUIDE_FILE_NAME)).unwrap(), "guide");
    }
}
