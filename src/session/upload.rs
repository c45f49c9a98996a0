//! Upload intake and the synchronous checks run before any parsing

use std::fs;
use std::io;
use std::path::Path;

use super::LoadError;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
const OCTET_STREAM: &str = "application/octet-stream";
const PDF_SIGNATURE: &[u8] = b"%PDF";

/// Default upload ceiling: 50 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Raw document bytes plus what the sender claims they are
#[derive(Clone, Debug)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: Option<String>,
}

impl Upload {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
            file_name: None,
        }
    }

    /// Bytes declared as `application/pdf`
    pub fn pdf(bytes: Vec<u8>) -> Self {
        Self::new(bytes, PDF_CONTENT_TYPE)
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Read a file, declaring its content type from the extension
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        let content_type = if is_pdf { PDF_CONTENT_TYPE } else { OCTET_STREAM };

        let mut upload = Self::new(bytes, content_type);
        upload.file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Ok(upload)
    }
}

/// Content type, then size, then signature. Runs before the engine sees a byte.
pub(crate) fn validate(upload: &Upload, limit: usize) -> Result<(), LoadError> {
    let declared = upload
        .content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();
    if !declared.eq_ignore_ascii_case(PDF_CONTENT_TYPE) {
        return Err(LoadError::InvalidFormat(format!(
            "expected {PDF_CONTENT_TYPE}, got {:?}",
            upload.content_type
        )));
    }

    if upload.bytes.len() > limit {
        return Err(LoadError::TooLarge {
            size: upload.bytes.len(),
            limit,
        });
    }

    if !upload.bytes.starts_with(PDF_SIGNATURE) {
        return Err(LoadError::InvalidFormat(
            "missing %PDF signature".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_content_type_first() {
        let upload = Upload::new(b"%PDF-1.7".to_vec(), "text/plain");
        assert!(matches!(
            validate(&upload, 1),
            Err(LoadError::InvalidFormat(_))
        ));
    }

    #[test]
    fn content_type_parameters_are_ignored() {
        let upload = Upload::new(b"%PDF-1.7".to_vec(), "Application/PDF; charset=binary");
        assert!(validate(&upload, DEFAULT_MAX_UPLOAD_BYTES).is_ok());
    }

    #[test]
    fn size_is_checked_before_signature() {
        let upload = Upload::pdf(vec![0u8; 16]);
        assert_eq!(
            validate(&upload, 8),
            Err(LoadError::TooLarge { size: 16, limit: 8 })
        );
    }

    #[test]
    fn short_buffer_is_invalid() {
        let upload = Upload::pdf(b"%PD".to_vec());
        assert!(matches!(
            validate(&upload, DEFAULT_MAX_UPLOAD_BYTES),
            Err(LoadError::InvalidFormat(_))
        ));
    }

    #[test]
    fn content_type_from_extension() {
        let dir = tempfile::TempDir::new().unwrap();
        let pdf = dir.path().join("Form.PDF");
        let txt = dir.path().join("notes.txt");
        fs::write(&pdf, b"%PDF-1.4").unwrap();
        fs::write(&txt, b"hello").unwrap();

        let upload = Upload::from_path(&pdf).unwrap();
        assert_eq!(upload.content_type, PDF_CONTENT_TYPE);
        assert_eq!(upload.file_name.as_deref(), Some("Form.PDF"));
        assert_eq!(Upload::from_path(&txt).unwrap().content_type, OCTET_STREAM);
    }
}
