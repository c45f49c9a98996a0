//! Document model: structural form fields and in-place renaming
//!
//! The catalog and session only see the traits in this module. The lopdf
//! adapter in [`lopdf_model`] is the production implementation.

use std::fmt::Debug;
use std::sync::Arc;

use crate::catalog::StructuralFieldInfo;

pub mod lopdf_model;

pub use lopdf_model::{LopdfForm, LopdfModel};

/// Errors from the document model
#[derive(Debug, thiserror::Error)]
pub enum ModelFault {
    #[error("PDF structure: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("document has no interactive form")]
    NoForm,

    #[error("invalid field name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("{detail}")]
    Generic { detail: String },
}

impl ModelFault {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Capability to read and change one field's name in the underlying document
pub trait FieldHandle: Send + Sync + Debug {
    /// Fully qualified name as currently stored in the document
    fn current_name(&self) -> Result<String, ModelFault>;

    /// Store `new_name` as the field's fully qualified name
    fn rename(&self, new_name: &str) -> Result<(), ModelFault>;

    /// Fully qualified name that `rename(new_name)` would store
    fn qualify(&self, new_name: &str) -> Result<String, ModelFault> {
        Ok(new_name.to_string())
    }
}

pub type SharedHandle = Arc<dyn FieldHandle>;

/// A parsed document whose fields can be renamed and re-serialized
pub trait FormDocument: Send {
    /// Terminal fields in form order
    fn fields(&self) -> Vec<StructuralFieldInfo>;

    /// Serialize the document including any renames applied via handles
    fn save(&self) -> Result<Vec<u8>, ModelFault>;
}

/// Factory for [`FormDocument`]s
pub trait DocumentModel: Send + Sync {
    fn load(&self, bytes: &[u8]) -> Result<Box<dyn FormDocument>, ModelFault>;
}
