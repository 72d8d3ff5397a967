//! Engine error taxonomy

use thiserror::Error;

use crate::models::{CoordsError, KeyError};
use crate::output::DecodeError;
use crate::persist::{DocumentError, StoreError};

/// Errors surfaced by template operations.
///
/// Bulk operations (import) contain failures per fragment or per template
/// and only return an error when the whole operation is refused.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// Malformed image or base64 payload
    #[error("Could not decode image: {0}")]
    Decode(#[from] DecodeError),
    /// Rejected user input; no state was changed
    #[error("{0}")]
    Validation(String),
    /// Imported document came from an unrecognized tool
    #[error("Unrecognized document identity '{0}'")]
    IdentityMismatch(String),
    /// Imported document has neither known shape
    #[error("{0}")]
    Document(#[from] DocumentError),
    /// The primary store could not be written or read
    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),
    #[error("No template with key '{0}'")]
    UnknownTemplate(String),
    #[error("Could not encode image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Could not serialize templates: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<CoordsError> for EngineError {
    fn from(e: CoordsError) -> Self {
        EngineError::Validation(e.to_string())
    }
}

impl From<KeyError> for EngineError {
    fn from(e: KeyError) -> Self {
        EngineError::Validation(e.to_string())
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
