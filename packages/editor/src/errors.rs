//! Error types for the editor

use bio_common::ServiceError;
use bio_layout::PatchError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Patch error: {0}")]
    Patch(#[from] PatchError),

    #[error("Profile is read-only")]
    ReadOnly,

    #[error("Sign in again to keep editing")]
    ReauthenticationRequired,

    #[error("Placeholder not found: {0}")]
    UnknownPlaceholder(String),
}

impl EditorError {
    /// Service-level view of this error, as reported to notifiers
    pub fn to_service_error(&self) -> ServiceError {
        match self {
            EditorError::Service(e) => e.clone(),
            EditorError::Patch(e) => ServiceError::from(e.clone()),
            EditorError::ReadOnly => ServiceError::Forbidden,
            EditorError::ReauthenticationRequired => ServiceError::Unauthenticated,
            EditorError::UnknownPlaceholder(id) => ServiceError::NotFound(id.clone()),
        }
    }
}

pub type EditorResult<T> = Result<T, EditorError>;
