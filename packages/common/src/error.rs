use crate::handle::HandleRejection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Typed failure reason returned by the persistence service and the
/// mutation layers built on top of it
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not allowed to modify this page")]
    Forbidden,

    #[error("Sign in required")]
    Unauthenticated,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid handle: {0}")]
    InvalidHandle(#[from] HandleRejection),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Coarse classification that decides how a failure is surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Rejected before reaching the network, shown inline
    Validation,
    /// Blocking, needs a different identity before retrying
    Authorization,
    /// User-actionable, optimistic state is rolled back
    Conflict,
    /// Generic failure, retry is left to the user
    Transient,
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::InvalidHandle(_) | ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::Forbidden | ServiceError::Unauthenticated => ErrorKind::Authorization,
            ServiceError::Conflict(_) | ServiceError::NotFound(_) => ErrorKind::Conflict,
            ServiceError::Network(_) | ServiceError::Unexpected(_) => ErrorKind::Transient,
        }
    }

    pub fn is_authorization(&self) -> bool {
        self.kind() == ErrorKind::Authorization
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }
}

impl From<String> for ServiceError {
    fn from(s: String) -> Self {
        ServiceError::Unexpected(s)
    }
}

impl From<&str> for ServiceError {
    fn from(s: &str) -> Self {
        ServiceError::Unexpected(s.to_string())
    }
}
