use crate::error::ServiceError;

/// Result type returned by every persistence and mutation call
pub type ServiceResult<T> = Result<T, ServiceError>;
