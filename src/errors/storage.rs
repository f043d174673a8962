use thiserror::Error;

use super::{AppError, ErrorKind};
use crate::monitoring::error_management::{ErrorCategory, ErrorSeverity};

/// Errors raised by `BlobStore` implementations and `StorageService`.
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    #[error("object not found: {key}")]
    NotFound { key: String },

    #[error("upstream storage error: {message}")]
    Upstream { message: String, retryable: bool },

    #[error("permanent storage failure: {message}")]
    Permanent { message: String },
}

impl AppError for StorageError {
    fn kind(&self) -> ErrorKind {
        match self {
            StorageError::NotFound { .. } => ErrorKind::NotFound,
            StorageError::Upstream { retryable, .. } => ErrorKind::Upstream { retryable: *retryable },
            StorageError::Permanent { .. } => ErrorKind::Permanent,
        }
    }

    fn user_message(&self) -> String {
        match self {
            StorageError::NotFound { .. } => "file not found in storage".to_string(),
            StorageError::Upstream { .. } => "storage backend unavailable".to_string(),
            StorageError::Permanent { .. } => "storage operation failed".to_string(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            StorageError::NotFound { .. } => "STORAGE_NOT_FOUND",
            StorageError::Upstream { .. } => "STORAGE_UPSTREAM",
            StorageError::Permanent { .. } => "STORAGE_PERMANENT",
        }
    }

    fn error_category(&self) -> ErrorCategory {
        ErrorCategory::FileSystem
    }

    fn error_severity(&self) -> ErrorSeverity {
        match self {
            StorageError::Upstream { .. } | StorageError::Permanent { .. } => ErrorSeverity::Important,
            StorageError::NotFound { .. } => ErrorSeverity::Minor,
        }
    }

    fn suppression_key(&self) -> Option<String> {
        match self {
            StorageError::Upstream { .. } => Some("storage_upstream_error".to_string()),
            _ => None,
        }
    }
}
