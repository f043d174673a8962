use thiserror::Error;
use uuid::Uuid;

use super::{AppError, ErrorKind};
use crate::monitoring::error_management::{ErrorCategory, ErrorSeverity};

/// Errors raised by `DocumentService` / the document side of `MetaStore`
/// (§7). `Conflict` covers dedup/uniqueness races; `PreconditionFailed`
/// covers optimistic-concurrency (etag/version) mismatches on `updateDocument`.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("validation failed: {message}")]
    Validation { message: String },

    #[error("document {id} not found")]
    NotFound { id: Uuid },

    #[error("storage key already in use")]
    DuplicateStorageKey,

    #[error("precondition failed: expected etag {expected}, found {actual}")]
    PreconditionFailed { expected: String, actual: String },

    #[error("owner {owner_id} forbidden from accessing document {id}")]
    Forbidden { owner_id: Uuid, id: Uuid },

    #[error("owner {owner_id} quota exceeded: {used} + {requested} > {limit} bytes")]
    QuotaExceeded {
        owner_id: Uuid,
        used: i64,
        requested: i64,
        limit: i64,
    },

    #[error("upstream storage error: {message}")]
    Upstream { message: String, retryable: bool },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl AppError for DocumentError {
    fn kind(&self) -> ErrorKind {
        match self {
            DocumentError::Validation { .. } => ErrorKind::Validation,
            DocumentError::NotFound { .. } => ErrorKind::NotFound,
            DocumentError::DuplicateStorageKey => ErrorKind::Conflict,
            DocumentError::PreconditionFailed { .. } => ErrorKind::PreconditionFailed,
            DocumentError::Forbidden { .. } => ErrorKind::Forbidden,
            DocumentError::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            DocumentError::Upstream { retryable, .. } => ErrorKind::Upstream { retryable: *retryable },
            DocumentError::Database(_) => ErrorKind::Upstream { retryable: true },
        }
    }

    fn user_message(&self) -> String {
        match self {
            DocumentError::Validation { message } => message.clone(),
            DocumentError::NotFound { .. } => "document not found".to_string(),
            DocumentError::DuplicateStorageKey => "storage key already in use".to_string(),
            DocumentError::PreconditionFailed { .. } => {
                "document was modified by someone else, reload and retry".to_string()
            }
            DocumentError::Forbidden { .. } => "not authorized for this document".to_string(),
            DocumentError::QuotaExceeded { .. } => "storage quota exceeded".to_string(),
            DocumentError::Upstream { .. } => "storage backend unavailable".to_string(),
            DocumentError::Database(_) => "a database error occurred".to_string(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            DocumentError::Validation { .. } => "DOCUMENT_VALIDATION",
            DocumentError::NotFound { .. } => "DOCUMENT_NOT_FOUND",
            DocumentError::DuplicateStorageKey => "DOCUMENT_DUPLICATE_STORAGE_KEY",
            DocumentError::PreconditionFailed { .. } => "DOCUMENT_PRECONDITION_FAILED",
            DocumentError::Forbidden { .. } => "DOCUMENT_FORBIDDEN",
            DocumentError::QuotaExceeded { .. } => "DOCUMENT_QUOTA_EXCEEDED",
            DocumentError::Upstream { .. } => "DOCUMENT_UPSTREAM",
            DocumentError::Database(_) => "DOCUMENT_DATABASE",
        }
    }

    fn error_category(&self) -> ErrorCategory {
        match self {
            DocumentError::Database(_) => ErrorCategory::Database,
            DocumentError::Upstream { .. } => ErrorCategory::FileSystem,
            _ => ErrorCategory::Database,
        }
    }

    fn error_severity(&self) -> ErrorSeverity {
        match self {
            DocumentError::Database(_) | DocumentError::Upstream { .. } => ErrorSeverity::Important,
            DocumentError::NotFound { .. } | DocumentError::Validation { .. } => ErrorSeverity::Expected,
            _ => ErrorSeverity::Minor,
        }
    }

    fn suppression_key(&self) -> Option<String> {
        match self {
            DocumentError::Database(_) => Some("document_database_error".to_string()),
            _ => None,
        }
    }
}
