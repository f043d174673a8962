use thiserror::Error;
use uuid::Uuid;

use super::{AppError, ErrorKind};
use crate::monitoring::error_management::{ErrorCategory, ErrorSeverity};

/// Errors raised by `OcrQueue` / the job side of `MetaStore` (§7).
/// `LeaseLost` is distinct from the generic taxonomy: a worker holding an
/// expired lease must abort in-flight work rather than commit it.
#[derive(Error, Debug)]
pub enum OcrJobError {
    #[error("job {id} not found")]
    NotFound { id: Uuid },

    #[error("document {document_id} is not linkable: missing or deleted")]
    DocumentNotLinkable { document_id: Uuid },

    #[error("job {id} is not in a cancellable state")]
    NotCancellable { id: Uuid },

    #[error("lease on job {id} lost or expired")]
    LeaseLost { id: Uuid },

    #[error("engine failed permanently: {message}")]
    EnginePermanent { message: String },

    #[error("engine failed transiently: {message}")]
    EngineTransient { message: String },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl AppError for OcrJobError {
    fn kind(&self) -> ErrorKind {
        match self {
            OcrJobError::NotFound { .. } => ErrorKind::NotFound,
            OcrJobError::DocumentNotLinkable { .. } => ErrorKind::Validation,
            OcrJobError::NotCancellable { .. } => ErrorKind::Conflict,
            OcrJobError::LeaseLost { .. } => ErrorKind::LeaseLost,
            OcrJobError::EnginePermanent { .. } => ErrorKind::Permanent,
            OcrJobError::EngineTransient { .. } => ErrorKind::Upstream { retryable: true },
            OcrJobError::Database(_) => ErrorKind::Upstream { retryable: true },
        }
    }

    fn user_message(&self) -> String {
        match self {
            OcrJobError::NotFound { .. } => "job not found".to_string(),
            OcrJobError::DocumentNotLinkable { .. } => "document does not exist or has been deleted".to_string(),
            OcrJobError::NotCancellable { .. } => "job can no longer be cancelled".to_string(),
            OcrJobError::LeaseLost { .. } => "job lease was lost".to_string(),
            OcrJobError::EnginePermanent { message } => message.clone(),
            OcrJobError::EngineTransient { .. } => "OCR engine temporarily unavailable".to_string(),
            OcrJobError::Database(_) => "a database error occurred".to_string(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            OcrJobError::NotFound { .. } => "OCR_JOB_NOT_FOUND",
            OcrJobError::DocumentNotLinkable { .. } => "OCR_JOB_DOCUMENT_NOT_LINKABLE",
            OcrJobError::NotCancellable { .. } => "OCR_JOB_NOT_CANCELLABLE",
            OcrJobError::LeaseLost { .. } => "OCR_JOB_LEASE_LOST",
            OcrJobError::EnginePermanent { .. } => "OCR_JOB_ENGINE_PERMANENT",
            OcrJobError::EngineTransient { .. } => "OCR_JOB_ENGINE_TRANSIENT",
            OcrJobError::Database(_) => "OCR_JOB_DATABASE",
        }
    }

    fn error_category(&self) -> ErrorCategory {
        match self {
            OcrJobError::EnginePermanent { .. } | OcrJobError::EngineTransient { .. } => {
                ErrorCategory::OcrProcessing
            }
            _ => ErrorCategory::Database,
        }
    }

    fn error_severity(&self) -> ErrorSeverity {
        match self {
            OcrJobError::EnginePermanent { .. } => ErrorSeverity::Important,
            OcrJobError::LeaseLost { .. } => ErrorSeverity::Minor,
            OcrJobError::Database(_) => ErrorSeverity::Important,
            _ => ErrorSeverity::Expected,
        }
    }

    fn suppression_key(&self) -> Option<String> {
        match self {
            OcrJobError::EngineTransient { .. } => Some("ocr_engine_transient".to_string()),
            _ => None,
        }
    }
}
