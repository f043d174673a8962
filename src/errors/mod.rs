use crate::monitoring::error_management::{ErrorCategory, ErrorSeverity, ManagedError};

pub mod auth;
pub mod document;
pub mod ocr_job;
pub mod storage;

pub use auth::AuthError;
pub use document::DocumentError;
pub use ocr_job::OcrJobError;
pub use storage::StorageError;

/// The taxonomy every core error collapses to. There is no HTTP status code
/// here; the façade that eventually sits in front of this crate is an
/// external collaborator and maps `ErrorKind` to transport-specific codes on
/// its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    PreconditionFailed,
    Unauthenticated,
    Forbidden,
    QuotaExceeded,
    Upstream { retryable: bool },
    Permanent,
    LeaseLost,
}

/// Common trait for all typed error enums in the crate.
pub trait AppError: std::error::Error + Send + Sync + 'static {
    /// Which bucket of the taxonomy this error belongs to.
    fn kind(&self) -> ErrorKind;

    /// A user-friendly error message.
    fn user_message(&self) -> String;

    /// Stable error code for machine consumers.
    fn error_code(&self) -> &'static str;

    /// Error category for the error management system.
    fn error_category(&self) -> ErrorCategory;

    /// Error severity for the error management system.
    fn error_severity(&self) -> ErrorSeverity;

    /// Optional suppression key for repeated error handling.
    fn suppression_key(&self) -> Option<String> {
        None
    }

    /// Optional suggested action for the user.
    fn suggested_action(&self) -> Option<String> {
        None
    }

    fn to_managed_error(&self) -> ManagedError {
        ManagedError {
            category: self.error_category(),
            severity: self.error_severity(),
            code: self.error_code().to_string(),
            user_message: self.user_message(),
            technical_details: self.to_string(),
            suggested_action: self.suggested_action(),
            suppression_key: self.suppression_key(),
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Upstream { retryable: true })
    }
}
