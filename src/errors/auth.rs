use thiserror::Error;

use super::{AppError, ErrorKind};
use crate::monitoring::error_management::{ErrorCategory, ErrorSeverity};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("missing or malformed bearer token")]
    MissingToken,

    #[error("token rejected: {0}")]
    InvalidToken(String),

    #[error("token expired")]
    Expired,

    #[error("principal lacks permission: {0}")]
    Forbidden(String),
}

impl AppError for AuthError {
    fn kind(&self) -> ErrorKind {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken(_) | AuthError::Expired => {
                ErrorKind::Unauthenticated
            }
            AuthError::Forbidden(_) => ErrorKind::Forbidden,
        }
    }

    fn user_message(&self) -> String {
        match self {
            AuthError::MissingToken => "authentication required".to_string(),
            AuthError::InvalidToken(_) => "invalid credentials".to_string(),
            AuthError::Expired => "session expired".to_string(),
            AuthError::Forbidden(reason) => reason.clone(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "AUTH_MISSING_TOKEN",
            AuthError::InvalidToken(_) => "AUTH_INVALID_TOKEN",
            AuthError::Expired => "AUTH_EXPIRED",
            AuthError::Forbidden(_) => "AUTH_FORBIDDEN",
        }
    }

    fn error_category(&self) -> ErrorCategory {
        ErrorCategory::Auth
    }

    fn error_severity(&self) -> ErrorSeverity {
        ErrorSeverity::Important
    }
}
