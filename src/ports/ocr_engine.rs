use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    Transient,
    Permanent,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct OcrEngineError {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl OcrEngineError {
    pub fn transient<S: Into<String>>(message: S) -> Self {
        Self {
            kind: EngineErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent<S: Into<String>>(message: S) -> Self {
        Self {
            kind: EngineErrorKind::Permanent,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RawOcrResult {
    pub text: String,
    /// Set when the engine positively determined there is no text to
    /// extract (e.g. a blank page), as opposed to `text` merely being empty.
    pub no_text: bool,
    pub confidence: f64,
    pub page_count: i32,
    pub word_count: i32,
    pub language: Option<String>,
    pub raw: JsonValue,
}

/// The opaque external OCR capability consumed by `OcrService` (§6.1).
/// Implementations are external collaborators; the core ships one
/// Tesseract-backed reference implementation behind the `ocr` feature
/// (`ocr::engine::TesseractEngine`).
#[async_trait]
pub trait OCREngine: Send + Sync {
    async fn extract(
        &self,
        bytes: &[u8],
        mime_type: &str,
        opts: &JsonValue,
        deadline: Duration,
    ) -> Result<RawOcrResult, OcrEngineError>;
}
