use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::time::Duration;

use crate::ports::ocr_engine::{EngineErrorKind, OCREngine, OcrEngineError, RawOcrResult};

#[cfg(feature = "ocr")]
use crate::ocr::error::OcrError;
#[cfg(feature = "ocr")]
use tesseract::Tesseract;

/// Reference `OCREngine` implementation backed by the system Tesseract
/// install, behind the `ocr` feature. Bytes are spilled to a temp file
/// because the `tesseract` crate's C bindings take a file path, not a buffer.
pub struct TesseractEngine;

impl TesseractEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OCREngine for TesseractEngine {
    async fn extract(
        &self,
        bytes: &[u8],
        mime_type: &str,
        opts: &JsonValue,
        deadline: Duration,
    ) -> Result<RawOcrResult, OcrEngineError> {
        #[cfg(feature = "ocr")]
        {
            let lang = opts
                .get("language")
                .and_then(|v| v.as_str())
                .filter(|l| *l != "auto")
                .unwrap_or("eng")
                .to_string();
            let bytes = bytes.to_vec();
            let mime_type = mime_type.to_string();

            let result = tokio::time::timeout(
                deadline,
                tokio::task::spawn_blocking(move || extract_blocking(&bytes, &mime_type, &lang)),
            )
            .await;

            match result {
                Ok(Ok(Ok(raw))) => Ok(raw),
                Ok(Ok(Err(e))) => Err(classify(e)),
                Ok(Err(join_err)) => Err(OcrEngineError::transient(format!("OCR task panicked: {join_err}"))),
                Err(_) => Err(OcrEngineError::transient(format!(
                    "OCR extraction exceeded deadline of {:?}",
                    deadline
                ))),
            }
        }

        #[cfg(not(feature = "ocr"))]
        {
            let _ = (bytes, mime_type, opts, deadline);
            Err(OcrEngineError::permanent("OCR engine not compiled in (missing 'ocr' feature)"))
        }
    }
}

#[cfg(feature = "ocr")]
fn extract_blocking(bytes: &[u8], mime_type: &str, lang: &str) -> Result<RawOcrResult, OcrError> {
    let suffix = match mime_type {
        "application/pdf" => ".pdf",
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "image/tiff" => ".tiff",
        _ => ".bin",
    };

    let mut tmp = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .map_err(OcrError::Io)?;
    std::io::Write::write_all(&mut tmp, bytes).map_err(OcrError::Io)?;
    let path = tmp.path().to_str().ok_or_else(|| OcrError::InvalidImageFormat {
        details: "temp file path is not valid UTF-8".to_string(),
    })?;

    let mut tesseract = Tesseract::new(None, Some(lang)).map_err(|e| OcrError::InitializationFailed {
        details: e.to_string(),
    })?;
    tesseract = tesseract.set_image(path).map_err(|e| OcrError::InvalidImageFormat {
        details: e.to_string(),
    })?;

    let text = tesseract
        .get_text()
        .map_err(|e| OcrError::InitializationFailed {
            details: format!("failed to extract text: {e}"),
        })?
        .trim()
        .to_string();

    let confidence = (tesseract.mean_text_conf() as f64 / 100.0).clamp(0.0, 1.0);
    let word_count = text.split_whitespace().count() as i32;
    let no_text = text.is_empty();

    Ok(RawOcrResult {
        text,
        no_text,
        confidence,
        page_count: 1,
        word_count,
        language: Some(lang.to_string()),
        raw: serde_json::json!({ "engine": "tesseract" }),
    })
}

#[cfg(feature = "ocr")]
fn classify(err: OcrError) -> OcrEngineError {
    let kind = if err.is_recoverable() {
        EngineErrorKind::Transient
    } else {
        EngineErrorKind::Permanent
    };
    OcrEngineError {
        kind,
        message: err.to_string(),
    }
}
