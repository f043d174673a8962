use std::path::Path;
use tracing::{debug, warn};

use crate::config::Config;
use crate::errors::document::DocumentError;

/// How confidently a MIME type was determined, mirroring the teacher's
/// server -> content -> extension detection ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MimeConfidence {
    Low,
    Medium,
    High,
    VeryHigh,
}

#[derive(Debug, Clone)]
pub struct DetectedMime {
    pub mime_type: String,
    pub confidence: MimeConfidence,
}

/// Sniffs, sanitizes and validates an upload before it reaches `StorageService`
/// (§4.5). The declared (client-sent) MIME type is never trusted outright;
/// magic bytes win when they disagree with it.
#[derive(Clone)]
pub struct ValidationService {
    max_file_size: i64,
    allowed_mime_types: Vec<String>,
    supported_formats: Vec<String>,
}

impl ValidationService {
    pub fn new(config: &Config) -> Self {
        Self {
            max_file_size: config.max_file_size,
            allowed_mime_types: config.allowed_mime_types.clone(),
            supported_formats: config.supported_formats.clone(),
        }
    }

    pub fn sanitize_filename(filename: &str) -> String {
        let base = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload");
        let cleaned: String = base
            .chars()
            .map(|c| if c.is_control() { '_' } else { c })
            .collect();
        cleaned.trim().to_string()
    }

    pub fn detect_mime(&self, bytes: &[u8], filename: &str, declared: Option<&str>) -> DetectedMime {
        if let Some(kind) = infer::get(bytes) {
            let sniffed = kind.mime_type().to_string();
            debug!("magic bytes detected {sniffed} for {filename}");
            if let Some(declared) = declared {
                if are_mime_types_compatible(&sniffed, declared) {
                    return DetectedMime { mime_type: sniffed, confidence: MimeConfidence::VeryHigh };
                }
                warn!("MIME mismatch for {filename}: declared={declared}, sniffed={sniffed}");
            }
            return DetectedMime { mime_type: sniffed, confidence: MimeConfidence::High };
        }

        if let Some(declared) = declared.filter(|d| !d.is_empty() && *d != "application/octet-stream") {
            return DetectedMime { mime_type: declared.to_string(), confidence: MimeConfidence::Medium };
        }

        let guessed = mime_guess::from_path(filename)
            .first()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        DetectedMime { mime_type: guessed, confidence: MimeConfidence::Low }
    }

    /// Runs every upload guardrail (§4.5, §7): size cap, allowed MIME types,
    /// and that the sniffed type actually matches a supported format. Returns
    /// the MIME type to persist with the document.
    pub fn validate_upload(
        &self,
        bytes: &[u8],
        filename: &str,
        declared_mime: Option<&str>,
    ) -> Result<String, DocumentError> {
        if bytes.is_empty() {
            return Err(DocumentError::Validation { message: "file is empty".to_string() });
        }
        if bytes.len() as i64 > self.max_file_size {
            return Err(DocumentError::Validation {
                message: format!(
                    "file size {} bytes exceeds the {} byte limit",
                    bytes.len(),
                    self.max_file_size
                ),
            });
        }

        scan_for_malicious_patterns(bytes)?;

        let detected = self.detect_mime(bytes, filename, declared_mime);

        if !self.allowed_mime_types.is_empty() && !self.allowed_mime_types.contains(&detected.mime_type) {
            return Err(DocumentError::Validation {
                message: format!("MIME type {} is not permitted", detected.mime_type),
            });
        }

        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        if let Some(ext) = &extension {
            if !self.supported_formats.is_empty() && !self.supported_formats.contains(ext) {
                return Err(DocumentError::Validation {
                    message: format!("file extension .{ext} is not a supported format"),
                });
            }
        }

        Ok(detected.mime_type)
    }
}

/// Crude signatures for embedded script/SQLi payloads, independent of the
/// external virus-scan engine. Scans a bounded prefix of the upload so a
/// multi-gigabyte binary doesn't get lowercased in full on every request.
const SUSPICIOUS_PATTERNS: &[&str] = &[
    "<script",
    "javascript:",
    "onerror=",
    "onload=",
    "union select",
    "drop table",
    "; exec ",
    "xp_cmdshell",
    "' or '1'='1",
];

const SCAN_WINDOW: usize = 64 * 1024;

fn scan_for_malicious_patterns(bytes: &[u8]) -> Result<(), DocumentError> {
    let window = &bytes[..bytes.len().min(SCAN_WINDOW)];
    let text = String::from_utf8_lossy(window).to_lowercase();
    for pattern in SUSPICIOUS_PATTERNS {
        if text.contains(pattern) {
            return Err(DocumentError::Validation {
                message: format!("content matched a disallowed pattern: {pattern}"),
            });
        }
    }
    Ok(())
}

fn are_mime_types_compatible(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        ("image/jpeg", "image/jpg") | ("image/jpg", "image/jpeg") => true,
        ("image/tiff", "image/tif") | ("image/tif", "image/tiff") => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            database_url: "postgresql://u:p@localhost/db".to_string(),
            storage_root: ".".to_string(),
            storage_bucket: "documents".to_string(),
            worker_count: 1,
            lease_ttl: std::time::Duration::from_secs(60),
            lease_grace: std::time::Duration::from_secs(5),
            empty_poll_interval: std::time::Duration::from_secs(1),
            sweeper_interval: std::time::Duration::from_secs(15),
            max_retries: 3,
            backoff_base: std::time::Duration::from_secs(1),
            backoff_max: std::time::Duration::from_secs(60),
            max_file_size: 1024,
            allowed_mime_types: vec!["application/pdf".to_string()],
            supported_formats: vec!["pdf".to_string()],
            presign_ttl_max: std::time::Duration::from_secs(3600),
            owner_quota_bytes: 1_000_000,
            ocr_timeout: std::time::Duration::from_secs(60),
            ocr_language: "eng".to_string(),
        }
    }

    #[test]
    fn rejects_oversized_files() {
        let svc = ValidationService::new(&config());
        let big = vec![0u8; 2048];
        let err = svc.validate_upload(&big, "a.pdf", Some("application/pdf")).unwrap_err();
        assert!(matches!(err, DocumentError::Validation { .. }));
    }

    #[test]
    fn rejects_disallowed_mime_types() {
        let svc = ValidationService::new(&config());
        let err = svc.validate_upload(b"plain text", "a.txt", Some("text/plain")).unwrap_err();
        assert!(matches!(err, DocumentError::Validation { .. }));
    }

    #[test]
    fn accepts_pdf_magic_bytes() {
        let svc = ValidationService::new(&config());
        let mime = svc.validate_upload(b"%PDF-1.4 rest of file", "a.pdf", Some("application/pdf")).unwrap();
        assert_eq!(mime, "application/pdf");
    }

    #[test]
    fn sanitizes_path_components_out_of_filenames() {
        assert_eq!(ValidationService::sanitize_filename("../../etc/passwd"), "passwd");
    }

    #[test]
    fn rejects_embedded_script_payloads() {
        let svc = ValidationService::new(&config());
        let err = svc.validate_upload(b"%PDF-1.4 <script>alert(1)</script>", "a.pdf", Some("application/pdf")).unwrap_err();
        assert!(matches!(err, DocumentError::Validation { .. }));
    }
}
