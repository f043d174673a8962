use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum DocumentStatus {
    #[serde(rename = "uploaded")]
    Uploaded,
    #[serde(rename = "processing")]
    Processing,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "failed")]
    Failed,
    #[serde(rename = "deleted")]
    Deleted,
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
            DocumentStatus::Deleted => "deleted",
        };
        write!(f, "{s}")
    }
}

impl TryFrom<String> for DocumentStatus {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "uploaded" => Ok(DocumentStatus::Uploaded),
            "processing" => Ok(DocumentStatus::Processing),
            "completed" => Ok(DocumentStatus::Completed),
            "failed" => Ok(DocumentStatus::Failed),
            "deleted" => Ok(DocumentStatus::Deleted),
            other => Err(format!("invalid document status: {other}")),
        }
    }
}

/// `pending` / `scanning` / `clean` / `threat` (virus) or `error`. Shared shape
/// for `security_scan_status` and `virus_scan_status`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum ScanStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "scanning")]
    Scanning,
    #[serde(rename = "clean")]
    Clean,
    #[serde(rename = "threat")]
    Threat,
    #[serde(rename = "error")]
    Error,
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScanStatus::Pending => "pending",
            ScanStatus::Scanning => "scanning",
            ScanStatus::Clean => "clean",
            ScanStatus::Threat => "threat",
            ScanStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

impl TryFrom<String> for ScanStatus {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(ScanStatus::Pending),
            "scanning" => Ok(ScanStatus::Scanning),
            "clean" => Ok(ScanStatus::Clean),
            "threat" | "infected" => Ok(ScanStatus::Threat),
            "error" => Ok(ScanStatus::Error),
            other => Err(format!("invalid scan status: {other}")),
        }
    }
}

/// The metadata record for one stored document. Owned exclusively by
/// `MetaStore`; every mutation goes through a typed operation there.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Document {
    pub id: Uuid,
    pub file_name: String,
    pub original_filename: String,
    pub file_size: i64,
    pub mime_type: String,
    pub file_type: String,
    pub document_type: Option<String>,
    pub file_hash: String,
    pub storage_key: String,
    pub storage_bucket: String,
    pub owner_id: Uuid,
    pub client_id: Option<Uuid>,
    pub insurer_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub status: DocumentStatus,
    pub version: i64,
    pub etag: String,
    #[sqlx(try_from = "String")]
    pub security_scan_status: ScanStatus,
    #[sqlx(try_from = "String")]
    pub virus_scan_status: ScanStatus,
    pub content_validated: bool,
    pub ocr_completed: bool,
    pub ocr_job_id: Option<Uuid>,
    pub ocr_text: Option<String>,
    pub ocr_confidence: Option<f64>,
    pub ocr_language: Option<String>,
    pub ocr_page_count: Option<i32>,
    pub ocr_word_count: Option<i32>,
    pub download_count: i64,
    pub last_accessed: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Document {
    /// `etag` is a deterministic function of `(id, version)` (§3).
    pub fn compute_etag(id: Uuid, version: i64) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(id.as_bytes());
        hasher.update(version.to_be_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn is_deleted(&self) -> bool {
        self.status == DocumentStatus::Deleted
    }
}

/// Fields `updateDocument` is allowed to touch (§6.4). Anything else must go
/// through a dedicated MetaStore operation (`completeJob`, `incrementAccessCounters`, ...).
#[derive(Debug, Default, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentPatch {
    pub file_name: Option<String>,
    pub document_type: Option<String>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<JsonValue>,
    /// MetaStore rejects `Some(DocumentStatus::Deleted)` here — that
    /// transition only happens through `delete()`.
    pub status: Option<DocumentStatus>,
    pub security_scan_status: Option<ScanStatus>,
    pub virus_scan_status: Option<ScanStatus>,
}

/// Fields `completeJob` applies to Document in the same transaction as the
/// OcrJob completion (§4.2).
#[derive(Debug, Clone)]
pub struct OcrDocumentPatch {
    pub ocr_job_id: Uuid,
    pub ocr_text: Option<String>,
    pub ocr_confidence: Option<f64>,
    pub ocr_language: Option<String>,
    pub ocr_page_count: Option<i32>,
    pub ocr_word_count: Option<i32>,
}

/// A `StorageService::store` result (§4.1).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoredFile {
    pub bucket: String,
    pub key: String,
    pub hash: String,
    pub size: i64,
    pub mime_type: String,
}

/// Opaque cursor for `listDocumentsByOwner` pagination.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentCursor {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentListFilter {
    pub status: Option<DocumentStatus>,
    pub mime_type: Option<String>,
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentPage {
    pub items: Vec<Document>,
    pub next_cursor: Option<DocumentCursor>,
}
