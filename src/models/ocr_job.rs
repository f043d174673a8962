use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum OcrJobStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "processing")]
    Processing,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "failed")]
    Failed,
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl OcrJobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OcrJobStatus::Completed | OcrJobStatus::Failed | OcrJobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for OcrJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OcrJobStatus::Pending => "pending",
            OcrJobStatus::Processing => "processing",
            OcrJobStatus::Completed => "completed",
            OcrJobStatus::Failed => "failed",
            OcrJobStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl TryFrom<String> for OcrJobStatus {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(OcrJobStatus::Pending),
            "processing" => Ok(OcrJobStatus::Processing),
            "completed" => Ok(OcrJobStatus::Completed),
            "failed" => Ok(OcrJobStatus::Failed),
            "cancelled" => Ok(OcrJobStatus::Cancelled),
            other => Err(format!("invalid ocr job status: {other}")),
        }
    }
}

/// One unit of OCR work against a `Document` (§3, §4.3).
///
/// `lease_owner` is non-null iff `status = processing` (enforced by every
/// MetaStore operation that touches the lease, never by application code
/// reading the row after the fact).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct OcrJob {
    pub id: Uuid,
    pub document_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: OcrJobStatus,
    pub priority: i16,
    pub language: String,
    pub engine: String,
    pub options: JsonValue,
    pub retry_count: i32,
    pub max_retries: i32,
    pub result: Option<JsonValue>,
    pub extracted_text: Option<String>,
    pub confidence_score: Option<f64>,
    pub page_count: Option<i32>,
    pub word_count: Option<i32>,
    pub character_count: Option<i32>,
    pub error_message: Option<String>,
    pub error_code: Option<String>,
    pub lease_owner: Option<String>,
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub processing_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OcrJob {
    /// `options._not_before` is the scheduler's visibility timeout (§4.3, §9).
    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.options
            .get("_not_before")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Options accepted when enqueuing a new job.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnqueueOptions {
    #[serde(default = "default_priority")]
    pub priority: i16,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_engine")]
    pub engine: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: i32,
    #[serde(default)]
    pub extra: JsonValue,
}

fn default_priority() -> i16 {
    5
}
fn default_language() -> String {
    "auto".to_string()
}
fn default_engine() -> String {
    "default".to_string()
}
fn default_max_retries() -> i32 {
    3
}

impl Default for EnqueueOptions {
    fn default() -> Self {
        Self {
            priority: default_priority(),
            language: default_language(),
            engine: default_engine(),
            max_retries: default_max_retries(),
            extra: JsonValue::Object(Default::default()),
        }
    }
}

/// The `OcrService.process` result applied by `completeJob` (§4.2, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OcrResult {
    pub text: String,
    pub confidence: f64,
    pub page_count: i32,
    pub word_count: i32,
    pub character_count: i32,
    pub language: Option<String>,
    pub raw: JsonValue,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, ToSchema)]
pub struct OcrJobFilter {
    pub status: Option<OcrJobStatus>,
    pub document_id: Option<Uuid>,
}
