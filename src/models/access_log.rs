use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum AccessType {
    #[serde(rename = "view")]
    View,
    #[serde(rename = "download")]
    Download,
    #[serde(rename = "upload")]
    Upload,
    #[serde(rename = "update")]
    Update,
    #[serde(rename = "delete")]
    Delete,
    #[serde(rename = "share")]
    Share,
    #[serde(rename = "copy")]
    Copy,
}

impl std::fmt::Display for AccessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AccessType::View => "view",
            AccessType::Download => "download",
            AccessType::Upload => "upload",
            AccessType::Update => "update",
            AccessType::Delete => "delete",
            AccessType::Share => "share",
            AccessType::Copy => "copy",
        };
        write!(f, "{s}")
    }
}

impl TryFrom<String> for AccessType {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "view" => Ok(AccessType::View),
            "download" => Ok(AccessType::Download),
            "upload" => Ok(AccessType::Upload),
            "update" => Ok(AccessType::Update),
            "delete" => Ok(AccessType::Delete),
            "share" => Ok(AccessType::Share),
            "copy" => Ok(AccessType::Copy),
            other => Err(format!("invalid access type: {other}")),
        }
    }
}

/// Append-only audit row (§3). Never updated or deleted from within the core.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AccessLog {
    pub id: Uuid,
    pub document_id: Uuid,
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub access_type: AccessType,
    pub success: bool,
    pub http_status_code: Option<i32>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub response_time_ms: Option<i32>,
    pub file_size_downloaded: Option<i64>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
    pub session_id: Option<String>,
    pub accessed_at: DateTime<Utc>,
}

/// Fields a caller supplies; `id`/`accessed_at` are assigned by MetaStore.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewAccessLog {
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub access_type: AccessType,
    pub success: bool,
    pub http_status_code: Option<i32>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub response_time_ms: Option<i32>,
    pub file_size_downloaded: Option<i64>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
    pub session_id: Option<String>,
}
