use sqlx::FromRow;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, warn};
use uuid::Uuid;

use crate::db::Database;
use crate::models::{AccessLog, NewAccessLog};

const ACCESS_LOG_FIELDS: &str = "id, document_id, user_id, access_type, success, http_status_code, \
    error_code, error_message, response_time_ms, file_size_downloaded, ip_address, user_agent, \
    request_id, session_id, accessed_at";

impl Database {
    /// `appendAccessLog` (§3, §4, §7). The audit trail is append-only; callers
    /// never update or delete a row through this crate.
    pub async fn append_access_log(&self, entry: NewAccessLog) -> Result<AccessLog, sqlx::Error> {
        let query_str = format!(
            r#"
            INSERT INTO access_log (
                document_id, user_id, access_type, success, http_status_code, error_code,
                error_message, response_time_ms, file_size_downloaded, ip_address, user_agent,
                request_id, session_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {ACCESS_LOG_FIELDS}
            "#
        );

        let row = sqlx::query(&query_str)
            .bind(entry.document_id)
            .bind(entry.user_id)
            .bind(entry.access_type.to_string())
            .bind(entry.success)
            .bind(entry.http_status_code)
            .bind(&entry.error_code)
            .bind(&entry.error_message)
            .bind(entry.response_time_ms)
            .bind(entry.file_size_downloaded)
            .bind(&entry.ip_address)
            .bind(&entry.user_agent)
            .bind(&entry.request_id)
            .bind(&entry.session_id)
            .fetch_one(&self.pool)
            .await?;

        AccessLog::from_row(&row)
    }

    pub async fn list_access_log_for_document(&self, document_id: Uuid) -> Result<Vec<AccessLog>, sqlx::Error> {
        let query_str = format!(
            "SELECT {ACCESS_LOG_FIELDS} FROM access_log WHERE document_id = $1 ORDER BY accessed_at DESC"
        );
        let rows = sqlx::query(&query_str)
            .bind(document_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(AccessLog::from_row).collect()
    }
}

/// Wraps `append_access_log` with a bounded in-memory retry queue (§7): if the
/// database is briefly unavailable, audit entries queue up to a cap instead of
/// being dropped or blocking the caller's request path. The queue is drained
/// by a background task; entries beyond the cap are dropped with a warning
/// rather than growing unbounded.
pub struct AccessLogger {
    db: Database,
    backlog: Arc<Mutex<Vec<NewAccessLog>>>,
    capacity: usize,
}

impl AccessLogger {
    pub fn new(db: Database, capacity: usize) -> Self {
        Self {
            db,
            backlog: Arc::new(Mutex::new(Vec::new())),
            capacity,
        }
    }

    pub async fn record(&self, entry: NewAccessLog) {
        if let Err(e) = self.db.append_access_log(entry.clone()).await {
            warn!("access log write failed, queuing for retry: {e}");
            let mut backlog = self.backlog.lock().await;
            if backlog.len() >= self.capacity {
                error!(
                    "access log backlog at capacity ({}), dropping oldest entry",
                    self.capacity
                );
                backlog.remove(0);
            }
            backlog.push(entry);
        }
    }

    /// Drains as much of the backlog as the database will currently accept.
    /// Intended to be called periodically by the maintenance sweeper.
    pub async fn drain_backlog(&self) {
        let mut backlog = self.backlog.lock().await;
        if backlog.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut *backlog);
        for entry in pending {
            if let Err(e) = self.db.append_access_log(entry.clone()).await {
                warn!("access log retry failed, re-queuing: {e}");
                backlog.push(entry);
            }
        }
    }
}
