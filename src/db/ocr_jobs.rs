use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::db::Database;
use crate::errors::{DocumentError, OcrJobError};
use crate::models::{EnqueueOptions, OcrDocumentPatch, OcrJob, OcrJobFilter, OcrResult};

const JOB_FIELDS: &str = "id, document_id, status, priority, language, engine, options, \
    retry_count, max_retries, result, extracted_text, confidence_score, page_count, word_count, \
    character_count, error_message, error_code, lease_owner, lease_expires_at, \
    processing_started_at, processing_completed_at, created_at, updated_at";

impl Database {
    /// `enqueueJob` (§4.3). A document may only have one active (non-terminal)
    /// job at a time; callers are expected to check `Document.ocr_job_id`
    /// before calling this — the queue itself does not deduplicate. The
    /// back-link is only created if `documentLinkable(id)` holds in the same
    /// transaction as the insert: the document exists and is not deleted.
    pub async fn enqueue_ocr_job(
        &self,
        document_id: Uuid,
        opts: EnqueueOptions,
    ) -> Result<OcrJob, OcrJobError> {
        let mut tx = self.pool.begin().await?;

        let linkable = sqlx::query(
            "SELECT 1 FROM documents WHERE id = $1 AND deleted_at IS NULL FOR SHARE",
        )
        .bind(document_id)
        .fetch_optional(&mut *tx)
        .await?;

        if linkable.is_none() {
            return Err(OcrJobError::DocumentNotLinkable { document_id });
        }

        let query_str = format!(
            r#"
            INSERT INTO ocr_queue (document_id, priority, language, engine, options, max_retries)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {JOB_FIELDS}
            "#
        );

        let row = sqlx::query(&query_str)
            .bind(document_id)
            .bind(opts.priority)
            .bind(&opts.language)
            .bind(&opts.engine)
            .bind(&opts.extra)
            .bind(opts.max_retries)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(OcrJob::from_row(&row)?)
    }

    /// `leaseOneJob` (§4.3): atomically claims the oldest, highest-priority
    /// eligible job (priority ascending — 1 is highest, per convention) whose
    /// `options._not_before` has elapsed, skipping rows locked by other
    /// workers rather than blocking on them.
    pub async fn lease_one_ocr_job(
        &self,
        worker_id: &str,
        lease_ttl: std::time::Duration,
    ) -> Result<Option<OcrJob>, OcrJobError> {
        let mut tx = self.pool.begin().await?;

        let candidate = sqlx::query(
            r#"
            SELECT id FROM ocr_queue
            WHERE status = 'pending'
              AND (options->>'_not_before' IS NULL OR (options->>'_not_before')::timestamptz <= NOW())
            ORDER BY priority ASC, created_at ASC, id ASC
            FOR UPDATE SKIP LOCKED
            LIMIT 1
            "#,
        )
        .fetch_optional(&mut *tx)
        .await?;

        let job_id: Uuid = match candidate {
            Some(row) => row.get("id"),
            None => {
                tx.rollback().await?;
                return Ok(None);
            }
        };

        let lease_expires_at = Utc::now() + chrono::Duration::from_std(lease_ttl).unwrap_or_default();

        let row = sqlx::query(&format!(
            r#"
            UPDATE ocr_queue SET
                status = 'processing',
                lease_owner = $2,
                lease_expires_at = $3,
                processing_started_at = COALESCE(processing_started_at, NOW()),
                retry_count = retry_count,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {JOB_FIELDS}
            "#
        ))
        .bind(job_id)
        .bind(worker_id)
        .bind(lease_expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(OcrJob::from_row(&row)?))
    }

    /// `renewLease` — heartbeat extension (§4.3). Fails with `LeaseLost` if
    /// the caller is no longer the lease holder (expired and reclaimed, or
    /// never held it), so the worker knows to abort rather than keep working.
    pub async fn renew_ocr_lease(
        &self,
        job_id: Uuid,
        worker_id: &str,
        lease_ttl: std::time::Duration,
    ) -> Result<(), OcrJobError> {
        let lease_expires_at = Utc::now() + chrono::Duration::from_std(lease_ttl).unwrap_or_default();

        let result = sqlx::query(
            r#"
            UPDATE ocr_queue SET lease_expires_at = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'processing' AND lease_owner = $2
            "#,
        )
        .bind(job_id)
        .bind(worker_id)
        .bind(lease_expires_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() != 1 {
            return Err(OcrJobError::LeaseLost { id: job_id });
        }
        Ok(())
    }

    /// `completeJob` (§4.2, §4.3): commits the job's terminal `completed`
    /// state and the document's OCR fields in one transaction. Fails with
    /// `LeaseLost` if the caller no longer holds the lease.
    pub async fn complete_ocr_job(
        &self,
        job_id: Uuid,
        worker_id: &str,
        result: OcrResult,
    ) -> Result<(OcrJob, ()), OcrJobError> {
        let mut tx = self.pool.begin().await?;

        let job_row = sqlx::query(&format!(
            "SELECT {JOB_FIELDS} FROM ocr_queue WHERE id = $1 AND lease_owner = $2 AND status = 'processing' FOR UPDATE"
        ))
        .bind(job_id)
        .bind(worker_id)
        .fetch_optional(&mut *tx)
        .await?;

        let job = match job_row {
            Some(row) => OcrJob::from_row(&row)?,
            None => return Err(OcrJobError::LeaseLost { id: job_id }),
        };

        let result_json = serde_json::to_value(&result).unwrap_or(serde_json::Value::Null);

        let updated_row = sqlx::query(&format!(
            r#"
            UPDATE ocr_queue SET
                status = 'completed',
                lease_owner = NULL,
                lease_expires_at = NULL,
                result = $2,
                extracted_text = $3,
                confidence_score = $4,
                page_count = $5,
                word_count = $6,
                character_count = $7,
                processing_completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {JOB_FIELDS}
            "#
        ))
        .bind(job_id)
        .bind(&result_json)
        .bind(&result.text)
        .bind(result.confidence)
        .bind(result.page_count)
        .bind(result.word_count)
        .bind(result.character_count)
        .fetch_one(&mut *tx)
        .await?;

        let doc_patch = OcrDocumentPatch {
            ocr_job_id: job_id,
            ocr_text: Some(result.text.clone()),
            ocr_confidence: Some(result.confidence),
            ocr_language: result.language.clone(),
            ocr_page_count: Some(result.page_count),
            ocr_word_count: Some(result.word_count),
        };
        self.apply_ocr_completion(&mut tx, job.document_id, &doc_patch)
            .await
            .map_err(|e| match e {
                DocumentError::Database(db_err) => OcrJobError::Database(db_err),
                other => OcrJobError::EnginePermanent { message: other.to_string() },
            })?;

        tx.commit().await?;

        Ok((OcrJob::from_row(&updated_row)?, ()))
    }

    /// `failJob` (§4.3, §7): applies the retry-with-backoff transition back
    /// to `pending` when `retry_count < max_retries`, otherwise moves to the
    /// terminal `failed` state and marks the document `failed` too.
    pub async fn fail_ocr_job(
        &self,
        job_id: Uuid,
        worker_id: &str,
        error_message: &str,
        error_code: Option<&str>,
        backoff_delay: std::time::Duration,
    ) -> Result<OcrJob, OcrJobError> {
        let mut tx = self.pool.begin().await?;

        let job_row = sqlx::query(&format!(
            "SELECT {JOB_FIELDS} FROM ocr_queue WHERE id = $1 AND lease_owner = $2 AND status = 'processing' FOR UPDATE"
        ))
        .bind(job_id)
        .bind(worker_id)
        .fetch_optional(&mut *tx)
        .await?;

        let job = match job_row {
            Some(row) => OcrJob::from_row(&row)?,
            None => return Err(OcrJobError::LeaseLost { id: job_id }),
        };

        let new_retry_count = job.retry_count + 1;
        let will_retry = new_retry_count <= job.max_retries;

        let updated_row = if will_retry {
            let not_before: DateTime<Utc> = Utc::now() + chrono::Duration::from_std(backoff_delay).unwrap_or_default();
            let mut options = job.options.clone();
            if let Some(obj) = options.as_object_mut() {
                obj.insert(
                    "_not_before".to_string(),
                    serde_json::Value::String(not_before.to_rfc3339()),
                );
            }

            sqlx::query(&format!(
                r#"
                UPDATE ocr_queue SET
                    status = 'pending',
                    lease_owner = NULL,
                    lease_expires_at = NULL,
                    retry_count = $2,
                    options = $3,
                    error_message = $4,
                    error_code = $5,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING {JOB_FIELDS}
                "#
            ))
            .bind(job_id)
            .bind(new_retry_count)
            .bind(&options)
            .bind(error_message)
            .bind(error_code)
            .fetch_one(&mut *tx)
            .await?
        } else {
            sqlx::query(&format!(
                r#"
                UPDATE ocr_queue SET
                    status = 'failed',
                    lease_owner = NULL,
                    lease_expires_at = NULL,
                    retry_count = $2,
                    error_message = $3,
                    error_code = $4,
                    processing_completed_at = NOW(),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING {JOB_FIELDS}
                "#
            ))
            .bind(job_id)
            .bind(new_retry_count)
            .bind(error_message)
            .bind(error_code)
            .fetch_one(&mut *tx)
            .await?
        };

        if !will_retry {
            self.mark_document_ocr_failed(job.document_id)
                .await
                .map_err(|e| match e {
                    DocumentError::Database(db_err) => OcrJobError::Database(db_err),
                    other => OcrJobError::EnginePermanent { message: other.to_string() },
                })?;
        }

        tx.commit().await?;

        Ok(OcrJob::from_row(&updated_row)?)
    }

    /// `cancelJob` (§4.3). Only non-terminal jobs can be cancelled.
    pub async fn cancel_ocr_job(&self, job_id: Uuid) -> Result<OcrJob, OcrJobError> {
        let result = sqlx::query(&format!(
            r#"
            UPDATE ocr_queue SET
                status = 'cancelled',
                lease_owner = NULL,
                lease_expires_at = NULL,
                processing_completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'processing')
            RETURNING {JOB_FIELDS}
            "#
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        match result {
            Some(row) => Ok(OcrJob::from_row(&row)?),
            None => {
                let exists = sqlx::query("SELECT 1 FROM ocr_queue WHERE id = $1")
                    .bind(job_id)
                    .fetch_optional(&self.pool)
                    .await?;
                if exists.is_some() {
                    Err(OcrJobError::NotCancellable { id: job_id })
                } else {
                    Err(OcrJobError::NotFound { id: job_id })
                }
            }
        }
    }

    /// `expireLeases` — sweeper that reclaims jobs whose lease has expired
    /// without a heartbeat or completion (§4.3, §9). A reclaimed attempt
    /// counts against the retry budget the same as an explicit failure does
    /// (S3, invariant 2), so a worker that keeps crashing on the same job
    /// still exhausts `max_retries` and lands in `failed` rather than
    /// cycling forever.
    pub async fn expire_ocr_leases(&self) -> Result<u64, OcrJobError> {
        let mut tx = self.pool.begin().await?;

        let expired = sqlx::query(&format!(
            "SELECT {JOB_FIELDS} FROM ocr_queue WHERE status = 'processing' AND lease_expires_at < NOW() FOR UPDATE SKIP LOCKED"
        ))
        .fetch_all(&mut *tx)
        .await?;

        let mut reclaimed = 0u64;
        for row in expired {
            let job = OcrJob::from_row(&row)?;
            let new_retry_count = job.retry_count + 1;
            let will_retry = new_retry_count <= job.max_retries;

            if will_retry {
                sqlx::query(
                    r#"
                    UPDATE ocr_queue SET
                        status = 'pending',
                        lease_owner = NULL,
                        lease_expires_at = NULL,
                        retry_count = $2,
                        error_message = 'lease expired without completion',
                        error_code = 'LEASE_EXPIRED',
                        updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(job.id)
                .bind(new_retry_count)
                .execute(&mut *tx)
                .await?;
            } else {
                sqlx::query(
                    r#"
                    UPDATE ocr_queue SET
                        status = 'failed',
                        lease_owner = NULL,
                        lease_expires_at = NULL,
                        retry_count = $2,
                        error_message = 'lease expired without completion',
                        error_code = 'LEASE_EXPIRED',
                        processing_completed_at = NOW(),
                        updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(job.id)
                .bind(new_retry_count)
                .execute(&mut *tx)
                .await?;

                self.mark_document_ocr_failed(job.document_id).await.map_err(|e| match e {
                    DocumentError::Database(db_err) => OcrJobError::Database(db_err),
                    other => OcrJobError::EnginePermanent { message: other.to_string() },
                })?;
            }

            reclaimed += 1;
        }

        tx.commit().await?;
        Ok(reclaimed)
    }

    pub async fn get_ocr_job(&self, job_id: Uuid) -> Result<Option<OcrJob>, OcrJobError> {
        let query_str = format!("SELECT {JOB_FIELDS} FROM ocr_queue WHERE id = $1");
        let row = sqlx::query(&query_str).bind(job_id).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| OcrJob::from_row(&r)).transpose()?)
    }

    /// `listJobs(filter)` (§6.2): admin listing, newest first.
    pub async fn list_ocr_jobs(&self, filter: &OcrJobFilter) -> Result<Vec<OcrJob>, OcrJobError> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT ");
        query.push(JOB_FIELDS);
        query.push(" FROM ocr_queue WHERE 1=1");

        if let Some(status) = filter.status {
            query.push(" AND status = ");
            query.push_bind(status.to_string());
        }
        if let Some(document_id) = filter.document_id {
            query.push(" AND document_id = ");
            query.push_bind(document_id);
        }
        query.push(" ORDER BY created_at DESC, id DESC");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(OcrJob::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(OcrJobError::from)
    }

    /// Open (non-terminal) jobs hanging off a document, used by the hard-delete
    /// orchestration in `DocumentService::delete` (§4.5).
    pub async fn list_open_ocr_jobs_for_document(&self, document_id: Uuid) -> Result<Vec<OcrJob>, OcrJobError> {
        let query_str = format!(
            "SELECT {JOB_FIELDS} FROM ocr_queue WHERE document_id = $1 AND status IN ('pending', 'processing')"
        );
        let rows = sqlx::query(&query_str).bind(document_id).fetch_all(&self.pool).await?;
        rows.iter()
            .map(OcrJob::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(OcrJobError::from)
    }
}
