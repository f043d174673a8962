use sqlx::{Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::db::Database;
use crate::errors::DocumentError;
use crate::models::{
    Document, DocumentCursor, DocumentListFilter, DocumentPage, DocumentPatch, DocumentStatus,
    OcrDocumentPatch,
};

const DOCUMENT_FIELDS: &str = "id, file_name, original_filename, file_size, mime_type, file_type, \
    document_type, file_hash, storage_key, storage_bucket, owner_id, client_id, insurer_id, status, \
    version, etag, security_scan_status, virus_scan_status, content_validated, ocr_completed, \
    ocr_job_id, ocr_text, ocr_confidence, ocr_language, ocr_page_count, ocr_word_count, \
    download_count, last_accessed, tags, metadata, created_at, updated_at, deleted_at";

impl Database {
    /// `insertDocument` (§4.2). `storage_key` uniqueness is enforced by the
    /// schema; a violation surfaces as `DocumentError::DuplicateStorageKey`.
    pub async fn insert_document(&self, mut document: Document) -> Result<Document, DocumentError> {
        document.version = 1;
        document.etag = Document::compute_etag(document.id, document.version);

        let query_str = format!(
            r#"
            INSERT INTO documents (
                id, file_name, original_filename, file_size, mime_type, file_type, document_type,
                file_hash, storage_key, storage_bucket, owner_id, client_id, insurer_id, status,
                version, etag, security_scan_status, virus_scan_status, content_validated,
                ocr_completed, ocr_job_id, ocr_text, ocr_confidence, ocr_language, ocr_page_count,
                ocr_word_count, download_count, last_accessed, tags, metadata, created_at,
                updated_at, deleted_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18,
                $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31, $32, $33
            )
            RETURNING {DOCUMENT_FIELDS}
            "#
        );

        let row = sqlx::query(&query_str)
            .bind(document.id)
            .bind(&document.file_name)
            .bind(&document.original_filename)
            .bind(document.file_size)
            .bind(&document.mime_type)
            .bind(&document.file_type)
            .bind(&document.document_type)
            .bind(&document.file_hash)
            .bind(&document.storage_key)
            .bind(&document.storage_bucket)
            .bind(document.owner_id)
            .bind(document.client_id)
            .bind(document.insurer_id)
            .bind(document.status.to_string())
            .bind(document.version)
            .bind(&document.etag)
            .bind(document.security_scan_status.to_string())
            .bind(document.virus_scan_status.to_string())
            .bind(document.content_validated)
            .bind(document.ocr_completed)
            .bind(document.ocr_job_id)
            .bind(&document.ocr_text)
            .bind(document.ocr_confidence)
            .bind(&document.ocr_language)
            .bind(document.ocr_page_count)
            .bind(document.ocr_word_count)
            .bind(document.download_count)
            .bind(document.last_accessed)
            .bind(&document.tags)
            .bind(&document.metadata)
            .bind(document.created_at)
            .bind(document.updated_at)
            .bind(document.deleted_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e, "idx_documents_storage_key") {
                    DocumentError::DuplicateStorageKey
                } else {
                    DocumentError::Database(e)
                }
            })?;

        row_to_document(&row).map_err(DocumentError::Database)
    }

    /// `getDocument` (§4.2). Returns `Ok(None)` rather than an error so
    /// callers decide whether a missing document is a 404 or a no-op.
    pub async fn get_document(&self, id: Uuid) -> Result<Option<Document>, DocumentError> {
        let query_str = format!("SELECT {DOCUMENT_FIELDS} FROM documents WHERE id = $1");
        let row = sqlx::query(&query_str)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_document(&r)).transpose().map_err(DocumentError::Database)
    }

    /// `findByOwnerAndHash` — dedup candidate lookup (§3 invariants).
    pub async fn find_document_by_owner_and_hash(
        &self,
        owner_id: Uuid,
        file_hash: &str,
    ) -> Result<Option<Document>, DocumentError> {
        let query_str = format!(
            "SELECT {DOCUMENT_FIELDS} FROM documents \
             WHERE owner_id = $1 AND file_hash = $2 AND deleted_at IS NULL \
             ORDER BY created_at DESC LIMIT 1"
        );
        let row = sqlx::query(&query_str)
            .bind(owner_id)
            .bind(file_hash)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_document(&r)).transpose().map_err(DocumentError::Database)
    }

    /// `listDocumentsByOwner` with keyset pagination on `(created_at, id)` (§4.2).
    pub async fn list_documents_by_owner(
        &self,
        owner_id: Uuid,
        filter: &DocumentListFilter,
        cursor: Option<DocumentCursor>,
        page_size: i64,
    ) -> Result<DocumentPage, DocumentError> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT ");
        query.push(DOCUMENT_FIELDS);
        query.push(" FROM documents WHERE owner_id = ");
        query.push_bind(owner_id);

        if !filter.include_deleted {
            query.push(" AND deleted_at IS NULL");
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ");
            query.push_bind(status.to_string());
        }
        if let Some(mime_type) = &filter.mime_type {
            query.push(" AND mime_type = ");
            query.push_bind(mime_type.clone());
        }
        if let Some(cursor) = &cursor {
            query.push(" AND (created_at, id) > (");
            query.push_bind(cursor.created_at);
            query.push(", ");
            query.push_bind(cursor.id);
            query.push(")");
        }

        query.push(" ORDER BY created_at ASC, id ASC LIMIT ");
        query.push_bind(page_size + 1);

        let rows = query.build().fetch_all(&self.pool).await?;

        let mut items: Vec<Document> = rows
            .iter()
            .map(row_to_document)
            .collect::<Result<_, _>>()
            .map_err(DocumentError::Database)?;

        let next_cursor = if items.len() as i64 > page_size {
            items.truncate(page_size as usize);
            items.last().map(|d| DocumentCursor {
                created_at: d.created_at,
                id: d.id,
            })
        } else {
            None
        };

        Ok(DocumentPage { items, next_cursor })
    }

    /// `updateDocument` (§4.2, §6.4). Enforces the optimistic-concurrency
    /// precondition: the caller's `expected_etag` must match the current row
    /// or the update is rejected without being applied. `status` cannot be
    /// set to `deleted` here — that transition is exclusively `delete()`'s,
    /// which is why `deleted_at` is never touched by this query.
    pub async fn update_document(
        &self,
        id: Uuid,
        expected_etag: &str,
        patch: DocumentPatch,
    ) -> Result<Document, DocumentError> {
        if matches!(patch.status, Some(DocumentStatus::Deleted)) {
            return Err(DocumentError::Validation {
                message: "status cannot be set to deleted via update; use delete() instead".to_string(),
            });
        }

        let mut tx = self.pool.begin().await?;

        let current = sqlx::query(&format!("SELECT {DOCUMENT_FIELDS} FROM documents WHERE id = $1 FOR UPDATE"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let current = match current {
            Some(row) => row_to_document(&row).map_err(DocumentError::Database)?,
            None => return Err(DocumentError::NotFound { id }),
        };

        if current.is_deleted() {
            return Err(DocumentError::NotFound { id });
        }

        if current.etag != expected_etag {
            return Err(DocumentError::PreconditionFailed {
                expected: expected_etag.to_string(),
                actual: current.etag,
            });
        }

        let new_version = current.version + 1;
        let new_etag = Document::compute_etag(id, new_version);

        let file_name = patch.file_name.unwrap_or(current.file_name);
        let document_type = patch.document_type.or(current.document_type);
        let tags = patch.tags.unwrap_or(current.tags);
        let metadata = patch.metadata.unwrap_or(current.metadata);
        let status = patch.status.unwrap_or(current.status);
        let security_scan_status = patch.security_scan_status.unwrap_or(current.security_scan_status);
        let virus_scan_status = patch.virus_scan_status.unwrap_or(current.virus_scan_status);

        let row = sqlx::query(&format!(
            r#"
            UPDATE documents SET
                file_name = $2, document_type = $3, tags = $4, metadata = $5, status = $6,
                security_scan_status = $7, virus_scan_status = $8,
                version = $9, etag = $10, updated_at = NOW()
            WHERE id = $1
            RETURNING {DOCUMENT_FIELDS}
            "#
        ))
        .bind(id)
        .bind(&file_name)
        .bind(&document_type)
        .bind(&tags)
        .bind(&metadata)
        .bind(status.to_string())
        .bind(security_scan_status.to_string())
        .bind(virus_scan_status.to_string())
        .bind(new_version)
        .bind(&new_etag)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        row_to_document(&row).map_err(DocumentError::Database)
    }

    /// Applies the OCR-side fields of `completeJob` to the Document in the
    /// same transaction as the job completion (§4.2). Callers pass an open
    /// transaction so both mutations commit atomically.
    pub async fn apply_ocr_completion<'e>(
        &self,
        tx: &mut sqlx::Transaction<'e, Postgres>,
        document_id: Uuid,
        patch: &OcrDocumentPatch,
    ) -> Result<(), DocumentError> {
        let row = sqlx::query("SELECT version FROM documents WHERE id = $1 FOR UPDATE")
            .bind(document_id)
            .fetch_optional(&mut **tx)
            .await?;
        let version: i64 = match row {
            Some(r) => r.get("version"),
            None => return Err(DocumentError::NotFound { id: document_id }),
        };
        let new_version = version + 1;
        let new_etag = Document::compute_etag(document_id, new_version);

        sqlx::query(
            r#"
            UPDATE documents SET
                ocr_completed = TRUE,
                ocr_job_id = $2,
                ocr_text = $3,
                ocr_confidence = $4,
                ocr_language = $5,
                ocr_page_count = $6,
                ocr_word_count = $7,
                status = 'completed',
                version = $8,
                etag = $9,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(document_id)
        .bind(patch.ocr_job_id)
        .bind(&patch.ocr_text)
        .bind(patch.ocr_confidence)
        .bind(&patch.ocr_language)
        .bind(patch.ocr_page_count)
        .bind(patch.ocr_word_count)
        .bind(new_version)
        .bind(&new_etag)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Marks the document `failed` after its OCR job exhausts retries.
    pub async fn mark_document_ocr_failed(&self, document_id: Uuid) -> Result<(), DocumentError> {
        let row = sqlx::query("SELECT version FROM documents WHERE id = $1")
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await?;
        let version: i64 = match row {
            Some(r) => r.get("version"),
            None => return Err(DocumentError::NotFound { id: document_id }),
        };
        let new_version = version + 1;
        let new_etag = Document::compute_etag(document_id, new_version);

        sqlx::query(
            "UPDATE documents SET status = 'failed', version = $2, etag = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(document_id)
        .bind(new_version)
        .bind(&new_etag)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// `softDelete` (§4.2, §3 invariants).
    pub async fn soft_delete_document(&self, id: Uuid) -> Result<(), DocumentError> {
        let row = sqlx::query("SELECT version FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let version: i64 = match row {
            Some(r) => r.get("version"),
            None => return Err(DocumentError::NotFound { id }),
        };
        let new_version = version + 1;
        let new_etag = Document::compute_etag(id, new_version);

        sqlx::query(
            "UPDATE documents SET status = 'deleted', deleted_at = NOW(), version = $2, etag = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(new_version)
        .bind(&new_etag)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// `hardDelete` (§4.2): drops the row outright. Called from
    /// `DocumentService::delete` once open OCR jobs are cancelled and the
    /// blob is gone; never used to implement `softDelete`.
    pub async fn hard_delete_document(&self, id: Uuid) -> Result<(), DocumentError> {
        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// `incrementAccessCounters` (§4.2): `download_count` is monotonic,
    /// `last_accessed` tracks the most recent access.
    pub async fn increment_access_counters(&self, id: Uuid) -> Result<(), DocumentError> {
        sqlx::query(
            "UPDATE documents SET download_count = download_count + 1, last_accessed = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Sums live (non-deleted) storage use for an owner, for quota checks (§7 QuotaExceeded).
    pub async fn sum_owner_storage_bytes(&self, owner_id: Uuid) -> Result<i64, DocumentError> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(file_size), 0)::BIGINT AS total FROM documents WHERE owner_id = $1 AND deleted_at IS NULL",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("total"))
    }
}

fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .constraint()
            .map(|c| c == constraint)
            .unwrap_or(false),
        _ => false,
    }
}

fn row_to_document(row: &sqlx::postgres::PgRow) -> Result<Document, sqlx::Error> {
    use sqlx::FromRow;
    Document::from_row(row)
}
