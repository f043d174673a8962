use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::db::access_log::AccessLogger;
use crate::db::Database;
use crate::errors::document::DocumentError;
use crate::errors::AppError;
use crate::models::{
    AccessType, Document, DocumentCursor, DocumentListFilter, DocumentPage, DocumentPatch,
    DocumentStatus, EnqueueOptions, NewAccessLog, Principal, ScanStatus,
};
use crate::ocr::queue::OcrQueue;
use crate::storage::StorageService;
use crate::validation::ValidationService;

/// `delete(id, mode, principal)` (§4.5): soft delete just flips `status` via
/// `softDelete`; hard delete also reclaims the OCR jobs and blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    Soft,
    Hard,
}

/// Orchestrates upload/get/download/update/delete the way the teacher's
/// document routes drive `db::documents`, `FileService` and the OCR queue
/// (§4.5). Every mutating path writes an access-log entry, success or not.
#[derive(Clone)]
pub struct DocumentService {
    db: Database,
    storage: StorageService,
    validation: ValidationService,
    queue: Arc<OcrQueue>,
    access_log: Arc<AccessLogger>,
    owner_quota_bytes: i64,
    presign_ttl_max: u64,
}

impl DocumentService {
    pub fn new(
        db: Database,
        storage: StorageService,
        queue: Arc<OcrQueue>,
        access_log: Arc<AccessLogger>,
        config: &Config,
    ) -> Self {
        Self {
            db,
            storage,
            validation: ValidationService::new(config),
            queue,
            access_log,
            owner_quota_bytes: config.owner_quota_bytes,
            presign_ttl_max: config.presign_ttl_max.as_secs(),
        }
    }

    /// `uploadDocument` (§4.5). Re-uploading identical bytes for the same
    /// owner returns the existing live document rather than creating a
    /// second metadata row pointing at the same blob (the dedup policy
    /// decided for the re-upload Open Question): the storage layer already
    /// dedupes content, and a second row would just be a redundant pointer
    /// with no distinguishing data.
    pub async fn upload(
        &self,
        owner_id: Uuid,
        filename: &str,
        bytes: &[u8],
        declared_mime: Option<&str>,
        client_id: Option<Uuid>,
        insurer_id: Option<Uuid>,
        auto_ocr: bool,
    ) -> Result<Document, DocumentError> {
        let start = Instant::now();
        let sanitized_name = ValidationService::sanitize_filename(filename);
        let mime_type = self.validation.validate_upload(bytes, &sanitized_name, declared_mime)?;

        let used = self.db.sum_owner_storage_bytes(owner_id).await?;
        if used + bytes.len() as i64 > self.owner_quota_bytes {
            let err = DocumentError::QuotaExceeded {
                owner_id,
                used,
                requested: bytes.len() as i64,
                limit: self.owner_quota_bytes,
            };
            self.log_access(owner_id, None, AccessType::Upload, false, Some(&err), start).await;
            return Err(err);
        }

        let hash = StorageService::hash_bytes(bytes);
        if let Some(existing) = self.db.find_document_by_owner_and_hash(owner_id, &hash).await? {
            info!("upload for owner {owner_id} matches existing document {} by content hash", existing.id);
            self.log_access(owner_id, Some(existing.id), AccessType::Upload, true, None, start).await;
            return Ok(existing);
        }

        let stored = self
            .storage
            .store(owner_id, &sanitized_name, bytes, &mime_type)
            .await
            .map_err(|e| DocumentError::Upstream { message: e.to_string(), retryable: true })?;

        let extension = std::path::Path::new(&sanitized_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_string();

        let now = chrono::Utc::now();
        let document = Document {
            id: Uuid::new_v4(),
            file_name: sanitized_name.clone(),
            original_filename: filename.to_string(),
            file_size: stored.size,
            mime_type: stored.mime_type.clone(),
            file_type: extension,
            document_type: None,
            file_hash: stored.hash,
            storage_key: stored.key,
            storage_bucket: stored.bucket,
            owner_id,
            client_id,
            insurer_id,
            status: DocumentStatus::Uploaded,
            version: 1,
            etag: String::new(),
            security_scan_status: ScanStatus::Pending,
            virus_scan_status: ScanStatus::Pending,
            content_validated: true,
            ocr_completed: false,
            ocr_job_id: None,
            ocr_text: None,
            ocr_confidence: None,
            ocr_language: None,
            ocr_page_count: None,
            ocr_word_count: None,
            download_count: 0,
            last_accessed: None,
            tags: Vec::new(),
            metadata: serde_json::json!({}),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let inserted = self.db.insert_document(document).await?;

        if auto_ocr {
            match self.queue.enqueue(inserted.id, EnqueueOptions::default()).await {
                Ok(job) => info!("auto-enqueued OCR job {} for document {}", job.id, inserted.id),
                Err(e) => warn!("failed to auto-enqueue OCR for document {}: {e}", inserted.id),
            }
        }

        self.log_access(owner_id, Some(inserted.id), AccessType::Upload, true, None, start).await;
        Ok(inserted)
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> Result<Document, DocumentError> {
        let doc = self.db.get_document(id).await?.ok_or(DocumentError::NotFound { id })?;
        self.authorize(principal, &doc)?;
        Ok(doc)
    }

    /// `downloadDocument` (§4.5). Increments `download_count`/`last_accessed`
    /// and appends an access-log entry regardless of outcome.
    pub async fn download(&self, principal: &Principal, id: Uuid) -> Result<(Document, Vec<u8>), DocumentError> {
        let start = Instant::now();
        let doc = match self.db.get_document(id).await? {
            Some(doc) => doc,
            None => {
                self.log_access(principal.user_id, Some(id), AccessType::Download, false, None, start).await;
                return Err(DocumentError::NotFound { id });
            }
        };

        if let Err(e) = self.authorize(principal, &doc) {
            self.log_access(principal.user_id, Some(id), AccessType::Download, false, Some(&e), start).await;
            return Err(e);
        }

        let bytes = self.storage.retrieve(&doc.storage_key).await.map_err(|e| DocumentError::Upstream {
            message: e.to_string(),
            retryable: true,
        });

        match bytes {
            Ok(bytes) => {
                self.db.increment_access_counters(id).await?;
                self.log_access(principal.user_id, Some(id), AccessType::Download, true, None, start).await;
                Ok((doc, bytes))
            }
            Err(e) => {
                self.log_access(principal.user_id, Some(id), AccessType::Download, false, Some(&e), start).await;
                Err(e)
            }
        }
    }

    pub async fn presign_download(&self, principal: &Principal, id: Uuid, ttl_secs: u64) -> Result<String, DocumentError> {
        let doc = self.get(principal, id).await?;
        let ttl = ttl_secs.min(self.presign_ttl_max);
        let presigned = self
            .storage
            .presign_download(&doc.storage_key, ttl)
            .await
            .map_err(|e| DocumentError::Upstream { message: e.to_string(), retryable: true })?;
        Ok(presigned.url)
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        expected_etag: &str,
        patch: DocumentPatch,
    ) -> Result<Document, DocumentError> {
        let current = self.db.get_document(id).await?.ok_or(DocumentError::NotFound { id })?;
        self.authorize(principal, &current)?;
        let updated = self.db.update_document(id, expected_etag, patch).await?;
        self.log_access(principal.user_id, Some(id), AccessType::Update, true, None, Instant::now()).await;
        Ok(updated)
    }

    pub async fn delete(&self, principal: &Principal, id: Uuid, mode: DeleteMode) -> Result<(), DocumentError> {
        let start = Instant::now();
        let current = self.db.get_document(id).await?.ok_or(DocumentError::NotFound { id })?;
        self.authorize(principal, &current)?;

        let result = match mode {
            DeleteMode::Soft => self.db.soft_delete_document(id).await,
            DeleteMode::Hard => self.hard_delete(&current).await,
        };

        self.log_access(principal.user_id, Some(id), AccessType::Delete, result.is_ok(), result.as_ref().err(), start)
            .await;
        result
    }

    /// `cancelJob` on every open OcrJob -> `BlobStore.delete` -> `hardDelete`
    /// (§4.5). Job cancellation is best-effort and only logged on failure;
    /// the blob delete must succeed before the metadata row is dropped, so a
    /// failed blob delete leaves the document in place for the sweeper to
    /// retry rather than losing the pointer to an orphaned blob.
    async fn hard_delete(&self, document: &Document) -> Result<(), DocumentError> {
        let open_jobs = self.db.list_open_ocr_jobs_for_document(document.id).await.map_err(|e| {
            DocumentError::Upstream { message: e.to_string(), retryable: true }
        })?;
        for job in open_jobs {
            if let Err(e) = self.queue.cancel(job.id).await {
                warn!("failed to cancel OCR job {} before hard delete of document {}: {e}", job.id, document.id);
            }
        }

        self.storage
            .delete(&document.storage_key)
            .await
            .map_err(|e| DocumentError::Upstream { message: e.to_string(), retryable: true })?;

        self.db.hard_delete_document(document.id).await
    }

    pub async fn list(
        &self,
        principal: &Principal,
        owner_id: Uuid,
        filter: &DocumentListFilter,
        cursor: Option<DocumentCursor>,
        page_size: i64,
    ) -> Result<DocumentPage, DocumentError> {
        if !principal.can_access_owner(owner_id) {
            return Err(DocumentError::Forbidden { owner_id, id: owner_id });
        }
        self.db.list_documents_by_owner(owner_id, filter, cursor, page_size).await
    }

    fn authorize(&self, principal: &Principal, doc: &Document) -> Result<(), DocumentError> {
        if principal.can_access_owner(doc.owner_id) {
            Ok(())
        } else {
            Err(DocumentError::Forbidden { owner_id: doc.owner_id, id: doc.id })
        }
    }

    async fn log_access(
        &self,
        user_id: Uuid,
        document_id: Option<Uuid>,
        access_type: AccessType,
        success: bool,
        error: Option<&DocumentError>,
        start: Instant,
    ) {
        let Some(document_id) = document_id else { return };
        self.access_log
            .record(NewAccessLog {
                document_id,
                user_id,
                access_type,
                success,
                http_status_code: None,
                error_code: error.map(|e| e.error_code().to_string()),
                error_message: error.map(|e| e.to_string()),
                response_time_ms: Some(start.elapsed().as_millis() as i32),
                file_size_downloaded: None,
                ip_address: None,
                user_agent: None,
                request_id: None,
                session_id: None,
            })
            .await;
    }
}
