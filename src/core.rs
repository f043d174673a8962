use std::sync::Arc;

use crate::blob::LocalFsBlobStore;
#[cfg(feature = "s3")]
use crate::blob::{s3::S3Config, S3BlobStore};
use crate::config::Config;
use crate::db::access_log::AccessLogger;
use crate::db::Database;
use crate::document_service::DocumentService;
use crate::ocr::queue::OcrQueue;
use crate::ocr::TesseractEngine;
use crate::ports::blob::BlobStore;
use crate::ports::ocr_engine::OCREngine;
use crate::storage::StorageService;

/// Wires up every collaborator the core needs, the way the teacher assembles
/// `AppState` in `lib.rs`/`main.rs` — but without a process-wide singleton: a
/// `Core` is an explicit value the binary builds once and threads through,
/// per §9's guidance against global state.
#[derive(Clone)]
pub struct Core {
    pub db: Database,
    pub document_service: DocumentService,
    pub ocr_queue: Arc<OcrQueue>,
    pub access_log: Arc<AccessLogger>,
    pub config: Config,
}

const ACCESS_LOG_BACKLOG_CAPACITY: usize = 1024;

impl Core {
    pub async fn bootstrap(config: Config) -> anyhow::Result<Self> {
        let db = Database::new(&config.database_url).await?;
        db.migrate().await?;

        let blob: Arc<dyn BlobStore> = build_blob_store(&config);
        let engine: Arc<dyn OCREngine> = Arc::new(TesseractEngine::new());

        let storage = StorageService::new(blob.clone(), config.storage_bucket.clone());
        let ocr_queue = Arc::new(OcrQueue::new(db.clone(), engine, blob, config.clone()));
        let access_log = Arc::new(AccessLogger::new(db.clone(), ACCESS_LOG_BACKLOG_CAPACITY));

        let document_service = DocumentService::new(
            db.clone(),
            storage,
            ocr_queue.clone(),
            access_log.clone(),
            &config,
        );

        Ok(Self {
            db,
            document_service,
            ocr_queue,
            access_log,
            config,
        })
    }

    /// Spawns the background tasks that keep the queue alive: worker loop,
    /// lease sweeper, and access-log backlog drain, mirroring the teacher's
    /// `ocr_runtime.spawn(...)` maintenance tasks in `main.rs`.
    pub fn spawn_background_tasks(&self) {
        tokio::spawn(self.ocr_queue.clone().run());
        tokio::spawn(self.ocr_queue.clone().run_lease_sweeper());

        let access_log = self.access_log.clone();
        let interval = self.config.sweeper_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                access_log.drain_backlog().await;
            }
        });
    }
}

#[cfg(not(feature = "s3"))]
fn build_blob_store(config: &Config) -> Arc<dyn BlobStore> {
    Arc::new(LocalFsBlobStore::new(config.storage_root.clone()))
}

#[cfg(feature = "s3")]
fn build_blob_store(config: &Config) -> Arc<dyn BlobStore> {
    if let Ok(bucket) = std::env::var("S3_BUCKET") {
        Arc::new(S3BlobStore::new(S3Config {
            bucket,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            access_key_id: std::env::var("S3_ACCESS_KEY_ID").unwrap_or_default(),
            secret_access_key: std::env::var("S3_SECRET_ACCESS_KEY").unwrap_or_default(),
            endpoint_url: std::env::var("S3_ENDPOINT_URL").ok(),
        }))
    } else {
        Arc::new(LocalFsBlobStore::new(config.storage_root.clone()))
    }
}
