use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::db::Database;
use crate::errors::OcrJobError;
use crate::models::{EnqueueOptions, OcrJob, OcrJobFilter, OcrResult};
use crate::monitoring::request_throttler::RequestThrottler;
use crate::ports::blob::BlobStore;
use crate::ports::ocr_engine::{EngineErrorKind, OCREngine, OcrEngineError, RawOcrResult};

/// Result validation applied before a completed extraction is accepted
/// (§4.4): non-empty text (unless the engine positively reported none),
/// confidence in `[0,1]`, at least one page.
fn validate_ocr_result(raw: &RawOcrResult) -> Result<(), OcrEngineError> {
    if raw.text.trim().is_empty() && !raw.no_text {
        return Err(OcrEngineError::permanent("engine returned empty text without signaling no_text"));
    }
    if !(0.0..=1.0).contains(&raw.confidence) {
        return Err(OcrEngineError::permanent(format!(
            "engine returned confidence {} outside [0,1]",
            raw.confidence
        )));
    }
    if raw.page_count < 1 {
        return Err(OcrEngineError::permanent(format!(
            "engine returned page_count {} below 1",
            raw.page_count
        )));
    }
    Ok(())
}

/// Computes `backoff(n) = min(base * 2^(n-1) + jitter, max)` (§4.3, §9).
pub fn backoff_delay(retry_count: i32, base: Duration, max: Duration) -> Duration {
    let exp = base.saturating_mul(1u32 << retry_count.saturating_sub(1).clamp(0, 16) as u32);
    let jitter_ms = rand::thread_rng().gen_range(0..=1000u64);
    (exp + Duration::from_millis(jitter_ms)).min(max)
}

/// `OcrQueue` (§4.3): a worker pool that leases jobs, heartbeats their lease
/// while processing, and applies `completeJob`/`failJob` against `MetaStore`.
/// A background sweeper separately reclaims leases that a crashed worker
/// never renewed.
#[derive(Clone)]
pub struct OcrQueue {
    db: Database,
    engine: Arc<dyn OCREngine>,
    blob: Arc<dyn BlobStore>,
    config: Config,
    worker_id: String,
    throttler: Arc<RequestThrottler>,
    paused: Arc<AtomicBool>,
}

impl OcrQueue {
    pub fn new(db: Database, engine: Arc<dyn OCREngine>, blob: Arc<dyn BlobStore>, config: Config) -> Self {
        let worker_id = format!(
            "worker-{}-{}",
            hostname::get().unwrap_or_default().to_string_lossy(),
            Uuid::new_v4()
        );
        let throttler = Arc::new(RequestThrottler::new(
            config.worker_count.min(15),
            60,
            format!("ocr-processing-{worker_id}"),
        ));

        Self {
            db,
            engine,
            blob,
            config,
            worker_id,
            throttler,
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn enqueue(&self, document_id: Uuid, opts: EnqueueOptions) -> Result<OcrJob, OcrJobError> {
        let job = self.db.enqueue_ocr_job(document_id, opts).await?;
        info!("enqueued OCR job {} for document {}", job.id, document_id);
        Ok(job)
    }

    pub async fn cancel(&self, job_id: Uuid) -> Result<OcrJob, OcrJobError> {
        self.db.cancel_ocr_job(job_id).await
    }

    /// `listJobs(filter)` (§6.2).
    pub async fn list(&self, filter: &OcrJobFilter) -> Result<Vec<OcrJob>, OcrJobError> {
        self.db.list_ocr_jobs(filter).await
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        info!("OCR queue paused for worker {}", self.worker_id);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        info!("OCR queue resumed for worker {}", self.worker_id);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Drives the worker loop: lease a job, spawn it under the semaphore and
    /// throttler, repeat. Runs until the process is torn down.
    pub async fn run(self: Arc<Self>) -> ! {
        let semaphore = Arc::new(Semaphore::new(self.config.worker_count));

        info!(
            "starting OCR queue worker {} with {} concurrent slots",
            self.worker_id, self.config.worker_count
        );

        loop {
            if self.is_paused() {
                sleep(Duration::from_secs(5)).await;
                continue;
            }

            match self.db.lease_one_ocr_job(&self.worker_id, self.config.lease_ttl).await {
                Ok(Some(job)) => {
                    let permit = match semaphore.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => continue,
                    };
                    let this = self.clone();
                    tokio::spawn(async move {
                        match this.throttler.acquire_permit().await {
                            Ok(_throttle_permit) => {
                                if let Err(e) = this.process(job).await {
                                    error!("error processing OCR job: {e}");
                                }
                            }
                            Err(e) => {
                                warn!("failed to acquire throttling permit: {e}");
                            }
                        }
                        drop(permit);
                    });
                }
                Ok(None) => {
                    sleep(self.config.empty_poll_interval).await;
                }
                Err(e) => {
                    error!("error leasing OCR job: {e}");
                    sleep(self.config.empty_poll_interval).await;
                }
            }
        }
    }

    /// Periodically reclaims jobs whose lease expired without a heartbeat or
    /// completion (§4.3, §9). Meant to be spawned once per process.
    pub async fn run_lease_sweeper(self: Arc<Self>) -> ! {
        loop {
            sleep(self.config.sweeper_interval).await;
            match self.db.expire_ocr_leases().await {
                Ok(0) => {}
                Ok(n) => warn!("lease sweeper reclaimed {n} expired OCR job(s)"),
                Err(e) => error!("lease sweeper failed: {e}"),
            }
        }
    }

    async fn process(&self, job: OcrJob) -> Result<(), OcrJobError> {
        let document = match self.db.get_document(job.document_id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                warn!("OCR job {} references missing document {}", job.id, job.document_id);
                self.db
                    .fail_ocr_job(job.id, &self.worker_id, "document not found", Some("DOCUMENT_NOT_FOUND"), Duration::ZERO)
                    .await?;
                return Ok(());
            }
            Err(e) => return Err(OcrJobError::EnginePermanent { message: e.to_string() }),
        };

        let bytes = match self.load_bytes(&document.storage_key).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.db
                    .fail_ocr_job(job.id, &self.worker_id, &e, Some("STORAGE_READ_FAILED"), self.next_backoff(&job))
                    .await?;
                return Ok(());
            }
        };

        let heartbeat_handle = self.spawn_heartbeat(job.id);

        let deadline = self
            .config
            .lease_ttl
            .saturating_sub(self.config.lease_grace)
            .min(self.config.ocr_timeout);

        let extraction = self
            .engine
            .extract(&bytes, &document.mime_type, &job.options, deadline)
            .await
            .and_then(|raw| validate_ocr_result(&raw).map(|_| raw));

        heartbeat_handle.abort();

        match extraction {
            Ok(raw) => {
                let result = OcrResult {
                    text: raw.text,
                    confidence: raw.confidence,
                    page_count: raw.page_count,
                    word_count: raw.word_count,
                    character_count: 0,
                    language: raw.language,
                    raw: raw.raw,
                };
                match self.db.complete_ocr_job(job.id, &self.worker_id, result).await {
                    Ok(_) => info!("OCR job {} completed for document {}", job.id, job.document_id),
                    Err(OcrJobError::LeaseLost { id }) => {
                        warn!("lease lost while completing OCR job {id}, worker {} aborting", self.worker_id);
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) => {
                let (message, code, permanent) = match e.kind {
                    EngineErrorKind::Transient => (e.message, "OCR_ENGINE_TRANSIENT", false),
                    EngineErrorKind::Permanent => (e.message, "OCR_ENGINE_PERMANENT", true),
                };
                let backoff = if permanent { Duration::ZERO } else { self.next_backoff(&job) };
                match self
                    .db
                    .fail_ocr_job(job.id, &self.worker_id, &message, Some(code), backoff)
                    .await
                {
                    Ok(updated) => {
                        if updated.status.is_terminal() {
                            warn!("OCR job {} permanently failed: {}", job.id, message);
                        }
                    }
                    Err(OcrJobError::LeaseLost { id }) => {
                        warn!("lease lost while failing OCR job {id}, worker {} aborting", self.worker_id);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(())
    }

    fn next_backoff(&self, job: &OcrJob) -> Duration {
        backoff_delay(job.retry_count + 1, self.config.backoff_base, self.config.backoff_max)
    }

    /// Heartbeats the lease at `lease_ttl / 3` so long-running extractions
    /// don't get reclaimed by the sweeper out from under the worker (§4.3).
    fn spawn_heartbeat(&self, job_id: Uuid) -> tokio::task::JoinHandle<()> {
        let db = self.db.clone();
        let worker_id = self.worker_id.clone();
        let lease_ttl = self.config.lease_ttl;
        let interval = lease_ttl / 3;
        tokio::spawn(async move {
            loop {
                sleep(interval).await;
                if let Err(e) = db.renew_ocr_lease(job_id, &worker_id, lease_ttl).await {
                    warn!("lease renewal failed for job {job_id}: {e}");
                    break;
                }
            }
        })
    }

    async fn load_bytes(&self, storage_key: &str) -> Result<Vec<u8>, String> {
        self.blob
            .get(storage_key)
            .await
            .map_err(|e| format!("failed to read blob {storage_key}: {e}"))
    }
}
