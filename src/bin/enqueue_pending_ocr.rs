//! Sweeps for documents that never got an OCR job queued (e.g. a migration
//! reset their status, or `auto_ocr` was skipped at upload time) and enqueues
//! one for each, with priority assigned by file size so small documents jump
//! the line ahead of large ones.

use anyhow::Result;
use sqlx::Row;
use tracing::{error, info, warn};
use uuid::Uuid;

use doccore::{config::Config, db::Database, models::EnqueueOptions};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    info!("scanning for documents missing an OCR job...");

    let config = Config::from_env()?;
    let db = Database::new(&config.database_url).await?;

    let rows = sqlx::query(
        r#"
        SELECT d.id, d.original_filename, d.file_size, d.mime_type
        FROM documents d
        LEFT JOIN ocr_queue oq
          ON oq.document_id = d.id
         AND oq.status IN ('pending', 'processing')
        WHERE d.deleted_at IS NULL
          AND d.ocr_completed = FALSE
          AND oq.document_id IS NULL
        ORDER BY d.created_at ASC
        "#,
    )
    .fetch_all(db.get_pool())
    .await?;

    if rows.is_empty() {
        info!("no documents need an OCR job queued");
        return Ok(());
    }

    info!("found {} document(s) missing an OCR job", rows.len());

    let mut queued = 0usize;
    let mut failed = 0usize;

    for row in &rows {
        let document_id: Uuid = row.get("id");
        let filename: String = row.get("original_filename");
        let file_size: i64 = row.get("file_size");
        let mime_type: String = row.get("mime_type");

        // 1 is highest priority; larger files yield to smaller ones.
        let priority: i16 = match file_size {
            0..=1_048_576 => 1,
            ..=5_242_880 => 2,
            ..=10_485_760 => 3,
            ..=52_428_800 => 4,
            _ => 5,
        };

        let opts = EnqueueOptions {
            priority,
            language: config.ocr_language.clone(),
            engine: "default".to_string(),
            max_retries: config.max_retries,
            extra: serde_json::json!({}),
        };

        match db.enqueue_ocr_job(document_id, opts).await {
            Ok(job) => {
                let size_mb = file_size as f64 / (1024.0 * 1024.0);
                info!(
                    "queued job {} for {} ({mime_type}, {size_mb:.2} MB, priority {priority})",
                    job.id, filename
                );
                queued += 1;
            }
            Err(e) => {
                warn!("failed to queue {filename} ({document_id}): {e}");
                failed += 1;
            }
        }
    }

    info!("done: {queued} queued, {failed} failed");
    if failed > 0 {
        error!("{failed} document(s) could not be queued, see warnings above");
    }

    Ok(())
}
