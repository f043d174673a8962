mod common;

use std::sync::Arc;

use doccore::db::access_log::AccessLogger;
use doccore::document_service::DocumentService;
use doccore::models::OcrResult;
use doccore::ocr::queue::OcrQueue;
use doccore::storage::StorageService;
use uuid::Uuid;

/// S1: upload with auto_ocr=true lands a pending job back-linked to the
/// document; completing that job atomically flips the document to
/// ocr_completed with the extracted text and bumps its version.
#[tokio::test]
async fn upload_then_worker_completion_updates_document_atomically() {
    let test_db = common::spin_up_postgres().await;
    let config = common::test_config();
    let dir = tempfile::tempdir().unwrap();

    let blob = Arc::new(doccore::blob::LocalFsBlobStore::new(dir.path()));
    let storage = StorageService::new(blob.clone(), config.storage_bucket.clone());
    let engine = common::StubEngine::succeeding("Invoice #42 total due $100");
    let queue = Arc::new(OcrQueue::new(test_db.db.clone(), engine, blob, config.clone()));
    let access_log = Arc::new(AccessLogger::new(test_db.db.clone(), 16));
    let svc = DocumentService::new(test_db.db.clone(), storage, queue, access_log, &config);

    let owner = Uuid::new_v4();
    let bytes = b"%PDF-1.4 fake invoice bytes";
    let document = svc
        .upload(owner, "inv.pdf", bytes, Some("application/pdf"), None, None, true)
        .await
        .expect("upload succeeds");

    assert_eq!(document.status.to_string(), "uploaded");
    assert!(!document.ocr_completed);
    assert!(document.storage_key.ends_with(&format!("/{}.pdf", document.file_hash)));
    assert!(document.storage_key.starts_with(&format!("documents/{owner}/")));

    let leased = test_db
        .db
        .lease_one_ocr_job("test-worker", config.lease_ttl)
        .await
        .unwrap()
        .expect("the auto-enqueued job is leasable");
    assert_eq!(leased.document_id, document.id);
    assert_eq!(leased.priority, 5);

    let result = OcrResult {
        text: "Invoice #42 total due $100".to_string(),
        confidence: 0.95,
        page_count: 1,
        word_count: 5,
        character_count: 27,
        language: Some("eng".to_string()),
        raw: serde_json::json!({}),
    };
    test_db
        .db
        .complete_ocr_job(leased.id, "test-worker", result)
        .await
        .expect("complete succeeds");

    let refreshed = test_db.db.get_document(document.id).await.unwrap().unwrap();
    assert!(refreshed.ocr_completed);
    assert_eq!(refreshed.ocr_text.as_deref(), Some("Invoice #42 total due $100"));
    assert_eq!(refreshed.ocr_confidence, Some(0.95));
    assert_eq!(refreshed.version, document.version + 1);
}
