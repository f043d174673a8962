mod common;

use std::sync::Arc;

use doccore::db::access_log::AccessLogger;
use doccore::document_service::DocumentService;
use doccore::ocr::queue::OcrQueue;
use doccore::storage::StorageService;
use uuid::Uuid;

/// S6: uploading identical bytes twice for the same owner must not create a
/// second storage object. This crate's chosen resolution returns the
/// existing document rather than inserting a duplicate row.
#[tokio::test]
async fn reuploading_identical_bytes_reuses_the_existing_document_and_blob() {
    let test_db = common::spin_up_postgres().await;
    let config = common::test_config();
    let dir = tempfile::tempdir().unwrap();

    let blob = Arc::new(doccore::blob::LocalFsBlobStore::new(dir.path()));
    let storage = StorageService::new(blob.clone(), config.storage_bucket.clone());
    let engine = common::StubEngine::succeeding("irrelevant");
    let queue = Arc::new(OcrQueue::new(test_db.db.clone(), engine, blob, config.clone()));
    let access_log = Arc::new(AccessLogger::new(test_db.db.clone(), 16));
    let svc = DocumentService::new(test_db.db.clone(), storage, queue, access_log, &config);

    let owner = Uuid::new_v4();
    let bytes = b"the quick brown fox";

    let first = svc
        .upload(owner, "a.txt", bytes, Some("text/plain"), None, None, false)
        .await
        .expect("first upload succeeds");
    let second = svc
        .upload(owner, "a-again.txt", bytes, Some("text/plain"), None, None, false)
        .await
        .expect("second upload succeeds");

    assert_eq!(first.id, second.id);
    assert_eq!(first.storage_key, second.storage_key);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE owner_id = $1 AND file_hash = $2")
        .bind(owner)
        .bind(&first.file_hash)
        .fetch_one(test_db.db.get_pool())
        .await
        .unwrap();
    assert_eq!(count, 1);

    let blob_path = dir.path().join(&first.storage_key);
    assert!(blob_path.exists(), "blob should exist at its content-addressed path");
}
