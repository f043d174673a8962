mod common;

use doccore::models::EnqueueOptions;
use std::time::Duration;

/// S4: a job with max_retries=3 whose engine always fails permanently goes
/// pending -> processing three times, then on the third failure (retry_count
/// reaching max_retries) transitions to the terminal `failed` state, and the
/// document (which had no prior completed OCR) is marked failed too.
#[tokio::test]
async fn exhausting_retries_fails_the_job_and_the_document() {
    let test_db = common::spin_up_postgres().await;

    let document_id = common::seed_document(&test_db.db).await;
    let opts = EnqueueOptions { max_retries: 3, ..EnqueueOptions::default() };
    let job = test_db.db.enqueue_ocr_job(document_id, opts).await.unwrap();

    for attempt in 1..=3 {
        let leased = test_db
            .db
            .lease_one_ocr_job("worker", Duration::from_secs(60))
            .await
            .unwrap()
            .expect("job is leasable before its final failure");
        assert_eq!(leased.id, job.id);

        let failed = test_db
            .db
            .fail_ocr_job(job.id, "worker", "engine exploded", Some("ENGINE_PERMANENT"), Duration::ZERO)
            .await
            .unwrap();

        if attempt < 3 {
            assert_eq!(failed.status.to_string(), "pending");
            assert_eq!(failed.retry_count, attempt);
        } else {
            assert_eq!(failed.status.to_string(), "failed");
            assert_eq!(failed.retry_count, 3);
        }
    }

    let document = test_db.db.get_document(document_id).await.unwrap().unwrap();
    assert_eq!(document.status.to_string(), "failed");
    assert!(!document.ocr_completed);

    // A fourth lease attempt finds nothing: the job is terminal.
    let nothing = test_db.db.lease_one_ocr_job("worker", Duration::from_secs(60)).await.unwrap();
    assert!(nothing.is_none());
}
