mod common;

use doccore::models::EnqueueOptions;
use std::time::Duration;

/// S3: a worker leases a job and then "crashes" (never completes it). Once
/// the lease has expired, the sweeper reclaims it — bumping retry_count and
/// putting it back to pending — and a second worker can lease it.
#[tokio::test]
async fn expired_lease_is_reclaimed_with_incremented_retry_count() {
    let test_db = common::spin_up_postgres().await;

    let document_id = common::seed_document(&test_db.db).await;
    let job = test_db
        .db
        .enqueue_ocr_job(document_id, EnqueueOptions::default())
        .await
        .unwrap();

    let short_ttl = Duration::from_millis(50);
    let leased = test_db.db.lease_one_ocr_job("worker-1", short_ttl).await.unwrap().unwrap();
    assert_eq!(leased.id, job.id);
    assert_eq!(leased.retry_count, 0);

    tokio::time::sleep(Duration::from_millis(150)).await;

    let reclaimed = test_db.db.expire_ocr_leases().await.unwrap();
    assert_eq!(reclaimed, 1);

    let after_sweep = test_db.db.get_ocr_job(job.id).await.unwrap().unwrap();
    assert_eq!(after_sweep.status.to_string(), "pending");
    assert_eq!(after_sweep.retry_count, 1);
    assert!(after_sweep.lease_owner.is_none());

    let leased_again = test_db
        .db
        .lease_one_ocr_job("worker-2", Duration::from_secs(60))
        .await
        .unwrap()
        .expect("second worker can lease the reclaimed job");
    assert_eq!(leased_again.id, job.id);
}
