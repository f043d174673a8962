mod common;

use doccore::models::EnqueueOptions;

fn opts(priority: i16) -> EnqueueOptions {
    EnqueueOptions { priority, ..EnqueueOptions::default() }
}

/// S2: three pending jobs J1(priority=9), J2(priority=1), J3(priority=1),
/// enqueued in that order. A single worker must lease them J2, J3, J1 —
/// lower priority number first, ties broken by enqueue order.
#[tokio::test]
async fn lower_priority_number_and_earlier_enqueue_time_win() {
    let test_db = common::spin_up_postgres().await;
    let config = common::test_config();

    let doc1 = common::seed_document(&test_db.db).await;
    let doc2 = common::seed_document(&test_db.db).await;
    let doc3 = common::seed_document(&test_db.db).await;

    let j1 = test_db.db.enqueue_ocr_job(doc1, opts(9)).await.unwrap();
    let j2 = test_db.db.enqueue_ocr_job(doc2, opts(1)).await.unwrap();
    let j3 = test_db.db.enqueue_ocr_job(doc3, opts(1)).await.unwrap();

    let first = test_db.db.lease_one_ocr_job("w1", config.lease_ttl).await.unwrap().unwrap();
    let second = test_db.db.lease_one_ocr_job("w1", config.lease_ttl).await.unwrap().unwrap();
    let third = test_db.db.lease_one_ocr_job("w1", config.lease_ttl).await.unwrap().unwrap();

    assert_eq!(first.id, j2.id);
    assert_eq!(second.id, j3.id);
    assert_eq!(third.id, j1.id);
}
