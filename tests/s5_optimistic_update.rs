mod common;

use doccore::errors::document::DocumentError;
use doccore::models::DocumentPatch;

/// S5: read a document's etag E1; a concurrent update A succeeds and moves
/// the etag to E2. A second update B presented with the stale E1 must fail
/// with PreconditionFailed, and the document's fields must be unchanged from
/// the state update A left behind.
#[tokio::test]
async fn stale_etag_is_rejected_and_leaves_state_untouched() {
    let test_db = common::spin_up_postgres().await;

    let document_id = common::seed_document(&test_db.db).await;
    let original = test_db.db.get_document(document_id).await.unwrap().unwrap();
    let e1 = original.etag.clone();

    let patch_a = DocumentPatch { file_name: Some("renamed-by-a.pdf".to_string()), ..Default::default() };
    let after_a = test_db.db.update_document(document_id, &e1, patch_a).await.expect("update A succeeds");
    assert_ne!(after_a.etag, e1);
    assert_eq!(after_a.file_name, "renamed-by-a.pdf");

    let patch_b = DocumentPatch { file_name: Some("renamed-by-b.pdf".to_string()), ..Default::default() };
    let result_b = test_db.db.update_document(document_id, &e1, patch_b).await;

    match result_b {
        Err(DocumentError::PreconditionFailed { expected, actual }) => {
            assert_eq!(expected, e1);
            assert_eq!(actual, after_a.etag);
        }
        other => panic!("expected PreconditionFailed, got {other:?}"),
    }

    let current = test_db.db.get_document(document_id).await.unwrap().unwrap();
    assert_eq!(current.file_name, "renamed-by-a.pdf");
    assert_eq!(current.etag, after_a.etag);
}
