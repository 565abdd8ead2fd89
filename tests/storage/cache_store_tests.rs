//! IngestCacheStore interface tests.
//!
//! These tests verify the contract of the IngestCacheStore trait.
//! Each storage implementation should run these tests.

use serde_json::json;

use rundown_ingest::storage::{IngestCacheStore, IngestDocumentKind, IngestWriteOp, StoredIngestDocument};

/// Create a part document belonging to `rundown_id`.
pub fn make_part_doc(rundown_id: &str, part: &str, modified: i64) -> StoredIngestDocument {
    StoredIngestDocument {
        id: format!("{rundown_id}_part_{part}"),
        rundown_id: rundown_id.to_string(),
        kind: IngestDocumentKind::Part,
        segment_id: Some(format!("{rundown_id}_segment_s1")),
        part_id: Some(format!("{rundown_id}_part_{part}")),
        modified,
        data: json!({ "externalId": part, "name": part, "rank": 0.0, "payload": { "n": modified } }),
    }
}

/// Create a rundown document.
pub fn make_rundown_doc(rundown_id: &str) -> StoredIngestDocument {
    StoredIngestDocument {
        id: rundown_id.to_string(),
        rundown_id: rundown_id.to_string(),
        kind: IngestDocumentKind::Rundown,
        segment_id: None,
        part_id: None,
        modified: 1,
        data: json!({ "externalId": rundown_id, "type": "mos", "name": "Show" }),
    }
}

fn upsert(docs: Vec<StoredIngestDocument>) -> Vec<IngestWriteOp> {
    docs.into_iter().map(IngestWriteOp::Upsert).collect()
}

// =============================================================================
// IngestCacheStore::load tests
// =============================================================================

pub async fn test_load_unknown_rundown<S: IngestCacheStore>(store: &S) {
    let docs = store
        .load("test_load_unknown")
        .await
        .expect("load should succeed");
    assert!(docs.is_empty(), "unknown rundown should have no documents");
}

pub async fn test_load_orders_by_id<S: IngestCacheStore>(store: &S) {
    let rundown = "test_load_order";
    store
        .bulk_write(
            rundown,
            upsert(vec![
                make_part_doc(rundown, "c", 1),
                make_rundown_doc(rundown),
                make_part_doc(rundown, "a", 1),
            ]),
        )
        .await
        .expect("write should succeed");

    let ids: Vec<_> = store
        .load(rundown)
        .await
        .expect("load should succeed")
        .into_iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(ids, [rundown.to_string(), format!("{rundown}_part_a"), format!("{rundown}_part_c")]);
}

// =============================================================================
// IngestCacheStore::bulk_write tests
// =============================================================================

pub async fn test_upsert_round_trips<S: IngestCacheStore>(store: &S) {
    let rundown = "test_upsert_round_trip";
    let docs = vec![make_rundown_doc(rundown), make_part_doc(rundown, "p1", 42)];

    store
        .bulk_write(rundown, upsert(docs.clone()))
        .await
        .expect("write should succeed");

    let loaded = store.load(rundown).await.expect("load should succeed");
    assert_eq!(loaded, docs, "documents should round-trip unchanged");
}

pub async fn test_upsert_replaces_existing<S: IngestCacheStore>(store: &S) {
    let rundown = "test_upsert_replace";
    store
        .bulk_write(rundown, upsert(vec![make_part_doc(rundown, "p1", 1)]))
        .await
        .expect("first write should succeed");
    store
        .bulk_write(rundown, upsert(vec![make_part_doc(rundown, "p1", 2)]))
        .await
        .expect("second write should succeed");

    let loaded = store.load(rundown).await.expect("load should succeed");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].modified, 2);
    assert_eq!(loaded[0].data["payload"], json!({ "n": 2 }));
}

pub async fn test_delete_removes_document<S: IngestCacheStore>(store: &S) {
    let rundown = "test_delete";
    store
        .bulk_write(
            rundown,
            upsert(vec![make_rundown_doc(rundown), make_part_doc(rundown, "p1", 1)]),
        )
        .await
        .expect("write should succeed");

    store
        .bulk_write(
            rundown,
            vec![
                IngestWriteOp::Delete(format!("{rundown}_part_p1")),
                IngestWriteOp::Delete(format!("{rundown}_part_missing")),
            ],
        )
        .await
        .expect("delete should succeed");

    let loaded = store.load(rundown).await.expect("load should succeed");
    assert_eq!(loaded, vec![make_rundown_doc(rundown)]);
}

pub async fn test_empty_batch<S: IngestCacheStore>(store: &S) {
    store
        .bulk_write("test_empty_batch", Vec::new())
        .await
        .expect("empty batch should succeed");
    assert!(store.load("test_empty_batch").await.unwrap().is_empty());
}

pub async fn test_rundowns_are_isolated<S: IngestCacheStore>(store: &S) {
    let a = "test_isolation_a";
    let b = "test_isolation_b";
    store
        .bulk_write(a, upsert(vec![make_rundown_doc(a), make_part_doc(a, "p1", 1)]))
        .await
        .expect("write a should succeed");
    store
        .bulk_write(b, upsert(vec![make_rundown_doc(b)]))
        .await
        .expect("write b should succeed");

    // Deleting an id of rundown a while scoped to b must not touch a.
    store
        .bulk_write(b, vec![IngestWriteOp::Delete(format!("{a}_part_p1"))])
        .await
        .expect("scoped delete should succeed");

    assert_eq!(store.load(a).await.unwrap().len(), 2);
    assert_eq!(store.load(b).await.unwrap().len(), 1);
}

pub async fn test_foreign_document_rejects_batch<S: IngestCacheStore>(store: &S) {
    let rundown = "test_foreign";
    let result = store
        .bulk_write(
            rundown,
            upsert(vec![
                make_part_doc(rundown, "p1", 1),
                make_part_doc("test_foreign_other", "p2", 1),
            ]),
        )
        .await;

    assert!(result.is_err(), "foreign document should be rejected");
    assert!(
        store.load(rundown).await.unwrap().is_empty(),
        "rejected batch must not be partially applied"
    );
    assert!(store.load("test_foreign_other").await.unwrap().is_empty());
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all IngestCacheStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_cache_store_tests {
    ($store:expr) => {
        use $crate::storage::cache_store_tests::*;

        // load tests
        test_load_unknown_rundown($store).await;
        println!("  test_load_unknown_rundown: PASSED");

        test_load_orders_by_id($store).await;
        println!("  test_load_orders_by_id: PASSED");

        // bulk_write tests
        test_upsert_round_trips($store).await;
        println!("  test_upsert_round_trips: PASSED");

        test_upsert_replaces_existing($store).await;
        println!("  test_upsert_replaces_existing: PASSED");

        test_delete_removes_document($store).await;
        println!("  test_delete_removes_document: PASSED");

        test_empty_batch($store).await;
        println!("  test_empty_batch: PASSED");

        // integration tests
        test_rundowns_are_isolated($store).await;
        println!("  test_rundowns_are_isolated: PASSED");

        test_foreign_document_rejects_batch($store).await;
        println!("  test_foreign_document_rejects_batch: PASSED");
    };
}
