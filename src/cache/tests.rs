use std::sync::Arc;

use serde_json::{json, Value};

use crate::storage::{IngestCacheStore, MockIngestCacheStore};
use crate::test_utils::{make_default_rundown, make_part, make_segment};

use super::*;

const RUNDOWN_ID: &str = "studio0_rundown0";

async fn new_cache(store: &Arc<MockIngestCacheStore>) -> NrcsIngestDataCache<Value> {
    let store: Arc<dyn IngestCacheStore> = store.clone();
    NrcsIngestDataCache::create(store, RUNDOWN_ID).await.unwrap()
}

#[tokio::test]
async fn test_fetch_rundown_on_empty_cache_is_none() {
    let store = Arc::new(MockIngestCacheStore::new());
    let cache = new_cache(&store).await;

    assert!(cache.fetch_rundown().is_none());
    assert!(!cache.has_changes());
}

#[tokio::test]
async fn test_replace_save_and_reload_round_trips() {
    let store = Arc::new(MockIngestCacheStore::new());
    let rundown = make_default_rundown();

    let mut cache = new_cache(&store).await;
    cache.replace(&rundown);
    cache.save_to_database().await.unwrap();

    assert_eq!(store.stored_count(RUNDOWN_ID).await, 7);
    let stored = store
        .get_stored(RUNDOWN_ID, "studio0_rundown0_part_part2")
        .await
        .unwrap();
    assert_eq!(stored.segment_id.as_deref(), Some("studio0_rundown0_segment_segment1"));
    assert!(stored.modified > 0);

    let reloaded = new_cache(&store).await;
    assert_eq!(reloaded.fetch_rundown(), Some(rundown));
}

#[tokio::test]
async fn test_replace_only_marks_changed_documents() {
    let store = Arc::new(MockIngestCacheStore::new());
    let mut rundown = make_default_rundown();

    let mut cache = new_cache(&store).await;
    cache.replace(&rundown);
    cache.save_to_database().await.unwrap();

    rundown.segments[1].parts[0].payload = json!({ "story": "changed" });
    cache.replace(&rundown);

    let changed: Vec<_> = cache.changed_ids().collect();
    assert_eq!(changed, ["studio0_rundown0_part_part2"]);
}

#[tokio::test]
async fn test_replace_identical_tree_is_noop() {
    let store = Arc::new(MockIngestCacheStore::new());
    let rundown = make_default_rundown();

    let mut cache = new_cache(&store).await;
    cache.replace(&rundown);
    cache.save_to_database().await.unwrap();

    cache.replace(&rundown);
    assert!(!cache.has_changes());
    cache.save_to_database().await.unwrap();
    assert_eq!(store.write_count().await, 1);
}

#[tokio::test]
async fn test_replace_removes_dropped_documents() {
    let store = Arc::new(MockIngestCacheStore::new());
    let mut rundown = make_default_rundown();

    let mut cache = new_cache(&store).await;
    cache.replace(&rundown);
    cache.save_to_database().await.unwrap();

    rundown.segments.remove(0);
    cache.replace(&rundown);
    cache.save_to_database().await.unwrap();

    assert_eq!(store.stored_count(RUNDOWN_ID).await, 4);
    assert!(store
        .get_stored(RUNDOWN_ID, "studio0_rundown0_segment_segment0")
        .await
        .is_none());
    assert_eq!(new_cache(&store).await.fetch_rundown(), Some(rundown));
}

#[tokio::test]
async fn test_delete_removes_everything() {
    let store = Arc::new(MockIngestCacheStore::new());

    let mut cache = new_cache(&store).await;
    cache.replace(&make_default_rundown());
    cache.save_to_database().await.unwrap();

    cache.delete();
    assert!(cache.fetch_rundown().is_none());
    cache.save_to_database().await.unwrap();

    assert_eq!(store.stored_count(RUNDOWN_ID).await, 0);
}

#[tokio::test]
async fn test_failed_save_keeps_changes_for_retry() {
    let store = Arc::new(MockIngestCacheStore::new());

    let mut cache = new_cache(&store).await;
    cache.replace(&make_default_rundown());

    store.set_fail_on_write(true).await;
    assert!(cache.save_to_database().await.is_err());
    assert!(cache.has_changes());
    assert_eq!(store.stored_count(RUNDOWN_ID).await, 0);

    store.set_fail_on_write(false).await;
    cache.save_to_database().await.unwrap();
    assert!(!cache.has_changes());
    assert_eq!(store.stored_count(RUNDOWN_ID).await, 7);
}

#[tokio::test]
async fn test_piecemeal_replace_and_prune() {
    let store = Arc::new(MockIngestCacheStore::new());

    let mut cache = new_cache(&store).await;
    cache.replace(&make_default_rundown());
    cache.save_to_database().await.unwrap();

    let generator = cache.generator().clone();
    let segment = make_segment("segment0", 0.0, &["part0", "partX"]);
    let segment_doc = generator.generate_segment_object(&segment);
    let part_doc = generator.generate_part_object(&segment_doc.id, &make_part("partX", 1.0));

    let keep = [
        generator.rundown_object_id(),
        segment_doc.id.clone(),
        generator.part_object_id("part0"),
        part_doc.id.clone(),
    ];
    cache.replace_documents(vec![part_doc]);
    cache.remove_all_other_documents(keep.iter().map(String::as_str));
    cache.save_to_database().await.unwrap();

    let rundown = new_cache(&store).await.fetch_rundown().unwrap();
    assert_eq!(rundown.segments.len(), 1);
    let ids: Vec<_> = rundown.segments[0]
        .parts
        .iter()
        .map(|p| p.external_id.as_str())
        .collect();
    assert_eq!(ids, ["part0", "partX"]);
}

#[test]
fn test_document_ids_are_derived_from_rundown_id() {
    let generator = IngestCacheObjectGenerator::new("rd");
    assert_eq!(generator.rundown_object_id(), "rd");
    assert_eq!(generator.segment_object_id("s1"), "rd_segment_s1");
    assert_eq!(generator.part_object_id("p1"), "rd_part_p1");
}
