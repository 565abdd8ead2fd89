use std::collections::HashMap;

use serde_json::{json, Value};

use crate::config::IngestConfig;
use crate::model::{
    IngestChangeSource, IngestPart, IngestSegment, PartChange, RundownChange, SegmentChange,
};
use crate::storage::MockIngestCacheStore;
use crate::test_utils::{make_default_rundown, make_part, make_rundown_with_source, make_segment};

use super::*;

const RUNDOWN_ID: &str = "studio0_rundown0";

fn store() -> (Arc<MockIngestCacheStore>, Arc<dyn IngestCacheStore>) {
    let mock = Arc::new(MockIngestCacheStore::new());
    let store: Arc<dyn IngestCacheStore> = mock.clone();
    (mock, store)
}

async fn seed(store: &Arc<dyn IngestCacheStore>) {
    run_ingest_update_operation(store.clone(), &IngestConfig::default(), RUNDOWN_ID, |existing| {
        handle_updated_rundown(existing, make_default_rundown())
    })
    .await
    .unwrap();
}

async fn run<F>(store: &Arc<dyn IngestCacheStore>, update: F) -> Result<Option<IngestUpdateOutcome>>
where
    F: FnOnce(Option<IngestRundownWithSource<Value>>) -> Result<UpdateIngestRundownResult<Value>>,
{
    run_ingest_update_operation(store.clone(), &IngestConfig::default(), RUNDOWN_ID, update).await
}

fn expect_changes(outcome: Option<IngestUpdateOutcome>) -> IngestChangeDetails {
    match outcome {
        Some(IngestUpdateOutcome::Updated { changes, .. }) => changes,
        other => panic!("expected an update, got {other:?}"),
    }
}

async fn cached(store: &Arc<dyn IngestCacheStore>) -> Option<IngestRundownWithSource<Value>> {
    crate::cache::NrcsIngestDataCache::<Value>::create(store.clone(), RUNDOWN_ID)
        .await
        .unwrap()
        .fetch_rundown()
}

mod runner {
    use super::*;

    #[tokio::test]
    async fn test_first_update_regenerates_and_persists() {
        let (mock, store) = store();

        let outcome = run(&store, |existing| {
            assert!(existing.is_none());
            handle_updated_rundown(existing, make_default_rundown())
        })
        .await
        .unwrap();

        assert!(expect_changes(outcome).is_regenerate());
        assert_eq!(mock.stored_count(RUNDOWN_ID).await, 7);
    }

    #[tokio::test]
    async fn test_identical_update_writes_nothing() {
        let (mock, store) = store();
        seed(&store).await;

        let outcome = run(&store, |existing| handle_updated_rundown(existing, make_default_rundown()))
            .await
            .unwrap();

        assert!(expect_changes(outcome).is_noop());
        assert_eq!(mock.write_count().await, 1);
    }

    #[tokio::test]
    async fn test_full_update_reports_only_differences() {
        let (_, store) = store();
        seed(&store).await;

        let mut updated = make_default_rundown();
        updated.segments[1].parts.pop();

        let changes = expect_changes(
            run(&store, |existing| handle_updated_rundown(existing, updated))
                .await
                .unwrap(),
        );

        assert_eq!(changes.segment_changes.len(), 1);
        let segment1 = changes.segment_changes["segment1"].as_parts().unwrap();
        assert_eq!(segment1.part_changes.get("part3"), Some(&PartChange::Deleted));
    }

    #[tokio::test]
    async fn test_reject_persists_nothing() {
        let (mock, store) = store();

        let outcome = run(&store, |existing| handle_removed_rundown(existing)).await.unwrap();

        assert!(outcome.is_none());
        assert_eq!(mock.write_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_update_leaves_cache_untouched() {
        let (mock, store) = store();
        seed(&store).await;

        let err = run(&store, |existing| {
            handle_removed_segment(existing, "rundown0", "missing")
        })
        .await
        .unwrap_err();

        assert!(matches!(err, IngestError::NotFound { .. }));
        assert_eq!(mock.write_count().await, 1);
        assert_eq!(cached(&store).await, Some(make_default_rundown()));
    }

    #[tokio::test]
    async fn test_storage_failure_is_propagated() {
        let (mock, store) = store();
        mock.set_fail_on_write(true).await;

        let err = run(&store, |existing| handle_updated_rundown(existing, make_default_rundown()))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Storage(_)));
        assert!(cached(&store).await.is_none());
    }

    #[tokio::test]
    async fn test_removed_rundown_deletes_cache() {
        let (mock, store) = store();
        seed(&store).await;

        let outcome = run(&store, |existing| handle_removed_rundown(existing)).await.unwrap();

        assert_eq!(outcome, Some(IngestUpdateOutcome::Deleted));
        assert_eq!(mock.stored_count(RUNDOWN_ID).await, 0);
    }

    #[tokio::test]
    async fn test_grouping_separator_groups_outcome() {
        let (_, store) = store();
        let config = IngestConfig {
            part_group_separator: Some(";".to_string()),
        };
        let flat = make_rundown_with_source(
            "rundown0",
            vec![
                IngestSegment::new("s1", "UN;a", 0.0, Value::Null).with_parts(vec![make_part("a", 0.0)]),
                IngestSegment::new("s2", "UN;b", 1.0, Value::Null).with_parts(vec![make_part("b", 0.0)]),
            ],
        );

        let outcome = run_ingest_update_operation(store.clone(), &config, RUNDOWN_ID, |existing| {
            handle_updated_rundown(existing, flat.clone())
        })
        .await
        .unwrap();

        let Some(IngestUpdateOutcome::Updated { ingest_rundown, .. }) = outcome else {
            panic!("expected an update");
        };
        assert_eq!(ingest_rundown.segments.len(), 1);
        assert_eq!(ingest_rundown.segments[0].external_id, "rundown0_a");

        // The cache keeps the flat tree.
        assert_eq!(cached(&store).await, Some(flat.clone()));

        let outcome = run_ingest_update_operation(store.clone(), &config, RUNDOWN_ID, |existing| {
            handle_updated_part(
                existing,
                "rundown0",
                "s2",
                IngestPart::new("b", "Part b", 0.0, json!({ "story": "b2" })),
            )
        })
        .await
        .unwrap();

        let changes = expect_changes(outcome);
        let group = changes.segment_changes["rundown0_a"].as_parts().unwrap();
        assert_eq!(group.part_changes.get("b"), Some(&PartChange::Updated));
    }
}

mod operations {
    use super::*;

    fn update_of(result: UpdateIngestRundownResult) -> (IngestRundownWithSource, IngestChangeDetails) {
        match result {
            UpdateIngestRundownResult::Update {
                ingest_rundown,
                changes,
            } => (ingest_rundown, changes),
            other => panic!("expected an update, got {other:?}"),
        }
    }

    #[test]
    fn test_meta_data_update_keeps_segments() {
        let mut meta = make_rundown_with_source("rundown0", Vec::new());
        meta.name = "Evening show".to_string();

        let (rundown, changes) =
            update_of(handle_updated_rundown_meta_data(Some(make_default_rundown()), meta).unwrap());

        assert_eq!(rundown.name, "Evening show");
        assert_eq!(rundown.segments, make_default_rundown().segments);
        assert_eq!(changes.rundown_changes, Some(RundownChange::Payload));
    }

    #[test]
    fn test_meta_data_update_requires_rundown() {
        let result = handle_updated_rundown_meta_data(None, make_default_rundown());
        assert!(matches!(result, Err(IngestError::NotFound { .. })));
    }

    #[test]
    fn test_regenerate_rundown() {
        let (_, changes) = update_of(handle_regenerate_rundown(Some(make_default_rundown()), "rundown0").unwrap());
        assert!(changes.is_regenerate());
        assert_eq!(changes.source, IngestChangeSource::Ingest);

        assert!(handle_regenerate_rundown::<Value>(None, "rundown0").is_err());
    }

    #[test]
    fn test_updated_segment_requires_create_for_new_segment() {
        let segment = make_segment("segment9", 0.5, &["part9"]);

        let result = handle_updated_segment(Some(make_default_rundown()), "rundown0", segment.clone(), false);
        assert!(matches!(result, Err(IngestError::NotFound { .. })));

        let (rundown, changes) = update_of(
            handle_updated_segment(Some(make_default_rundown()), "rundown0", segment, true).unwrap(),
        );
        let ids: Vec<_> = rundown.segments.iter().map(|s| s.external_id.as_str()).collect();
        assert_eq!(ids, ["segment0", "segment9", "segment1"]);
        assert_eq!(changes.segment_changes["segment9"], SegmentChange::InsertedOrUpdated);
    }

    #[test]
    fn test_updated_segment_ranks() {
        let ranks: HashMap<String, f64> = [("segment0".to_string(), 5.0), ("ghost".to_string(), 1.0)]
            .into_iter()
            .collect();

        let (rundown, changes) = update_of(
            handle_updated_segment_ranks(Some(make_default_rundown()), "rundown0", &ranks).unwrap(),
        );

        assert!(changes.segment_order_changed);
        assert_eq!(rundown.segments[0].external_id, "segment1");
    }

    #[test]
    fn test_removed_and_regenerated_segment() {
        let (rundown, changes) = update_of(
            handle_removed_segment(Some(make_default_rundown()), "rundown0", "segment0").unwrap(),
        );
        assert_eq!(rundown.segments.len(), 1);
        assert!(changes.segment_changes["segment0"].is_deleted());

        let (_, changes) = update_of(
            handle_regenerate_segment(Some(make_default_rundown()), "rundown0", "segment1").unwrap(),
        );
        assert_eq!(changes.segment_changes["segment1"], SegmentChange::InsertedOrUpdated);

        assert!(handle_regenerate_segment(Some(make_default_rundown()), "rundown0", "nope").is_err());
    }

    #[test]
    fn test_updated_part_inserts_by_rank() {
        let (rundown, changes) = update_of(
            handle_updated_part(Some(make_default_rundown()), "rundown0", "segment0", make_part("partX", 0.5))
                .unwrap(),
        );

        let ids: Vec<_> = rundown.segments[0].parts.iter().map(|p| p.external_id.as_str()).collect();
        assert_eq!(ids, ["part0", "partX", "part1"]);
        let segment = changes.segment_changes["segment0"].as_parts().unwrap();
        assert_eq!(segment.part_changes.get("partX"), Some(&PartChange::Inserted));
        assert!(segment.part_order_changed);
    }

    #[test]
    fn test_updated_part_replaces_existing() {
        let (_, changes) = update_of(
            handle_updated_part(
                Some(make_default_rundown()),
                "rundown0",
                "segment0",
                IngestPart::new("part1", "Part part1", 1.0, json!({ "story": "new" })),
            )
            .unwrap(),
        );

        let segment = changes.segment_changes["segment0"].as_parts().unwrap();
        assert_eq!(segment.part_changes.get("part1"), Some(&PartChange::Updated));
        assert!(!segment.part_order_changed);
    }

    #[test]
    fn test_removed_part() {
        let (rundown, changes) = update_of(
            handle_removed_part(Some(make_default_rundown()), "rundown0", "segment1", "part2").unwrap(),
        );

        assert_eq!(rundown.segments[1].parts.len(), 1);
        let segment = changes.segment_changes["segment1"].as_parts().unwrap();
        assert_eq!(segment.part_changes.get("part2"), Some(&PartChange::Deleted));

        let missing = handle_removed_part(Some(make_default_rundown()), "rundown0", "segment1", "part0");
        assert!(matches!(missing, Err(IngestError::NotFound { .. })));
    }
}

mod custom {
    use super::*;

    #[tokio::test]
    async fn test_requires_cached_rundown() {
        let (_, store) = store();

        let err = run_custom_ingest_update_operation::<Value, _>(
            store,
            &IngestConfig::default(),
            RUNDOWN_ID,
            |_| Ok(CustomIngestAction::Commit),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, IngestError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_commit_writes_touched_documents_only() {
        let (mock, store) = store();
        seed(&store).await;

        let outcome = run_custom_ingest_update_operation::<Value, _>(
            store.clone(),
            &IngestConfig::default(),
            RUNDOWN_ID,
            |rundown| {
                rundown
                    .get_segment_mut("segment0")
                    .ok_or_else(|| IngestError::segment_not_found("segment0"))?
                    .set_payload_property("locked", json!(true))?;
                rundown.remove_segment("segment1");
                Ok(CustomIngestAction::Commit)
            },
        )
        .await
        .unwrap();

        let changes = expect_changes(outcome);
        assert_eq!(changes.source, IngestChangeSource::User);
        assert_eq!(changes.segment_changes["segment0"], SegmentChange::InsertedOrUpdated);
        assert!(changes.segment_changes["segment1"].is_deleted());

        assert_eq!(mock.write_count().await, 2);
        assert_eq!(mock.stored_count(RUNDOWN_ID).await, 4);
        let rundown = cached(&store).await.unwrap();
        assert_eq!(rundown.segments.len(), 1);
        assert_eq!(rundown.segments[0].payload, json!({ "segment": "segment0", "locked": true }));
    }

    #[tokio::test]
    async fn test_reject_and_errors_persist_nothing() {
        let (mock, store) = store();
        seed(&store).await;

        let outcome = run_custom_ingest_update_operation::<Value, _>(
            store.clone(),
            &IngestConfig::default(),
            RUNDOWN_ID,
            |rundown| {
                rundown.remove_all_segments();
                Ok(CustomIngestAction::Reject)
            },
        )
        .await
        .unwrap();
        assert!(outcome.is_none());

        let err = run_custom_ingest_update_operation::<Value, _>(
            store.clone(),
            &IngestConfig::default(),
            RUNDOWN_ID,
            |rundown| {
                rundown.remove_all_segments();
                rundown.move_segment_before("segment0", None)?;
                Ok(CustomIngestAction::Commit)
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, IngestError::NotFound { .. }));

        assert_eq!(mock.write_count().await, 1);
        assert_eq!(cached(&store).await, Some(make_default_rundown()));
    }
}
