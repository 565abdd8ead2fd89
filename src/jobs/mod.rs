//! Ingest operation runner.
//!
//! Every ingest mutation goes through one of two entry points:
//!
//! - [`run_ingest_update_operation`] hands the cached tree to a pure update
//!   function and persists whatever tree it returns.
//! - [`run_custom_ingest_update_operation`] opens the cached tree as a
//!   [`MutableIngestRundown`] for shaping logic that edits in place.
//!
//! The caller is expected to hold the rundown lock for the whole call. Nothing
//! is persisted when the update function fails or rejects.

mod operations;

pub use operations::*;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::cache::NrcsIngestDataCache;
use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::grouping::group_parts_in_rundown_and_changes;
use crate::model::{IngestChangeDetails, IngestRundownWithSource, Payload};
use crate::mutable::MutableIngestRundown;
use crate::storage::IngestCacheStore;

/// What an update function wants done with the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateIngestRundownResult<P = serde_json::Value> {
    /// Leave the cache untouched.
    Reject,
    /// Delete every cached document of the rundown.
    Delete,
    /// Persist `ingest_rundown`; `changes` describes the update.
    Update {
        ingest_rundown: IngestRundownWithSource<P>,
        changes: IngestChangeDetails,
    },
}

/// What shaping logic wants done with its edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomIngestAction {
    Commit,
    Reject,
}

/// Outcome of a persisted ingest operation, handed to regeneration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
#[serde(bound = "P: Payload")]
pub enum IngestUpdateOutcome<P = serde_json::Value> {
    Deleted,
    #[serde(rename_all = "camelCase")]
    Updated {
        /// The tree downstream works from (grouped when grouping is enabled).
        ingest_rundown: IngestRundownWithSource<P>,
        changes: IngestChangeDetails,
    },
}

/// Load the cache, apply `update` to the cached tree and persist the result.
///
/// Returns `None` when `update` rejects.
#[tracing::instrument(name = "ingest.update", skip_all, fields(%rundown_id))]
pub async fn run_ingest_update_operation<P, F>(
    store: Arc<dyn IngestCacheStore>,
    config: &IngestConfig,
    rundown_id: &str,
    update: F,
) -> Result<Option<IngestUpdateOutcome<P>>>
where
    P: Payload,
    F: FnOnce(Option<IngestRundownWithSource<P>>) -> Result<UpdateIngestRundownResult<P>>,
{
    let mut cache = NrcsIngestDataCache::<P>::create(store, rundown_id).await?;
    let old = cache.fetch_rundown();

    match update(old.clone())? {
        UpdateIngestRundownResult::Reject => {
            debug!("ingest update rejected");
            Ok(None)
        }
        UpdateIngestRundownResult::Delete => {
            cache.delete();
            cache.save_to_database().await?;
            info!("ingest rundown deleted");
            Ok(Some(IngestUpdateOutcome::Deleted))
        }
        UpdateIngestRundownResult::Update {
            ingest_rundown,
            changes,
        } => {
            cache.replace(&ingest_rundown);
            cache.save_to_database().await?;
            Ok(Some(build_outcome(config, old.as_ref(), ingest_rundown, changes)))
        }
    }
}

/// Open the cached rundown for in-place editing and commit the edits.
///
/// Only the cache documents the edits touched are rewritten. Fails with
/// `NotFound` when nothing is cached for `rundown_id`; returns `None` when
/// `update` rejects.
#[tracing::instrument(name = "ingest.custom_update", skip_all, fields(%rundown_id))]
pub async fn run_custom_ingest_update_operation<P, F>(
    store: Arc<dyn IngestCacheStore>,
    config: &IngestConfig,
    rundown_id: &str,
    update: F,
) -> Result<Option<IngestUpdateOutcome<P>>>
where
    P: Payload,
    F: FnOnce(&mut MutableIngestRundown<P>) -> Result<CustomIngestAction>,
{
    let mut cache = NrcsIngestDataCache::<P>::create(store, rundown_id).await?;
    let old = cache
        .fetch_rundown()
        .ok_or_else(|| IngestError::rundown_not_found(rundown_id))?;

    let mut rundown = MutableIngestRundown::new(old.clone());
    if update(&mut rundown)? == CustomIngestAction::Reject {
        debug!("custom ingest update rejected");
        return Ok(None);
    }

    let commit = rundown.into_changes_info(cache.generator());
    let keep = commit.all_cache_object_ids;
    cache.replace_documents(commit.changed_cache_objects);
    cache.remove_all_other_documents(keep.iter().map(String::as_str));
    cache.save_to_database().await?;

    Ok(Some(build_outcome(config, Some(&old), commit.ingest_rundown, commit.changes)))
}

/// Group the persisted tree for downstream when a separator is configured.
fn build_outcome<P: Payload>(
    config: &IngestConfig,
    old: Option<&IngestRundownWithSource<P>>,
    ingest_rundown: IngestRundownWithSource<P>,
    changes: IngestChangeDetails,
) -> IngestUpdateOutcome<P> {
    let separator = config
        .part_group_separator
        .as_deref()
        .filter(|separator| !separator.is_empty());

    let Some(separator) = separator else {
        log_changes(&changes);
        return IngestUpdateOutcome::Updated {
            ingest_rundown,
            changes,
        };
    };

    let source = changes.source;
    let grouped = group_parts_in_rundown_and_changes(
        &ingest_rundown,
        old.map(|old| &old.rundown),
        &changes,
        separator,
    );
    let mut changes = grouped.changes;
    changes.source = source;
    log_changes(&changes);

    IngestUpdateOutcome::Updated {
        ingest_rundown: IngestRundownWithSource::new(grouped.ingest_rundown, ingest_rundown.rundown_source),
        changes,
    }
}

fn log_changes(changes: &IngestChangeDetails) {
    if changes.is_regenerate() {
        info!(source = ?changes.source, "ingest rundown regenerating");
    } else {
        debug!(
            source = ?changes.source,
            segments = changes.segment_changes.len(),
            renamed = changes.changed_segment_external_ids.len(),
            segment_order_changed = changes.segment_order_changed,
            "ingest changes computed"
        );
    }
}

#[cfg(test)]
mod tests;
