//! Standard NRCS ingest operations.
//!
//! Each function takes the cached tree (if any) plus the incoming data and
//! returns what the runner should persist. They are pure; pass them to
//! [`run_ingest_update_operation`](super::run_ingest_update_operation) in a
//! closure.

use std::collections::{BTreeSet, HashMap};

use tracing::warn;

use crate::diff::compute_changes;
use crate::error::{IngestError, Result};
use crate::model::{
    IngestChangeDetails, IngestChangeSource, IngestPart, IngestRundownWithSource, IngestSegment,
    PartChange, Payload, RundownChange, SegmentChange, SegmentPartChanges,
};

use super::UpdateIngestRundownResult;

fn require_rundown<P: Payload>(
    existing: Option<IngestRundownWithSource<P>>,
    rundown_external_id: &str,
) -> Result<IngestRundownWithSource<P>> {
    existing.ok_or_else(|| IngestError::rundown_not_found(rundown_external_id))
}

fn update<P: Payload>(
    ingest_rundown: IngestRundownWithSource<P>,
    changes: IngestChangeDetails,
) -> Result<UpdateIngestRundownResult<P>> {
    Ok(UpdateIngestRundownResult::Update {
        ingest_rundown,
        changes,
    })
}

fn segment_change(segment_external_id: &str, change: SegmentChange) -> IngestChangeDetails {
    let mut changes = IngestChangeDetails::default();
    changes
        .segment_changes
        .insert(segment_external_id.to_string(), change);
    changes
}

/// Replace the whole tree.
///
/// Changes are computed against the cached tree; without one the rundown is
/// regenerated.
pub fn handle_updated_rundown<P: Payload>(
    existing: Option<IngestRundownWithSource<P>>,
    ingest_rundown: IngestRundownWithSource<P>,
) -> Result<UpdateIngestRundownResult<P>> {
    let changes = compute_changes(
        existing.as_ref().map(|e| &e.rundown),
        &ingest_rundown.rundown,
        &BTreeSet::new(),
    );
    update(ingest_rundown, changes)
}

/// Update the rundown's own fields, keeping the cached segments.
pub fn handle_updated_rundown_meta_data<P: Payload>(
    existing: Option<IngestRundownWithSource<P>>,
    ingest_rundown: IngestRundownWithSource<P>,
) -> Result<UpdateIngestRundownResult<P>> {
    let existing = require_rundown(existing, &ingest_rundown.external_id)?;

    let unchanged = existing.name == ingest_rundown.name
        && existing.rundown_type == ingest_rundown.rundown_type
        && existing.payload == ingest_rundown.payload
        && existing.rundown_source == ingest_rundown.rundown_source;

    let mut updated = ingest_rundown;
    updated.segments = existing.rundown.segments;
    updated.user_edit_states = existing.rundown.user_edit_states;

    let mut changes = IngestChangeDetails::default();
    if !unchanged {
        changes.rundown_changes = Some(RundownChange::Payload);
    }
    update(updated, changes)
}

/// Keep the cached tree but regenerate everything derived from it.
pub fn handle_regenerate_rundown<P: Payload>(
    existing: Option<IngestRundownWithSource<P>>,
    rundown_external_id: &str,
) -> Result<UpdateIngestRundownResult<P>> {
    let existing = require_rundown(existing, rundown_external_id)?;
    update(existing, IngestChangeDetails::regenerate(IngestChangeSource::Ingest))
}

/// Delete the cached tree; rejected when nothing is cached.
pub fn handle_removed_rundown<P: Payload>(
    existing: Option<IngestRundownWithSource<P>>,
) -> Result<UpdateIngestRundownResult<P>> {
    Ok(match existing {
        Some(_) => UpdateIngestRundownResult::Delete,
        None => UpdateIngestRundownResult::Reject,
    })
}

/// Insert or replace one segment with all of its parts.
///
/// A segment that is not cached yet is only accepted when `is_create_action`.
pub fn handle_updated_segment<P: Payload>(
    existing: Option<IngestRundownWithSource<P>>,
    rundown_external_id: &str,
    segment: IngestSegment<P>,
    is_create_action: bool,
) -> Result<UpdateIngestRundownResult<P>> {
    let mut rundown = require_rundown(existing, rundown_external_id)?;
    let segment_id = segment.external_id.clone();

    match rundown.segments.iter().position(|s| s.external_id == segment_id) {
        Some(index) => rundown.segments[index] = segment,
        None if is_create_action => rundown.segments.push(segment),
        None => return Err(IngestError::segment_not_found(segment_id)),
    }
    rundown.sort_segments();

    update(rundown, segment_change(&segment_id, SegmentChange::InsertedOrUpdated))
}

/// Apply new segment ranks; ids that are not cached are ignored.
pub fn handle_updated_segment_ranks<P: Payload>(
    existing: Option<IngestRundownWithSource<P>>,
    rundown_external_id: &str,
    new_ranks: &HashMap<String, f64>,
) -> Result<UpdateIngestRundownResult<P>> {
    let mut rundown = require_rundown(existing, rundown_external_id)?;

    let mut has_changes = false;
    for (segment_id, rank) in new_ranks {
        match rundown.segment_mut(segment_id) {
            Some(segment) => {
                if segment.rank != *rank {
                    segment.rank = *rank;
                    has_changes = true;
                }
            }
            None => warn!(%segment_id, "segment to re-rank not found"),
        }
    }
    rundown.sort_segments();

    let changes = IngestChangeDetails {
        segment_order_changed: has_changes,
        ..Default::default()
    };
    update(rundown, changes)
}

pub fn handle_removed_segment<P: Payload>(
    existing: Option<IngestRundownWithSource<P>>,
    rundown_external_id: &str,
    segment_external_id: &str,
) -> Result<UpdateIngestRundownResult<P>> {
    let mut rundown = require_rundown(existing, rundown_external_id)?;

    let before = rundown.segments.len();
    rundown.segments.retain(|s| s.external_id != segment_external_id);
    if rundown.segments.len() == before {
        return Err(IngestError::segment_not_found(segment_external_id));
    }

    update(rundown, segment_change(segment_external_id, SegmentChange::Deleted))
}

pub fn handle_regenerate_segment<P: Payload>(
    existing: Option<IngestRundownWithSource<P>>,
    rundown_external_id: &str,
    segment_external_id: &str,
) -> Result<UpdateIngestRundownResult<P>> {
    let rundown = require_rundown(existing, rundown_external_id)?;
    if rundown.segment(segment_external_id).is_none() {
        return Err(IngestError::segment_not_found(segment_external_id));
    }

    update(
        rundown,
        segment_change(segment_external_id, SegmentChange::InsertedOrUpdated),
    )
}

/// Insert or replace one part, keeping parts ordered by rank.
pub fn handle_updated_part<P: Payload>(
    existing: Option<IngestRundownWithSource<P>>,
    rundown_external_id: &str,
    segment_external_id: &str,
    part: IngestPart<P>,
) -> Result<UpdateIngestRundownResult<P>> {
    let mut rundown = require_rundown(existing, rundown_external_id)?;
    let segment = rundown
        .segment_mut(segment_external_id)
        .ok_or_else(|| IngestError::segment_not_found(segment_external_id))?;

    let part_id = part.external_id.clone();
    let (change, order_changed) = match segment.parts.iter().position(|p| p.external_id == part_id) {
        Some(index) => {
            let order_changed = segment.parts[index].rank != part.rank;
            segment.parts[index] = part;
            (PartChange::Updated, order_changed)
        }
        None => {
            segment.parts.push(part);
            (PartChange::Inserted, true)
        }
    };
    segment.sort_parts();

    let changes = SegmentPartChanges {
        part_changes: [(part_id, change)].into_iter().collect(),
        part_order_changed: order_changed,
        payload_changed: false,
    };
    update(
        rundown,
        segment_change(segment_external_id, SegmentChange::Parts(changes)),
    )
}

pub fn handle_removed_part<P: Payload>(
    existing: Option<IngestRundownWithSource<P>>,
    rundown_external_id: &str,
    segment_external_id: &str,
    part_external_id: &str,
) -> Result<UpdateIngestRundownResult<P>> {
    let mut rundown = require_rundown(existing, rundown_external_id)?;
    let segment = rundown
        .segment_mut(segment_external_id)
        .ok_or_else(|| IngestError::segment_not_found(segment_external_id))?;

    let before = segment.parts.len();
    segment.parts.retain(|p| p.external_id != part_external_id);
    if segment.parts.len() == before {
        return Err(IngestError::part_not_found(part_external_id));
    }

    let changes = SegmentPartChanges {
        part_changes: [(part_external_id.to_string(), PartChange::Deleted)]
            .into_iter()
            .collect(),
        part_order_changed: true,
        payload_changed: false,
    };
    update(
        rundown,
        segment_change(segment_external_id, SegmentChange::Parts(changes)),
    )
}
