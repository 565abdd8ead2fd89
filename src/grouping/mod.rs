//! Grouping of flat NRCS segments into multi-part segments.
//!
//! Some NRCS adapters emit one segment per story, each holding a single part
//! and named `"<group><separator><story>"`. Consecutive stories sharing a
//! group name are merged into one segment here, before changes are computed.

use std::collections::BTreeSet;

use crate::diff::compute_changes;
use crate::model::{
    IngestChangeDetails, IngestChangeSource, IngestPart, IngestRundown, IngestSegment, Payload,
    PartChange, RundownChange, SegmentChange,
};

/// Merge consecutive flat segments with the same group name.
///
/// The group name is the text before the first `separator`, or the whole
/// segment name when the separator is absent or the prefix is empty. Each
/// group's external id is `<rundownExternalId>_<firstPartExternalId>`, so a
/// group's identity follows its first part. Parts are re-ranked from 0 and
/// groups from 0 in output order.
pub fn group_flat_parts_into_segments<P: Payload>(
    rundown_external_id: &str,
    flat_segments: &[IngestSegment<P>],
    separator: &str,
) -> Vec<IngestSegment<P>> {
    struct Group<'a, P> {
        name: &'a str,
        fallback_id: &'a str,
        parts: Vec<IngestPart<P>>,
    }

    let mut groups: Vec<Group<'_, P>> = Vec::new();
    for segment in flat_segments {
        let group_name = group_name(&segment.name, separator);

        if let Some(last) = groups.last_mut().filter(|g| g.name == group_name) {
            last.parts.extend(segment.parts.iter().cloned());
        } else {
            groups.push(Group {
                name: group_name,
                fallback_id: &segment.external_id,
                parts: segment.parts.clone(),
            });
        }
    }

    groups
        .into_iter()
        .enumerate()
        .map(|(rank, group)| {
            let first_id = group
                .parts
                .first()
                .map(|p| p.external_id.as_str())
                .unwrap_or(group.fallback_id);
            let mut segment = IngestSegment::new(
                format!("{rundown_external_id}_{first_id}"),
                group.name,
                rank as f64,
                P::default(),
            );
            segment.parts = group
                .parts
                .into_iter()
                .enumerate()
                .map(|(rank, mut part)| {
                    part.rank = rank as f64;
                    part
                })
                .collect();
            segment
        })
        .collect()
}

fn group_name<'a>(name: &'a str, separator: &str) -> &'a str {
    if separator.is_empty() {
        return name;
    }
    match name.split_once(separator) {
        Some((prefix, _)) if !prefix.is_empty() => prefix,
        _ => name,
    }
}

/// Group a whole rundown; rundown-level fields are kept as they are.
pub fn group_rundown<P: Payload>(rundown: &IngestRundown<P>, separator: &str) -> IngestRundown<P> {
    IngestRundown {
        external_id: rundown.external_id.clone(),
        rundown_type: rundown.rundown_type.clone(),
        name: rundown.name.clone(),
        payload: rundown.payload.clone(),
        segments: group_flat_parts_into_segments(&rundown.external_id, &rundown.segments, separator),
        user_edit_states: rundown.user_edit_states.clone(),
    }
}

/// Grouped tree plus the changes computed on the grouped shape.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedIngestChanges<P = serde_json::Value> {
    pub ingest_rundown: IngestRundown<P>,
    pub changes: IngestChangeDetails,
}

/// Group both trees, then compute changes between the grouped shapes.
///
/// `source_changes` describes the update in terms of the flat tree; the parts
/// it names are forced to `Updated` in the grouped comparison, and its
/// rundown-level change is carried through.
pub fn group_parts_in_rundown_and_changes<P: Payload>(
    new_flat: &IngestRundown<P>,
    old_flat: Option<&IngestRundown<P>>,
    source_changes: &IngestChangeDetails,
    separator: &str,
) -> GroupedIngestChanges<P> {
    let ingest_rundown = group_rundown(new_flat, separator);

    let old_flat = match old_flat {
        Some(old) if !source_changes.is_regenerate() => old,
        _ => {
            return GroupedIngestChanges {
                ingest_rundown,
                changes: IngestChangeDetails::regenerate(IngestChangeSource::Ingest),
            }
        }
    };

    let old_grouped = group_rundown(old_flat, separator);
    let hints = find_all_parts_with_changes(new_flat, source_changes);
    let mut changes = compute_changes(Some(&old_grouped), &ingest_rundown, &hints);
    if source_changes.rundown_changes.is_some() {
        changes.rundown_changes = source_changes.rundown_changes;
    }
    if changes.rundown_changes == Some(RundownChange::Regenerate) {
        changes = IngestChangeDetails::regenerate(IngestChangeSource::Ingest);
    }

    GroupedIngestChanges {
        ingest_rundown,
        changes,
    }
}

/// Part ids that `source_changes` says were inserted or updated.
///
/// Every part of a segment flagged `InsertedOrUpdated` counts; parts of a
/// deleted segment do not.
pub fn find_all_parts_with_changes<P: Payload>(
    rundown: &IngestRundown<P>,
    source_changes: &IngestChangeDetails,
) -> BTreeSet<String> {
    let mut parts = BTreeSet::new();
    for segment in &rundown.segments {
        let Some(change) = source_changes.segment_changes.get(&segment.external_id) else {
            continue;
        };
        match change {
            SegmentChange::InsertedOrUpdated => {
                parts.extend(segment.parts.iter().map(|p| p.external_id.clone()));
            }
            SegmentChange::Deleted => {}
            SegmentChange::Parts(changes) => {
                for part in &segment.parts {
                    if matches!(
                        changes.part_changes.get(&part.external_id),
                        Some(PartChange::Inserted | PartChange::Updated)
                    ) {
                        parts.insert(part.external_id.clone());
                    }
                }
            }
        }
    }
    parts
}
