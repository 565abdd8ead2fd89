//! Change computation between two versions of an ingest tree.
//!
//! Pure and total: given the previous and the new tree, produce the minimal
//! [`IngestChangeDetails`] describing what downstream has to regenerate.
//! External id uniqueness (segments within a rundown, parts within a
//! segment) is the caller's responsibility.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::model::{
    IngestChangeDetails, IngestChangeSource, IngestPart, IngestRundown, IngestSegment, Payload,
    PartChange, RundownChange, SegmentChange, SegmentPartChanges,
};

/// Compute the changes from `old` to `new`.
///
/// Without a baseline the only safe answer is a full regenerate. Parts in
/// `changed_part_hints` are reported as `Updated` even when their name and
/// payload are unchanged.
pub fn compute_changes<P: Payload>(
    old: Option<&IngestRundown<P>>,
    new: &IngestRundown<P>,
    changed_part_hints: &BTreeSet<String>,
) -> IngestChangeDetails {
    let Some(old) = old else {
        return IngestChangeDetails::regenerate(IngestChangeSource::Ingest);
    };

    let rundown_changes = (old.name != new.name
        || old.rundown_type != new.rundown_type
        || old.payload != new.payload)
        .then_some(RundownChange::Payload);

    let mut segment_changes = calculate_segment_changes(old, new, changed_part_hints);

    let changed_segment_external_ids =
        calculate_segment_external_id_changes(&old.segments, &new.segments);
    for old_id in changed_segment_external_ids.keys() {
        segment_changes.remove(old_id);
    }

    IngestChangeDetails {
        source: IngestChangeSource::Ingest,
        rundown_changes,
        segment_order_changed: has_order_changed(&old.segments, &new.segments, |s| &s.external_id),
        segment_changes,
        changed_segment_external_ids,
    }
}

/// Per-segment changes, including deletions of segments missing from `new`.
pub fn calculate_segment_changes<P: Payload>(
    old: &IngestRundown<P>,
    new: &IngestRundown<P>,
    changed_part_hints: &BTreeSet<String>,
) -> BTreeMap<String, SegmentChange> {
    let old_segments: HashMap<&str, &IngestSegment<P>> = old
        .segments
        .iter()
        .map(|s| (s.external_id.as_str(), s))
        .collect();

    let mut changes = BTreeMap::new();
    for segment in &new.segments {
        match old_segments.get(segment.external_id.as_str()) {
            None => {
                changes.insert(segment.external_id.clone(), SegmentChange::InsertedOrUpdated);
            }
            Some(old_segment) => {
                let part_changes = calculate_part_changes(old_segment, segment, changed_part_hints);
                if !part_changes.is_empty() {
                    changes.insert(segment.external_id.clone(), SegmentChange::Parts(part_changes));
                }
            }
        }
    }

    let new_ids: HashSet<&str> = new.segments.iter().map(|s| s.external_id.as_str()).collect();
    for old_segment in &old.segments {
        if !new_ids.contains(old_segment.external_id.as_str()) {
            changes.insert(old_segment.external_id.clone(), SegmentChange::Deleted);
        }
    }

    changes
}

/// Changes inside a segment present on both sides.
pub fn calculate_part_changes<P: Payload>(
    old: &IngestSegment<P>,
    new: &IngestSegment<P>,
    changed_part_hints: &BTreeSet<String>,
) -> SegmentPartChanges {
    let old_parts: HashMap<&str, &IngestPart<P>> = old
        .parts
        .iter()
        .map(|p| (p.external_id.as_str(), p))
        .collect();

    let mut part_changes = BTreeMap::new();
    for part in &new.parts {
        match old_parts.get(part.external_id.as_str()) {
            None => {
                part_changes.insert(part.external_id.clone(), PartChange::Inserted);
            }
            Some(old_part) => {
                if changed_part_hints.contains(&part.external_id)
                    || old_part.name != part.name
                    || old_part.payload != part.payload
                {
                    part_changes.insert(part.external_id.clone(), PartChange::Updated);
                }
            }
        }
    }

    let new_ids: HashSet<&str> = new.parts.iter().map(|p| p.external_id.as_str()).collect();
    for old_part in &old.parts {
        if !new_ids.contains(old_part.external_id.as_str()) {
            part_changes.insert(old_part.external_id.clone(), PartChange::Deleted);
        }
    }

    SegmentPartChanges {
        part_changes,
        part_order_changed: has_order_changed(&old.parts, &new.parts, |p| &p.external_id),
        payload_changed: old.name != new.name || old.payload != new.payload,
    }
}

/// Pair removed segments with added ones whose identity changed.
///
/// A removed segment matches the first added segment with the same name,
/// otherwise the first added segment sharing any part external id. Each added
/// segment is claimed at most once, so the result depends on segment order and
/// may miss a rename when several candidates exist.
pub fn calculate_segment_external_id_changes<P: Payload>(
    old_segments: &[IngestSegment<P>],
    new_segments: &[IngestSegment<P>],
) -> BTreeMap<String, String> {
    let old_ids: HashSet<&str> = old_segments.iter().map(|s| s.external_id.as_str()).collect();
    let new_ids: HashSet<&str> = new_segments.iter().map(|s| s.external_id.as_str()).collect();

    let removed: Vec<&IngestSegment<P>> = old_segments
        .iter()
        .filter(|s| !new_ids.contains(s.external_id.as_str()))
        .collect();
    let mut added: Vec<&IngestSegment<P>> = new_segments
        .iter()
        .filter(|s| !old_ids.contains(s.external_id.as_str()))
        .collect();

    let mut changes = BTreeMap::new();
    if removed.is_empty() || added.is_empty() {
        return changes;
    }

    for removed_segment in removed {
        let by_name = added.iter().position(|s| s.name == removed_segment.name);
        let matched = by_name.or_else(|| {
            added.iter().position(|s| {
                removed_segment
                    .parts
                    .iter()
                    .any(|old_part| s.part(&old_part.external_id).is_some())
            })
        });

        if let Some(index) = matched {
            let new_segment = added.remove(index);
            changes.insert(
                removed_segment.external_id.clone(),
                new_segment.external_id.clone(),
            );
        }
    }

    changes
}

/// True when the id sequences differ in length or at any position.
pub fn has_order_changed<T>(old: &[T], new: &[T], id: impl Fn(&T) -> &String) -> bool {
    old.len() != new.len() || old.iter().zip(new).any(|(a, b)| id(a) != id(b))
}
