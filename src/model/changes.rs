//! Change descriptions handed to the regeneration pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Who caused the change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IngestChangeSource {
    /// Data arriving from the NRCS.
    #[default]
    Ingest,
    /// An edit made by a user or by shaping logic on their behalf.
    User,
}

/// Rundown-level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RundownChange {
    /// Discard everything derived from this rundown and rebuild it.
    Regenerate,
    /// Only the rundown's own name/payload changed.
    Payload,
}

/// Per-part change inside a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PartChange {
    Inserted,
    Updated,
    Deleted,
}

/// Fine-grained changes within a segment that exists on both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentPartChanges {
    #[serde(default)]
    pub part_changes: BTreeMap<String, PartChange>,
    #[serde(default)]
    pub part_order_changed: bool,
    #[serde(default)]
    pub payload_changed: bool,
}

impl SegmentPartChanges {
    /// True when nothing in the segment needs regenerating.
    pub fn is_empty(&self) -> bool {
        self.part_changes.is_empty() && !self.part_order_changed && !self.payload_changed
    }
}

/// Change to a single segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "SegmentChangeRepr", from = "SegmentChangeRepr")]
pub enum SegmentChange {
    /// The segment is new, or must be regenerated in full.
    InsertedOrUpdated,
    /// The segment no longer exists.
    Deleted,
    /// The segment exists on both sides; only the listed pieces changed.
    Parts(SegmentPartChanges),
}

impl SegmentChange {
    pub fn is_deleted(&self) -> bool {
        matches!(self, SegmentChange::Deleted)
    }

    pub fn as_parts(&self) -> Option<&SegmentPartChanges> {
        match self {
            SegmentChange::Parts(changes) => Some(changes),
            _ => None,
        }
    }
}

/// Wire shape: whole-segment outcomes are plain strings, part-level changes an object.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SegmentChangeRepr {
    Whole(WholeSegmentChange),
    Parts(SegmentPartChanges),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum WholeSegmentChange {
    InsertedOrUpdated,
    Deleted,
}

impl From<SegmentChange> for SegmentChangeRepr {
    fn from(change: SegmentChange) -> Self {
        match change {
            SegmentChange::InsertedOrUpdated => Self::Whole(WholeSegmentChange::InsertedOrUpdated),
            SegmentChange::Deleted => Self::Whole(WholeSegmentChange::Deleted),
            SegmentChange::Parts(parts) => Self::Parts(parts),
        }
    }
}

impl From<SegmentChangeRepr> for SegmentChange {
    fn from(repr: SegmentChangeRepr) -> Self {
        match repr {
            SegmentChangeRepr::Whole(WholeSegmentChange::InsertedOrUpdated) => Self::InsertedOrUpdated,
            SegmentChangeRepr::Whole(WholeSegmentChange::Deleted) => Self::Deleted,
            SegmentChangeRepr::Parts(parts) => Self::Parts(parts),
        }
    }
}

/// The structured, minimal output of an ingest operation.
///
/// `rundown_changes = Regenerate` means every derived entity of the rundown is
/// discarded; otherwise only the named segments/parts are re-derived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestChangeDetails {
    #[serde(default)]
    pub source: IngestChangeSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rundown_changes: Option<RundownChange>,
    #[serde(default)]
    pub segment_order_changed: bool,
    #[serde(default)]
    pub segment_changes: BTreeMap<String, SegmentChange>,
    /// Old segment external id → new segment external id.
    #[serde(default)]
    pub changed_segment_external_ids: BTreeMap<String, String>,
}

impl IngestChangeDetails {
    /// A change that forces the whole rundown to be rebuilt.
    pub fn regenerate(source: IngestChangeSource) -> Self {
        Self {
            source,
            rundown_changes: Some(RundownChange::Regenerate),
            ..Default::default()
        }
    }

    pub fn is_regenerate(&self) -> bool {
        self.rundown_changes == Some(RundownChange::Regenerate)
    }

    /// True when nothing downstream needs to be touched.
    pub fn is_noop(&self) -> bool {
        self.rundown_changes.is_none()
            && !self.segment_order_changed
            && self.segment_changes.is_empty()
            && self.changed_segment_external_ids.is_empty()
    }
}
