use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::cache::{IngestCacheDocument, IngestCacheObjectGenerator};
use crate::error::{IngestError, Result};
use crate::model::{
    IngestPart, IngestSegment, PartChange, Payload, SegmentChange, SegmentPartChanges,
    UserEditStates,
};

use super::{set_edit_state, set_json_property, MutableIngestPart};

/// One segment and its parts, editable in place.
///
/// Remembers the external id and the part ids it was created with, so a
/// commit can report a rename and exact per-part changes.
#[derive(Debug, Clone)]
pub struct MutableIngestSegment<P = Value> {
    external_id: String,
    original_external_id: String,
    name: String,
    rank: f64,
    committed_rank: f64,
    payload: P,
    user_edit_states: UserEditStates,
    parts: Vec<MutableIngestPart<P>>,
    original_part_ids: BTreeSet<String>,
    segment_has_changes: bool,
    part_order_has_changed: bool,
}

/// What a commit of one segment produced.
#[derive(Debug, Clone)]
pub struct MutableSegmentChangesInfo<P = Value> {
    /// Current parts, re-ranked from 0.
    pub ingest_parts: Vec<IngestPart<P>>,
    /// Cache documents that must be written.
    pub changed_cache_objects: Vec<IngestCacheDocument<P>>,
    /// Ids of every cache document this segment still owns.
    pub all_cache_object_ids: Vec<String>,
    pub segment_has_changes: bool,
    pub part_ids_with_changes: Vec<String>,
    pub part_order_has_changed: bool,
    pub original_external_id: String,
    /// Inserted/updated/deleted parts since the previous commit.
    pub part_changes: BTreeMap<String, PartChange>,
}

impl<P: Payload> MutableSegmentChangesInfo<P> {
    /// The change to report for this segment, if any.
    pub fn segment_change(&self) -> Option<SegmentChange> {
        if self.segment_has_changes {
            return Some(SegmentChange::InsertedOrUpdated);
        }
        let changes = SegmentPartChanges {
            part_changes: self.part_changes.clone(),
            part_order_changed: self.part_order_has_changed,
            payload_changed: false,
        };
        (!changes.is_empty()).then_some(SegmentChange::Parts(changes))
    }
}

impl<P: Payload> MutableIngestSegment<P> {
    /// Wrap `segment`; with `has_changes` the segment and all of its parts
    /// start dirty.
    pub fn new(segment: IngestSegment<P>, has_changes: bool) -> Self {
        let original_part_ids = if has_changes {
            BTreeSet::new()
        } else {
            segment.parts.iter().map(|p| p.external_id.clone()).collect()
        };
        let parts = segment
            .parts
            .into_iter()
            .map(|p| MutableIngestPart::new(p, has_changes))
            .collect();

        Self {
            original_external_id: segment.external_id.clone(),
            external_id: segment.external_id,
            name: segment.name,
            rank: segment.rank,
            committed_rank: segment.rank,
            payload: segment.payload,
            user_edit_states: segment.user_edit_states,
            parts,
            original_part_ids,
            segment_has_changes: has_changes,
            part_order_has_changed: false,
        }
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    /// External id at the last commit.
    pub fn original_external_id(&self) -> &str {
        &self.original_external_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn user_edit_states(&self) -> &UserEditStates {
        &self.user_edit_states
    }

    pub fn parts(&self) -> &[MutableIngestPart<P>] {
        &self.parts
    }

    pub fn segment_has_changes(&self) -> bool {
        self.segment_has_changes
    }

    pub fn part_order_has_changed(&self) -> bool {
        self.part_order_has_changed
    }

    pub fn get_part(&self, external_id: &str) -> Option<&MutableIngestPart<P>> {
        self.parts.iter().find(|p| p.external_id() == external_id)
    }

    pub fn get_part_mut(&mut self, external_id: &str) -> Option<&mut MutableIngestPart<P>> {
        self.parts.iter_mut().find(|p| p.external_id() == external_id)
    }

    fn part_index(&self, external_id: &str) -> Option<usize> {
        self.parts.iter().position(|p| p.external_id() == external_id)
    }

    /// Move a part before `before`, or to the end when `before` is `None`.
    pub fn move_part_before(&mut self, part_external_id: &str, before: Option<&str>) -> Result<()> {
        self.move_part(part_external_id, before, Placement::Before)
    }

    /// Move a part after `after`, or to the start when `after` is `None`.
    pub fn move_part_after(&mut self, part_external_id: &str, after: Option<&str>) -> Result<()> {
        self.move_part(part_external_id, after, Placement::After)
    }

    fn move_part(&mut self, part_external_id: &str, anchor: Option<&str>, placement: Placement) -> Result<()> {
        if anchor == Some(part_external_id) {
            return Err(IngestError::invalid(format!(
                "Cannot move part \"{part_external_id}\" relative to itself"
            )));
        }
        let index = self
            .part_index(part_external_id)
            .ok_or_else(|| IngestError::part_not_found(part_external_id))?;
        if let Some(anchor) = anchor {
            if self.part_index(anchor).is_none() {
                return Err(IngestError::part_not_found(anchor));
            }
        }

        let part = self.parts.remove(index);
        let target = placement.target_index(anchor.and_then(|a| self.part_index(a)), self.parts.len());
        self.parts.insert(target, part);
        self.part_order_has_changed = true;
        Ok(())
    }

    /// Insert `part` as a fresh dirty wrapper, replacing any part with the same
    /// external id. Placed before `before`, or appended when `None`.
    pub fn replace_part(
        &mut self,
        part: IngestPart<P>,
        before: Option<&str>,
    ) -> Result<&mut MutableIngestPart<P>> {
        if before == Some(part.external_id.as_str()) {
            return Err(IngestError::invalid(format!(
                "Cannot insert part \"{}\" before itself",
                part.external_id
            )));
        }
        if let Some(before) = before {
            if self.part_index(before).is_none() {
                return Err(IngestError::part_not_found(before));
            }
        }

        if let Some(existing) = self.part_index(&part.external_id) {
            self.parts.remove(existing);
        }
        let target = match before.and_then(|b| self.part_index(b)) {
            Some(index) => index,
            None => self.parts.len(),
        };
        self.parts.insert(target, MutableIngestPart::new(part, true));
        self.part_order_has_changed = true;
        Ok(&mut self.parts[target])
    }

    /// Remove a part; false when it did not exist.
    pub fn remove_part(&mut self, external_id: &str) -> bool {
        match self.part_index(external_id) {
            Some(index) => {
                self.parts.remove(index);
                self.part_order_has_changed = true;
                true
            }
            None => false,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.name != name {
            self.name = name;
            self.segment_has_changes = true;
        }
    }

    pub fn replace_payload(&mut self, payload: P) {
        if self.payload != payload {
            self.payload = payload;
            self.segment_has_changes = true;
        }
    }

    pub fn set_user_edit_state(&mut self, key: &str, value: bool) {
        if set_edit_state(&mut self.user_edit_states, key, value) {
            self.segment_has_changes = true;
        }
    }

    /// Mark the segment changed without comparing anything.
    pub fn force_regenerate(&mut self) {
        self.segment_has_changes = true;
    }

    pub(crate) fn set_external_id(&mut self, external_id: impl Into<String>) {
        self.external_id = external_id.into();
    }

    pub(crate) fn set_original_external_id(&mut self, original_external_id: impl Into<String>) {
        self.original_external_id = original_external_id.into();
    }

    pub(crate) fn set_rank(&mut self, rank: f64) {
        self.rank = rank;
    }

    /// Segment without its parts, as stored in the segment cache document.
    pub fn to_ingest_segment(&self, parts: Vec<IngestPart<P>>) -> IngestSegment<P> {
        IngestSegment {
            external_id: self.external_id.clone(),
            name: self.name.clone(),
            rank: self.rank,
            payload: self.payload.clone(),
            parts,
            user_edit_states: self.user_edit_states.clone(),
        }
    }

    /// Collect what changed since the last commit and reset all flags.
    ///
    /// Parts are re-ranked from 0. Only dirty parts are reported as changed,
    /// but parts whose rank moved are still re-emitted as cache documents. A
    /// renamed segment re-emits every part, since their documents point at
    /// the segment document id.
    pub fn take_changes_info(
        &mut self,
        generator: &IngestCacheObjectGenerator,
    ) -> MutableSegmentChangesInfo<P> {
        let renamed = self.original_external_id != self.external_id;
        let segment_object_id = generator.segment_object_id(&self.external_id);

        let mut changed_cache_objects = Vec::new();
        if self.segment_has_changes || renamed || self.rank != self.committed_rank {
            changed_cache_objects.push(generator.generate_segment_object(&self.to_ingest_segment(Vec::new())));
        }

        let mut ingest_parts = Vec::with_capacity(self.parts.len());
        let mut all_cache_object_ids = Vec::with_capacity(self.parts.len() + 1);
        all_cache_object_ids.push(segment_object_id.clone());
        let mut part_ids_with_changes = Vec::new();
        let mut part_changes = BTreeMap::new();

        for (rank, part) in self.parts.iter_mut().enumerate() {
            let rank_moved = part.set_rank(rank as f64);
            let dirty = part.check_and_clear_changes_flags();

            all_cache_object_ids.push(generator.part_object_id(part.external_id()));
            if dirty || rank_moved || renamed {
                changed_cache_objects.push(generator.generate_part_object(&segment_object_id, part.data()));
            }
            if dirty {
                let change = if self.original_part_ids.contains(part.external_id()) {
                    PartChange::Updated
                } else {
                    PartChange::Inserted
                };
                part_ids_with_changes.push(part.external_id().to_string());
                part_changes.insert(part.external_id().to_string(), change);
            }
            ingest_parts.push(part.data().clone());
        }

        let current_ids: BTreeSet<String> = ingest_parts.iter().map(|p| p.external_id.clone()).collect();
        for removed in self.original_part_ids.difference(&current_ids) {
            part_changes.insert(removed.clone(), PartChange::Deleted);
        }

        let info = MutableSegmentChangesInfo {
            ingest_parts,
            changed_cache_objects,
            all_cache_object_ids,
            segment_has_changes: self.segment_has_changes,
            part_ids_with_changes,
            part_order_has_changed: self.part_order_has_changed,
            original_external_id: self.original_external_id.clone(),
            part_changes,
        };

        self.segment_has_changes = false;
        self.part_order_has_changed = false;
        self.original_external_id = self.external_id.clone();
        self.original_part_ids = current_ids;
        self.committed_rank = self.rank;

        info
    }
}

impl MutableIngestSegment<Value> {
    pub fn set_payload_property(&mut self, key: &str, value: Value) -> Result<()> {
        if set_json_property(&mut self.payload, key, value)? {
            self.segment_has_changes = true;
        }
        Ok(())
    }
}

/// Where a moved item lands relative to its anchor.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Placement {
    Before,
    After,
}

impl Placement {
    /// Insertion index given the anchor's index after the moved item was
    /// taken out. No anchor means the end for `Before` and the start for `After`.
    pub(crate) fn target_index(self, anchor_index: Option<usize>, len: usize) -> usize {
        match (self, anchor_index) {
            (Placement::Before, Some(index)) => index,
            (Placement::Before, None) => len,
            (Placement::After, Some(index)) => index + 1,
            (Placement::After, None) => 0,
        }
    }
}
