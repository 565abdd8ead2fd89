use std::collections::BTreeSet;

use serde_json::Value;

use crate::cache::{IngestCacheDocument, IngestCacheObjectGenerator};
use crate::error::{IngestError, Result};
use crate::model::{
    IngestChangeDetails, IngestChangeSource, IngestRundown, IngestRundownWithSource,
    IngestSegment, Payload, RundownChange, RundownSource, SegmentChange, UserEditStates,
};

use super::segment::Placement;
use super::{set_edit_state, set_json_property, MutableIngestPart, MutableIngestSegment};

/// A cached rundown opened for editing by shaping logic.
#[derive(Debug, Clone)]
pub struct MutableIngestRundown<P = Value> {
    external_id: String,
    rundown_type: String,
    name: String,
    payload: P,
    user_edit_states: UserEditStates,
    rundown_source: RundownSource,
    segments: Vec<MutableIngestSegment<P>>,
    original_segment_ids: Vec<String>,
    rundown_has_changes: bool,
    force_full_regenerate: bool,
}

/// Result of committing a [`MutableIngestRundown`].
#[derive(Debug, Clone)]
pub struct MutableRundownChangesInfo<P = Value> {
    pub ingest_rundown: IngestRundownWithSource<P>,
    pub changes: IngestChangeDetails,
    /// Cache documents that must be written.
    pub changed_cache_objects: Vec<IngestCacheDocument<P>>,
    /// Every cache document id the rundown still owns; anything else is stale.
    pub all_cache_object_ids: Vec<String>,
}

impl<P: Payload> MutableIngestRundown<P> {
    /// Open a persisted rundown; everything starts clean.
    pub fn new(rundown: IngestRundownWithSource<P>) -> Self {
        let IngestRundownWithSource {
            rundown,
            rundown_source,
        } = rundown;

        let original_segment_ids = rundown.segments.iter().map(|s| s.external_id.clone()).collect();
        let segments = rundown
            .segments
            .into_iter()
            .map(|s| MutableIngestSegment::new(s, false))
            .collect();

        Self {
            external_id: rundown.external_id,
            rundown_type: rundown.rundown_type,
            name: rundown.name,
            payload: rundown.payload,
            user_edit_states: rundown.user_edit_states,
            rundown_source,
            segments,
            original_segment_ids,
            rundown_has_changes: false,
            force_full_regenerate: false,
        }
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn rundown_type(&self) -> &str {
        &self.rundown_type
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

    pub fn rundown_source(&self) -> &RundownSource {
        &self.rundown_source
    }

    pub fn segments(&self) -> &[MutableIngestSegment<P>] {
        &self.segments
    }

    pub fn get_segment(&self, external_id: &str) -> Option<&MutableIngestSegment<P>> {
        self.segments.iter().find(|s| s.external_id() == external_id)
    }

    pub fn get_segment_mut(&mut self, external_id: &str) -> Option<&mut MutableIngestSegment<P>> {
        self.segments.iter_mut().find(|s| s.external_id() == external_id)
    }

    fn segment_index(&self, external_id: &str) -> Option<usize> {
        self.segments.iter().position(|s| s.external_id() == external_id)
    }

    /// First part with `part_external_id` in any segment.
    pub fn find_part(&self, part_external_id: &str) -> Option<&MutableIngestPart<P>> {
        self.find_part_and_segment(part_external_id).map(|(part, _)| part)
    }

    pub fn find_part_and_segment(
        &self,
        part_external_id: &str,
    ) -> Option<(&MutableIngestPart<P>, &MutableIngestSegment<P>)> {
        self.segments
            .iter()
            .find_map(|segment| segment.get_part(part_external_id).map(|part| (part, segment)))
    }

    /// Move a segment before `before`, or to the end when `before` is `None`.
    pub fn move_segment_before(&mut self, segment_external_id: &str, before: Option<&str>) -> Result<()> {
        self.move_segment(segment_external_id, before, Placement::Before)
    }

    /// Move a segment after `after`, or to the start when `after` is `None`.
    pub fn move_segment_after(&mut self, segment_external_id: &str, after: Option<&str>) -> Result<()> {
        self.move_segment(segment_external_id, after, Placement::After)
    }

    fn move_segment(
        &mut self,
        segment_external_id: &str,
        anchor: Option<&str>,
        placement: Placement,
    ) -> Result<()> {
        if anchor == Some(segment_external_id) {
            return Err(IngestError::invalid(format!(
                "Cannot move segment \"{segment_external_id}\" relative to itself"
            )));
        }
        let index = self
            .segment_index(segment_external_id)
            .ok_or_else(|| IngestError::segment_not_found(segment_external_id))?;
        if let Some(anchor) = anchor {
            if self.segment_index(anchor).is_none() {
                return Err(IngestError::segment_not_found(anchor));
            }
        }

        let segment = self.segments.remove(index);
        let target = placement.target_index(anchor.and_then(|a| self.segment_index(a)), self.segments.len());
        self.segments.insert(target, segment);
        Ok(())
    }

    /// Insert `segment` as a fresh dirty wrapper, replacing any segment with
    /// the same external id. Placed before `before`, or appended when `None`.
    pub fn replace_segment(
        &mut self,
        segment: IngestSegment<P>,
        before: Option<&str>,
    ) -> Result<&mut MutableIngestSegment<P>> {
        if before == Some(segment.external_id.as_str()) {
            return Err(IngestError::invalid(format!(
                "Cannot insert segment \"{}\" before itself",
                segment.external_id
            )));
        }
        if let Some(before) = before {
            if self.segment_index(before).is_none() {
                return Err(IngestError::segment_not_found(before));
            }
        }

        if let Some(existing) = self.segment_index(&segment.external_id) {
            self.segments.remove(existing);
        }
        let target = match before.and_then(|b| self.segment_index(b)) {
            Some(index) => index,
            None => self.segments.len(),
        };
        self.segments.insert(target, MutableIngestSegment::new(segment, true));
        Ok(&mut self.segments[target])
    }

    /// Give a segment a new external id; reported as a rename at commit.
    pub fn change_segment_external_id(
        &mut self,
        old_external_id: &str,
        new_external_id: &str,
    ) -> Result<&mut MutableIngestSegment<P>> {
        if old_external_id != new_external_id && self.segment_index(new_external_id).is_some() {
            return Err(IngestError::invalid(format!(
                "Segment \"{new_external_id}\" already exists"
            )));
        }
        let index = self
            .segment_index(old_external_id)
            .ok_or_else(|| IngestError::segment_not_found(old_external_id))?;

        let segment = &mut self.segments[index];
        segment.set_external_id(new_external_id);
        Ok(segment)
    }

    /// Declare which persisted segment `segment_external_id` descends from.
    ///
    /// `original_external_id` must be a segment of the rundown as it was opened
    /// and must not still be in use by another segment.
    pub fn change_segment_original_external_id(
        &mut self,
        segment_external_id: &str,
        original_external_id: &str,
    ) -> Result<&mut MutableIngestSegment<P>> {
        if !self.original_segment_ids.iter().any(|id| id == original_external_id) {
            return Err(IngestError::segment_not_found(original_external_id));
        }
        if original_external_id != segment_external_id
            && self.segment_index(original_external_id).is_some()
        {
            return Err(IngestError::invalid(format!(
                "Segment \"{original_external_id}\" still exists"
            )));
        }
        let index = self
            .segment_index(segment_external_id)
            .ok_or_else(|| IngestError::segment_not_found(segment_external_id))?;

        let segment = &mut self.segments[index];
        segment.set_original_external_id(original_external_id);
        Ok(segment)
    }

    /// Remove a segment; false when it did not exist.
    pub fn remove_segment(&mut self, external_id: &str) -> bool {
        match self.segment_index(external_id) {
            Some(index) => {
                self.segments.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn remove_all_segments(&mut self) {
        self.segments.clear();
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.name != name {
            self.name = name;
            self.rundown_has_changes = true;
        }
    }

    pub fn replace_payload(&mut self, payload: P) {
        if self.payload != payload {
            self.payload = payload;
            self.rundown_has_changes = true;
        }
    }

    pub fn set_user_edit_state(&mut self, key: &str, value: bool) {
        if set_edit_state(&mut self.user_edit_states, key, value) {
            self.rundown_has_changes = true;
        }
    }

    /// Regenerate everything derived from this rundown on commit.
    pub fn force_full_regenerate(&mut self) {
        self.force_full_regenerate = true;
    }

    /// Commit all edits: the new tree, its change description (source
    /// `User`), the cache documents to write and the ids to keep.
    ///
    /// Segments are re-ranked from 0 in their current order.
    pub fn into_changes_info(mut self, generator: &IngestCacheObjectGenerator) -> MutableRundownChangesInfo<P> {
        let mut changes = IngestChangeDetails {
            source: IngestChangeSource::User,
            ..Default::default()
        };
        if self.rundown_has_changes {
            changes.rundown_changes = Some(RundownChange::Payload);
        }

        let mut ingest_rundown = IngestRundownWithSource::new(
            IngestRundown {
                external_id: self.external_id,
                rundown_type: self.rundown_type,
                name: self.name,
                payload: self.payload,
                segments: Vec::with_capacity(self.segments.len()),
                user_edit_states: self.user_edit_states,
            },
            self.rundown_source,
        );

        let mut changed_cache_objects = Vec::new();
        let mut all_cache_object_ids = vec![generator.rundown_object_id()];
        if self.rundown_has_changes || self.force_full_regenerate {
            changed_cache_objects.push(generator.generate_rundown_object(&ingest_rundown));
        }

        let mut claimed_original_ids = BTreeSet::new();
        for (rank, segment) in self.segments.iter_mut().enumerate() {
            segment.set_rank(rank as f64);
            let info = segment.take_changes_info(generator);

            if info.original_external_id != segment.external_id() {
                changes
                    .changed_segment_external_ids
                    .insert(info.original_external_id.clone(), segment.external_id().to_string());
                changes
                    .segment_changes
                    .insert(segment.external_id().to_string(), SegmentChange::InsertedOrUpdated);
            } else if let Some(change) = info.segment_change() {
                changes.segment_changes.insert(segment.external_id().to_string(), change);
            }
            claimed_original_ids.insert(info.original_external_id);

            changed_cache_objects.extend(info.changed_cache_objects);
            all_cache_object_ids.extend(info.all_cache_object_ids);
            ingest_rundown.segments.push(segment.to_ingest_segment(info.ingest_parts));
        }

        let current_ids: Vec<&str> = ingest_rundown.segments.iter().map(|s| s.external_id.as_str()).collect();

        // An original id taken over by a renamed segment is still live.
        for original_id in &self.original_segment_ids {
            if !claimed_original_ids.contains(original_id) && !current_ids.contains(&original_id.as_str()) {
                changes
                    .segment_changes
                    .insert(original_id.clone(), SegmentChange::Deleted);
            }
        }

        changes.segment_order_changed = self.original_segment_ids != current_ids;

        if self.force_full_regenerate {
            changes = IngestChangeDetails::regenerate(IngestChangeSource::User);
        }

        MutableRundownChangesInfo {
            ingest_rundown,
            changes,
            changed_cache_objects,
            all_cache_object_ids,
        }
    }
}

impl MutableIngestRundown<Value> {
    pub fn set_payload_property(&mut self, key: &str, value: Value) -> Result<()> {
        if set_json_property(&mut self.payload, key, value)? {
            self.rundown_has_changes = true;
        }
        Ok(())
    }
}
