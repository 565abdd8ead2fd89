//! Deterministic document ids and document construction for one rundown.

use crate::cache::{IngestCacheData, IngestCacheDocument};
use crate::model::{IngestPart, IngestRundown, IngestRundownWithSource, IngestSegment, Payload};

/// Builds cache documents for a single rundown.
///
/// Ids are `<rundownId>`, `<rundownId>_segment_<segmentExternalId>` and
/// `<rundownId>_part_<partExternalId>`, so documents can be upserted or
/// deleted individually without rewriting the whole tree.
#[derive(Debug, Clone)]
pub struct IngestCacheObjectGenerator {
    rundown_id: String,
}

impl IngestCacheObjectGenerator {
    pub fn new(rundown_id: impl Into<String>) -> Self {
        Self {
            rundown_id: rundown_id.into(),
        }
    }

    pub fn rundown_id(&self) -> &str {
        &self.rundown_id
    }

    pub fn rundown_object_id(&self) -> String {
        self.rundown_id.clone()
    }

    pub fn segment_object_id(&self, segment_external_id: &str) -> String {
        format!("{}_segment_{}", self.rundown_id, segment_external_id)
    }

    pub fn part_object_id(&self, part_external_id: &str) -> String {
        format!("{}_part_{}", self.rundown_id, part_external_id)
    }

    /// Rundown document; the segment list is stripped.
    pub fn generate_rundown_object<P: Payload>(
        &self,
        rundown: &IngestRundownWithSource<P>,
    ) -> IngestCacheDocument<P> {
        let data = IngestRundownWithSource {
            rundown: IngestRundown {
                external_id: rundown.external_id.clone(),
                rundown_type: rundown.rundown_type.clone(),
                name: rundown.name.clone(),
                payload: rundown.payload.clone(),
                segments: Vec::new(),
                user_edit_states: rundown.user_edit_states.clone(),
            },
            rundown_source: rundown.rundown_source.clone(),
        };

        IngestCacheDocument {
            id: self.rundown_object_id(),
            rundown_id: self.rundown_id.clone(),
            modified: 0,
            data: IngestCacheData::Rundown(data),
        }
    }

    /// Segment document; the part list is stripped.
    pub fn generate_segment_object<P: Payload>(
        &self,
        segment: &IngestSegment<P>,
    ) -> IngestCacheDocument<P> {
        let id = self.segment_object_id(&segment.external_id);
        let data = IngestSegment {
            external_id: segment.external_id.clone(),
            name: segment.name.clone(),
            rank: segment.rank,
            payload: segment.payload.clone(),
            parts: Vec::new(),
            user_edit_states: segment.user_edit_states.clone(),
        };

        IngestCacheDocument {
            id: id.clone(),
            rundown_id: self.rundown_id.clone(),
            modified: 0,
            data: IngestCacheData::Segment {
                segment_id: id,
                segment: data,
            },
        }
    }

    /// Part document, linked to its segment document by `segment_object_id`.
    pub fn generate_part_object<P: Payload>(
        &self,
        segment_object_id: &str,
        part: &IngestPart<P>,
    ) -> IngestCacheDocument<P> {
        let id = self.part_object_id(&part.external_id);

        IngestCacheDocument {
            id: id.clone(),
            rundown_id: self.rundown_id.clone(),
            modified: 0,
            data: IngestCacheData::Part {
                segment_id: segment_object_id.to_string(),
                part_id: id,
                part: part.clone(),
            },
        }
    }

    /// Decompose a full tree into its documents.
    pub fn generate_cache_for_rundown<P: Payload>(
        &self,
        rundown: &IngestRundownWithSource<P>,
    ) -> Vec<IngestCacheDocument<P>> {
        let mut docs = vec![self.generate_rundown_object(rundown)];

        for segment in &rundown.segments {
            let segment_doc = self.generate_segment_object(segment);
            let segment_object_id = segment_doc.id.clone();
            docs.push(segment_doc);

            for part in &segment.parts {
                docs.push(self.generate_part_object(&segment_object_id, part));
            }
        }

        docs
    }
}
