//! Typed cache documents and their storage conversion.

use crate::model::{IngestPart, IngestRundownWithSource, IngestSegment, Payload};
use crate::storage::{IngestDocumentKind, StorageError, StoredIngestDocument};

/// One persisted unit of the decomposed ingest tree.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestCacheDocument<P = serde_json::Value> {
    pub id: String,
    pub rundown_id: String,
    /// Milliseconds since the epoch of the last write; 0 until first saved.
    pub modified: i64,
    pub data: IngestCacheData<P>,
}

/// What a cache document holds.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestCacheData<P = serde_json::Value> {
    /// Rundown-level fields; `segments` is always empty.
    Rundown(IngestRundownWithSource<P>),
    /// Segment-level fields; `parts` is always empty.
    Segment {
        segment_id: String,
        segment: IngestSegment<P>,
    },
    Part {
        segment_id: String,
        part_id: String,
        part: IngestPart<P>,
    },
}

impl<P: Payload> IngestCacheData<P> {
    pub fn kind(&self) -> IngestDocumentKind {
        match self {
            IngestCacheData::Rundown(_) => IngestDocumentKind::Rundown,
            IngestCacheData::Segment { .. } => IngestDocumentKind::Segment,
            IngestCacheData::Part { .. } => IngestDocumentKind::Part,
        }
    }

    /// Segment the document belongs to (segment and part documents only).
    pub fn segment_id(&self) -> Option<&str> {
        match self {
            IngestCacheData::Rundown(_) => None,
            IngestCacheData::Segment { segment_id, .. } => Some(segment_id),
            IngestCacheData::Part { segment_id, .. } => Some(segment_id),
        }
    }
}

impl<P: Payload> IngestCacheDocument<P> {
    /// Equality ignoring the write timestamp.
    pub fn content_eq(&self, other: &Self) -> bool {
        self.id == other.id && self.rundown_id == other.rundown_id && self.data == other.data
    }

    pub fn to_stored(&self) -> Result<StoredIngestDocument, StorageError> {
        let (segment_id, part_id, data) = match &self.data {
            IngestCacheData::Rundown(rundown) => (None, None, serde_json::to_value(rundown)?),
            IngestCacheData::Segment {
                segment_id,
                segment,
            } => (Some(segment_id.clone()), None, serde_json::to_value(segment)?),
            IngestCacheData::Part {
                segment_id,
                part_id,
                part,
            } => (
                Some(segment_id.clone()),
                Some(part_id.clone()),
                serde_json::to_value(part)?,
            ),
        };

        Ok(StoredIngestDocument {
            id: self.id.clone(),
            rundown_id: self.rundown_id.clone(),
            kind: self.data.kind(),
            segment_id,
            part_id,
            modified: self.modified,
            data,
        })
    }

    pub fn from_stored(stored: StoredIngestDocument) -> Result<Self, StorageError> {
        let missing = |field: &str| StorageError::InvalidDocument {
            id: stored.id.clone(),
            reason: format!("{} document without {field}", stored.kind.as_str()),
        };

        let data = match stored.kind {
            IngestDocumentKind::Rundown => {
                IngestCacheData::Rundown(serde_json::from_value(stored.data)?)
            }
            IngestDocumentKind::Segment => IngestCacheData::Segment {
                segment_id: stored.segment_id.clone().ok_or_else(|| missing("segment_id"))?,
                segment: serde_json::from_value(stored.data)?,
            },
            IngestDocumentKind::Part => IngestCacheData::Part {
                segment_id: stored.segment_id.clone().ok_or_else(|| missing("segment_id"))?,
                part_id: stored.part_id.clone().ok_or_else(|| missing("part_id"))?,
                part: serde_json::from_value(stored.data)?,
            },
        };

        Ok(Self {
            id: stored.id,
            rundown_id: stored.rundown_id,
            modified: stored.modified,
            data,
        })
    }
}
