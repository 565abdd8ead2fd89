//! Ingest tree model.
//!
//! Plain data describing a rundown as received from an NRCS:
//! `IngestRundown` → `IngestSegment` → `IngestPart`. Array order is
//! authoritative; `rank` is advisory and re-derived where needed.

mod changes;

pub use changes::{
    IngestChangeDetails, IngestChangeSource, PartChange, RundownChange, SegmentChange,
    SegmentPartChanges,
};

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::ops::{Deref, DerefMut};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Opaque payload carried at every level of the tree.
///
/// The engine never looks inside a payload; it only clones, compares and
/// (at the storage boundary) serializes it.
pub trait Payload:
    Clone + PartialEq + Default + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> Payload for T where
    T: Clone + PartialEq + Default + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// Flags set by users on an ingest entity, keyed by edit-state name.
pub type UserEditStates = BTreeMap<String, bool>;

/// A single playable item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound = "P: Payload")]
pub struct IngestPart<P = serde_json::Value> {
    /// Unique within the owning segment.
    pub external_id: String,
    pub name: String,
    pub rank: f64,
    #[serde(default)]
    pub payload: P,
    #[serde(default)]
    pub user_edit_states: UserEditStates,
}

impl<P: Payload> IngestPart<P> {
    pub fn new(external_id: impl Into<String>, name: impl Into<String>, rank: f64, payload: P) -> Self {
        Self {
            external_id: external_id.into(),
            name: name.into(),
            rank,
            payload,
            user_edit_states: UserEditStates::new(),
        }
    }
}

/// A story grouping of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound = "P: Payload")]
pub struct IngestSegment<P = serde_json::Value> {
    /// Unique within the owning rundown.
    pub external_id: String,
    pub name: String,
    pub rank: f64,
    #[serde(default)]
    pub payload: P,
    #[serde(default)]
    pub parts: Vec<IngestPart<P>>,
    #[serde(default)]
    pub user_edit_states: UserEditStates,
}

impl<P: Payload> IngestSegment<P> {
    pub fn new(external_id: impl Into<String>, name: impl Into<String>, rank: f64, payload: P) -> Self {
        Self {
            external_id: external_id.into(),
            name: name.into(),
            rank,
            payload,
            parts: Vec::new(),
            user_edit_states: UserEditStates::new(),
        }
    }

    /// Builder-style helper for attaching parts.
    pub fn with_parts(mut self, parts: Vec<IngestPart<P>>) -> Self {
        self.parts = parts;
        self
    }

    pub fn part(&self, external_id: &str) -> Option<&IngestPart<P>> {
        self.parts.iter().find(|p| p.external_id == external_id)
    }

    /// Sort parts by rank, keeping array order for equal ranks.
    pub fn sort_parts(&mut self) {
        self.parts.sort_by(|a, b| a.rank.total_cmp(&b.rank));
    }
}

/// A show, as received from the NRCS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound = "P: Payload")]
pub struct IngestRundown<P = serde_json::Value> {
    /// Unique within the system.
    pub external_id: String,
    /// Tag identifying the source NRCS (e.g. `"mos"`).
    #[serde(rename = "type")]
    pub rundown_type: String,
    pub name: String,
    #[serde(default)]
    pub payload: P,
    #[serde(default)]
    pub segments: Vec<IngestSegment<P>>,
    #[serde(default)]
    pub user_edit_states: UserEditStates,
}

impl<P: Payload> IngestRundown<P> {
    pub fn new(
        external_id: impl Into<String>,
        rundown_type: impl Into<String>,
        name: impl Into<String>,
        payload: P,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            rundown_type: rundown_type.into(),
            name: name.into(),
            payload,
            segments: Vec::new(),
            user_edit_states: UserEditStates::new(),
        }
    }

    /// Builder-style helper for attaching segments.
    pub fn with_segments(mut self, segments: Vec<IngestSegment<P>>) -> Self {
        self.segments = segments;
        self
    }

    pub fn segment(&self, external_id: &str) -> Option<&IngestSegment<P>> {
        self.segments.iter().find(|s| s.external_id == external_id)
    }

    pub fn segment_mut(&mut self, external_id: &str) -> Option<&mut IngestSegment<P>> {
        self.segments.iter_mut().find(|s| s.external_id == external_id)
    }

    /// Sort segments by rank, keeping array order for equal ranks.
    pub fn sort_segments(&mut self) {
        self.segments.sort_by(|a, b| a.rank.total_cmp(&b.rank));
    }
}

/// Where a rundown came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RundownSource {
    /// Produced by an NRCS gateway device.
    #[serde(rename_all = "camelCase")]
    Nrcs {
        peripheral_device_id: String,
        nrcs_name: String,
    },
    /// Pushed over the HTTP ingest API.
    Http,
    /// Restored from a snapshot of another rundown.
    #[serde(rename_all = "camelCase")]
    Snapshot { rundown_id: String },
    /// Generated for testing a show style variant.
    #[serde(rename_all = "camelCase")]
    Testing { show_style_variant_id: String },
}

/// An `IngestRundown` together with its origin.
///
/// Derefs to the plain tree so diffing and grouping code can take either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound = "P: Payload")]
pub struct IngestRundownWithSource<P = serde_json::Value> {
    #[serde(flatten)]
    pub rundown: IngestRundown<P>,
    pub rundown_source: RundownSource,
}

impl<P: Payload> IngestRundownWithSource<P> {
    pub fn new(rundown: IngestRundown<P>, rundown_source: RundownSource) -> Self {
        Self {
            rundown,
            rundown_source,
        }
    }

    pub fn into_inner(self) -> IngestRundown<P> {
        self.rundown
    }
}

impl<P> Deref for IngestRundownWithSource<P> {
    type Target = IngestRundown<P>;

    fn deref(&self) -> &Self::Target {
        &self.rundown
    }
}

impl<P> DerefMut for IngestRundownWithSource<P> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.rundown
    }
}
