//! IngestCacheStore trait definition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Result;

/// Which level of the ingest tree a stored document holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestDocumentKind {
    Rundown,
    Segment,
    Part,
}

impl IngestDocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestDocumentKind::Rundown => "rundown",
            IngestDocumentKind::Segment => "segment",
            IngestDocumentKind::Part => "part",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "rundown" => Some(IngestDocumentKind::Rundown),
            "segment" => Some(IngestDocumentKind::Segment),
            "part" => Some(IngestDocumentKind::Part),
            _ => None,
        }
    }
}

/// One persisted piece of a decomposed ingest tree, in storage form.
///
/// `data` holds the serialized rundown/segment/part with its child list
/// emptied; the children live in their own documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredIngestDocument {
    pub id: String,
    pub rundown_id: String,
    pub kind: IngestDocumentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_id: Option<String>,
    /// Milliseconds since the epoch, stamped when the document is written.
    pub modified: i64,
    pub data: serde_json::Value,
}

/// A single step of a bulk write.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestWriteOp {
    /// Insert the document, or replace the one with the same id.
    Upsert(StoredIngestDocument),
    /// Remove the document with this id, if present.
    Delete(String),
}

/// Interface for ingest cache persistence.
///
/// The store is shared by all rundowns; every call is scoped by
/// `rundown_id`, and implementations must never touch documents of another
/// rundown.
///
/// # Implementations
///
/// - `SqliteIngestCacheStore`: SQLite storage
/// - `MockIngestCacheStore`: In-memory store for testing and ephemeral use
#[async_trait]
pub trait IngestCacheStore: Send + Sync {
    /// Load every document belonging to a rundown.
    ///
    /// Returns an empty list for a rundown that was never stored.
    async fn load(&self, rundown_id: &str) -> Result<Vec<StoredIngestDocument>>;

    /// Apply upserts and deletes for a rundown as one atomic batch.
    ///
    /// Either every operation is applied or none is.
    async fn bulk_write(&self, rundown_id: &str, ops: Vec<IngestWriteOp>) -> Result<()>;
}
