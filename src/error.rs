//! Ingest operation errors.

use crate::storage::StorageError;

/// Result type for ingest operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors raised while applying an ingest operation.
///
/// None of these are recovered internally: they unwind to the operation
/// runner, which aborts without persisting anything.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("{kind} \"{id}\" not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl IngestError {
    pub fn rundown_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: EntityKind::Rundown,
            id: id.into(),
        }
    }

    pub fn segment_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: EntityKind::Segment,
            id: id.into(),
        }
    }

    pub fn part_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: EntityKind::Part,
            id: id.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }
}

/// Level of the ingest tree an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Rundown,
    Segment,
    Part,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Rundown => write!(f, "Rundown"),
            EntityKind::Segment => write!(f, "Segment"),
            EntityKind::Part => write!(f, "Part"),
        }
    }
}
