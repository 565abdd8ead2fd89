//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Ingest cache table schema.
#[derive(Iden)]
pub enum IngestCache {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "rundown_id"]
    RundownId,
    #[iden = "kind"]
    Kind,
    #[iden = "segment_id"]
    SegmentId,
    #[iden = "part_id"]
    PartId,
    #[iden = "modified"]
    Modified,
    #[iden = "data"]
    Data,
}

/// SQL for creating the ingest cache table.
pub const CREATE_INGEST_CACHE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS ingest_cache (
    id TEXT NOT NULL,
    rundown_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    segment_id TEXT,
    part_id TEXT,
    modified INTEGER NOT NULL,
    data TEXT NOT NULL,
    PRIMARY KEY (rundown_id, id)
);

CREATE INDEX IF NOT EXISTS idx_ingest_cache_rundown ON ingest_cache(rundown_id);
"#;
