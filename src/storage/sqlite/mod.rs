//! SQLite implementation of the ingest cache store.

use async_trait::async_trait;
use sea_query::{Expr, OnConflict, Order, Query, SqliteQueryBuilder};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::storage::schema::{IngestCache, CREATE_INGEST_CACHE_TABLE};
use crate::storage::{
    IngestCacheStore, IngestDocumentKind, IngestWriteOp, Result, StorageError,
    StoredIngestDocument,
};

/// SQLite implementation of IngestCacheStore.
///
/// Documents are kept in a single `ingest_cache` table with the payload tree
/// stored as JSON text.
pub struct SqliteIngestCacheStore {
    pool: SqlitePool,
}

impl SqliteIngestCacheStore {
    /// Create a new SQLite ingest cache store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the table and index if they do not exist yet.
    pub async fn init(&self) -> Result<()> {
        sqlx::raw_sql(CREATE_INGEST_CACHE_TABLE)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply a batch within an already-started transaction.
    async fn apply_ops(
        conn: &mut SqliteConnection,
        rundown_id: &str,
        ops: Vec<IngestWriteOp>,
    ) -> Result<()> {
        for op in ops {
            match op {
                IngestWriteOp::Upsert(doc) => {
                    if doc.rundown_id != rundown_id {
                        return Err(StorageError::InvalidDocument {
                            id: doc.id,
                            reason: format!("belongs to rundown {}", doc.rundown_id),
                        });
                    }
                    let data = serde_json::to_string(&doc.data)?;

                    let query = Query::insert()
                        .into_table(IngestCache::Table)
                        .columns([
                            IngestCache::Id,
                            IngestCache::RundownId,
                            IngestCache::Kind,
                            IngestCache::SegmentId,
                            IngestCache::PartId,
                            IngestCache::Modified,
                            IngestCache::Data,
                        ])
                        .values_panic([
                            doc.id.into(),
                            doc.rundown_id.into(),
                            doc.kind.as_str().into(),
                            doc.segment_id.into(),
                            doc.part_id.into(),
                            doc.modified.into(),
                            data.into(),
                        ])
                        .on_conflict(
                            OnConflict::columns([IngestCache::RundownId, IngestCache::Id])
                                .update_columns([
                                    IngestCache::Kind,
                                    IngestCache::SegmentId,
                                    IngestCache::PartId,
                                    IngestCache::Modified,
                                    IngestCache::Data,
                                ])
                                .to_owned(),
                        )
                        .to_string(SqliteQueryBuilder);

                    sqlx::query(&query).execute(&mut *conn).await?;
                }
                IngestWriteOp::Delete(id) => {
                    let query = Query::delete()
                        .from_table(IngestCache::Table)
                        .and_where(Expr::col(IngestCache::RundownId).eq(rundown_id))
                        .and_where(Expr::col(IngestCache::Id).eq(id))
                        .to_string(SqliteQueryBuilder);

                    sqlx::query(&query).execute(&mut *conn).await?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl IngestCacheStore for SqliteIngestCacheStore {
    async fn load(&self, rundown_id: &str) -> Result<Vec<StoredIngestDocument>> {
        let query = Query::select()
            .columns([
                IngestCache::Id,
                IngestCache::RundownId,
                IngestCache::Kind,
                IngestCache::SegmentId,
                IngestCache::PartId,
                IngestCache::Modified,
                IngestCache::Data,
            ])
            .from(IngestCache::Table)
            .and_where(Expr::col(IngestCache::RundownId).eq(rundown_id))
            .order_by(IngestCache::Id, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let kind: String = row.get("kind");
            let kind = IngestDocumentKind::parse(&kind).ok_or_else(|| {
                StorageError::InvalidDocument {
                    id: id.clone(),
                    reason: format!("unknown kind {kind}"),
                }
            })?;
            let data: String = row.get("data");
            docs.push(StoredIngestDocument {
                id,
                rundown_id: row.get("rundown_id"),
                kind,
                segment_id: row.get("segment_id"),
                part_id: row.get("part_id"),
                modified: row.get("modified"),
                data: serde_json::from_str(&data)?,
            });
        }

        debug!(%rundown_id, count = docs.len(), "loaded ingest cache documents");
        Ok(docs)
    }

    async fn bulk_write(&self, rundown_id: &str, ops: Vec<IngestWriteOp>) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }

        // BEGIN IMMEDIATE acquires the write lock upfront, preventing deadlocks
        // when concurrent DEFERRED transactions race to upgrade from shared to exclusive.
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result = match Self::apply_ops(&mut conn, rundown_id, ops).await {
            Ok(()) => sqlx::query("COMMIT")
                .execute(&mut *conn)
                .await
                .map(|_| ())
                .map_err(StorageError::from),
            Err(e) => Err(e),
        };

        // Pooled connections must not stay inside a transaction.
        if result.is_err() {
            let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
        }
        result
    }
}
