//! Mock IngestCacheStore implementation for testing.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::storage::{IngestCacheStore, IngestWriteOp, Result, StorageError, StoredIngestDocument};

/// Documents of one rundown, keyed by document id.
type RundownDocuments = HashMap<String, StoredIngestDocument>;

/// Mock store that keeps ingest cache documents in memory.
#[derive(Default)]
pub struct MockIngestCacheStore {
    documents: RwLock<HashMap<String, RundownDocuments>>,
    fail_on_write: RwLock<bool>,
    fail_on_load: RwLock<bool>,
    write_count: RwLock<usize>,
}

impl MockIngestCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_write(&self, fail: bool) {
        *self.fail_on_write.write().await = fail;
    }

    pub async fn set_fail_on_load(&self, fail: bool) {
        *self.fail_on_load.write().await = fail;
    }

    /// Number of bulk writes that reached the store.
    pub async fn write_count(&self) -> usize {
        *self.write_count.read().await
    }

    pub async fn get_stored(&self, rundown_id: &str, id: &str) -> Option<StoredIngestDocument> {
        self.documents
            .read()
            .await
            .get(rundown_id)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    pub async fn stored_count(&self, rundown_id: &str) -> usize {
        self.documents
            .read()
            .await
            .get(rundown_id)
            .map(|docs| docs.len())
            .unwrap_or_default()
    }
}

#[async_trait]
impl IngestCacheStore for MockIngestCacheStore {
    async fn load(&self, rundown_id: &str) -> Result<Vec<StoredIngestDocument>> {
        if *self.fail_on_load.read().await {
            return Err(StorageError::Unavailable(format!(
                "load of rundown {rundown_id} failed"
            )));
        }
        let store = self.documents.read().await;
        let mut docs: Vec<_> = store
            .get(rundown_id)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs)
    }

    async fn bulk_write(&self, rundown_id: &str, ops: Vec<IngestWriteOp>) -> Result<()> {
        if *self.fail_on_write.read().await {
            return Err(StorageError::Unavailable(format!(
                "bulk write of rundown {rundown_id} failed"
            )));
        }

        // Validate the whole batch before touching anything
        for op in &ops {
            if let IngestWriteOp::Upsert(doc) = op {
                if doc.rundown_id != rundown_id {
                    return Err(StorageError::InvalidDocument {
                        id: doc.id.clone(),
                        reason: format!("belongs to rundown {}", doc.rundown_id),
                    });
                }
            }
        }

        let mut store = self.documents.write().await;
        let docs = store.entry(rundown_id.to_string()).or_default();
        for op in ops {
            match op {
                IngestWriteOp::Upsert(doc) => {
                    docs.insert(doc.id.clone(), doc);
                }
                IngestWriteOp::Delete(id) => {
                    docs.remove(&id);
                }
            }
        }
        if docs.is_empty() {
            store.remove(rundown_id);
        }

        *self.write_count.write().await += 1;
        Ok(())
    }
}
