//! Ingest data cache.
//!
//! Holds the last persisted ingest tree of one rundown, decomposed into one
//! document per rundown/segment/part. Updates are tracked per document id so
//! that a save only rewrites what actually changed.
//!
//! A cache instance is owned by a single ingest operation; the rundown-level
//! lock held by the job layer guarantees no other instance mutates the same
//! rundown concurrently.

mod document;
mod generator;

pub use document::{IngestCacheData, IngestCacheDocument};
pub use generator::IngestCacheObjectGenerator;

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use crate::model::{IngestPart, IngestRundownWithSource, IngestSegment, Payload};
use crate::storage::{self, IngestCacheStore, IngestWriteOp, StorageError};

/// In-memory view of a rundown's ingest cache documents.
pub struct NrcsIngestDataCache<P: Payload = serde_json::Value> {
    store: Arc<dyn IngestCacheStore>,
    generator: IngestCacheObjectGenerator,
    documents: BTreeMap<String, IngestCacheDocument<P>>,
    changed_ids: BTreeSet<String>,
}

impl<P: Payload> NrcsIngestDataCache<P> {
    /// Load every persisted document of `rundown_id`.
    pub async fn create(
        store: Arc<dyn IngestCacheStore>,
        rundown_id: &str,
    ) -> Result<Self, StorageError> {
        let stored = store.load(rundown_id).await?;

        let mut documents = BTreeMap::new();
        for doc in stored {
            let doc = IngestCacheDocument::from_stored(doc)?;
            documents.insert(doc.id.clone(), doc);
        }
        debug!(%rundown_id, count = documents.len(), "ingest cache loaded");

        Ok(Self {
            store,
            generator: IngestCacheObjectGenerator::new(rundown_id),
            documents,
            changed_ids: BTreeSet::new(),
        })
    }

    pub fn rundown_id(&self) -> &str {
        self.generator.rundown_id()
    }

    pub fn generator(&self) -> &IngestCacheObjectGenerator {
        &self.generator
    }

    /// Ids of documents that differ from what was last saved.
    pub fn changed_ids(&self) -> impl Iterator<Item = &str> {
        self.changed_ids.iter().map(String::as_str)
    }

    pub fn has_changes(&self) -> bool {
        !self.changed_ids.is_empty()
    }

    /// Reassemble the full tree, or `None` if no rundown is cached.
    ///
    /// Segments and parts are ordered by rank. Part documents whose segment
    /// document is missing are ignored.
    pub fn fetch_rundown(&self) -> Option<IngestRundownWithSource<P>> {
        let mut rundown = self.documents.values().find_map(|doc| match &doc.data {
            IngestCacheData::Rundown(rundown) => Some(rundown.clone()),
            _ => None,
        })?;

        let mut groups: BTreeMap<&str, (Option<&IngestSegment<P>>, Vec<&IngestPart<P>>)> =
            BTreeMap::new();
        for doc in self.documents.values() {
            match &doc.data {
                IngestCacheData::Rundown(_) => {}
                IngestCacheData::Segment {
                    segment_id,
                    segment,
                } => {
                    groups.entry(segment_id.as_str()).or_default().0 = Some(segment);
                }
                IngestCacheData::Part {
                    segment_id, part, ..
                } => {
                    groups.entry(segment_id.as_str()).or_default().1.push(part);
                }
            }
        }

        rundown.segments = groups
            .into_values()
            .filter_map(|(segment, parts)| {
                let mut segment = segment?.clone();
                segment.parts = parts.into_iter().cloned().collect();
                segment.sort_parts();
                Some(segment)
            })
            .collect();
        rundown.sort_segments();

        Some(rundown)
    }

    /// Replace the cached tree, marking only documents whose content differs.
    pub fn replace(&mut self, rundown: &IngestRundownWithSource<P>) {
        let new_docs = self.generator.generate_cache_for_rundown(rundown);
        let new_ids: HashSet<String> = new_docs.iter().map(|doc| doc.id.clone()).collect();

        let removed: Vec<String> = self
            .documents
            .keys()
            .filter(|id| !new_ids.contains(*id))
            .cloned()
            .collect();
        for id in removed {
            self.documents.remove(&id);
            self.changed_ids.insert(id);
        }

        for doc in new_docs {
            let unchanged = self
                .documents
                .get(&doc.id)
                .is_some_and(|existing| existing.content_eq(&doc));
            if !unchanged {
                self.changed_ids.insert(doc.id.clone());
                self.documents.insert(doc.id.clone(), doc);
            }
        }
    }

    /// Drop every document; the next save deletes them from storage.
    pub fn delete(&mut self) {
        self.changed_ids.extend(self.documents.keys().cloned());
        self.documents.clear();
    }

    /// Drop every document whose id is not in `ids_to_keep`.
    pub fn remove_all_other_documents<'a>(&mut self, ids_to_keep: impl IntoIterator<Item = &'a str>) {
        let keep: HashSet<&str> = ids_to_keep.into_iter().collect();
        let removed: Vec<String> = self
            .documents
            .keys()
            .filter(|id| !keep.contains(id.as_str()))
            .cloned()
            .collect();
        for id in removed {
            self.documents.remove(&id);
            self.changed_ids.insert(id);
        }
    }

    /// Insert or overwrite individual documents.
    pub fn replace_documents(&mut self, docs: impl IntoIterator<Item = IngestCacheDocument<P>>) {
        for doc in docs {
            self.changed_ids.insert(doc.id.clone());
            self.documents.insert(doc.id.clone(), doc);
        }
    }

    /// Persist every changed document in one bulk write.
    ///
    /// The changed set is only cleared once the write succeeded, so a failed
    /// save can be retried with the same instance.
    pub async fn save_to_database(&mut self) -> Result<(), StorageError> {
        if self.changed_ids.is_empty() {
            return Ok(());
        }

        let modified = chrono::Utc::now().timestamp_millis();
        let mut ops = Vec::with_capacity(self.changed_ids.len());
        let mut upserts = 0usize;
        for id in &self.changed_ids {
            match self.documents.get(id) {
                Some(doc) => {
                    let mut stored = doc.to_stored()?;
                    stored.modified = modified;
                    ops.push(IngestWriteOp::Upsert(stored));
                    upserts += 1;
                }
                None => ops.push(IngestWriteOp::Delete(id.clone())),
            }
        }
        let deletes = ops.len() - upserts;

        let rundown_id = self.generator.rundown_id().to_string();
        if let Err(err) = self.store.bulk_write(&rundown_id, ops).await {
            storage::log_write_failure(&rundown_id, &err);
            return Err(err);
        }

        for id in std::mem::take(&mut self.changed_ids) {
            if let Some(doc) = self.documents.get_mut(&id) {
                doc.modified = modified;
            }
        }
        if upserts == 0 && deletes > 0 && self.documents.is_empty() {
            info!(%rundown_id, deletes, "ingest cache removed");
        } else {
            debug!(%rundown_id, upserts, deletes, "ingest cache saved");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
