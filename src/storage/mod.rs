//! Storage implementations.
//!
//! The ingest cache persists through the [`IngestCacheStore`] trait; the
//! backend is picked from configuration at startup.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::{StorageConfig, StorageType};

mod cache_store;
pub mod mock;
#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use cache_store::{IngestCacheStore, IngestDocumentKind, IngestWriteOp, StoredIngestDocument};
pub use mock::MockIngestCacheStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteIngestCacheStore;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors raised by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid document {id}: {reason}")]
    InvalidDocument { id: String, reason: String },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Unsupported storage: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Initialize storage based on configuration.
pub async fn init_storage(config: &StorageConfig) -> Result<Arc<dyn IngestCacheStore>> {
    info!("Storage: {:?} at {}", config.storage_type, config.path);

    match config.storage_type {
        StorageType::Memory => Ok(Arc::new(MockIngestCacheStore::new())),
        #[cfg(feature = "sqlite")]
        StorageType::Sqlite => {
            if let Some(parent) = std::path::Path::new(&config.path).parent() {
                std::fs::create_dir_all(parent)?;
            }

            let pool =
                sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", config.path)).await?;

            let store = SqliteIngestCacheStore::new(pool);
            store.init().await?;

            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageType::Sqlite => {
            error!("SQLite storage requested but 'sqlite' feature is not enabled");
            Err(StorageError::Unsupported(
                "sqlite feature not enabled".to_string(),
            ))
        }
    }
}

/// Report a failed bulk write before handing the error back.
pub(crate) fn log_write_failure(rundown_id: &str, err: &StorageError) {
    error!(%rundown_id, error = %err, "ingest cache bulk write failed");
}
