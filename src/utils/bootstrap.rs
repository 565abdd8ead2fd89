//! Bootstrap utilities for the rundown-ingest binary.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, LOG_ENV_VAR};
use crate::storage::{self, IngestCacheStore, StorageError};

/// Initialize tracing with the RUNDOWN_INGEST_LOG environment variable.
///
/// Defaults to "info" level if RUNDOWN_INGEST_LOG is not set.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Open the configured cache store.
pub async fn connect_storage(config: &Config) -> Result<Arc<dyn IngestCacheStore>, StorageError> {
    let store = storage::init_storage(&config.storage).await?;
    info!(
        separator = config.ingest.part_group_separator.as_deref().unwrap_or(""),
        "Ingest cache ready"
    );
    Ok(store)
}
