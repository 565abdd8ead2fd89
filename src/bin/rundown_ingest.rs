//! rundown-ingest: apply a full NRCS rundown update from a JSON file
//!
//! Loads the cached ingest tree of `<rundown-id>`, replaces it with the tree in
//! `<ingest-rundown.json>` and prints the resulting change description.
//!
//! ## Usage
//! ```text
//! rundown-ingest <rundown-id> <ingest-rundown.json>
//! ```
//!
//! ## Configuration
//! - RUNDOWN_INGEST_CONFIG: Path to a YAML config file (optional)
//! - RUNDOWN_INGEST__STORAGE__TYPE / RUNDOWN_INGEST__STORAGE__PATH: cache store
//! - RUNDOWN_INGEST__INGEST__PART_GROUP_SEPARATOR: group flat NRCS segments
//! - RUNDOWN_INGEST_LOG: tracing filter (default: info)

use tracing::info;

use rundown_ingest::config::Config;
use rundown_ingest::jobs::{handle_updated_rundown, run_ingest_update_operation, IngestUpdateOutcome};
use rundown_ingest::model::IngestRundownWithSource;
use rundown_ingest::utils::bootstrap::{connect_storage, init_tracing};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let (Some(rundown_id), Some(input_path)) = (args.next(), args.next()) else {
        eprintln!("usage: rundown-ingest <rundown-id> <ingest-rundown.json>");
        std::process::exit(2);
    };

    let config = Config::load(None)?;
    let store = connect_storage(&config).await?;

    let input = std::fs::read_to_string(&input_path)?;
    let ingest_rundown: IngestRundownWithSource = serde_json::from_str(&input)?;
    info!(%rundown_id, external_id = %ingest_rundown.external_id, "Applying rundown update");

    let outcome = run_ingest_update_operation(store, &config.ingest, &rundown_id, |existing| {
        handle_updated_rundown(existing, ingest_rundown)
    })
    .await?;

    match outcome {
        Some(IngestUpdateOutcome::Updated { changes, .. }) => {
            println!("{}", serde_json::to_string_pretty(&changes)?);
        }
        Some(IngestUpdateOutcome::Deleted) | None => {
            info!(%rundown_id, "No changes to report");
        }
    }

    Ok(())
}
