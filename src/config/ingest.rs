//! Ingest behaviour configuration.

use serde::Deserialize;

/// How incoming NRCS data is shaped before diffing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Separator used by NRCS adapters that send one part per segment,
    /// named `"<group><separator><story>"`. When set, consecutive segments
    /// sharing a group name are merged before changes are computed.
    pub part_group_separator: Option<String>,
}
