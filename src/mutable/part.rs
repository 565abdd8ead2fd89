use serde_json::Value;

use crate::error::Result;
use crate::model::{IngestPart, Payload, UserEditStates};

use super::{set_edit_state, set_json_property};

/// One part with its own dirty flag.
#[derive(Debug, Clone)]
pub struct MutableIngestPart<P = Value> {
    part: IngestPart<P>,
    has_changes: bool,
}

impl<P: Payload> MutableIngestPart<P> {
    /// Wrap `part`; `has_changes` marks it dirty from the start (new parts).
    pub fn new(part: IngestPart<P>, has_changes: bool) -> Self {
        Self { part, has_changes }
    }

    pub fn external_id(&self) -> &str {
        &self.part.external_id
    }

    pub fn name(&self) -> &str {
        &self.part.name
    }

    pub fn payload(&self) -> &P {
        &self.part.payload
    }

    pub fn user_edit_states(&self) -> &UserEditStates {
        &self.part.user_edit_states
    }

    pub fn data(&self) -> &IngestPart<P> {
        &self.part
    }

    pub fn has_changes(&self) -> bool {
        self.has_changes
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.part.name != name {
            self.part.name = name;
            self.has_changes = true;
        }
    }

    pub fn replace_payload(&mut self, payload: P) {
        if self.part.payload != payload {
            self.part.payload = payload;
            self.has_changes = true;
        }
    }

    pub fn set_user_edit_state(&mut self, key: &str, value: bool) {
        if set_edit_state(&mut self.part.user_edit_states, key, value) {
            self.has_changes = true;
        }
    }

    /// Return the dirty flag and reset it.
    pub fn check_and_clear_changes_flags(&mut self) -> bool {
        std::mem::take(&mut self.has_changes)
    }

    /// Rank is owned by the segment and only rewritten at commit.
    pub(crate) fn set_rank(&mut self, rank: f64) -> bool {
        if self.part.rank == rank {
            return false;
        }
        self.part.rank = rank;
        true
    }
}

impl MutableIngestPart<Value> {
    pub fn set_payload_property(&mut self, key: &str, value: Value) -> Result<()> {
        if set_json_property(&mut self.part.payload, key, value)? {
            self.has_changes = true;
        }
        Ok(())
    }
}
