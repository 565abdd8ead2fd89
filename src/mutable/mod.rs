//! Mutable wrappers around a cached ingest tree.
//!
//! Shaping logic edits a rundown through these wrappers instead of touching the
//! plain tree. Every setter compares against the current value and only marks
//! the entity dirty on a real change, so committing an untouched wrapper
//! produces no cache writes and an empty change description.
//!
//! Lifecycle per wrapper: clean → dirty (a setter changed something) →
//! committed (`take_changes_info` / `into_changes_info`, flags reset).

mod part;
mod rundown;
mod segment;

pub use part::MutableIngestPart;
pub use rundown::{MutableIngestRundown, MutableRundownChangesInfo};
pub use segment::{MutableIngestSegment, MutableSegmentChangesInfo};

use serde_json::{Map, Value};

use crate::error::{IngestError, Result};

/// Set `key` on a JSON object payload, returning whether anything changed.
///
/// A null payload is promoted to an empty object first; any other non-object
/// payload is rejected.
fn set_json_property(payload: &mut Value, key: &str, value: Value) -> Result<bool> {
    if payload.is_null() {
        *payload = Value::Object(Map::new());
    }
    let Value::Object(map) = payload else {
        return Err(IngestError::invalid(format!(
            "Cannot set property \"{key}\" on a non-object payload"
        )));
    };

    if map.get(key) == Some(&value) {
        return Ok(false);
    }
    map.insert(key.to_string(), value);
    Ok(true)
}

/// Store `value` under `key`, returning whether it differed.
fn set_edit_state(states: &mut crate::model::UserEditStates, key: &str, value: bool) -> bool {
    if states.get(key) == Some(&value) {
        return false;
    }
    states.insert(key.to_string(), value);
    true
}
