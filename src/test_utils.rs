//! Test utilities: ingest tree fixtures.
//!
//! Builders for small rundowns with JSON payloads, shared by unit tests and
//! (behind the `test-utils` feature) integration tests.

use serde_json::{json, Value};

use crate::model::{IngestPart, IngestRundown, IngestRundownWithSource, IngestSegment, RundownSource};

/// Part with a payload derived from its id.
pub fn make_part(external_id: &str, rank: f64) -> IngestPart<Value> {
    IngestPart::new(
        external_id,
        format!("Part {external_id}"),
        rank,
        json!({ "story": external_id }),
    )
}

/// Segment whose parts are ranked by position.
pub fn make_segment(external_id: &str, rank: f64, part_ids: &[&str]) -> IngestSegment<Value> {
    let parts = part_ids
        .iter()
        .enumerate()
        .map(|(i, id)| make_part(id, i as f64))
        .collect();
    IngestSegment::new(
        external_id,
        format!("Segment {external_id}"),
        rank,
        json!({ "segment": external_id }),
    )
    .with_parts(parts)
}

/// Rundown whose segments are ranked by position.
pub fn make_rundown(external_id: &str, segments: Vec<IngestSegment<Value>>) -> IngestRundown<Value> {
    let segments = segments
        .into_iter()
        .enumerate()
        .map(|(i, mut segment)| {
            segment.rank = i as f64;
            segment
        })
        .collect();
    IngestRundown::new(external_id, "mos", format!("Rundown {external_id}"), json!({ "show": external_id }))
        .with_segments(segments)
}

/// Same as [`make_rundown`], tagged as coming from an NRCS device.
pub fn make_rundown_with_source(
    external_id: &str,
    segments: Vec<IngestSegment<Value>>,
) -> IngestRundownWithSource<Value> {
    IngestRundownWithSource::new(
        make_rundown(external_id, segments),
        RundownSource::Nrcs {
            peripheral_device_id: "mos-gateway".to_string(),
            nrcs_name: "ENPS".to_string(),
        },
    )
}

/// Two segments, `segment0` with `part0`/`part1` and `segment1` with `part2`/`part3`.
pub fn make_default_rundown() -> IngestRundownWithSource<Value> {
    make_rundown_with_source(
        "rundown0",
        vec![
            make_segment("segment0", 0.0, &["part0", "part1"]),
            make_segment("segment1", 1.0, &["part2", "part3"]),
        ],
    )
}
