//! Rundown Ingest - NRCS change tracking and diffing
//!
//! Caches the ingest tree of each rundown as it was last received from a
//! newsroom computer system, applies incoming updates to it and computes the
//! minimal change description downstream regeneration needs.

pub mod cache;
pub mod config;
pub mod diff;
pub mod error;
pub mod grouping;
pub mod jobs;
pub mod model;
pub mod mutable;
pub mod storage;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{IngestError, Result};
