//! Shared storage integration tests.
//!
//! Tests the IngestCacheStore interface against all implementations.
//! Each implementation module imports these test functions and runs them.

pub mod cache_store_tests;
