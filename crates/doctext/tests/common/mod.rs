//! Shared test utilities for doctext integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs against temp directories and SQLite files
//! - Builders for configs, notification batches, upload events and documents

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{TestHarness, BUCKET};
