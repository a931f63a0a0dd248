//! Test helpers for harvest integration tests.
//!
//! This module provides the shared blog-domain store the pipeline tests run
//! against.

#[path = "helpers/fixtures.rs"]
pub mod fixtures;
