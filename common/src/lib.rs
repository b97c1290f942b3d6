//! Shared utilities for the pizzeria workspace
//!
//! This crate provides functionality used by every member crate:
//!
//! - YAML configuration loading
//! - Shared test utilities (unique identifiers, throwaway database URLs)

pub mod config;

// Test helpers module - available for both development and test builds
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

#[cfg(any(test, feature = "test-helpers"))]
pub use test_helpers::{generate_unique_id, temp_database_url};
