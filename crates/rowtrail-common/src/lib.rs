//! Rowtrail Common Library
//!
//! Shared utilities for the Rowtrail workspace.
//!
//! # Overview
//!
//! This crate provides functionality used across all Rowtrail workspace
//! members:
//!
//! - **Canonical Serialization**: deterministic textual forms for row values,
//!   used for record identities and change detection
//! - **Logging**: tracing-based logging configuration and initialization

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod canon;
pub mod logging;

pub use canon::{canonical_row, canonical_value, CYCLIC_PLACEHOLDER};
