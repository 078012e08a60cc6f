//! SFR Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the SFR ePub pipeline.
//!
//! # Overview
//!
//! This crate provides common functionality used across all SFR workspace members:
//!
//! - **Error Handling**: The per-record error taxonomy and result type
//! - **Logging**: Centralized tracing initialization
//! - **Checksums**: Content integrity utilities for stored artifacts

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{IngestError, Result};
