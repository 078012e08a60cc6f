//! SFR Ingest Library
//!
//! Ingestion-and-decomposition pipeline for remote ePub packages.
//!
//! Per input record the pipeline:
//!
//! 1. Resolves a canonical artifact name from the source address
//! 2. Gates on a conditional existence probe against content storage
//! 3. Fetches the archive and tees the byte stream to two consumers
//! 4. Decomposes the archive into individually stored parts while
//!    accumulating the complete document for scoring
//! 5. Computes a severity-weighted accessibility score
//! 6. Emits exactly one normalized result event
//!
//! Records in a batch are processed independently; one record's failure
//! never aborts its siblings.

pub mod archive;
pub mod buffer;
pub mod config;
pub mod events;
pub mod fetch;
pub mod filename;
pub mod gate;
pub mod models;
pub mod orchestrator;
pub mod report;
pub mod score;
pub mod scoring;
pub mod storage;
pub mod tee;
