//! Conditional processing gate
//!
//! Decides whether a named artifact must be (re)written by probing storage
//! with the record's last-modified timestamp as an "unless newer than"
//! precondition. A boolean gate per call; nothing is memoized.

use chrono::{DateTime, Utc};
use sfr_common::Result;
use tracing::debug;

use crate::storage::{ObjectStore, ProbeOutcome};

/// Gate decision for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The artifact is missing or older than the record; process it
    Proceed,
    /// The stored artifact is already up to date; terminal no-op outcome
    Existing,
}

/// Probe storage and decide whether processing may continue.
///
/// A precondition-failed probe is the "existing" no-op outcome, not an
/// error. Any probe failure other than the two recognized outcomes
/// propagates unchanged, since it is ambiguous whether the artifact is
/// current.
pub async fn check(
    store: &dyn ObjectStore,
    key: &str,
    last_modified: DateTime<Utc>,
) -> Result<GateDecision> {
    match store.probe(key, last_modified).await? {
        ProbeOutcome::UpToDate => {
            debug!(key, "Stored artifact is up to date, skipping");
            Ok(GateDecision::Existing)
        },
        ProbeOutcome::Missing | ProbeOutcome::Stale => Ok(GateDecision::Proceed),
    }
}
