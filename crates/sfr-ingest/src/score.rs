//! Severity-weighted accessibility score
//!
//! Starts from a fixed baseline and subtracts `count / 4^i` for the i-th
//! severity in descending order, so a single critical violation costs a
//! full point while a minor one costs 1/64th.

use crate::models::{AccessibilityScore, ViolationReport};

/// Baseline score before any violations are deducted
pub const STARTING_SCORE: f64 = 10.0;

/// Weight divisor between adjacent severity categories
pub const SCORE_DIVISOR: f64 = 4.0;

/// Reduce a violation report to a single score.
///
/// A negative raw score is clamped to zero: a negative score is never
/// surfaced. This is deliberate policy, not a numerical accident.
pub fn calculate(report: &ViolationReport) -> AccessibilityScore {
    let mut score = STARTING_SCORE;

    for (i, count) in report.counts().iter().enumerate() {
        score -= f64::from(*count) / SCORE_DIVISOR.powi(i as i32);
    }

    AccessibilityScore {
        value: score.max(0.0),
    }
}
