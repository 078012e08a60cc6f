//! Accessibility report summarization
//!
//! The scanning service returns an EARL-style JSON document: a two-element
//! array whose second element carries the assertions, the scanner release
//! under `earl:assertedBy.doap:release.doap:revision`, and the run date
//! under `dct:date`. Each top-level assertion nests per-test assertions
//! whose `earl:test.earl:impact` names the violation severity.

use serde::Serialize;
use serde_json::Value;
use sfr_common::{IngestError, Result};
use tracing::debug;

use crate::models::ViolationReport;
use crate::score;

/// Flattened summary of one scan
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    /// Scanner release that produced the report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ace_version: Option<String>,

    /// When the scan ran, as reported by the scanner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Severity-weighted score, clamped at zero
    pub score: f64,

    /// Per-severity violation counts
    pub violations: ViolationReport,
}

/// Reduce a raw scanner document to a [`ReportSummary`].
///
/// Accepts either the two-element array form or the bare report object.
pub fn summarize(raw: &Value) -> Result<ReportSummary> {
    let main = match raw {
        Value::Array(items) => items.get(1).ok_or_else(|| {
            IngestError::AccessibilityReport(
                "report array is missing its main element".to_string(),
            )
        })?,
        Value::Object(_) => raw,
        _ => {
            return Err(IngestError::AccessibilityReport(format!(
                "unexpected report shape: {}",
                value_kind(raw)
            )))
        },
    };

    let assertions = main
        .get("assertions")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            IngestError::AccessibilityReport("report carries no assertions".to_string())
        })?;

    let violations = tally_violations(assertions);
    let score = score::calculate(&violations);

    Ok(ReportSummary {
        ace_version: main
            .pointer("/earl:assertedBy/doap:release/doap:revision")
            .and_then(Value::as_str)
            .map(str::to_string),
        timestamp: main
            .get("dct:date")
            .and_then(Value::as_str)
            .map(str::to_string),
        score: score.value,
        violations,
    })
}

/// Count `earl:impact` occurrences across the nested assertion lists
fn tally_violations(assertions: &[Value]) -> ViolationReport {
    let mut violations = ViolationReport::default();

    for assertion in assertions {
        let Some(tests) = assertion.get("assertions").and_then(Value::as_array) else {
            continue;
        };

        for test in tests {
            let Some(impact) = test
                .pointer("/earl:test/earl:impact")
                .and_then(Value::as_str)
            else {
                continue;
            };

            if !violations.increment(impact) {
                debug!(impact, "Ignoring unknown violation severity");
            }
        }
    }

    violations
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
