//! Data model for the ingestion pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One batch of input records
#[derive(Debug, Clone, Deserialize)]
pub struct IngestBatch {
    pub records: Vec<IngestRecord>,
}

/// One input record, immutable after parsing
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRecord {
    /// Source address; must end in the recognized archive extension
    pub url: String,

    /// Instance identifier carried through to the result event
    pub id: String,

    /// Last-modified timestamp used for the conditional existence probe
    pub updated: DateTime<Utc>,

    /// Explicit filename override; when present it is used unmodified
    #[serde(default, rename = "fileName")]
    pub file_name: Option<String>,

    /// Opaque attribute bag carried through for event enrichment
    #[serde(default)]
    pub data: Option<ItemMetadata>,
}

/// Opaque item attributes, never interpreted by the pipeline itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drm: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rights: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub measurements: Vec<serde_json::Value>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One file contained in the archive, materialized during decomposition
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub path: String,
    pub bytes: Vec<u8>,
}

/// Categorized violation counts from an accessibility scan
///
/// Severity ordering is fixed and meaningful: critical, serious, moderate,
/// minor, in descending weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationReport {
    #[serde(default)]
    pub critical: u32,
    #[serde(default)]
    pub serious: u32,
    #[serde(default)]
    pub moderate: u32,
    #[serde(default)]
    pub minor: u32,
}

impl ViolationReport {
    /// Severity names in fixed descending-severity order
    pub const SEVERITIES: [&'static str; 4] = ["critical", "serious", "moderate", "minor"];

    /// Counts in the same fixed order as [`Self::SEVERITIES`]
    pub fn counts(&self) -> [u32; 4] {
        [self.critical, self.serious, self.moderate, self.minor]
    }

    /// Increment the count for a named severity; unknown names are ignored
    /// and reported as `false`.
    pub fn increment(&mut self, severity: &str) -> bool {
        match severity {
            "critical" => self.critical += 1,
            "serious" => self.serious += 1,
            "moderate" => self.moderate += 1,
            "minor" => self.minor += 1,
            _ => return false,
        }
        true
    }
}

/// Derived accessibility score, read-only once computed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccessibilityScore {
    pub value: f64,
}

/// The single normalized output shape for every terminal code path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEvent {
    pub status: u16,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_deserializes_with_optional_fields() {
        let json = serde_json::json!({
            "url": "https://example.org/files/123456.epub.images",
            "id": "inst-1",
            "updated": "2024-01-18T12:00:00Z",
            "data": {
                "source": "gutenberg",
                "drm": "none",
                "rights": "public_domain",
                "measurements": [{"quantity": "downloads", "value": 42}]
            }
        });

        let record: IngestRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.id, "inst-1");
        assert!(record.file_name.is_none());
        let meta = record.data.unwrap();
        assert_eq!(meta.source.as_deref(), Some("gutenberg"));
        assert_eq!(meta.measurements.len(), 1);
    }

    #[test]
    fn test_violation_report_order_and_increment() {
        let mut report = ViolationReport::default();
        assert!(report.increment("serious"));
        assert!(report.increment("serious"));
        assert!(report.increment("minor"));
        assert!(!report.increment("cosmetic"));
        assert_eq!(report.counts(), [0, 2, 0, 1]);
    }

    #[test]
    fn test_metadata_roundtrip_keeps_unknown_fields() {
        let json = serde_json::json!({
            "source": "gutenberg",
            "links": ["https://example.org"]
        });
        let meta: ItemMetadata = serde_json::from_value(json.clone()).unwrap();
        let back = serde_json::to_value(&meta).unwrap();
        assert_eq!(back["links"], json["links"]);
    }
}
