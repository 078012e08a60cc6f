//! Canonical artifact name resolution
//!
//! Source addresses end in `<name>.epub`, optionally followed by an
//! image-inclusion qualifier (`.images` / `.noimages`). When the qualifier
//! is present it is spliced into the returned name with an underscore
//! before the extension: `123456.epub.images` -> `123456_images.epub`.

use regex::Regex;
use sfr_common::{IngestError, Result};

/// Gutenberg-style name with an image qualifier
const QUALIFIED_PATTERN: &str = r"([0-9]+)\.epub\.((?:no)?images)$";

/// Bare ePub name without a qualifier
const PLAIN_PATTERN: &str = r"([^/]+\.epub)$";

/// Derive the artifact name for a source address.
///
/// An explicit override wins unmodified. Otherwise the address must end in
/// the recognized `.epub` extension; anything else is a hard validation
/// failure that short-circuits the record.
pub fn resolve(source_url: &str, override_name: Option<&str>) -> Result<String> {
    if let Some(name) = override_name {
        return Ok(name.to_string());
    }

    let qualified = compile(QUALIFIED_PATTERN)?;
    if let Some(caps) = qualified.captures(source_url) {
        return Ok(format!("{}_{}.epub", &caps[1], &caps[2]));
    }

    let plain = compile(PLAIN_PATTERN)?;
    if let Some(caps) = plain.captures(source_url) {
        return Ok(caps[1].to_string());
    }

    Err(IngestError::Regex(format!(
        "no recognized ePub name in address: {}",
        source_url
    )))
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| IngestError::Regex(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_qualified_images_name() {
        let name = resolve("https://example.org/ebooks/123456.epub.images", None).unwrap();
        assert_eq!(name, "123456_images.epub");
    }

    #[test]
    fn test_resolves_qualified_noimages_name() {
        let name = resolve("https://example.org/ebooks/9876.epub.noimages", None).unwrap();
        assert_eq!(name, "9876_noimages.epub");
    }

    #[test]
    fn test_plain_epub_name_passes_through() {
        let name = resolve("https://example.org/ebooks/other.epub", None).unwrap();
        assert_eq!(name, "other.epub");
    }

    #[test]
    fn test_override_wins_unmodified() {
        let name = resolve(
            "https://example.org/ebooks/123456.epub.images",
            Some("custom-name.epub"),
        )
        .unwrap();
        assert_eq!(name, "custom-name.epub");
    }

    #[test]
    fn test_missing_extension_is_a_hard_failure() {
        let err = resolve("https://example.org/ebooks/123456.mobi", None).unwrap_err();
        assert!(matches!(err, IngestError::Regex(_)));
    }

    #[test]
    fn test_name_is_taken_from_last_path_segment() {
        let name = resolve("https://example.org/deep/path/55.epub.images", None).unwrap();
        assert_eq!(name, "55_images.epub");
    }
}
