//! Configuration constants and validation functions for the harvester.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{HarvesterError, Result};

/// Base URL of gesetze-im-internet.de.
pub const GII_BASE_URL: &str = "https://www.gesetze-im-internet.de";

/// HTTP timeout in seconds.
///
/// Set to 30 seconds to accommodate large archives and slow connections.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Default maximum HTTP response size in bytes (100 MB).
pub const DEFAULT_MAX_RESPONSE_SIZE: u64 = 100 * 1024 * 1024;

/// Text wrap width for Markdown paragraphs.
pub const TEXT_WRAP_WIDTH: usize = 70;

/// Default directory for downloaded law XML.
pub const DEFAULT_LAWS_PATH: &str = "laws";

/// Default location of the law list.
pub const DEFAULT_LAWLIST_PATH: &str = "data/laws.json";

/// Characters of the `Teilliste_*.html` index pages.
pub const PART_LIST_CHARS: &str = "abcdefghijklmnopqrstuvwxyz0123456789";

/// Law slug pattern as used in gesetze-im-internet.de URLs.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static SLUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9_.-]*$").expect("valid regex"));

/// Validate a law slug.
///
/// # Examples
/// ```
/// use gesetze_harvester::config::validate_slug;
///
/// assert!(validate_slug("bgb").is_ok());
/// assert!(validate_slug("aeg_1994").is_ok());
/// assert!(validate_slug("../etc").is_err());
/// ```
pub fn validate_slug(slug: &str) -> Result<()> {
    if SLUG_PATTERN.is_match(slug) && !slug.contains("..") {
        Ok(())
    } else {
        Err(HarvesterError::InvalidSlug(slug.to_string()))
    }
}

/// Build the URL of a law's XML archive.
pub fn law_zip_url(base_url: &str, slug: &str) -> String {
    debug_assert!(
        validate_slug(slug).is_ok(),
        "slug should be validated before calling law_zip_url"
    );
    format!("{}/{slug}/xml.zip", base_url.trim_end_matches('/'))
}

/// Build the URL of one `Teilliste` index page.
///
/// # Examples
/// ```
/// use gesetze_harvester::config::part_list_url;
///
/// assert_eq!(
///     part_list_url("https://www.gesetze-im-internet.de", 'a'),
///     "https://www.gesetze-im-internet.de/Teilliste_A.html"
/// );
/// ```
pub fn part_list_url(base_url: &str, part: char) -> String {
    format!(
        "{}/Teilliste_{}.html",
        base_url.trim_end_matches('/'),
        part.to_ascii_uppercase()
    )
}

/// Directory of a law below `root`, bucketed by the slug's first character.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use gesetze_harvester::config::law_dir;
///
/// assert_eq!(law_dir(Path::new("laws"), "bgb"), Path::new("laws/b/bgb"));
/// ```
pub fn law_dir(root: &Path, slug: &str) -> PathBuf {
    let prefix: String = slug.chars().take(1).collect();
    root.join(prefix).join(slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_slug_valid() {
        assert!(validate_slug("bgb").is_ok());
        assert!(validate_slug("1-dm-goldmg").is_ok());
        assert!(validate_slug("sgb_5").is_ok());
        assert!(validate_slug("b.v.g").is_ok());
    }

    #[test]
    fn test_validate_slug_invalid() {
        assert!(validate_slug("").is_err());
        assert!(validate_slug("BGB").is_err());
        assert!(validate_slug("_bgb").is_err());
        assert!(validate_slug("a/b").is_err());
        assert!(validate_slug("a..b").is_err());
        assert!(validate_slug("bgb ").is_err());
    }

    #[test]
    fn test_law_zip_url() {
        assert_eq!(
            law_zip_url(GII_BASE_URL, "kaeaano"),
            "https://www.gesetze-im-internet.de/kaeaano/xml.zip"
        );
        assert_eq!(
            law_zip_url("http://127.0.0.1:8080/", "bgb"),
            "http://127.0.0.1:8080/bgb/xml.zip"
        );
    }

    #[test]
    fn test_part_list_url_digits() {
        assert_eq!(
            part_list_url(GII_BASE_URL, '1'),
            "https://www.gesetze-im-internet.de/Teilliste_1.html"
        );
    }

    #[test]
    fn test_law_dir() {
        assert_eq!(
            law_dir(Path::new("/tmp/laws"), "aeg_1994"),
            Path::new("/tmp/laws/a/aeg_1994")
        );
    }
}
