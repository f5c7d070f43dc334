//! The law list: every law published on gesetze-im-internet.de.
//!
//! The site splits its index into `Teilliste_A.html` … `Teilliste_9.html`,
//! encoded in ISO-8859-1.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::{part_list_url, PART_LIST_CHARS};
use crate::error::Result;
use crate::http::Fetch;
use crate::types::{BatchReport, LawRecord};

/// Link to a law on a part list page.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static PART_LIST_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"href="\./([^/]+)/index\.html"><abbr title="([^"]*)">([^<]+)</abbr>"#)
        .expect("valid regex")
});

/// Extract law records from one part list page.
///
/// # Examples
/// ```
/// use gesetze_harvester::lawlist::parse_part_list;
///
/// let html = r#"<a href="./bgb/index.html"><abbr title="Bürgerliches Gesetzbuch">BGB</abbr></a>"#;
/// let records = parse_part_list(html);
/// assert_eq!(records[0].slug, "bgb");
/// assert_eq!(records[0].abbreviation, "BGB");
/// ```
pub fn parse_part_list(html: &str) -> Vec<LawRecord> {
    PART_LIST_ENTRY
        .captures_iter(html)
        .map(|caps| LawRecord {
            slug: caps[1].to_string(),
            name: unescape_attribute(&caps[2]),
            abbreviation: unescape_attribute(caps[3].trim()),
        })
        .collect()
}

fn unescape_attribute(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Download all part lists and write the law list to `lawlist_path`.
///
/// A part list that cannot be fetched is reported and skipped; the list is
/// written from the remaining pages.
pub fn update_list(
    fetcher: &impl Fetch,
    base_url: &str,
    lawlist_path: &Path,
) -> Result<BatchReport> {
    let mut report = BatchReport::new();
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for part in PART_LIST_CHARS.chars() {
        let url = part_list_url(base_url, part);
        tracing::info!(part = %part, "loading part list");

        let page = match fetcher.fetch_page(&url) {
            Ok(page) => page,
            Err(e) => {
                report.record_failure(url, e);
                continue;
            }
        };

        for record in parse_part_list(&page.latin1_text()) {
            if seen.insert(record.slug.clone()) {
                records.push(record);
            }
        }
        report.record_success(url);
    }

    save_law_list(lawlist_path, &records)?;
    tracing::info!(count = records.len(), path = %lawlist_path.display(), "law list written");

    Ok(report)
}

/// Read the law list.
pub fn load_law_list(path: &Path) -> Result<Vec<LawRecord>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write the law list as pretty-printed JSON.
pub fn save_law_list(path: &Path, records: &[LawRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut json = serde_json::to_string_pretty(records)?;
    json.push('\n');
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarvesterError;
    use crate::http::Page;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    struct FakeFetcher {
        pages: HashMap<String, Vec<u8>>,
    }

    impl Fetch for FakeFetcher {
        fn fetch_page(&self, url: &str) -> Result<Page> {
            self.pages
                .get(url)
                .map(|body| Page::from_body(body.clone()))
                .ok_or_else(|| HarvesterError::NotFound(url.to_string()))
        }
    }

    const PART_A: &str = concat!(
        r#"<p><a href="./aeg_1994/index.html"><abbr title="Allgemeines Eisenbahngesetz">AEG </abbr></a></p>"#,
        r#"<p><a href="./aktg/index.html"><abbr title="Aktiengesetz &quot;AktG&quot;">AktG</abbr></a></p>"#,
    );

    #[test]
    fn test_parse_part_list() {
        let records = parse_part_list(PART_A);
        assert_eq!(
            records,
            vec![
                LawRecord::new("aeg_1994", "Allgemeines Eisenbahngesetz", "AEG"),
                LawRecord::new("aktg", "Aktiengesetz \"AktG\"", "AktG"),
            ]
        );
    }

    #[test]
    fn test_parse_part_list_ignores_other_links() {
        let html = r#"<a href="./impressum.html">Impressum</a>"#;
        assert!(parse_part_list(html).is_empty());
    }

    #[test]
    fn test_update_list_skips_failed_parts() {
        let base = "http://gii.test";
        let mut pages = HashMap::new();
        pages.insert(part_list_url(base, 'a'), PART_A.as_bytes().to_vec());
        // Latin-1 encoded "Gebührengesetz"
        let mut part_b = br#"<a href="./bgebg/index.html"><abbr title="Geb"#.to_vec();
        part_b.push(0xfc);
        part_b.extend_from_slice(br#"hrengesetz">BGebG</abbr>"#);
        pages.insert(part_list_url(base, 'b'), part_b);
        let fetcher = FakeFetcher { pages };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("laws.json");
        let report = update_list(&fetcher, base, &path).unwrap();

        assert_eq!(report.succeeded.len(), 2);
        assert_eq!(report.failures.len(), PART_LIST_CHARS.len() - 2);

        let records = load_law_list(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].name, "Gebührengesetz");
    }
}
