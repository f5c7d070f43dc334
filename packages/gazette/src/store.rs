//! JSON dumps of scraped gazette entries.
//!
//! A dump is append-only: entries already present keep their position, and
//! an issue that is already in the dump is never added again.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::GazetteEntry;

/// Load a dump. A missing file is an empty dump.
pub fn load_entries(path: &Path) -> Result<Vec<GazetteEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Entries of `scraped` whose issue is not yet in `existing`, sorted by
/// issue id. Entries of the same issue keep their scraped order.
#[must_use]
pub fn merge_new(existing: &[GazetteEntry], scraped: Vec<GazetteEntry>) -> Vec<GazetteEntry> {
    let known: HashSet<&str> = existing.iter().map(|e| e.issue_id.as_str()).collect();
    let mut new: Vec<GazetteEntry> = scraped
        .into_iter()
        .filter(|entry| !known.contains(entry.issue_id.as_str()))
        .collect();
    new.sort_by(|a, b| a.issue_id.cmp(&b.issue_id));
    new
}

/// Append the new entries of `scraped` to the dump at `path`.
///
/// The file is only rewritten when something was appended. Returns the
/// number of appended entries.
pub fn append_new(path: &Path, scraped: Vec<GazetteEntry>) -> Result<usize> {
    let mut entries = load_entries(path)?;
    let new = merge_new(&entries, scraped);
    if new.is_empty() {
        tracing::info!(path = %path.display(), "no new entries");
        return Ok(0);
    }

    let appended = new.len();
    entries.extend(new);
    save_entries(path, &entries)?;
    tracing::info!(path = %path.display(), appended, "dump updated");
    Ok(appended)
}

/// Write a dump through a temporary file in the same directory.
fn save_entries(path: &Path, entries: &[GazetteEntry]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut json = serde_json::to_string_pretty(entries)?;
    json.push('\n');

    let temp = temp_path(path);
    fs::write(&temp, json)?;
    fs::rename(&temp, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GazetteKind;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn entry(issue: &str, title: &str) -> GazetteEntry {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        GazetteEntry::new(GazetteKind::Bgbl, issue, date, title, 2020)
    }

    fn titles(entries: &[GazetteEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.title.as_str()).collect()
    }

    #[test]
    fn test_merge_new_skips_known_issues() {
        let existing = vec![entry("2020-1-0002", "old")];
        let scraped = vec![
            entry("2020-1-0003", "c1"),
            entry("2020-1-0002", "again"),
            entry("2020-1-0001", "a"),
            entry("2020-1-0003", "c2"),
        ];
        let new = merge_new(&existing, scraped);
        assert_eq!(titles(&new), vec!["a", "c1", "c2"]);
    }

    #[test]
    fn test_append_new_keeps_existing_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("bgbl.json");

        assert_eq!(
            append_new(&path, vec![entry("2020-1-0009", "z"), entry("2020-1-0001", "y")]).unwrap(),
            2
        );
        assert_eq!(append_new(&path, vec![entry("2020-1-0005", "x")]).unwrap(), 1);

        let stored = load_entries(&path).unwrap();
        assert_eq!(titles(&stored), vec!["y", "z", "x"]);
        assert!(!dir.path().join("data").join("bgbl.json.tmp").exists());
    }

    #[test]
    fn test_append_nothing_new_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banz.json");
        append_new(&path, vec![entry("2020-1-0001", "a")]).unwrap();
        let before = fs::read(&path).unwrap();

        assert_eq!(append_new(&path, vec![entry("2020-1-0001", "a")]).unwrap(), 0);
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_entries(&dir.path().join("none.json")).unwrap().is_empty());
    }
}
