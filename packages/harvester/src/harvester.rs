//! Main harvester service that ties fetching and storage together.

use std::path::{Path, PathBuf};

use indicatif::ProgressBar;

use crate::config::GII_BASE_URL;
use crate::content::{fetch_law_archive, store_law};
use crate::error::Result;
use crate::http::Fetch;
use crate::types::{BatchReport, LawRecord};

/// Downloads law archives into a local directory tree.
#[derive(Debug, Clone)]
pub struct Harvester<F> {
    fetcher: F,
    base_url: String,
    laws_path: PathBuf,
}

impl<F: Fetch> Harvester<F> {
    /// Create a harvester writing below `laws_path`.
    pub fn new(fetcher: F, laws_path: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            base_url: GII_BASE_URL.to_string(),
            laws_path: laws_path.into(),
        }
    }

    /// Use a different site root (mirrors, test servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Directory the laws are written to.
    pub fn laws_path(&self) -> &Path {
        &self.laws_path
    }

    /// Download and store a single law.
    pub fn load_law(&self, slug: &str) -> Result<()> {
        let archive = fetch_law_archive(&self.fetcher, &self.base_url, slug)?;
        store_law(&self.laws_path, slug, &archive)?;
        tracing::info!(slug, "law stored");
        Ok(())
    }

    /// Download the given laws one after another.
    ///
    /// Per-item failures are collected; anything else (disk full, permission
    /// denied) aborts the batch.
    pub fn load<S: AsRef<str>>(&self, slugs: &[S], progress: &ProgressBar) -> Result<BatchReport> {
        let mut report = BatchReport::new();

        for slug in slugs {
            let slug = slug.as_ref();
            progress.set_message(slug.to_string());

            match self.load_law(slug) {
                Ok(()) => report.record_success(slug),
                Err(e) if e.is_per_item() => report.record_failure(slug, e),
                Err(e) => return Err(e),
            }
            progress.inc(1);
        }

        Ok(report)
    }

    /// Download every law of the law list.
    pub fn loadall(&self, lawlist: &[LawRecord], progress: &ProgressBar) -> Result<BatchReport> {
        let slugs: Vec<&str> = lawlist.iter().map(|law| law.slug.as_str()).collect();
        self.load(&slugs, progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarvesterError;
    use crate::http::Page;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    struct OneLawFetcher;

    impl Fetch for OneLawFetcher {
        fn fetch_page(&self, url: &str) -> Result<Page> {
            if url.ends_with("/bgb/xml.zip") {
                let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
                writer
                    .start_file("BJNR001950896.xml", SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(b"<dokumente/>").unwrap();
                Ok(Page::from_body(writer.finish().unwrap().into_inner()))
            } else {
                Err(HarvesterError::NotFound(url.to_string()))
            }
        }
    }

    #[test]
    fn test_load_collects_failures() {
        let root = tempfile::tempdir().unwrap();
        let harvester = Harvester::new(OneLawFetcher, root.path()).with_base_url("http://gii.test");

        let report = harvester
            .load(&["bgb", "gone", "Not A Slug"], &ProgressBar::hidden())
            .unwrap();

        assert_eq!(report.succeeded, vec!["bgb"]);
        assert_eq!(report.failures.len(), 2);
        assert!(matches!(report.failures[0].error, HarvesterError::NotFound(_)));
        assert!(matches!(report.failures[1].error, HarvesterError::InvalidSlug(_)));
        assert!(root.path().join("b/bgb/bgb.xml").exists());
    }

    #[test]
    fn test_loadall_uses_lawlist_slugs() {
        let root = tempfile::tempdir().unwrap();
        let harvester = Harvester::new(OneLawFetcher, root.path()).with_base_url("http://gii.test");
        let lawlist = vec![LawRecord::new("bgb", "Bürgerliches Gesetzbuch", "BGB")];

        let report = harvester.loadall(&lawlist, &ProgressBar::hidden()).unwrap();

        assert!(report.is_success());
        assert_eq!(report.total(), 1);
    }
}
