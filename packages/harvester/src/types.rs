//! Core data types for the harvester.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One entry of the law list.
///
/// Field order matches the sorted keys of the persisted JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LawRecord {
    /// Official abbreviation (e.g., "BGB").
    pub abbreviation: String,

    /// Full name of the law.
    pub name: String,

    /// URL slug on gesetze-im-internet.de (e.g., "bgb").
    pub slug: String,
}

impl LawRecord {
    /// Create a new record.
    #[must_use]
    pub fn new(
        slug: impl Into<String>,
        name: impl Into<String>,
        abbreviation: impl Into<String>,
    ) -> Self {
        Self {
            abbreviation: abbreviation.into(),
            name: name.into(),
            slug: slug.into(),
        }
    }
}

/// Law records keyed by slug.
#[derive(Debug, Clone, Default)]
pub struct LawIndex {
    by_slug: BTreeMap<String, LawRecord>,
}

impl LawIndex {
    /// Build an index; the first record of a duplicated slug wins.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = LawRecord>) -> Self {
        let mut by_slug = BTreeMap::new();
        for record in records {
            if by_slug.contains_key(&record.slug) {
                tracing::warn!(slug = %record.slug, "duplicate slug in law list, keeping first");
                continue;
            }
            by_slug.insert(record.slug.clone(), record);
        }
        Self { by_slug }
    }

    /// Look up a law by slug.
    #[must_use]
    pub fn get(&self, slug: &str) -> Option<&LawRecord> {
        self.by_slug.get(slug)
    }

    /// All slugs in sorted order.
    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.by_slug.keys().map(String::as_str)
    }

    /// Number of laws.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_slug.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_slug.is_empty()
    }
}

/// A law converted to Markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedLaw {
    /// Slug derived from the law's abbreviation; names the output directory.
    pub slug: String,

    /// Complete `index.md` content including front matter.
    pub markdown: String,
}

/// A single failed item of a batch.
#[derive(Debug)]
pub struct BatchFailure<E> {
    /// Item identifier (slug, path, page).
    pub item: String,

    /// What went wrong.
    pub error: E,
}

/// Outcome of a batch operation that continues past per-item failures.
#[derive(Debug)]
pub struct BatchReport<E = crate::error::HarvesterError> {
    /// Identifiers of items that succeeded.
    pub succeeded: Vec<String>,

    /// Items that failed, in processing order.
    pub failures: Vec<BatchFailure<E>>,
}

impl<E> Default for BatchReport<E> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<E: fmt::Display> BatchReport<E> {
    /// Create an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful item.
    pub fn record_success(&mut self, item: impl Into<String>) {
        self.succeeded.push(item.into());
    }

    /// Record and log a failed item.
    pub fn record_failure(&mut self, item: impl Into<String>, error: E) {
        let item = item.into();
        tracing::warn!(item = %item, error = %error, "item failed");
        self.failures.push(BatchFailure { item, error });
    }

    /// Whether every item succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Total number of processed items.
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failures.len()
    }

    /// Merge another report into this one.
    pub fn extend(&mut self, other: BatchReport<E>) {
        self.succeeded.extend(other.succeeded);
        self.failures.extend(other.failures);
    }
}
