//! Paged scraping as a lazy, finite iterator.

use std::collections::VecDeque;
use std::iter::FusedIterator;

use crate::error::{GazetteError, Result};
use crate::types::GazetteEntry;

/// A source of table-of-contents pages.
///
/// Each call fetches and parses the next page; `Ok(None)` means the source is
/// exhausted.
pub trait IndexPages {
    fn next_page(&mut self) -> Result<Option<Vec<GazetteEntry>>>;
}

impl<P: IndexPages + ?Sized> IndexPages for Box<P> {
    fn next_page(&mut self) -> Result<Option<Vec<GazetteEntry>>> {
        (**self).next_page()
    }
}

/// Iterator over the entries of an [`IndexPages`] source.
///
/// Pages are only fetched when the buffered entries run out. The first
/// error is yielded once, after which the iterator ends.
pub struct Scrape<P> {
    pages: P,
    buffer: VecDeque<GazetteEntry>,
    done: bool,
}

impl<P: IndexPages> Scrape<P> {
    pub fn new(pages: P) -> Self {
        Self {
            pages,
            buffer: VecDeque::new(),
            done: false,
        }
    }
}

impl<P: IndexPages> Iterator for Scrape<P> {
    type Item = Result<GazetteEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.buffer.pop_front() {
                return Some(Ok(entry));
            }
            if self.done {
                return None;
            }
            match self.pages.next_page() {
                Ok(Some(entries)) => self.buffer.extend(entries),
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<P: IndexPages> FusedIterator for Scrape<P> {}

/// Everything scraped before the run ended, and the error that ended it.
#[derive(Debug)]
pub struct PartialScrape {
    pub entries: Vec<GazetteEntry>,
    pub error: Option<GazetteError>,
}

impl PartialScrape {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Drain a scrape, keeping the entries gathered before a failure.
pub fn collect_partial<I>(scrape: I) -> PartialScrape
where
    I: IntoIterator<Item = Result<GazetteEntry>>,
{
    let mut entries = Vec::new();
    for item in scrape {
        match item {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!(error = %e, scraped = entries.len(), "scrape stopped early");
                return PartialScrape {
                    entries,
                    error: Some(e),
                };
            }
        }
    }
    PartialScrape {
        entries,
        error: None,
    }
}
