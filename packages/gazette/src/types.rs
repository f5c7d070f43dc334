//! Gazette entries as scraped from the tables of contents.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The gazette an entry was published in.
///
/// Variant order is the tie-break order used when ranking entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GazetteKind {
    /// Bundesgesetzblatt
    #[serde(rename = "BGBl")]
    Bgbl,
    /// Bundesanzeiger
    #[serde(rename = "BAnz")]
    Banz,
    /// Verkehrsblatt
    #[serde(rename = "VkBl")]
    Vkbl,
}

impl GazetteKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bgbl => "BGBl",
            Self::Banz => "BAnz",
            Self::Vkbl => "VkBl",
        }
    }
}

impl fmt::Display for GazetteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First and (optionally) last page of a publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u32>,
}

impl PageRange {
    #[must_use]
    pub fn starting_at(start: u32) -> Self {
        Self { start, end: None }
    }
}

/// One entry of a gazette table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazetteEntry {
    pub source: GazetteKind,

    /// Sortable identifier of the issue the entry appeared in.
    pub issue_id: String,

    /// Publication date of the issue.
    pub date: NaiveDate,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_range: Option<PageRange>,

    pub year: i32,

    /// BGBl part (1 or 2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<u8>,

    /// Issue number (BGBl) or ordinance number (VkBl).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,

    /// Link (BGBl), ident (BAnz) or file number (VkBl).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Issuing public body (BAnz).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    /// Edition label, e.g. `23/2012` (VkBl).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,

    /// Date of the published act itself, when the table of contents gives one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub law_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional: Vec<String>,
}

impl GazetteEntry {
    /// Create an entry with only the required fields set.
    #[must_use]
    pub fn new(
        source: GazetteKind,
        issue_id: impl Into<String>,
        date: NaiveDate,
        title: impl Into<String>,
        year: i32,
    ) -> Self {
        Self {
            source,
            issue_id: issue_id.into(),
            date,
            title: title.into(),
            page_range: None,
            year,
            part: None,
            number: None,
            reference: None,
            publisher: None,
            edition: None,
            law_date: None,
            additional: Vec::new(),
        }
    }

    #[must_use]
    pub fn first_page(&self) -> Option<u32> {
        self.page_range.map(|range| range.start)
    }

    /// Human-readable citation of the entry.
    ///
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use gesetze_gazette::{GazetteEntry, GazetteKind, PageRange};
    ///
    /// let date = NaiveDate::from_ymd_opt(2020, 3, 27).unwrap();
    /// let mut entry = GazetteEntry::new(GazetteKind::Bgbl, "2020-1-0014", date, "Gesetz", 2020);
    /// entry.part = Some(1);
    /// entry.number = Some(14);
    /// entry.page_range = Some(PageRange::starting_at(569));
    /// assert_eq!(entry.citation(), "BGBl I: 2020, 569 (Nr. 14)");
    /// ```
    #[must_use]
    pub fn citation(&self) -> String {
        match self.source {
            GazetteKind::Bgbl => {
                let part = "I".repeat(usize::from(self.part.unwrap_or(1)));
                let mut citation = format!("BGBl {part}: {}", self.year);
                if let Some(page) = self.first_page() {
                    citation.push_str(&format!(", {page}"));
                }
                if let Some(number) = self.number {
                    citation.push_str(&format!(" (Nr. {number})"));
                }
                citation
            }
            GazetteKind::Banz => {
                let mut parts: Vec<&str> = Vec::new();
                parts.extend(self.reference.as_deref());
                parts.extend(self.publisher.as_deref());
                parts.extend(self.additional.iter().map(String::as_str));
                if parts.is_empty() {
                    format!("BAnz {}", self.issue_id)
                } else {
                    parts.join(", ")
                }
            }
            GazetteKind::Vkbl => {
                let mut citation = format!(
                    "VkBl {}",
                    self.edition.as_deref().unwrap_or(&self.year.to_string())
                );
                if let Some(page) = self.first_page() {
                    citation.push_str(&format!(" S. {page}"));
                }
                if let Some(number) = self.number {
                    citation.push_str(&format!(" ({number})"));
                }
                citation
            }
        }
    }
}
