//! Verkehrsblatt (VkBl) article search, one page per year.

use std::collections::HashMap;
use std::sync::LazyLock;

use gesetze_harvester::Fetch;
use regex::Regex;

use super::parse_dotted_date;
use crate::config::{YearRange, VKBL_BASE_URL, VKBL_FIRST_YEAR};
use crate::error::Result;
use crate::html::{descendants_with_class, Element};
use crate::pages::IndexPages;
use crate::types::{GazetteEntry, GazetteKind, PageRange};

/// Icon marking the row with the order link and price.
const ORDER_ICON: &str = "../images/orange.gif";

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Preis: (\d+,\d+) \((\d+) Seite").expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static EDITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)/(\d{4})$").expect("valid regex"));

/// Page source over the VkBl years of a range.
pub struct VkblPages<F> {
    fetcher: F,
    base_url: String,
    next_year: i32,
    last_year: i32,
}

impl<F: Fetch> VkblPages<F> {
    pub fn new(fetcher: F, years: YearRange) -> Self {
        Self {
            fetcher,
            base_url: VKBL_BASE_URL.to_string(),
            next_year: years.min,
            last_year: years.max,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn year_url(&self, year: i32) -> String {
        format!(
            "{}?seitenzahl=1&anzahl=10000&start=0&Titel=&Datum=&Muster=&Muster2=&Jahrgang={year}&VerordnungsNr=&Seite=&Bereichsname=&DB=&Aktenzeichen=",
            self.base_url
        )
    }
}

impl<F: Fetch> IndexPages for VkblPages<F> {
    fn next_page(&mut self) -> Result<Option<Vec<GazetteEntry>>> {
        if self.next_year > self.last_year {
            return Ok(None);
        }
        let year = self.next_year;
        self.next_year += 1;

        let html = self.fetcher.fetch_page(&self.year_url(year))?.latin1_text();
        let entries = parse_year_page(&html, year);
        tracing::info!(year, entries = entries.len(), "VkBl year");
        Ok(Some(entries))
    }
}

/// First year to scrape in update mode: the latest year already in the dump.
#[must_use]
pub fn update_start_year(existing: &[GazetteEntry]) -> i32 {
    existing
        .iter()
        .filter(|entry| entry.source == GazetteKind::Vkbl)
        .map(|entry| entry.year)
        .max()
        .unwrap_or(VKBL_FIRST_YEAR)
}

/// Articles listed on a year's result page.
pub fn parse_year_page(html: &str, year: i32) -> Vec<GazetteEntry> {
    descendants_with_class(html, "table", "tabelle2")
        .iter()
        .filter_map(|table| parse_article(table, year))
        .collect()
}

/// Lower-case a label and keep only `a`-`z`.
fn field_key(label: &str) -> String {
    label
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_lowercase)
        .collect()
}

fn parse_article(table: &Element<'_>, page_year: i32) -> Option<GazetteEntry> {
    let rows = table.find_all("tr");
    let [header_row, title_row, field_rows @ ..] = rows.as_slice() else {
        return None;
    };

    let header = header_row.find("td")?.raw_text();
    let header = header.trim();
    let (genre, edition) = match header.split_once('\u{a0}') {
        Some((genre, rest)) => (
            genre.trim().to_string(),
            rest.split_whitespace().nth(2).map(str::to_string),
        ),
        None => (header.to_string(), None),
    };

    let mut lines = title_row
        .find("td")?
        .text_lines()
        .into_iter()
        .map(|line| line.replace("Titel:", "").trim().to_string())
        .filter(|line| !line.is_empty());
    let Some(title) = lines.next() else {
        tracing::warn!(header, "article without title");
        return None;
    };
    let description: Vec<String> = lines.collect();

    let mut fields = HashMap::new();
    let mut pages = None;
    for row in field_rows {
        match row.find_all("td").as_slice() {
            [label, value] => {
                fields.insert(field_key(&label.text()), value.text());
            }
            [cell] => {
                let is_order_row = cell
                    .find_all("img")
                    .iter()
                    .any(|img| img.attr("src").as_deref() == Some(ORDER_ICON));
                if is_order_row {
                    pages = PRICE
                        .captures(&cell.text())
                        .and_then(|caps| caps[2].parse::<u32>().ok());
                }
            }
            _ => {}
        }
    }

    let field = |key: &str| fields.get(key).map(String::as_str).filter(|v| !v.is_empty());
    let Some(date) = field("verffentlichtam")
        .or_else(|| field("verkndetam"))
        .and_then(parse_dotted_date)
    else {
        tracing::warn!(title, "article without publication date, skipping");
        return None;
    };
    let year = field("jahr")
        .and_then(|v| v.parse().ok())
        .unwrap_or(page_year);

    let mut entry = GazetteEntry::new(
        GazetteKind::Vkbl,
        issue_id(edition.as_deref(), year),
        date,
        title,
        year,
    );
    entry.page_range = field("seite")
        .and_then(|v| v.parse::<u32>().ok())
        .map(|start| PageRange {
            start,
            end: pages.filter(|&n| n > 0).map(|n| start + n - 1),
        });
    entry.number = field("vonummer").and_then(|v| v.parse().ok());
    entry.reference = field("aktenzeichen").map(str::to_string);
    entry.law_date = field("verkndetam").and_then(parse_dotted_date);
    entry.edition = edition;
    entry.additional = std::iter::once(genre)
        .filter(|g| !g.is_empty())
        .chain(description)
        .collect();
    Some(entry)
}

/// `{year}-{edition:03}` for an edition label like `23/2012`.
fn issue_id(edition: Option<&str>, year: i32) -> String {
    edition
        .and_then(|label| EDITION.captures(label))
        .and_then(|caps| {
            let number: u32 = caps[1].parse().ok()?;
            Some(format!("{}-{number:03}", &caps[2]))
        })
        .unwrap_or_else(|| format!("{year}-000"))
}
