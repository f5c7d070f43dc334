//! Bundesanzeiger (BAnz) official part, one page per edition.

use std::collections::VecDeque;

use chrono::{Datelike, NaiveDate};
use gesetze_harvester::Fetch;

use super::{parse_dotted_date, parse_long_date};
use crate::config::{YearRange, BANZ_BASE_URL};
use crate::error::Result;
use crate::html::{find_by_id, find_with_attr, to_lowercase_fast, Element};
use crate::pages::IndexPages;
use crate::types::{GazetteEntry, GazetteKind};

const START: &str = "page.navid=to_official_part&global_data.designmode=eb";

/// An edition as offered by the edition selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edition {
    /// Form value identifying the edition.
    pub value: String,
    pub date: NaiveDate,
}

/// Page source over the BAnz editions of a year range.
pub struct BanzPages<F> {
    fetcher: F,
    base_url: String,
    years: YearRange,
    editions: Option<VecDeque<Edition>>,
}

impl<F: Fetch> BanzPages<F> {
    pub fn new(fetcher: F, years: YearRange) -> Self {
        Self {
            fetcher,
            base_url: BANZ_BASE_URL.to_string(),
            years,
            editions: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn get(&self, query: &str) -> Result<String> {
        let url = format!("{}?{query}", self.base_url);
        Ok(self.fetcher.fetch_page(&url)?.text())
    }

    fn discover(&self) -> Result<VecDeque<Edition>> {
        let start = self.get(START)?;
        let mut editions = VecDeque::new();
        for year in parse_years(&start) {
            if !self.years.contains(year) {
                continue;
            }
            let page = self.get(&format!(
                "page.navid=official_starttoofficial_start_changeyear&genericsearch_param.year={year}&genericsearch_param.edition=&genericsearch_param.sort_type="
            ))?;
            let found = parse_editions(&page);
            tracing::info!(year, editions = found.len(), "BAnz year");
            editions.extend(found);
        }
        Ok(editions)
    }
}

impl<F: Fetch> IndexPages for BanzPages<F> {
    fn next_page(&mut self) -> Result<Option<Vec<GazetteEntry>>> {
        if self.editions.is_none() {
            self.editions = Some(self.discover()?);
        }
        let Some(edition) = self.editions.as_mut().and_then(VecDeque::pop_front) else {
            return Ok(None);
        };

        let page = self.get(&format!(
            "genericsearch_param.edition={}&genericsearch_param.sort_type=&%28page.navid%3Dofficial_starttoofficial_start_update%29=Ver%C3%B6ffentlichungen+anzeigen",
            edition.value
        ))?;
        let entries = parse_edition_page(&page, &edition);
        tracing::debug!(date = %edition.date, entries = entries.len(), "edition scraped");
        Ok(Some(entries))
    }
}

/// Years offered in the side menu.
pub fn parse_years(html: &str) -> Vec<i32> {
    find_by_id(html, "td_sub_menu_v")
        .map(|menu| {
            menu.find_all("li")
                .iter()
                .filter_map(|li| li.text().parse().ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Editions of the edition selector; options without a date are skipped.
pub fn parse_editions(html: &str) -> Vec<Edition> {
    let Some(select) = find_with_attr(html, "select", "name", "genericsearch_param.edition") else {
        return Vec::new();
    };
    select
        .find_all("option")
        .iter()
        .filter_map(|option| {
            let label = option.text();
            let Some(date) = parse_dotted_date(&label) else {
                tracing::debug!(label, "edition option without date");
                return None;
            };
            Some(Edition {
                value: option.attr("value").unwrap_or_default(),
                date,
            })
        })
        .collect()
}

/// Publications listed in an edition's result table.
pub fn parse_edition_page(html: &str, edition: &Edition) -> Vec<GazetteEntry> {
    let Some(table) = find_with_attr(html, "table", "summary", "Trefferliste") else {
        tracing::debug!(date = %edition.date, "no result table");
        return Vec::new();
    };

    let mut entries = Vec::new();
    for tr in table.find_all("tr") {
        let tds = tr.find_all("td");
        let [body, publication, ident] = tds.as_slice() else {
            continue;
        };
        let Some(link) = publication.find("a") else {
            continue;
        };

        let additional = trailing_lines(publication);
        let law_date = additional.iter().find_map(|line| parse_long_date(line));

        let mut entry = GazetteEntry::new(
            GazetteKind::Banz,
            edition.date.format("%Y-%m-%d").to_string(),
            edition.date,
            link.text(),
            edition.date.year(),
        );
        entry.reference = Some(ident.text()).filter(|s| !s.is_empty());
        entry.publisher = Some(body.text()).filter(|s| !s.is_empty());
        entry.law_date = law_date;
        entry.additional = additional;
        entries.push(entry);
    }
    entries
}

/// Text lines of a cell following its first link.
fn trailing_lines(cell: &Element<'_>) -> Vec<String> {
    let lc = to_lowercase_fast(cell.inner);
    let rest = lc.find("</a>").map_or("", |end| &cell.inner[end + 4..]);
    Element {
        open_tag: "",
        inner: rest,
    }
    .text_lines()
}
