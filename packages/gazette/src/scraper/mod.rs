//! Scrapers for the individual gazettes.
//!
//! Each scraper implements [`IndexPages`](crate::pages::IndexPages): the
//! first call walks the site's navigation to plan the pages to fetch, every
//! call then fetches and parses one table-of-contents page.

mod banz;
mod bgbl;
mod vkbl;

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::config::month_number;

pub use banz::{parse_edition_page, parse_editions, parse_years, BanzPages, Edition};
pub use bgbl::{
    parse_issue, parse_issue_list, parse_toc_offsets, parse_xaver_response, parse_year_tocs,
    BgblPages, IssueRef,
};
pub use vkbl::{parse_year_page, update_start_year, VkblPages};

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DOTTED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})").expect("valid regex")
});

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static LONG_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[Vv]om (\d+)\. (\w+) (\d{4})").expect("valid regex")
});

/// First `D.M.YYYY` date in the text.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use gesetze_gazette::scraper::parse_dotted_date;
///
/// assert_eq!(parse_dotted_date("vom 3.4.2020"), NaiveDate::from_ymd_opt(2020, 4, 3));
/// assert_eq!(parse_dotted_date("31.02.2020"), None);
/// ```
#[must_use]
pub fn parse_dotted_date(text: &str) -> Option<NaiveDate> {
    let caps = DOTTED_DATE.captures(text)?;
    NaiveDate::from_ymd_opt(caps[3].parse().ok()?, caps[2].parse().ok()?, caps[1].parse().ok()?)
}

/// First `vom D. Monat YYYY` date in the text.
#[must_use]
pub fn parse_long_date(text: &str) -> Option<NaiveDate> {
    let caps = LONG_DATE.captures(text)?;
    let month = month_number(&caps[2])?;
    NaiveDate::from_ymd_opt(caps[3].parse().ok()?, month, caps[1].parse().ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_long_date() {
        assert_eq!(
            parse_long_date("Verordnung vom 4. März 2020"),
            NaiveDate::from_ymd_opt(2020, 3, 4)
        );
        assert_eq!(parse_long_date("vom 4. Brumaire 2020"), None);
        assert_eq!(parse_long_date("ohne Datum"), None);
    }

    #[test]
    fn test_parse_dotted_date_two_digit_parts() {
        assert_eq!(
            parse_dotted_date("Nr. 14 vom 27.03.2020"),
            NaiveDate::from_ymd_opt(2020, 3, 27)
        );
    }
}
