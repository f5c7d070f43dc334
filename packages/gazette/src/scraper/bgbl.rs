//! Bundesgesetzblatt (BGBl) tables of contents from the Xaver application.
//!
//! Xaver answers every request with a JavaScript object literal whose
//! `innerhtml` member carries the rendered fragment. Requests need a session
//! id, handed out as the `XaverSID` header of the start page.

use std::collections::VecDeque;
use std::sync::LazyLock;

use chrono::NaiveDate;
use gesetze_harvester::Fetch;
use regex::Regex;

use super::parse_dotted_date;
use crate::config::{YearRange, BGBL_BASE_URL};
use crate::error::{GazetteError, Result};
use crate::html::{elements, Element};
use crate::pages::IndexPages;
use crate::types::{GazetteEntry, GazetteKind, PageRange};

const START: &str = "start.xav?startbk=Bundesanzeiger_BGBl";
const TOC_PREFIX: &str = "toc.xav?tocf=xaver.component.TOC_0&tf=xaver.component.Text_0&qmf=&hlf=&bk=Bundesanzeiger_BGBl&dir=center";
const TEXT_PREFIX: &str = "text.xav?tf=xaver.component.Text_0&tocf=&qmf=&hlf=xaver.component.Hitlist_0&bk=Bundesanzeiger_BGBl";

/// Marker of a response sent for an expired session.
const SESSION_EXPIRED: &str = "Session veraltet";

/// Logins attempted for a single request before giving up.
const MAX_LOGINS: usize = 3;

/// Rows of an issue page that describe the issue rather than a publication.
const META_ROWS: [&str; 2] = ["Komplette Ausgabe", "Inhaltsverzeichnis"];

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static UNQUOTED_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([,\{])(\w+):").expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static TOC_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"tocid=(\d+)&").expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ISSUE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Nr\. (\d+) vom (\d{2}\.\d{2}\.\d{4})").expect("valid regex")
});

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DOC_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)start=%2f%2f\*%5B%40node_id%3D%27(\d+)%27%5D").expect("valid regex")
});

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ISSUE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"aus +Nr\. +(\d+) +vom +(\d{1,2}\.\d{1,2}\.\d{4}), +Seite *(\d*)\w?\.?$")
        .expect("valid regex")
});

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static SESSION_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"SID=[^&]+&").expect("valid regex"));

/// One issue found in a year's table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    pub part: u8,
    pub year: i32,
    pub number: u32,
    pub date: NaiveDate,
    pub doc_id: String,
}

impl IssueRef {
    #[must_use]
    pub fn issue_id(&self) -> String {
        format!("{}-{}-{:04}", self.year, self.part, self.number)
    }
}

/// Page source over the BGBl issues of a year range.
pub struct BgblPages<F> {
    fetcher: F,
    base_url: String,
    years: YearRange,
    parts: Vec<u8>,
    session: Option<String>,
    issues: Option<VecDeque<IssueRef>>,
}

impl<F: Fetch> BgblPages<F> {
    /// Scrape parts I and II.
    pub fn new(fetcher: F, years: YearRange) -> Self {
        Self {
            fetcher,
            base_url: BGBL_BASE_URL.to_string(),
            years,
            parts: vec![1, 2],
            session: None,
            issues: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_parts(mut self, parts: Vec<u8>) -> Self {
        self.parts = parts;
        self
    }

    fn login(&mut self) -> Result<String> {
        let url = format!("{}{START}", self.base_url);
        let page = self.fetcher.fetch_page(&url)?;
        let sid = page
            .header("XaverSID")
            .ok_or_else(|| GazetteError::Session(format!("no XaverSID header from {url}")))?
            .to_string();
        tracing::debug!(sid, "logged in");
        self.session = Some(sid.clone());
        Ok(sid)
    }

    /// GET a Xaver fragment, logging in again when the session has expired.
    fn get(&mut self, path: &str) -> Result<String> {
        for _ in 0..MAX_LOGINS {
            let sid = match &self.session {
                Some(sid) => sid.clone(),
                None => self.login()?,
            };
            let url = format!("{}{path}&SID={sid}", self.base_url);
            let body = self.fetcher.fetch_page(&url)?.text();
            if body.contains(SESSION_EXPIRED) {
                tracing::info!("session expired, logging in again");
                self.session = None;
                continue;
            }
            return parse_xaver_response(&body, &url);
        }
        Err(GazetteError::Session(format!(
            "session expired {MAX_LOGINS} times in a row"
        )))
    }

    /// Walk the navigation down to the issues of every selected year.
    fn discover(&mut self) -> Result<VecDeque<IssueRef>> {
        let base_toc = self.get(&format!("{TOC_PREFIX}&start=1&cur=1&op=1"))?;
        let offsets = parse_toc_offsets(&base_toc);

        let mut issues = VecDeque::new();
        for part in self.parts.clone() {
            let offset = offsets
                .get(usize::from(part).saturating_sub(1))
                .ok_or_else(|| {
                    GazetteError::malformed("BGBl base TOC", format!("no entry for part {part}"))
                })?
                .clone();
            let main_toc = self.get(&format!("{TOC_PREFIX}&op={offset}"))?;

            for (year, tocid) in parse_year_tocs(&main_toc) {
                if !self.years.contains(year) {
                    continue;
                }
                tracing::info!(part, year, "reading year TOC");
                let year_toc =
                    self.get(&format!("{TOC_PREFIX}&op={tocid}&cur={tocid}&start={tocid}"))?;
                issues.extend(parse_issue_list(&year_toc, part, year));
            }
        }
        tracing::info!(issues = issues.len(), "BGBl issues to scrape");
        Ok(issues)
    }
}

impl<F: Fetch> IndexPages for BgblPages<F> {
    fn next_page(&mut self) -> Result<Option<Vec<GazetteEntry>>> {
        if self.issues.is_none() {
            self.issues = Some(self.discover()?);
        }
        let Some(issue) = self.issues.as_mut().and_then(VecDeque::pop_front) else {
            return Ok(None);
        };

        let path = format!(
            "{TEXT_PREFIX}&start=%2F%2F*%5B%40node_id%3D%27{}%27%5D",
            issue.doc_id
        );
        let html = self.get(&path)?;
        let entries = parse_issue(&html, &issue);
        tracing::debug!(issue = %issue.issue_id(), entries = entries.len(), "issue scraped");
        Ok(Some(entries))
    }
}

/// Extract the `innerhtml` member of a Xaver response.
///
/// The response is an object literal with unquoted keys; they are quoted so
/// it parses as JSON.
pub fn parse_xaver_response(body: &str, document: &str) -> Result<String> {
    let json = UNQUOTED_KEY.replace_all(body, r#"$1"$2":"#);
    let value: serde_json::Value = serde_json::from_str(&json)
        .map_err(|e| GazetteError::malformed(document, e.to_string()))?;
    value
        .get("innerhtml")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| GazetteError::malformed(document, "no innerhtml member"))
}

fn toc_entries(html: &str) -> impl Iterator<Item = Element<'_>> {
    elements(html, "a")
        .into_iter()
        .filter(|a| a.has_class("tocEntry"))
}

/// TOC ids of the gazette parts, in part order.
pub fn parse_toc_offsets(html: &str) -> Vec<String> {
    toc_entries(html)
        .filter(|a| {
            a.attr("title")
                .is_some_and(|title| title.contains("Bundesgesetzblatt Teil"))
        })
        .filter_map(|a| {
            let href = a.attr("href")?;
            TOC_ID.captures(&href).map(|caps| caps[1].to_string())
        })
        .collect()
}

/// `(year, tocid)` pairs of a part's table of contents.
pub fn parse_year_tocs(html: &str) -> Vec<(i32, String)> {
    toc_entries(html)
        .filter_map(|a| {
            let year = a.text().parse().ok()?;
            let href = a.attr("href")?;
            let tocid = TOC_ID.captures(&href)?[1].to_string();
            Some((year, tocid))
        })
        .collect()
}

/// Issues listed in a year's table of contents.
pub fn parse_issue_list(html: &str, part: u8, year: i32) -> Vec<IssueRef> {
    toc_entries(html)
        .filter_map(|a| {
            let text = a.text();
            let caps = ISSUE_LINK.captures(&text)?;
            let href = a.attr("href")?;
            let Some(doc_id) = DOC_ID.captures(&href) else {
                tracing::warn!(part, year, text, "issue link without document id");
                return None;
            };
            Some(IssueRef {
                part,
                year,
                number: caps[1].parse().ok()?,
                date: parse_dotted_date(&caps[2])?,
                doc_id: doc_id[1].to_string(),
            })
        })
        .collect()
}

/// Publications listed on an issue page.
pub fn parse_issue(html: &str, issue: &IssueRef) -> Vec<GazetteEntry> {
    let mut entries = Vec::new();
    for tr in elements(html, "tr") {
        let tds = tr.find_all("td");
        let Some(cell) = tds.get(1) else {
            continue;
        };
        let divs = cell.find_all("div");
        let (law_date, link_div, text_div) = match divs.as_slice() {
            [link, text] => (None, link, text),
            [date, link, text, ..] => (Some(date), link, text),
            _ => continue,
        };
        let Some(link) = link_div.find("a") else {
            continue;
        };

        let title = link.text();
        if META_ROWS.contains(&title.as_str()) {
            continue;
        }

        let text = text_div.text();
        let Some(caps) = ISSUE_LINE.captures(&text) else {
            tracing::debug!(issue = %issue.issue_id(), text, "unrecognized issue row");
            continue;
        };

        let date = parse_dotted_date(&caps[2]).unwrap_or(issue.date);
        let mut entry = GazetteEntry::new(
            GazetteKind::Bgbl,
            issue.issue_id(),
            date,
            title,
            issue.year,
        );
        entry.part = Some(issue.part);
        entry.number = Some(issue.number);
        entry.page_range = caps[3].parse().ok().map(PageRange::starting_at);
        entry.reference = link
            .attr("href")
            .map(|href| SESSION_PARAM.replace_all(&href, "").into_owned());
        entry.law_date = law_date.and_then(|div| parse_dotted_date(&div.text()));
        entries.push(entry);
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use gesetze_harvester::{HarvesterError, Page};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    fn xaver(html: &str) -> String {
        format!("{{innerhtml:{},tocf:\"x\"}}", serde_json::to_string(html).unwrap())
    }

    fn issue() -> IssueRef {
        IssueRef {
            part: 1,
            year: 2020,
            number: 14,
            date: NaiveDate::from_ymd_opt(2020, 3, 27).unwrap(),
            doc_id: "123".to_string(),
        }
    }

    const ISSUE_PAGE: &str = r#"<table>
        <tr><td></td><td><div><a href="x">Komplette Ausgabe</a></div><div>aus Nr. 14 vom 27.03.2020, Seite 569</div></td></tr>
        <tr><td>1</td><td><div>23.03.2020</div><div><a href="text.xav?SID=abc&amp;start=1">Gesetz zur Abmilderung der Folgen der COVID-19-Pandemie</a></div><div>aus  Nr. 14 vom 27.3.2020, Seite 569</div></td></tr>
        <tr><td>2</td><td><div><a href="y">Verordnung ohne Seite</a></div><div>aus Nr. 14 vom 27.03.2020, Seite </div></td></tr>
        <tr><td>3</td><td><div>kein Link</div></td></tr>
    </table>"#;

    #[test]
    fn test_parse_xaver_response() {
        let html = parse_xaver_response(&xaver("<a class=\"tocEntry\">x</a>"), "test").unwrap();
        assert_eq!(html, "<a class=\"tocEntry\">x</a>");
        assert!(parse_xaver_response("{tocf:1}", "test").is_err());
    }

    #[test]
    fn test_parse_toc_offsets() {
        let html = r#"<a class="tocEntry" title="Bundesgesetzblatt Teil I" href="toc.xav?tocid=11&x">I</a>
            <a class="tocEntry" title="Bundesanzeiger" href="toc.xav?tocid=99&x">B</a>
            <a class="tocEntry" title="Bundesgesetzblatt Teil II" href="toc.xav?tocid=22&x">II</a>"#;
        assert_eq!(parse_toc_offsets(html), vec!["11", "22"]);
    }

    #[test]
    fn test_parse_year_tocs_skips_non_years() {
        let html = r#"<a class="tocEntry" href="toc.xav?tocid=5&a">2020</a>
            <a class="tocEntry" href="toc.xav?tocid=6&a">Register</a>"#;
        assert_eq!(parse_year_tocs(html), vec![(2020, "5".to_string())]);
    }

    #[test]
    fn test_parse_issue_list() {
        let html = r#"<a class="tocEntry" href="text.xav?start=%2f%2f*%5B%40node_id%3D%27123%27%5D&x">Nr. 14 vom 27.03.2020</a>"#;
        assert_eq!(parse_issue_list(html, 1, 2020), vec![issue()]);
    }

    #[test]
    fn test_parse_issue_rows() {
        let entries = parse_issue(ISSUE_PAGE, &issue());
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.issue_id, "2020-1-0014");
        assert_eq!(
            first.title,
            "Gesetz zur Abmilderung der Folgen der COVID-19-Pandemie"
        );
        assert_eq!(first.page_range, Some(PageRange::starting_at(569)));
        assert_eq!(first.law_date, NaiveDate::from_ymd_opt(2020, 3, 23));
        assert_eq!(first.reference.as_deref(), Some("text.xav?start=1"));
        assert_eq!(first.citation(), "BGBl I: 2020, 569 (Nr. 14)");

        assert_eq!(entries[1].page_range, None);
        assert_eq!(entries[1].law_date, None);
    }

    /// Serves canned Xaver fragments keyed by URL substring.
    struct FakeXaver {
        routes: Vec<(&'static str, String)>,
        expire_once: RefCell<bool>,
        requests: RefCell<Vec<String>>,
    }

    impl Fetch for FakeXaver {
        fn fetch_page(&self, url: &str) -> gesetze_harvester::Result<Page> {
            self.requests.borrow_mut().push(url.to_string());
            if url.contains("start.xav") {
                let mut page = Page::from_body("");
                page.headers.insert("xaversid".into(), "s1".into());
                return Ok(page);
            }
            if *self.expire_once.borrow() {
                *self.expire_once.borrow_mut() = false;
                return Ok(Page::from_body("<p>Session veraltet</p>"));
            }
            self.routes
                .iter()
                .find(|(key, _)| url.contains(key))
                .map(|(_, body)| Page::from_body(body.clone()))
                .ok_or_else(|| HarvesterError::NotFound(url.to_string()))
        }
    }

    #[test]
    fn test_pages_walk_navigation() {
        let fetcher = FakeXaver {
            routes: vec![
                (
                    "op=1&",
                    xaver(r#"<a class="tocEntry" title="Bundesgesetzblatt Teil I" href="toc.xav?tocid=11&x">I</a>"#),
                ),
                (
                    "op=11&",
                    xaver(r#"<a class="tocEntry" href="toc.xav?tocid=5&a">2020</a><a class="tocEntry" href="toc.xav?tocid=4&a">2019</a>"#),
                ),
                (
                    "op=5&",
                    xaver(r#"<a class="tocEntry" href="text.xav?start=%2f%2f*%5B%40node_id%3D%27123%27%5D&x">Nr. 14 vom 27.03.2020</a>"#),
                ),
                ("node_id%3D%27123%27", xaver(ISSUE_PAGE)),
            ],
            expire_once: RefCell::new(true),
            requests: RefCell::new(Vec::new()),
        };

        let years = YearRange::new(2020, 2020).unwrap();
        let mut pages = BgblPages::new(fetcher, years)
            .with_base_url("http://bgbl.test/Xaver/")
            .with_parts(vec![1]);

        let entries = pages.next_page().unwrap().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(pages.next_page().unwrap().is_none());

        let requests = pages.fetcher.requests.borrow();
        assert_eq!(
            requests.iter().filter(|u| u.contains("start.xav")).count(),
            2
        );
        assert!(requests.iter().all(|u| !u.contains("op=4&")));
        assert!(requests.iter().any(|u| u.ends_with("&SID=s1")));
    }
}
