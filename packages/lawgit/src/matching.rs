//! Scoring gazette entries against a changed law.
//!
//! Everything here is pure: the current date is passed in, no files or git
//! are touched.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use gesetze_gazette::{GazetteEntry, GazetteKind};
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::identity::LawIdentity;

/// Confidence of an entry cited by the law text.
pub const CITED_CONFIDENCE: f64 = 1.0;

const TITLE_WEIGHT: f64 = 0.85;
const RECENCY_WEIGHT: f64 = 0.15;

/// Minimum length of a law name token taking part in title similarity.
const MIN_TOKEN_CHARS: usize = 3;

/// Function words, folded. They never identify a law.
const STOP_WORDS: &[&str] = &[
    "aus", "bei", "beim", "das", "dem", "den", "der", "des", "die", "durch", "ein", "eine",
    "einem", "einen", "einer", "eines", "fuer", "gegen", "mit", "nach", "oder", "sowie", "ueber",
    "und", "unter", "vom", "von", "zum", "zur",
];

/// Genre words common to most gazette titles, folded. They only count when
/// a law name consists of nothing else.
const GENERIC_WORDS: &[&str] = &[
    "achtes", "aenderung", "anordnung", "bekanntmachung", "bestimmungen", "drittes", "erstes",
    "fuenftes", "gesetz", "gesetzes", "neufassung", "sechstes", "verordnung", "viertes",
    "vorschriften", "zweites",
];

/// Notes marking a change the documentation service has not processed yet.
const TRANSIENT_MARKERS: [&str; 2] = [
    "noch nicht berücksichtigt",
    "noch nicht abschließend bearbeitet",
];

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static BGBL_CITATIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"BGBl +(?P<part>I+):? *(?P<year>\d{4}), +(?:S\. )?(?P<page>\d+)",
        r"BGBl +(?P<part>I+):? *(?P<year>\d{4}), \d \((?P<page>\d+)\)",
        r"BGBl +(?P<part>I+):? *(?P<year>\d{4}), (?P<page>\d+)",
        r"\d{1,2}\.\.?\d{1,2}\.\.?(?P<year>\d{4}) (?P<part>I+) (?:S\. )?(?P<page>\d+)",
        r"(?P<year>\d{4}).{0,8}?BGBl\.? +(?P<part>I+):? +(?:S\. )?(?P<page>\d+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid regex"))
    .collect()
});

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static VKBL_CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"VkBl: *(?P<year>\d{4}),? +(?:S\. )?(?P<page>\d+)").expect("valid regex")
});

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static NON_IDENT_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w \.]").expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static LONE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" \d{4} ").expect("valid regex"));

/// Inputs of the scorer besides law and entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSettings {
    pub today: NaiveDate,
    pub window_days: i64,
    /// Also consider entries outside the window.
    pub consider_old: bool,
}

/// Text the scorer looks for citations in.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evidence<'a> {
    /// Lines added by the change.
    pub added: &'a str,
    /// Whole current document, consulted when the added lines cite nothing.
    pub document: Option<&'a str>,
}

/// Gazette references found in a text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Citations {
    /// `(year, part, page)`
    pub bgbl: HashSet<(i32, u8, u32)>,
    /// `(year, page)`
    pub vkbl: HashSet<(i32, u32)>,
    /// Normalized lines mentioning the Bundesanzeiger.
    pub banz_lines: Vec<String>,
}

impl Citations {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bgbl.is_empty() && self.vkbl.is_empty() && self.banz_lines.is_empty()
    }

    /// Whether this text cites the entry.
    #[must_use]
    pub fn cites(&self, entry: &GazetteEntry) -> bool {
        match entry.source {
            GazetteKind::Bgbl => match (entry.part, entry.first_page()) {
                (Some(part), Some(page)) => self.bgbl.contains(&(entry.year, part, page)),
                _ => false,
            },
            GazetteKind::Banz => entry
                .reference
                .as_deref()
                .filter(|ident| !ident.is_empty())
                .is_some_and(|ident| self.banz_lines.iter().any(|line| line.contains(ident))),
            GazetteKind::Vkbl => entry
                .first_page()
                .is_some_and(|page| self.vkbl.contains(&(entry.year, page))),
        }
    }
}

/// Collect the gazette citations of a text.
///
/// A line that carries a citation together with a note that the change is
/// not yet processed disables citations for the whole text.
#[must_use]
pub fn extract_citations(text: &str) -> Citations {
    let mut citations = Citations::default();
    for line in text.lines() {
        let mut found = false;

        for re in BGBL_CITATIONS.iter() {
            for caps in re.captures_iter(line) {
                found = true;
                let (Ok(year), Ok(part), Ok(page)) = (
                    caps["year"].parse::<i32>(),
                    u8::try_from(caps["part"].len()),
                    caps["page"].parse::<u32>(),
                ) else {
                    continue;
                };
                citations.bgbl.insert((year, part, page));
            }
        }

        for caps in VKBL_CITATION.captures_iter(line) {
            found = true;
            if let (Ok(year), Ok(page)) = (caps["year"].parse::<i32>(), caps["page"].parse::<u32>()) {
                citations.vkbl.insert((year, page));
            }
        }

        if line.contains("BAnz") {
            found = true;
            let normalized = NON_IDENT_CHARS.replace_all(line, "");
            citations
                .banz_lines
                .push(LONE_YEAR.replace_all(&normalized, " ").into_owned());
        }

        if found && TRANSIENT_MARKERS.iter().any(|marker| line.contains(marker)) {
            tracing::debug!(line, "change not yet processed, ignoring citations");
            return Citations::default();
        }
    }
    citations
}

/// Fold a string for comparison: NFC, lowercase, umlauts transliterated.
#[must_use]
pub fn fold(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for c in text.nfc().flat_map(char::to_lowercase) {
        match c {
            'ä' => folded.push_str("ae"),
            'ö' => folded.push_str("oe"),
            'ü' => folded.push_str("ue"),
            'ß' => folded.push_str("ss"),
            c => folded.push(c),
        }
    }
    folded
}

fn tokens(text: &str) -> Vec<String> {
    fold(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_generic(token: &str) -> bool {
    STOP_WORDS.contains(&token) || GENERIC_WORDS.contains(&token)
}

/// A law prepared for scoring many entries.
#[derive(Debug, Clone)]
pub struct LawProfile {
    name_tokens: HashSet<String>,
    abbreviation_tokens: Vec<String>,
}

impl LawProfile {
    #[must_use]
    pub fn new(law: &LawIdentity) -> Self {
        let words: HashSet<String> = tokens(&law.name)
            .into_iter()
            .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS && !STOP_WORDS.contains(&t.as_str()))
            .collect();
        let distinctive: HashSet<String> = words
            .iter()
            .filter(|t| !is_generic(t))
            .cloned()
            .collect();

        let mut abbreviation_tokens = tokens(&law.abbreviation);
        if abbreviation_tokens.iter().all(|t| is_generic(t)) {
            abbreviation_tokens.clear();
        }

        Self {
            name_tokens: if distinctive.is_empty() { words } else { distinctive },
            abbreviation_tokens,
        }
    }

    /// Share of the law name's distinctive tokens found in `title`; 1.0 when
    /// the law's abbreviation occurs in it as whole tokens.
    #[must_use]
    pub fn title_similarity(&self, title: &str) -> f64 {
        let title_tokens = tokens(title);

        let abbr = &self.abbreviation_tokens;
        if !abbr.is_empty() && title_tokens.windows(abbr.len()).any(|w| w == abbr.as_slice()) {
            return 1.0;
        }
        if self.name_tokens.is_empty() {
            return 0.0;
        }

        let title_tokens: HashSet<&str> = title_tokens.iter().map(String::as_str).collect();
        let found = self
            .name_tokens
            .iter()
            .filter(|t| title_tokens.contains(t.as_str()))
            .count();
        found as f64 / self.name_tokens.len() as f64
    }
}

/// An entry with its confidence for one law.
#[derive(Debug, Clone, Copy)]
pub struct ScoredEntry<'a> {
    pub entry: &'a GazetteEntry,
    pub confidence: f64,
    /// The law text cites the entry.
    pub cited: bool,
}

impl ScoredEntry<'_> {
    /// Ranking: confidence, then most recent, then source order, then
    /// lowest issue id, then title. `Greater` is better.
    fn rank(&self, other: &Self) -> Ordering {
        self.confidence
            .total_cmp(&other.confidence)
            .then_with(|| self.entry.date.cmp(&other.entry.date))
            .then_with(|| other.entry.source.cmp(&self.entry.source))
            .then_with(|| other.entry.issue_id.cmp(&self.entry.issue_id))
            .then_with(|| other.entry.title.cmp(&self.entry.title))
    }
}

fn age_days(entry: &GazetteEntry, settings: &MatchSettings) -> i64 {
    (settings.today - entry.date).num_days()
}

fn in_window(entry: &GazetteEntry, settings: &MatchSettings) -> bool {
    settings.consider_old || (0..=settings.window_days).contains(&age_days(entry, settings))
}

/// `1 - age / window`, clamped to `[0, 1]`.
#[must_use]
pub fn recency(entry: &GazetteEntry, settings: &MatchSettings) -> f64 {
    let window = settings.window_days.max(1) as f64;
    (1.0 - age_days(entry, settings) as f64 / window).clamp(0.0, 1.0)
}

/// Pick the entry that most likely caused the change of `law`.
#[must_use]
pub fn best_match<'a>(
    law: &LawIdentity,
    evidence: &Evidence<'_>,
    entries: &'a [GazetteEntry],
    settings: &MatchSettings,
) -> Option<ScoredEntry<'a>> {
    let candidates: Vec<&GazetteEntry> = entries.iter().filter(|e| in_window(e, settings)).collect();
    if candidates.is_empty() {
        return None;
    }

    let mut citations = extract_citations(evidence.added);
    if !candidates.iter().any(|e| citations.cites(e)) {
        citations = evidence.document.map(extract_citations).unwrap_or_default();
    }

    let profile = LawProfile::new(law);
    candidates
        .into_iter()
        .map(|entry| {
            if citations.cites(entry) {
                ScoredEntry {
                    entry,
                    confidence: CITED_CONFIDENCE,
                    cited: true,
                }
            } else {
                let similarity = profile.title_similarity(&entry.title);
                ScoredEntry {
                    entry,
                    confidence: TITLE_WEIGHT * similarity + RECENCY_WEIGHT * recency(entry, settings),
                    cited: false,
                }
            }
        })
        .max_by(|a, b| a.rank(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gesetze_gazette::PageRange;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn settings() -> MatchSettings {
        MatchSettings {
            today: date(2020, 6, 1),
            window_days: 360,
            consider_old: false,
        }
    }

    fn law() -> LawIdentity {
        LawIdentity {
            slug: "ifsg".into(),
            name: "Gesetz zur Verhütung und Bekämpfung von Infektionskrankheiten beim Menschen".into(),
            abbreviation: "IfSG".into(),
        }
    }

    fn bgbl(issue: &str, title: &str, date: NaiveDate, page: u32) -> GazetteEntry {
        let mut entry = GazetteEntry::new(GazetteKind::Bgbl, issue, date, title, 2020);
        entry.part = Some(1);
        entry.page_range = Some(PageRange::starting_at(page));
        entry
    }

    #[test]
    fn test_extract_bgbl_citations() {
        let text = "Zuletzt geändert durch Art. 1 G v. 27.3.2020 I 587\n\
                    +Stand: Zuletzt geändert durch Art. 5 G v. 19.5.2020 BGBl. I S. 1018\n\
                    (BGBl I 2020, 1055)";
        let citations = extract_citations(text);
        assert!(citations.bgbl.contains(&(2020, 1, 587)));
        assert!(citations.bgbl.contains(&(2020, 1, 1018)));
        assert!(citations.bgbl.contains(&(2020, 1, 1055)));
    }

    #[test]
    fn test_extract_vkbl_and_banz() {
        let citations = extract_citations("VkBl: 2012, S. 945\nBAnz AT 13.05.2020 V1 vom 2020");
        assert!(citations.vkbl.contains(&(2012, 945)));
        assert_eq!(citations.banz_lines, vec!["BAnz AT 13.05.2020 V1 vom 2020"]);
    }

    #[test]
    fn test_transient_marker_disables_citations() {
        let text = "(BGBl I 2020, 1055)\nÄnderung durch Art. 2 G v. 1.6.2020 BGBl I 2020, 1200 (noch nicht berücksichtigt)";
        assert!(extract_citations(text).is_empty());
    }

    #[test]
    fn test_fold_umlauts() {
        assert_eq!(fold("Verhütung Größe"), "verhuetung groesse");
    }

    #[test]
    fn test_title_similarity() {
        let profile = LawProfile::new(&law());
        assert_eq!(profile.title_similarity("Drittes Gesetz zur Änderung des IfSG"), 1.0);
        assert_eq!(
            profile.title_similarity(
                "Gesetz zur Verhütung und Bekämpfung von Infektionskrankheiten beim Menschen"
            ),
            1.0
        );
        let partial = profile.title_similarity("Gesetz zur Bekämpfung von Schwarzarbeit");
        assert!(partial > 0.0 && partial < 0.6);
    }

    #[test]
    fn test_shared_function_words_do_not_match() {
        let law = LawIdentity {
            slug: "wpg".into(),
            name: "Gesetz über die Feststellung des Wirtschaftsplans".into(),
            abbreviation: "WPG".into(),
        };
        let entries = vec![bgbl(
            "2020-1-0020",
            "Gesetz über die Statistik des Warenverkehrs",
            date(2020, 6, 1),
            700,
        )];
        let best = best_match(&law, &Evidence::default(), &entries, &settings()).unwrap();
        assert!(best.confidence < 0.6, "confidence {}", best.confidence);
    }

    #[test]
    fn test_generic_name_still_matches_itself() {
        let law = LawIdentity {
            slug: "g".into(),
            name: "Gesetz".into(),
            abbreviation: "G".into(),
        };
        assert_eq!(LawProfile::new(&law).title_similarity("Gesetz"), 1.0);
    }

    #[test]
    fn test_citation_beats_title() {
        let entries = vec![
            bgbl("2020-1-0014", &law().name, date(2020, 5, 20), 600),
            bgbl("2020-1-0012", "Verordnung über anderes", date(2020, 3, 27), 587),
        ];
        let evidence = Evidence {
            added: "+Zuletzt geändert durch Art. 1 G v. 27.3.2020 I 587",
            document: None,
        };
        let best = best_match(&law(), &evidence, &entries, &settings()).unwrap();
        assert_eq!(best.entry.issue_id, "2020-1-0012");
        assert!(best.cited);
        assert_eq!(best.confidence, CITED_CONFIDENCE);
    }

    #[test]
    fn test_document_consulted_when_diff_cites_nothing() {
        let entries = vec![bgbl("2020-1-0012", "Verordnung", date(2020, 3, 27), 587)];
        let evidence = Evidence {
            added: "+§ 5 neu gefasst",
            document: Some("Stand: Zuletzt geändert durch Art. 1 G v. 27.3.2020 I 587"),
        };
        let best = best_match(&law(), &evidence, &entries, &settings()).unwrap();
        assert!(best.cited);
    }

    #[test]
    fn test_exact_title_above_threshold() {
        let entries = vec![
            bgbl("2020-1-0014", &law().name, date(2020, 5, 20), 600),
            bgbl("2020-1-0015", "Gesetz über Schwarzarbeit", date(2020, 5, 30), 700),
        ];
        let best = best_match(&law(), &Evidence::default(), &entries, &settings()).unwrap();
        assert_eq!(best.entry.issue_id, "2020-1-0014");
        assert!(best.confidence > 0.85);
    }

    #[test]
    fn test_window_excludes_old_and_future() {
        let entries = vec![
            bgbl("2018-1-0001", &law().name, date(2018, 1, 1), 1),
            bgbl("2020-1-0099", &law().name, date(2020, 12, 1), 1),
        ];
        assert!(best_match(&law(), &Evidence::default(), &entries, &settings()).is_none());

        let old = MatchSettings {
            consider_old: true,
            ..settings()
        };
        assert!(best_match(&law(), &Evidence::default(), &entries, &old).is_some());
    }

    #[test]
    fn test_tie_break_order() {
        let day = date(2020, 5, 1);
        let mut banz = GazetteEntry::new(GazetteKind::Banz, "2020-05-01", day, "Bekanntmachung", 2020);
        banz.reference = Some("BAnz AT 01.05.2020 B1".into());
        let entries = vec![
            banz,
            bgbl("2020-1-0020", "Bekanntmachung", day, 10),
            bgbl("2020-1-0010", "Bekanntmachung", day, 5),
        ];
        let best = best_match(&law(), &Evidence::default(), &entries, &settings()).unwrap();
        assert_eq!(best.entry.issue_id, "2020-1-0010");
    }

    #[test]
    fn test_recency() {
        let entry = bgbl("x", "t", date(2020, 6, 1), 1);
        assert_eq!(recency(&entry, &settings()), 1.0);
        let half = bgbl("x", "t", date(2019, 12, 4), 1);
        assert!((recency(&half, &settings()) - 0.5).abs() < 0.01);
    }
}
