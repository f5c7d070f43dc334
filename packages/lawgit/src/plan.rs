//! Turning scored laws into branches and commits.

use std::collections::BTreeMap;

use gesetze_gazette::{GazetteEntry, GazetteKind};

use crate::identity::LawIdentity;
use crate::scan::WorkingTreeChange;

/// A changed law together with its best gazette entry.
#[derive(Debug, Clone)]
pub struct CommitCandidate {
    pub law: LawIdentity,
    /// `<prefix>/<slug>`
    pub dir: String,
    pub changes: Vec<WorkingTreeChange>,
    pub matched_entry: Option<GazetteEntry>,
    /// 0.0 when nothing matched.
    pub confidence: f64,
}

impl CommitCandidate {
    fn files(&self) -> impl Iterator<Item = String> + '_ {
        self.changes.iter().map(|c| c.file_path.clone())
    }
}

/// One commit to create.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCommit {
    pub message: String,
    /// Exactly the files this commit stages.
    pub files: Vec<String>,
    /// Slugs of the laws it touches.
    pub laws: Vec<String>,
}

/// The commits of one branch, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchPlan {
    pub branch: String,
    pub commits: Vec<PlannedCommit>,
}

impl BranchPlan {
    /// Every file the branch's commits stage.
    pub fn files(&self) -> Vec<&str> {
        self.commits
            .iter()
            .flat_map(|c| c.files.iter().map(String::as_str))
            .collect()
    }
}

/// Branch collecting the laws changed by a gazette entry.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use gesetze_gazette::{GazetteEntry, GazetteKind};
/// use gesetze_lawgit::plan::branch_name;
///
/// let date = NaiveDate::from_ymd_opt(2020, 5, 13).unwrap();
/// let mut entry = GazetteEntry::new(GazetteKind::Bgbl, "2020-1-0024", date, "Gesetz", 2020);
/// entry.part = Some(1);
/// entry.number = Some(24);
/// assert_eq!(branch_name(&entry), "bgbl/2020/1-24");
///
/// let entry = GazetteEntry::new(GazetteKind::Banz, "2020-05-13", date, "Bekanntmachung", 2020);
/// assert_eq!(branch_name(&entry), "banz/2020/05-13");
/// ```
#[must_use]
pub fn branch_name(entry: &GazetteEntry) -> String {
    match entry.source {
        GazetteKind::Bgbl => match (entry.part, entry.number) {
            (Some(part), Some(number)) => format!("bgbl/{}/{part}-{number}", entry.year),
            _ => format!("bgbl/{}", entry.issue_id),
        },
        GazetteKind::Banz => format!("banz/{}", entry.date.format("%Y/%m-%d")),
        GazetteKind::Vkbl => format!("vkbl/{}", entry.date.format("%Y/%m-%d")),
    }
}

/// Message of a commit attributed to `entry`.
#[must_use]
pub fn matched_message(entry: &GazetteEntry, confidence: f64, slugs: &[String]) -> String {
    format!(
        "{}\n\n{}: {}\n\nGazette-Issue: {}\nConfidence: {confidence:.2}\nLaws: {}",
        entry.title,
        entry.date.format("%d.%m.%Y"),
        entry.citation(),
        entry.issue_id,
        slugs.join(", ")
    )
}

/// Message of a commit no gazette entry explains.
#[must_use]
pub fn degraded_message(candidate: &CommitCandidate) -> String {
    let law = &candidate.law;
    let mut message = format!("Update {} ({})\n\n", law.name, law.abbreviation);
    match &candidate.matched_entry {
        Some(entry) => message.push_str(&format!(
            "No gazette entry matched. Closest: {} ({}), confidence {:.2}.",
            entry.issue_id,
            entry.citation(),
            candidate.confidence
        )),
        None => message.push_str("No gazette entry matched."),
    }
    message
}

/// Group candidates into branches and commits.
///
/// Candidates at or above `threshold` get one commit per gazette entry on
/// the entry's branch; the rest get one commit per law on `working_branch`.
/// Branches are returned in name order.
#[must_use]
pub fn synthesize(
    candidates: Vec<CommitCandidate>,
    threshold: f64,
    working_branch: &str,
) -> Vec<BranchPlan> {
    // branch -> entry -> candidates
    let mut matched: BTreeMap<String, BTreeMap<EntryKey, Vec<CommitCandidate>>> = BTreeMap::new();
    let mut unmatched = Vec::new();

    for candidate in candidates {
        match &candidate.matched_entry {
            Some(entry) if candidate.confidence >= threshold => {
                matched
                    .entry(branch_name(entry))
                    .or_default()
                    .entry(EntryKey::of(entry))
                    .or_default()
                    .push(candidate);
            }
            _ => unmatched.push(candidate),
        }
    }

    let mut plans: BTreeMap<String, Vec<PlannedCommit>> = matched
        .into_iter()
        .map(|(branch, groups)| (branch, groups.into_values().filter_map(entry_commit).collect()))
        .collect();

    if !unmatched.is_empty() {
        let commits = plans.entry(working_branch.to_string()).or_default();
        for candidate in unmatched {
            commits.push(PlannedCommit {
                message: degraded_message(&candidate),
                files: candidate.files().collect(),
                laws: vec![candidate.law.slug.clone()],
            });
        }
    }

    plans
        .into_iter()
        .map(|(branch, commits)| BranchPlan { branch, commits })
        .collect()
}

/// One commit for all laws changed by the same entry. Its confidence is the
/// lowest of the group.
fn entry_commit(group: Vec<CommitCandidate>) -> Option<PlannedCommit> {
    let entry = group.first()?.matched_entry.clone()?;
    let confidence = group
        .iter()
        .map(|c| c.confidence)
        .fold(f64::INFINITY, f64::min);
    let laws: Vec<String> = group.iter().map(|c| c.law.slug.clone()).collect();
    Some(PlannedCommit {
        message: matched_message(&entry, confidence, &laws),
        files: group.iter().flat_map(CommitCandidate::files).collect(),
        laws,
    })
}

/// Identity of an entry for grouping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct EntryKey {
    issue_id: String,
    title: String,
    page: Option<u32>,
    source: GazetteKind,
}

impl EntryKey {
    fn of(entry: &GazetteEntry) -> Self {
        Self {
            issue_id: entry.issue_id.clone(),
            title: entry.title.clone(),
            page: entry.first_page(),
            source: entry.source,
        }
    }
}
