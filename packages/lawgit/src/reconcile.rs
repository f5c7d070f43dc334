//! The autocommit run: scan, match, plan, commit.

use std::fs;
use std::path::Path;

use chrono::{Local, NaiveDate};
use gesetze_gazette::{load_entries, GazetteEntry};
use gesetze_harvester::lawlist::load_law_list;
use gesetze_harvester::markdown::INDEX_FILE;
use gesetze_harvester::LawIndex;

use crate::commit::{Committer, Outcome};
use crate::config::LawgitConfig;
use crate::error::Result;
use crate::git_ops::GitRepo;
use crate::identity::resolve_identity;
use crate::matching::{best_match, Evidence, MatchSettings};
use crate::plan::{synthesize, CommitCandidate};
use crate::scan::{scan, ChangeKind, LawChanges};

/// Options of one autocommit run.
#[derive(Debug, Clone)]
pub struct AutocommitOptions {
    pub config: LawgitConfig,
    pub dry_run: bool,
    /// Ignore the matching window.
    pub consider_old: bool,
    /// Only laws whose directory name contains this.
    pub grep: Option<String>,
    /// Defaults to the local date.
    pub today: Option<NaiveDate>,
}

impl AutocommitOptions {
    pub fn new(config: LawgitConfig) -> Self {
        Self {
            config,
            dry_run: false,
            consider_old: false,
            grep: None,
            today: None,
        }
    }
}

/// Commit the working tree changes of `repo`, one branch per gazette entry.
pub fn autocommit(repo: &GitRepo, options: &AutocommitOptions) -> Result<Outcome> {
    let config = &options.config;
    config.validate()?;

    let scanned = scan(repo, options.grep.as_deref())?;
    if scanned.laws.is_empty() {
        tracing::info!("no law changes in working tree");
        return Ok(Outcome::clean());
    }
    tracing::info!(laws = scanned.laws.len(), "changed laws found");

    let entries = load_gazette(config)?;
    let index = load_index(&config.lawlist_path())?;
    let settings = MatchSettings {
        today: options
            .today
            .unwrap_or_else(|| Local::now().date_naive()),
        window_days: config.window_days,
        consider_old: options.consider_old,
    };

    let mut candidates = Vec::with_capacity(scanned.laws.len());
    for law in scanned.laws {
        candidates.push(candidate(repo, law, &entries, &index, &settings)?);
    }

    let plans = synthesize(candidates, config.threshold, &config.working_branch);
    let committer = Committer::new(repo, &config.stable_branch);
    if options.dry_run {
        let operations = committer.describe(&plans)?;
        return Ok(Outcome::DryRun { plans, operations });
    }
    committer.execute(&plans)
}

fn candidate(
    repo: &GitRepo,
    law: LawChanges,
    entries: &[GazetteEntry],
    index: &LawIndex,
    settings: &MatchSettings,
) -> Result<CommitCandidate> {
    let document = read_document(repo, &law.dir)?;
    let added = added_text(repo.path(), &law);
    let identity = resolve_identity(&law.slug, document.as_deref(), index);

    let evidence = Evidence {
        added: &added,
        document: document.as_deref(),
    };
    let best = best_match(&identity, &evidence, entries, settings);
    match &best {
        Some(scored) => tracing::info!(
            slug = %law.slug,
            issue = %scored.entry.issue_id,
            confidence = scored.confidence,
            cited = scored.cited,
            "best gazette entry"
        ),
        None => tracing::info!(slug = %law.slug, "no gazette entry in window"),
    }

    Ok(CommitCandidate {
        law: identity,
        dir: law.dir,
        changes: law.changes,
        matched_entry: best.map(|scored| scored.entry.clone()),
        confidence: best.map_or(0.0, |scored| scored.confidence),
    })
}

/// All entries of the gazette dumps; missing dumps count as empty.
fn load_gazette(config: &LawgitConfig) -> Result<Vec<GazetteEntry>> {
    let mut entries = Vec::new();
    for path in config.dump_paths() {
        let loaded = load_entries(&path)?;
        tracing::debug!(path = %path.display(), entries = loaded.len(), "loaded gazette dump");
        entries.extend(loaded);
    }
    Ok(entries)
}

fn load_index(path: &Path) -> Result<LawIndex> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no law list, identities come from front matter");
        return Ok(LawIndex::default());
    }
    Ok(LawIndex::from_records(load_law_list(path)?))
}

/// Current `index.md` of a law; the committed one if it was deleted.
fn read_document(repo: &GitRepo, dir: &str) -> Result<Option<String>> {
    let relative = format!("{dir}/{INDEX_FILE}");
    match fs::read_to_string(repo.path().join(&relative)) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => repo.show_head(&relative),
        Err(e) => Err(e.into()),
    }
}

/// Text added by the change: `+` lines of the diffs plus new Markdown files.
fn added_text(root: &Path, law: &LawChanges) -> String {
    let mut added = String::new();
    for change in &law.changes {
        if let Some(diff) = &change.content_diff {
            for line in diff.lines() {
                if let Some(text) = line.strip_prefix('+').filter(|_| !line.starts_with("+++")) {
                    added.push_str(text);
                    added.push('\n');
                }
            }
        } else if change.kind == ChangeKind::Added && change.file_path.ends_with(".md") {
            match fs::read_to_string(root.join(&change.file_path)) {
                Ok(text) => added.push_str(&text),
                Err(e) => tracing::warn!(path = %change.file_path, error = %e, "cannot read added file"),
            }
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::WorkingTreeChange;

    #[test]
    fn test_added_text_keeps_plus_lines_only() {
        let law = LawChanges {
            slug: "testg".into(),
            dir: "t/testg".into(),
            changes: vec![WorkingTreeChange {
                file_path: "t/testg/index.md".into(),
                kind: ChangeKind::Modified,
                content_diff: Some(
                    "--- a/t/testg/index.md\n+++ b/t/testg/index.md\n@@ -1 +1 @@\n-alt\n+neu (BGBl I 2020, 569)\n"
                        .into(),
                ),
            }],
        };
        assert_eq!(added_text(Path::new("."), &law), "neu (BGBl I 2020, 569)\n");
    }
}
