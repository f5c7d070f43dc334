//! Working tree scan: which files changed, grouped per law directory.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::git_ops::GitRepo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

/// One changed file of the working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingTreeChange {
    /// Repository-relative path with `/` separators.
    pub file_path: String,
    pub kind: ChangeKind,
    /// `git diff HEAD` of the file (modified and deleted files only).
    pub content_diff: Option<String>,
}

/// Changes below one `<prefix>/<slug>/` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LawChanges {
    pub slug: String,
    /// `<prefix>/<slug>`
    pub dir: String,
    pub changes: Vec<WorkingTreeChange>,
}

impl LawChanges {
    #[must_use]
    pub fn files(&self) -> Vec<&str> {
        self.changes.iter().map(|c| c.file_path.as_str()).collect()
    }
}

#[derive(Debug, Default)]
pub struct Scan {
    /// Changed laws, ordered by directory.
    pub laws: Vec<LawChanges>,
    /// Changes outside the law directory layout; never committed.
    pub unassigned: Vec<WorkingTreeChange>,
}

/// Parse `git status --porcelain -z` output into `(kind, path)` pairs.
///
/// Renames and copies report their new path.
#[must_use]
pub fn parse_porcelain(status: &str) -> Vec<(ChangeKind, String)> {
    let mut parsed = Vec::new();
    let mut records = status.split('\0').filter(|r| !r.is_empty());
    while let Some(record) = records.next() {
        let (Some(code), Some(path)) = (record.get(..2), record.get(3..)) else {
            continue;
        };
        if code.starts_with('R') || code.starts_with('C') {
            // The source path follows as its own record.
            records.next();
        }

        let kind = if code == "??" {
            ChangeKind::Added
        } else if code.contains('D') {
            ChangeKind::Deleted
        } else if code.starts_with('A') {
            ChangeKind::Added
        } else {
            ChangeKind::Modified
        };
        parsed.push((kind, path.to_string()));
    }
    parsed
}

/// `(dir, slug)` of a path laid out as `<prefix>/<slug>/<file>`.
#[must_use]
pub fn law_location(path: &str) -> Option<(String, String)> {
    let mut parts = path.split('/');
    let prefix = parts.next().filter(|p| !p.is_empty())?;
    let slug = parts.next().filter(|s| !s.is_empty())?;
    parts.next()?;
    Some((format!("{prefix}/{slug}"), slug.to_string()))
}

/// Scan the working tree of `repo`.
///
/// With `grep`, only laws whose directory name contains it are kept.
pub fn scan(repo: &GitRepo, grep: Option<&str>) -> Result<Scan> {
    let status = repo.status()?;
    let has_head = repo.has_head()?;

    let mut laws: BTreeMap<String, LawChanges> = BTreeMap::new();
    let mut unassigned = Vec::new();
    for (kind, path) in parse_porcelain(&status) {
        let location = law_location(&path);
        if let (Some((_, slug)), Some(pattern)) = (&location, grep) {
            if !slug.contains(pattern) {
                tracing::debug!(path, "filtered out by grep");
                continue;
            }
        }

        let content_diff = if kind != ChangeKind::Added && has_head {
            Some(repo.diff_head(&path)?)
        } else {
            None
        };
        let change = WorkingTreeChange {
            file_path: path,
            kind,
            content_diff,
        };

        match location {
            Some((dir, slug)) => laws
                .entry(dir.clone())
                .or_insert_with(|| LawChanges {
                    slug,
                    dir,
                    changes: Vec::new(),
                })
                .changes
                .push(change),
            None => {
                tracing::warn!(path = %change.file_path, "change outside law directories, leaving it alone");
                unassigned.push(change);
            }
        }
    }

    tracing::info!(laws = laws.len(), "scanned working tree");
    Ok(Scan {
        laws: laws.into_values().collect(),
        unassigned,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_porcelain_kinds() {
        let status = " M b/bgb/index.md\0?? h/hgb/index.md\0 D a/ao/index.md\0A  s/stgb/bild.png\0R  v/vwgo/neu.md\0v/vwgo/alt.md\0";
        assert_eq!(
            parse_porcelain(status),
            vec![
                (ChangeKind::Modified, "b/bgb/index.md".to_string()),
                (ChangeKind::Added, "h/hgb/index.md".to_string()),
                (ChangeKind::Deleted, "a/ao/index.md".to_string()),
                (ChangeKind::Added, "s/stgb/bild.png".to_string()),
                (ChangeKind::Modified, "v/vwgo/neu.md".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_porcelain_deleted_in_worktree() {
        let status = "AD n/neu/index.md\0RD v/vwgo/neu.md\0v/vwgo/alt.md\0DD k/konflikt/index.md\0";
        let kinds: Vec<ChangeKind> = parse_porcelain(status).into_iter().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, vec![ChangeKind::Deleted; 3]);
    }

    #[test]
    fn test_parse_porcelain_path_with_spaces() {
        let parsed = parse_porcelain("?? a/abc/Anlage 1.pdf\0");
        assert_eq!(parsed[0].1, "a/abc/Anlage 1.pdf");
    }

    #[test]
    fn test_law_location() {
        assert_eq!(
            law_location("b/bgb/index.md"),
            Some(("b/bgb".to_string(), "bgb".to_string()))
        );
        assert_eq!(
            law_location("b/bgb/img/x.png"),
            Some(("b/bgb".to_string(), "bgb".to_string()))
        );
        assert_eq!(law_location("README.md"), None);
        assert_eq!(law_location("b/index.md"), None);
    }
}
