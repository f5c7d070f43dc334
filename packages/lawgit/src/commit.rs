//! Executing a commit plan against the repository.

use crate::error::{LawgitError, Result};
use crate::git_ops::GitRepo;
use crate::plan::BranchPlan;

/// How an autocommit run ended.
///
/// `empty` lists branches whose planned commits changed nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Every branch was committed and merged into the stable branch.
    CommittedAndMerged {
        branches: Vec<String>,
        empty: Vec<String>,
    },
    /// Some branches were committed but need manual merging.
    CommittedUnmerged {
        merged: Vec<String>,
        unmerged: Vec<String>,
        empty: Vec<String>,
    },
    /// Nothing was committed.
    NoChanges { empty: Vec<String> },
    /// Nothing was touched; `operations` lists what would have run.
    DryRun {
        plans: Vec<BranchPlan>,
        operations: Vec<String>,
    },
}

impl Outcome {
    /// A working tree without law changes.
    #[must_use]
    pub fn clean() -> Self {
        Self::NoChanges { empty: Vec::new() }
    }

    /// Empty commits as the errors an operator sees.
    #[must_use]
    pub fn empty_commits(&self) -> Vec<LawgitError> {
        let empty = match self {
            Self::CommittedAndMerged { empty, .. }
            | Self::CommittedUnmerged { empty, .. }
            | Self::NoChanges { empty } => empty.as_slice(),
            Self::DryRun { .. } => return Vec::new(),
        };
        empty
            .iter()
            .map(|branch| LawgitError::NothingToCommit {
                branch: branch.clone(),
            })
            .collect()
    }
}

/// Applies branch plans on top of a stable branch.
///
/// Commits are written onto their branch without checking it out, so the
/// stable branch stays checked out with the pending changes in place.
pub struct Committer<'a> {
    repo: &'a GitRepo,
    stable: &'a str,
}

impl<'a> Committer<'a> {
    pub fn new(repo: &'a GitRepo, stable: &'a str) -> Self {
        Self { repo, stable }
    }

    /// Commit every plan on its branch and merge the branch into stable.
    ///
    /// A conflict never touches the stable branch: the committed branch is
    /// reported as unmerged, its changes stay in the working tree and the
    /// remaining plans still run.
    pub fn execute(&self, plans: &[BranchPlan]) -> Result<Outcome> {
        if self.repo.current_branch()? != self.stable {
            self.repo.checkout(self.stable)?;
        }

        let mut merged = Vec::new();
        let mut unmerged = Vec::new();
        let mut empty = Vec::new();
        let mut committed = 0;

        for plan in plans {
            let count = self.commit_branch(plan)?;
            if count < plan.commits.len() {
                empty.push(plan.branch.clone());
            }
            if count == 0 {
                continue;
            }
            committed += count;

            match self.merge_branch(plan) {
                Ok(()) => {
                    tracing::info!(branch = %plan.branch, "merged into {}", self.stable);
                    merged.push(plan.branch.clone());
                }
                Err(LawgitError::MergeConflict { branch }) => {
                    tracing::warn!(branch, "committed but not merged into {}", self.stable);
                    unmerged.push(branch);
                }
                Err(e) => return Err(e),
            }
        }

        if !unmerged.is_empty() {
            return Ok(Outcome::CommittedUnmerged {
                merged,
                unmerged,
                empty,
            });
        }
        if committed == 0 {
            return Ok(Outcome::NoChanges { empty });
        }
        Ok(Outcome::CommittedAndMerged {
            branches: merged,
            empty,
        })
    }

    /// Commit a plan on its branch, creating the branch at stable first if
    /// needed. Returns the number of commits made.
    fn commit_branch(&self, plan: &BranchPlan) -> Result<usize> {
        if !self.repo.branch_exists(&plan.branch)? {
            tracing::debug!(branch = %plan.branch, "creating branch");
            self.repo.create_branch(&plan.branch, self.stable)?;
        }

        let mut committed = 0;
        for commit in &plan.commits {
            let files: Vec<&str> = commit.files.iter().map(String::as_str).collect();
            if self.repo.commit_to_branch(&plan.branch, &commit.message, &files)? {
                tracing::info!(branch = %plan.branch, laws = ?commit.laws, "committed");
                committed += 1;
            } else {
                let empty = LawgitError::NothingToCommit {
                    branch: plan.branch.clone(),
                };
                tracing::warn!(laws = ?commit.laws, "{empty}");
            }
        }
        Ok(committed)
    }

    /// Merge a committed branch into stable.
    ///
    /// The plan's pending changes are stashed first; they are in the branch
    /// now. On success the stash is dropped, on a conflict the merge is
    /// aborted and the changes are restored onto the untouched stable branch.
    fn merge_branch(&self, plan: &BranchPlan) -> Result<()> {
        let files = plan.files();
        let stashed = self.repo.stash_push(&files)?;

        let merged = self.repo.merge(&plan.branch, true);
        if stashed {
            match merged {
                Ok(()) => self.repo.stash_drop()?,
                Err(_) => self.repo.stash_pop()?,
            }
        }
        merged
    }

    /// The git operations `execute` would run, for dry runs.
    pub fn describe(&self, plans: &[BranchPlan]) -> Result<Vec<String>> {
        let mut operations = Vec::new();
        for plan in plans {
            if !self.repo.branch_exists(&plan.branch)? {
                operations.push(format!("git branch {} {}", plan.branch, self.stable));
            }
            for commit in &plan.commits {
                let subject = commit.message.lines().next().unwrap_or_default();
                operations.push(format!("git read-tree {} (temporary index)", plan.branch));
                operations.push(format!("git add -A -- {}", commit.files.join(" ")));
                operations.push(format!("git commit-tree -p {} -m {subject:?}", plan.branch));
            }
            operations.push(format!(
                "git stash push --include-untracked -- {}",
                plan.files().join(" ")
            ));
            operations.push(format!("git merge --no-edit --no-ff {}", plan.branch));
            operations.push("git stash drop".to_string());
        }
        Ok(operations)
    }
}
