//! Error types for lawgit.

use gesetze_gazette::GazetteError;
use gesetze_harvester::HarvesterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LawgitError {
    /// A commit would have been empty.
    #[error("nothing to commit on {branch}")]
    NothingToCommit { branch: String },

    /// Merging left conflicts; the merge has been aborted.
    #[error("merge conflict merging {branch}")]
    MergeConflict { branch: String },

    /// Branches that were committed but could not be merged.
    #[error("branches need manual merging: {}", branches.join(", "))]
    Unmerged { branches: Vec<String> },

    #[error("git error: {message}")]
    Git { message: String, stderr: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Gazette(#[from] GazetteError),

    #[error(transparent)]
    Harvester(#[from] HarvesterError),
}

pub type Result<T> = std::result::Result<T, LawgitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmerged_lists_branches() {
        let err = LawgitError::Unmerged {
            branches: vec!["bgbl/2020/1-14".into(), "lawgit/updates".into()],
        };
        assert_eq!(
            err.to_string(),
            "branches need manual merging: bgbl/2020/1-14, lawgit/updates"
        );
    }
}
