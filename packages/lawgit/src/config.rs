use std::path::PathBuf;

use crate::error::{LawgitError, Result};

/// Settings of an autocommit run.
#[derive(Debug, Clone, PartialEq)]
pub struct LawgitConfig {
    /// Directory holding `laws.json` and the gazette dumps.
    pub data_dir: PathBuf,
    /// Branch every change branch is created from and merged into.
    pub stable_branch: String,
    /// Branch collecting changes no gazette entry explains.
    pub working_branch: String,
    /// Minimum confidence for a change to be attributed to an entry.
    pub threshold: f64,
    /// Entries older than this many days are not considered.
    pub window_days: i64,
}

impl Default for LawgitConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            stable_branch: "master".into(),
            working_branch: "lawgit/updates".into(),
            threshold: 0.6,
            window_days: 360,
        }
    }
}

impl LawgitConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let data_dir = std::env::var("LAWGIT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let stable_branch =
            std::env::var("LAWGIT_STABLE_BRANCH").unwrap_or(defaults.stable_branch);

        let working_branch =
            std::env::var("LAWGIT_WORKING_BRANCH").unwrap_or(defaults.working_branch);

        let threshold = std::env::var("LAWGIT_CONFIDENCE_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.threshold);

        let window_days = std::env::var("LAWGIT_WINDOW_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.window_days);

        let config = Self {
            data_dir,
            stable_branch,
            working_branch,
            threshold,
            window_days,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(LawgitError::Config(format!(
                "confidence threshold must be between 0 and 1, got {}",
                self.threshold
            )));
        }
        if self.window_days <= 0 {
            return Err(LawgitError::Config(format!(
                "window must be at least one day, got {}",
                self.window_days
            )));
        }
        if self.stable_branch == self.working_branch {
            return Err(LawgitError::Config(
                "stable and working branch must differ".into(),
            ));
        }
        Ok(())
    }

    pub fn lawlist_path(&self) -> PathBuf {
        self.data_dir.join("laws.json")
    }

    /// Gazette dumps read for matching.
    pub fn dump_paths(&self) -> Vec<PathBuf> {
        [
            gesetze_gazette::config::BGBL_DUMP,
            gesetze_gazette::config::BANZ_DUMP,
            gesetze_gazette::config::VKBL_DUMP,
        ]
        .iter()
        .map(|name| self.data_dir.join(name))
        .collect()
    }
}

/// Locations used by `lawgit update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateConfig {
    pub laws_repository: String,
    /// Checkout of the Markdown laws repository.
    pub laws_path: PathBuf,
    /// Downloaded XML laws.
    pub raw_xml_path: PathBuf,
}

impl UpdateConfig {
    pub fn from_env() -> Self {
        Self {
            laws_repository: std::env::var("LAWS_REPOSITORY")
                .unwrap_or_else(|_| "https://github.com/bundestag/gesetze.git".into()),
            laws_path: std::env::var("LAWS_PATH")
                .unwrap_or_else(|_| "gesetze".into())
                .into(),
            raw_xml_path: std::env::var("RAW_XML_PATH")
                .unwrap_or_else(|_| "gesetze-xml".into())
                .into(),
        }
    }
}
