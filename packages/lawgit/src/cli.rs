//! Command-line interface for lawgit.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::commit::Outcome;
use crate::config::{LawgitConfig, UpdateConfig};
use crate::error::{LawgitError, Result};
use crate::git_ops::GitRepo;
use crate::reconcile::{autocommit, AutocommitOptions};
use crate::update::update;

/// Commit law changes with messages naming the gazette issue that caused them.
#[derive(Parser)]
#[command(name = "lawgit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Commit the working tree changes of a laws repository.
    Autocommit {
        /// Checkout of the Markdown laws repository
        repopath: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Pull, scrape, download, convert and autocommit.
    Update {
        #[command(flatten)]
        run: RunArgs,
    },
}

/// Flags shared by both commands; they override the environment.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Only log the planned git operations
    #[arg(long)]
    pub dry_run: bool,

    /// Also match gazette entries outside the window
    #[arg(long)]
    pub consider_old: bool,

    /// Only laws whose directory name contains this
    #[arg(long)]
    pub grep: Option<String>,

    /// Directory with laws.json and the gazette dumps
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    #[arg(long)]
    pub stable_branch: Option<String>,

    /// Branch for changes no gazette entry explains
    #[arg(long)]
    pub working_branch: Option<String>,

    /// Minimum confidence to attribute a change to an entry (0 to 1)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Ignore entries older than this many days
    #[arg(long)]
    pub window_days: Option<i64>,
}

impl RunArgs {
    /// Options from the environment with these flags applied.
    pub fn options(self, mut config: LawgitConfig) -> Result<AutocommitOptions> {
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(branch) = self.stable_branch {
            config.stable_branch = branch;
        }
        if let Some(branch) = self.working_branch {
            config.working_branch = branch;
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(days) = self.window_days {
            config.window_days = days;
        }
        config.validate()?;

        Ok(AutocommitOptions {
            config,
            dry_run: self.dry_run,
            consider_old: self.consider_old,
            grep: self.grep,
            today: None,
        })
    }
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Autocommit { repopath, run } => {
            let options = run.options(LawgitConfig::from_env()?)?;
            let repo = GitRepo::open(&repopath)?;
            report(autocommit(&repo, &options)?)
        }
        Commands::Update { run } => {
            let options = run.options(LawgitConfig::from_env()?)?;
            let progress = progress_bar();
            let summary = update(&UpdateConfig::from_env(), &options, &progress);
            progress.finish_and_clear();
            let summary = summary?;

            println!(
                "{} {} new BAnz entries, {} laws downloaded, {} converted",
                style("Updated:").bold(),
                style(summary.gazette_entries).cyan(),
                summary.downloads.succeeded.len(),
                summary.conversions.succeeded.len()
            );
            for failure in summary.downloads.failures.iter().chain(&summary.conversions.failures) {
                eprintln!("  {} {}: {}", style("✗").red(), failure.item, failure.error);
            }
            let batch = summary.batch_result();
            report(summary.outcome)?;
            batch.map_err(LawgitError::from)
        }
    }
}

/// Print the outcome; unmerged branches turn into a non-zero exit.
fn report(outcome: Outcome) -> Result<()> {
    for empty in outcome.empty_commits() {
        eprintln!("  {} {empty}", style("!").yellow());
    }
    match outcome {
        Outcome::NoChanges { .. } => {
            println!("{} no law changes to commit", style("Done:").green().bold());
            Ok(())
        }
        Outcome::CommittedAndMerged { branches, .. } => {
            println!(
                "{} {} branches committed and merged",
                style("Done:").green().bold(),
                branches.len()
            );
            for branch in &branches {
                println!("  {} {branch}", style("✓").green());
            }
            Ok(())
        }
        Outcome::CommittedUnmerged {
            merged, unmerged, ..
        } => {
            println!(
                "{} {} merged, {} need manual merging",
                style("Done:").yellow().bold(),
                merged.len(),
                unmerged.len()
            );
            for branch in &unmerged {
                eprintln!("  {} {branch}", style("✗").red());
            }
            Err(LawgitError::Unmerged { branches: unmerged })
        }
        Outcome::DryRun { plans, operations } => {
            println!(
                "{} {} branches planned",
                style("Dry run:").bold(),
                plans.len()
            );
            for plan in &plans {
                println!("  {} ({} commits)", style(&plan.branch).cyan(), plan.commits.len());
            }
            for operation in &operations {
                tracing::info!("{operation}");
                println!("    {operation}");
            }
            Ok(())
        }
    }
}

fn progress_bar() -> ProgressBar {
    let progress = ProgressBar::new(0);
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .expect("valid template"),
    );
    progress
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_autocommit() {
        let cli = Cli::parse_from([
            "lawgit",
            "autocommit",
            "gesetze",
            "--dry-run",
            "--grep",
            "bgb",
            "--threshold",
            "0.8",
        ]);

        let Commands::Autocommit { repopath, run } = cli.command else {
            panic!("expected autocommit command");
        };
        assert_eq!(repopath, PathBuf::from("gesetze"));
        assert!(run.dry_run);
        assert!(!run.consider_old);
        assert_eq!(run.grep.as_deref(), Some("bgb"));
        assert_eq!(run.threshold, Some(0.8));
    }

    #[test]
    fn test_cli_autocommit_requires_repopath() {
        assert!(Cli::try_parse_from(["lawgit", "autocommit"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let run = RunArgs {
            stable_branch: Some("main".into()),
            window_days: Some(30),
            ..RunArgs::default()
        };
        let options = run.options(LawgitConfig::default()).unwrap();
        assert_eq!(options.config.stable_branch, "main");
        assert_eq!(options.config.window_days, 30);
        assert_eq!(options.config.threshold, 0.6);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let run = RunArgs {
            threshold: Some(2.0),
            ..RunArgs::default()
        };
        assert!(matches!(
            run.options(LawgitConfig::default()),
            Err(LawgitError::Config(_))
        ));
    }
}
