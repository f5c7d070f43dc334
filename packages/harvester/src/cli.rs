//! Command-line interface for the harvester.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{
    law_dir, DEFAULT_LAWLIST_PATH, DEFAULT_LAWS_PATH, DEFAULT_MAX_RESPONSE_SIZE, GII_BASE_URL,
};
use crate::error::{HarvesterError, Result};
use crate::harvester::Harvester;
use crate::http::HttpFetcher;
use crate::lawlist::{load_law_list, update_list};
use crate::markdown::{convert_file, convert_tree};
use crate::types::BatchReport;

/// Download German federal laws from gesetze-im-internet.de and convert them to Markdown.
#[derive(Parser)]
#[command(name = "gesetze-harvester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Site root to download from
    #[arg(long, global = true, default_value = GII_BASE_URL)]
    pub base_url: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rebuild the law list from the site's index pages.
    Updatelist {
        /// Law list file
        #[arg(long, default_value = DEFAULT_LAWLIST_PATH)]
        lawlist: PathBuf,
    },

    /// Download every law of the law list.
    Loadall {
        /// Directory to store laws in
        #[arg(long, default_value = DEFAULT_LAWS_PATH)]
        path: PathBuf,

        /// Law list file
        #[arg(long, default_value = DEFAULT_LAWLIST_PATH)]
        lawlist: PathBuf,

        /// Maximum archive size in bytes
        #[arg(long, default_value_t = DEFAULT_MAX_RESPONSE_SIZE)]
        max_size: u64,
    },

    /// Download the given laws.
    Load {
        /// Directory to store laws in
        #[arg(long, default_value = DEFAULT_LAWS_PATH)]
        path: PathBuf,

        /// Law slugs (e.g., bgb, aeg_1994)
        #[arg(required = true)]
        slugs: Vec<String>,
    },

    /// Convert downloaded law XML to Markdown.
    Convert {
        /// Single XML file to convert to stdout
        #[arg(long, conflicts_with_all = ["inpath", "outpath"])]
        name: Option<PathBuf>,

        /// Directory of downloaded laws
        #[arg(required_unless_present = "name")]
        inpath: Option<PathBuf>,

        /// Directory to write Markdown to
        #[arg(required_unless_present = "name")]
        outpath: Option<PathBuf>,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let base_url = cli.base_url;

    match cli.command {
        Commands::Updatelist { lawlist } => updatelist_command(&base_url, &lawlist),
        Commands::Loadall {
            path,
            lawlist,
            max_size,
        } => loadall_command(&base_url, &path, &lawlist, max_size),
        Commands::Load { path, slugs } => load_command(&base_url, &path, &slugs),
        Commands::Convert {
            name: Some(file), ..
        } => {
            let converted = convert_file(&file)?;
            print!("{}", converted.markdown);
            Ok(())
        }
        Commands::Convert {
            inpath: Some(inpath),
            outpath: Some(outpath),
            ..
        } => convert_command(&inpath, &outpath),
        Commands::Convert { .. } => Err(HarvesterError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "convert needs either --name <file> or <inpath> <outpath>",
        ))),
    }
}

fn updatelist_command(base_url: &str, lawlist: &Path) -> Result<()> {
    println!("{} law list", style("Updating").bold());
    let fetcher = HttpFetcher::new()?;
    let report = update_list(&fetcher, base_url, lawlist)?;
    println!(
        "{} {}",
        style("Saved to:").green().bold(),
        lawlist.display()
    );
    finish(&report)
}

fn loadall_command(base_url: &str, path: &Path, lawlist: &Path, max_size: u64) -> Result<()> {
    let laws = load_law_list(lawlist)?;
    println!(
        "{} {} laws into {}",
        style("Downloading").bold(),
        style(laws.len()).cyan(),
        path.display()
    );

    let fetcher = HttpFetcher::new()?.with_max_size(max_size);
    let harvester = Harvester::new(fetcher, path).with_base_url(base_url);
    let progress = progress_bar(laws.len() as u64);
    let report = harvester.loadall(&laws, &progress);
    progress.finish_and_clear();

    finish(&report?)
}

fn load_command(base_url: &str, path: &Path, slugs: &[String]) -> Result<()> {
    let fetcher = HttpFetcher::new()?;
    let harvester = Harvester::new(fetcher, path).with_base_url(base_url);
    let progress = progress_bar(slugs.len() as u64);
    let report = harvester.load(slugs, &progress);
    progress.finish_and_clear();

    finish(&report?)
}

fn convert_command(inpath: &Path, outpath: &Path) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    spinner.set_message(format!("Converting {}", inpath.display()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let report = convert_tree(inpath, outpath);
    spinner.finish_and_clear();
    let report = report?;

    for slug in &report.succeeded {
        println!("{}", law_dir(outpath, slug).display());
    }
    finish(&report)
}

fn progress_bar(len: u64) -> ProgressBar {
    let progress = ProgressBar::new(len);
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .expect("valid template"),
    );
    progress
}

/// Print a batch summary; failing items turn into a non-zero exit.
fn finish(report: &BatchReport) -> Result<()> {
    println!();
    println!(
        "{} {} succeeded, {} failed",
        style("Done:").green().bold(),
        report.succeeded.len(),
        report.failures.len()
    );

    if report.is_success() {
        return Ok(());
    }

    for failure in &report.failures {
        eprintln!("  {} {}: {}", style("✗").red(), failure.item, failure.error);
    }
    Err(HarvesterError::BatchFailed {
        failed: report.failures.len(),
        total: report.total(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_load() {
        let cli = Cli::parse_from(["gesetze-harvester", "load", "bgb", "hgb"]);

        let Commands::Load { path, slugs } = cli.command else {
            panic!("expected load command");
        };
        assert_eq!(path, PathBuf::from(DEFAULT_LAWS_PATH));
        assert_eq!(slugs, vec!["bgb", "hgb"]);
        assert_eq!(cli.base_url, GII_BASE_URL);
    }

    #[test]
    fn test_cli_parse_load_requires_slug() {
        assert!(Cli::try_parse_from(["gesetze-harvester", "load"]).is_err());
    }

    #[test]
    fn test_cli_parse_convert_paths() {
        let cli = Cli::parse_from(["gesetze-harvester", "convert", "laws", "laws-md"]);

        let Commands::Convert {
            name,
            inpath,
            outpath,
        } = cli.command
        else {
            panic!("expected convert command");
        };
        assert!(name.is_none());
        assert_eq!(inpath, Some(PathBuf::from("laws")));
        assert_eq!(outpath, Some(PathBuf::from("laws-md")));
    }

    #[test]
    fn test_cli_parse_convert_name() {
        let cli = Cli::parse_from(["gesetze-harvester", "convert", "--name", "laws/b/bgb/bgb.xml"]);

        let Commands::Convert { name, .. } = cli.command else {
            panic!("expected convert command");
        };
        assert_eq!(name, Some(PathBuf::from("laws/b/bgb/bgb.xml")));
    }

    #[test]
    fn test_cli_parse_convert_requires_paths() {
        assert!(Cli::try_parse_from(["gesetze-harvester", "convert", "laws"]).is_err());
    }

    #[test]
    fn test_cli_parse_loadall_defaults() {
        let cli = Cli::parse_from(["gesetze-harvester", "loadall"]);

        let Commands::Loadall {
            lawlist, max_size, ..
        } = cli.command
        else {
            panic!("expected loadall command");
        };
        assert_eq!(lawlist, PathBuf::from(DEFAULT_LAWLIST_PATH));
        assert_eq!(max_size, DEFAULT_MAX_RESPONSE_SIZE);
    }
}
