//! Command-line interface for the gazette scrapers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use console::style;
use gesetze_harvester::HttpFetcher;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{current_year, YearRange, VKBL_FIRST_YEAR};
use crate::error::Result;
use crate::pages::{collect_partial, IndexPages, Scrape};
use crate::scraper::{update_start_year, BanzPages, BgblPages, VkblPages};
use crate::store::{append_new, load_entries};

/// Scrape gazette tables of contents into JSON dumps.
#[derive(Parser)]
#[command(name = "gesetze-gazette")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Override the site root of the selected gazette
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output file and year bounds shared by all gazettes.
#[derive(Args, Debug)]
pub struct Target {
    /// JSON dump to append to
    pub output: PathBuf,

    /// First year to scrape
    pub minyear: Option<i32>,

    /// Last year to scrape
    #[arg(requires = "minyear")]
    pub maxyear: Option<i32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bundesgesetzblatt, parts I and II.
    Bgbl(Target),

    /// Bundesanzeiger, official part.
    Banz(Target),

    /// Verkehrsblatt.
    Vkbl {
        #[command(flatten)]
        target: Target,

        /// Start at the latest year already in the dump
        #[arg(long, conflicts_with = "minyear")]
        update: bool,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let fetcher = HttpFetcher::new()?;

    match cli.command {
        Commands::Bgbl(target) => {
            let years = YearRange::from_bounds(target.minyear, target.maxyear, YearRange::ALL)?;
            let mut pages = BgblPages::new(fetcher, years);
            if let Some(url) = cli.base_url {
                pages = pages.with_base_url(url);
            }
            scrape_into(&target.output, "BGBl", pages)
        }
        Commands::Banz(target) => {
            let years = YearRange::from_bounds(target.minyear, target.maxyear, YearRange::ALL)?;
            let mut pages = BanzPages::new(fetcher, years);
            if let Some(url) = cli.base_url {
                pages = pages.with_base_url(url);
            }
            scrape_into(&target.output, "BAnz", pages)
        }
        Commands::Vkbl { target, update } => {
            let years = vkbl_years(&target, update)?;
            let mut pages = VkblPages::new(fetcher, years);
            if let Some(url) = cli.base_url {
                pages = pages.with_base_url(url);
            }
            scrape_into(&target.output, "VkBl", pages)
        }
    }
}

fn vkbl_years(target: &Target, update: bool) -> Result<YearRange> {
    let default = YearRange {
        min: VKBL_FIRST_YEAR,
        max: current_year(),
    };
    let years = YearRange::from_bounds(target.minyear, target.maxyear, default)?;
    if !update {
        return Ok(years);
    }
    let start = update_start_year(&load_entries(&target.output)?);
    YearRange::new(start, years.max)
}

/// Scrape everything, append what is new, then report the error that
/// stopped the scrape (if any).
fn scrape_into(output: &Path, name: &str, pages: impl IndexPages) -> Result<()> {
    println!("{} {name}", style("Scraping").bold());

    let spinner = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {pos} entries {msg}")
            .expect("valid template"),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));

    let partial = collect_partial(Scrape::new(pages).inspect(|item| {
        if item.is_ok() {
            spinner.inc(1);
        }
    }));
    spinner.finish_and_clear();

    let scraped = partial.entries.len();
    let appended = append_new(output, partial.entries)?;
    println!(
        "{} {} scraped, {} new in {}",
        style("Done:").green().bold(),
        scraped,
        style(appended).cyan(),
        output.display()
    );

    match partial.error {
        Some(e) => {
            eprintln!("  {} scrape stopped early", style("✗").red());
            Err(e)
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_bgbl_years() {
        let cli = Cli::parse_from(["gesetze-gazette", "bgbl", "data/bgbl.json", "2019", "2020"]);

        let Commands::Bgbl(target) = cli.command else {
            panic!("expected bgbl command");
        };
        assert_eq!(target.output, PathBuf::from("data/bgbl.json"));
        assert_eq!(target.minyear, Some(2019));
        assert_eq!(target.maxyear, Some(2020));
    }

    #[test]
    fn test_cli_vkbl_update_conflicts_with_years() {
        assert!(Cli::try_parse_from(["gesetze-gazette", "vkbl", "v.json", "--update", "2000"]).is_err());

        let cli = Cli::parse_from(["gesetze-gazette", "vkbl", "v.json", "--update"]);
        let Commands::Vkbl { update, .. } = cli.command else {
            panic!("expected vkbl command");
        };
        assert!(update);
    }

    #[test]
    fn test_vkbl_years_update_uses_dump() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("vkbl.json");
        let date = chrono::NaiveDate::from_ymd_opt(2015, 3, 1).unwrap();
        append_new(
            &output,
            vec![crate::GazetteEntry::new(
                crate::GazetteKind::Vkbl,
                "2015-004",
                date,
                "Richtlinie",
                2015,
            )],
        )
        .unwrap();

        let target = Target {
            output,
            minyear: None,
            maxyear: None,
        };
        let years = vkbl_years(&target, true).unwrap();
        assert_eq!(years.min, 2015);
        assert_eq!(years.max, current_year());
        assert_eq!(vkbl_years(&target, false).unwrap().min, VKBL_FIRST_YEAR);
    }
}
