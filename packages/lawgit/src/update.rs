//! `lawgit update`: refresh the laws repository end to end.

use chrono::Datelike;
use gesetze_gazette::config::{current_year, BANZ_DUMP};
use gesetze_gazette::scraper::BanzPages;
use gesetze_gazette::{append_new, collect_partial, Scrape, YearRange};
use gesetze_harvester::lawlist::load_law_list;
use gesetze_harvester::{convert_tree, BatchReport, Harvester, HarvesterError, HttpFetcher};
use indicatif::ProgressBar;

use crate::commit::Outcome;
use crate::config::UpdateConfig;
use crate::error::Result;
use crate::git_ops::GitRepo;
use crate::reconcile::{autocommit, AutocommitOptions};

/// Steps of an update, for reporting.
#[derive(Debug)]
pub struct UpdateSummary {
    /// New BAnz entries.
    pub gazette_entries: usize,
    pub downloads: BatchReport,
    pub conversions: BatchReport,
    pub outcome: Outcome,
}

impl UpdateSummary {
    /// Items that failed while downloading or converting.
    #[must_use]
    pub fn failed_items(&self) -> usize {
        self.downloads.failures.len() + self.conversions.failures.len()
    }

    /// Batch failures as an error, once everything else is reported.
    pub fn batch_result(&self) -> std::result::Result<(), HarvesterError> {
        let failed = self.failed_items();
        if failed == 0 {
            return Ok(());
        }
        Err(HarvesterError::BatchFailed {
            failed,
            total: self.downloads.total() + self.conversions.total(),
        })
    }
}

/// Pull the laws repository, scrape new BAnz editions, download and convert
/// every law, then autocommit the result.
///
/// A failing scrape stops the update after its partial results are saved;
/// failing downloads or conversions do not.
pub fn update(
    update_config: &UpdateConfig,
    options: &AutocommitOptions,
    progress: &ProgressBar,
) -> Result<UpdateSummary> {
    let (repo, cloned) =
        GitRepo::clone_or_open(&update_config.laws_repository, &update_config.laws_path)?;
    if !cloned {
        repo.pull()?;
    }

    let years = YearRange::new(repo.head_commit_date()?.year(), current_year())?;
    tracing::info!(min = years.min, max = years.max, "scraping BAnz");
    let pages = BanzPages::new(HttpFetcher::new()?, years);
    let partial = collect_partial(Scrape::new(pages));
    let gazette_entries = append_new(&options.config.data_dir.join(BANZ_DUMP), partial.entries)?;
    if let Some(e) = partial.error {
        return Err(e.into());
    }
    tracing::info!(new = gazette_entries, "BAnz entries saved");

    let laws = load_law_list(&options.config.lawlist_path())?;
    progress.set_length(laws.len() as u64);
    let harvester = Harvester::new(HttpFetcher::new()?, &update_config.raw_xml_path);
    let downloads = harvester.loadall(&laws, progress)?;
    progress.finish_and_clear();
    tracing::info!(
        succeeded = downloads.succeeded.len(),
        failed = downloads.failures.len(),
        "laws downloaded"
    );

    let conversions = convert_tree(&update_config.raw_xml_path, &update_config.laws_path)?;
    tracing::info!(
        succeeded = conversions.succeeded.len(),
        failed = conversions.failures.len(),
        "laws converted"
    );

    let outcome = autocommit(&repo, options)?;
    Ok(UpdateSummary {
        gazette_entries,
        downloads,
        conversions,
        outcome,
    })
}
