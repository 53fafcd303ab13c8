use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::error::ScrapeError;
use crate::fetch::{ListingRequest, ListingSource, fetch_listing};
use crate::filter::filter_abbreviations;
use crate::merge::build_final_list;
use crate::runtime::ResolvedPaths;
use crate::store::{read_list, read_override_list, write_list};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    Declined,
    Updated(UpdateReport),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub pages_fetched: usize,
    pub raw_candidates: usize,
    pub scraped_abbreviations: usize,
    pub add_entries: usize,
    pub remove_entries: usize,
    pub final_entries: usize,
    pub snapshot_path: PathBuf,
    pub output_path: PathBuf,
}

/// Scrape the listing, merge it with the override lists, and persist both lists.
///
/// `confirmed` is the caller's go-ahead; without it nothing is fetched or
/// written. Every failure leaves both output files as they were.
pub fn run_update<S: ListingSource + ?Sized>(
    paths: &ResolvedPaths,
    request: &ListingRequest,
    source: &mut S,
    confirmed: bool,
) -> Result<UpdateOutcome, ScrapeError> {
    if !confirmed {
        info!("update declined before fetching");
        return Ok(UpdateOutcome::Declined);
    }

    let harvest = fetch_listing(source, request)?;
    let scraped = filter_abbreviations(&harvest.candidates);
    info!(
        pages = harvest.pages_fetched,
        raw = harvest.candidates.len(),
        valid = scraped.len(),
        "listing scraped"
    );
    if scraped.is_empty() {
        return Err(ScrapeError::EmptyResult);
    }

    let mut report = merge_and_persist(paths, &scraped, true)?;
    report.pages_fetched = harvest.pages_fetched;
    report.raw_candidates = harvest.candidates.len();
    Ok(UpdateOutcome::Updated(report))
}

/// Re-apply the override lists to the last saved scrape without touching the network.
pub fn rebuild_from_snapshot(paths: &ResolvedPaths) -> Result<UpdateReport, ScrapeError> {
    let snapshot = read_list(&paths.snapshot_path)?;
    let scraped = filter_abbreviations(&snapshot);
    if scraped.is_empty() {
        return Err(ScrapeError::EmptyResult);
    }
    let report = merge_and_persist(paths, &scraped, false)?;
    Ok(UpdateReport {
        raw_candidates: snapshot.len(),
        ..report
    })
}

// Override lists are read before anything is written so a bad list cannot
// leave a fresh snapshot next to a stale output.
fn merge_and_persist(
    paths: &ResolvedPaths,
    scraped: &[String],
    write_snapshot: bool,
) -> Result<UpdateReport, ScrapeError> {
    let to_add = filter_abbreviations(read_override_list(&paths.add_path)?);
    let to_remove = filter_abbreviations(read_override_list(&paths.remove_path)?);
    let merged = build_final_list(scraped, &to_add, &to_remove);

    if write_snapshot {
        write_list(&paths.snapshot_path, scraped)?;
    }
    write_list(&paths.output_path, &merged)?;
    info!(
        entries = merged.len(),
        output = %paths.output_path.display(),
        "abbreviation list written"
    );

    Ok(UpdateReport {
        scraped_abbreviations: scraped.len(),
        add_entries: to_add.len(),
        remove_entries: to_remove.len(),
        final_entries: merged.len(),
        snapshot_path: paths.snapshot_path.clone(),
        output_path: paths.output_path.clone(),
        ..UpdateReport::default()
    })
}
