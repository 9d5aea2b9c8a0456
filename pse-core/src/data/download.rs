//! Download orchestrator: per-company history loop with progress reporting.
//!
//! Each company is an independent target. A failed fetch is recorded and the
//! loop moves on; partial completion is the expected steady state under a
//! flaky network. Only a failure to write the output aborts the batch.

use super::cache::cache_for;
use super::dates::{ensure_payload_date, DEFAULT_START_DATE};
use super::history::fetch_historical_data;
use super::writer::{company_file_path, write_company_history};
use crate::client::PseClient;
use crate::domain::Company;
use crate::error::DataError;
use chrono::Local;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{info, warn};

/// What to download and where.
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    pub output_dir: PathBuf,
    /// Start of the range; defaults to [`DEFAULT_START_DATE`].
    pub start_date: Option<String>,
    /// End of the range; defaults to today.
    pub end_date: Option<String>,
    /// Case-insensitive symbol allow-list. `None` or empty means all.
    pub symbols: Option<Vec<String>>,
    /// Cap on companies processed after symbol filtering.
    pub max_companies: Option<usize>,
    /// Response cache directory; `None` disables caching.
    pub cache_dir: Option<PathBuf>,
    /// Re-fetch even when the dataset file or cache entry exists.
    pub refresh: bool,
}

/// Result for a single company.
#[derive(Debug)]
pub enum CompanyOutcome {
    /// Fetched and written.
    Saved(PathBuf),
    /// Dataset file already present; nothing fetched.
    AlreadyPresent(PathBuf),
    /// Fetched, but no valid rows; nothing written.
    NoData,
    /// Fetch failed; recorded and skipped.
    Failed(DataError),
}

/// Summary of a batch download.
#[derive(Debug, Default)]
pub struct DownloadSummary {
    /// Companies that passed the filter and the cap.
    pub processed: usize,
    /// Dataset files that now exist for processed companies, in order.
    pub paths: Vec<PathBuf>,
    pub written: usize,
    pub already_present: usize,
    pub empty: usize,
    pub failures: Vec<(String, DataError)>,
}

impl DownloadSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, company: &Company, outcome: CompanyOutcome) {
        match outcome {
            CompanyOutcome::Saved(path) => {
                self.written += 1;
                self.paths.push(path);
            }
            CompanyOutcome::AlreadyPresent(path) => {
                self.already_present += 1;
                self.paths.push(path);
            }
            CompanyOutcome::NoData => self.empty += 1,
            CompanyOutcome::Failed(e) => self.failures.push((company.stock_symbol.clone(), e)),
        }
    }
}

/// Progress callback for the per-company loop.
pub trait DownloadProgress: Send {
    /// Called before a company is checked or fetched. `index` is 1-based.
    fn on_start(&self, company: &Company, index: usize);

    /// Called once the company's outcome is known.
    fn on_complete(&self, company: &Company, index: usize, outcome: &CompanyOutcome);

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, summary: &DownloadSummary);
}

/// Reports progress as log lines, one per company.
pub struct LogProgress;

impl DownloadProgress for LogProgress {
    fn on_start(&self, _company: &Company, _index: usize) {}

    fn on_complete(&self, company: &Company, index: usize, outcome: &CompanyOutcome) {
        match outcome {
            CompanyOutcome::AlreadyPresent(path) => {
                info!("Skipping {} (already exists)", path.display())
            }
            CompanyOutcome::Saved(path) => info!(
                "[{index}] {} {} {}: saved {}",
                company.stock_symbol,
                company.company_id,
                company.company_name,
                path.display()
            ),
            CompanyOutcome::NoData => info!("[{index}] No data for {}", company.company_name),
            CompanyOutcome::Failed(e) => {
                warn!("[{index}] Request failed for {}: {e}", company.company_name)
            }
        }
    }

    fn on_batch_complete(&self, summary: &DownloadSummary) {
        info!(
            "Download complete: {} processed, {} written, {} already present, {} without data, {} failed",
            summary.processed,
            summary.written,
            summary.already_present,
            summary.empty,
            summary.failures.len()
        );
    }
}

/// Companies eligible for download: symbol filter first, then the cap.
pub fn select_companies<'a>(
    companies: &'a [Company],
    symbols: Option<&[String]>,
    max_companies: Option<usize>,
) -> Vec<&'a Company> {
    let symbol_set: Option<HashSet<String>> = symbols
        .filter(|s| !s.is_empty())
        .map(|s| s.iter().map(|sym| sym.trim().to_uppercase()).collect());

    companies
        .iter()
        .filter(|c| {
            symbol_set
                .as_ref()
                .map_or(true, |set| set.contains(&c.symbol_key()))
        })
        .take(max_companies.unwrap_or(usize::MAX))
        .collect()
}

/// Fetch and write price history for every eligible company.
///
/// Per-company fetch failures are collected in the summary. Returns `Err` only
/// when a dataset file cannot be written.
pub fn download_historical_data(
    client: &PseClient,
    companies: &[Company],
    options: &DownloadOptions,
    progress: &dyn DownloadProgress,
) -> Result<DownloadSummary, DataError> {
    let cache = cache_for(options.cache_dir.as_deref());
    let start = ensure_payload_date(options.start_date.as_deref().unwrap_or(DEFAULT_START_DATE));
    let end = match options.end_date.as_deref() {
        Some(text) => ensure_payload_date(text),
        None => ensure_payload_date(&Local::now().date_naive()),
    };

    let selected = select_companies(
        companies,
        options.symbols.as_deref(),
        options.max_companies,
    );

    let mut summary = DownloadSummary::default();

    for (i, company) in selected.into_iter().enumerate() {
        let index = i + 1;
        summary.processed += 1;
        progress.on_start(company, index);

        let output_path = company_file_path(&options.output_dir, company);

        let outcome = if output_path.exists() && !options.refresh {
            CompanyOutcome::AlreadyPresent(output_path)
        } else {
            match fetch_historical_data(
                client,
                company,
                &start,
                &end,
                cache.as_ref(),
                options.refresh,
            ) {
                Ok(rows) if rows.is_empty() => CompanyOutcome::NoData,
                Ok(rows) => {
                    write_company_history(&output_path, company, &rows)?;
                    CompanyOutcome::Saved(output_path)
                }
                Err(e) => CompanyOutcome::Failed(e),
            }
        };

        progress.on_complete(company, index, &outcome);
        summary.record(company, outcome);
    }

    progress.on_batch_complete(&summary);
    Ok(summary)
}
