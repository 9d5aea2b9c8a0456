//! End-to-end steps: companies list → price history → combined export.

use crate::client::{ClientConfig, PseClient};
use crate::config::{Config, DatasetPaths};
use crate::data::combiner::combine_csvs;
use crate::data::directory::{load_companies_csv, save_companies_csv, scrape_companies};
use crate::data::download::{
    download_historical_data, DownloadOptions, DownloadProgress, DownloadSummary, LogProgress,
};
use crate::domain::Company;
use crate::error::DataError;
use std::path::{Path, PathBuf};
use tracing::info;

/// Reuse the companies list at `path` unless `refresh` is set or it is
/// missing; otherwise scrape the directory and save the result.
pub fn ensure_companies_csv(
    client: &PseClient,
    path: &Path,
    refresh: bool,
    max_pages: Option<u32>,
) -> Result<Vec<Company>, DataError> {
    if path.exists() && !refresh {
        info!("Using existing company list: {}", path.display());
        return load_companies_csv(path);
    }

    info!("Scraping company list...");
    let companies = scrape_companies(client, max_pages);
    save_companies_csv(&companies, path)?;
    Ok(companies)
}

/// Download price history for `companies` with log-line progress.
pub fn download_prices(
    client: &PseClient,
    companies: &[Company],
    options: &DownloadOptions,
) -> Result<DownloadSummary, DataError> {
    download_historical_data(client, companies, options, &LogProgress)
}

/// Merge every per-company file under `history_dir` into `combined_csv`.
pub fn export_prices(history_dir: &Path, combined_csv: &Path) -> Result<PathBuf, DataError> {
    combine_csvs(history_dir, combined_csv)
}

/// Everything a full sync needs.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub paths: DatasetPaths,
    pub rate_limit_seconds: f64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub symbols: Vec<String>,
    pub max_companies: Option<usize>,
    pub cache_dir: Option<PathBuf>,
    pub refresh: bool,
    pub max_pages: Option<u32>,
}

impl SyncSettings {
    pub fn from_config(config: &Config, refresh: bool, max_pages: Option<u32>) -> Self {
        Self {
            paths: config.resolve_paths(),
            rate_limit_seconds: config.rate_limit,
            start_date: config.start_date.clone(),
            end_date: config.end_date.clone(),
            symbols: config.symbols.clone(),
            max_companies: config.max_companies,
            cache_dir: config.cache_dir.clone(),
            refresh,
            max_pages,
        }
    }

    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions {
            output_dir: self.paths.history_dir.clone(),
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            symbols: (!self.symbols.is_empty()).then(|| self.symbols.clone()),
            max_companies: self.max_companies,
            cache_dir: self.cache_dir.clone(),
            refresh: self.refresh,
        }
    }
}

/// What a sync produced.
#[derive(Debug)]
pub struct SyncReport {
    pub companies: usize,
    pub download: DownloadSummary,
    pub combined_csv: PathBuf,
}

/// Build one client and run all three steps.
pub fn sync_data(settings: &SyncSettings) -> Result<SyncReport, DataError> {
    let client = PseClient::new(ClientConfig::with_rate_limit(settings.rate_limit_seconds))?;
    sync_with_client(&client, settings, &LogProgress)
}

/// [`sync_data`] over a caller-supplied client.
pub fn sync_with_client(
    client: &PseClient,
    settings: &SyncSettings,
    progress: &dyn DownloadProgress,
) -> Result<SyncReport, DataError> {
    info!("Step 1: Preparing company list...");
    let companies = ensure_companies_csv(
        client,
        &settings.paths.companies_csv,
        settings.refresh,
        settings.max_pages,
    )?;

    info!("Step 2: Downloading historical data...");
    let download =
        download_historical_data(client, &companies, &settings.download_options(), progress)?;

    info!("Step 3: Exporting combined CSV...");
    let combined_csv = export_prices(&settings.paths.history_dir, &settings.paths.combined_csv)?;

    Ok(SyncReport {
        companies: companies.len(),
        download,
        combined_csv,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_options_follow_settings() {
        let config = Config {
            symbols: vec!["BDO".into()],
            max_companies: Some(2),
            cache_dir: None,
            ..Config::default()
        };

        let settings = SyncSettings::from_config(&config, true, Some(1));
        let opts = settings.download_options();
        assert_eq!(opts.output_dir, PathBuf::from("data/history"));
        assert_eq!(opts.symbols, Some(vec!["BDO".to_string()]));
        assert_eq!(opts.max_companies, Some(2));
        assert!(opts.cache_dir.is_none());
        assert!(opts.refresh);
    }

    #[test]
    fn empty_symbols_mean_no_filter() {
        let settings = SyncSettings::from_config(&Config::default(), false, None);
        assert!(settings.download_options().symbols.is_none());
    }
}
