//! Acquisition and dataset files: directory scraping, history fetch + cache,
//! per-company writing, combining, and status.

pub mod cache;
pub mod combiner;
pub mod dates;
pub mod directory;
pub mod download;
pub mod history;
pub mod sanitize;
pub mod status;
pub mod writer;

pub use cache::{cache_for, CacheKey, JsonFileCache, NoCache, ResponseCache};
pub use combiner::combine_csvs;
pub use dates::{ensure_payload_date, format_output_date, parse_input_date};
pub use directory::{load_companies_csv, parse_companies_from_html, save_companies_csv, scrape_companies};
pub use download::{
    download_historical_data, CompanyOutcome, DownloadOptions, DownloadProgress, DownloadSummary,
    LogProgress,
};
pub use history::{fetch_historical_data, parse_chart_data};
pub use sanitize::sanitize_filename;
pub use status::{collect_status, DatasetStatus};
pub use writer::{company_file_name, write_company_history};
