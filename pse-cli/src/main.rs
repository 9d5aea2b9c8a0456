//! PSE CLI: companies, prices, export, sync and status commands.
//!
//! Commands:
//! - `init`: write a commented `pse.toml`
//! - `sync`: refresh the companies list, download prices, export the combined CSV
//! - `companies`: scrape or reuse the companies list, optionally print it
//! - `prices`: download per-company price history
//! - `export`: merge per-company files into one CSV
//! - `status`: report what is on disk

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pse_core::client::{ClientConfig, PseClient};
use pse_core::config::{
    load_config, write_default_config, Config, ConfigOverrides, DEFAULT_CONFIG_NAME,
};
use pse_core::data::{collect_status, parse_input_date, DatasetStatus, DownloadSummary};
use pse_core::pipeline::{
    download_prices, ensure_companies_csv, export_prices, sync_data, SyncSettings,
};
use std::path::{Path, PathBuf};
use tracing::{error, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Exit status for configuration-level failures.
const EXIT_CONFIG: i32 = 2;

#[derive(Parser)]
#[command(name = "pse", version, about = "PSE EDGE data scraper")]
struct Cli {
    /// Path to pse.toml (default: ./pse.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,

    /// Only show warnings and errors.
    #[arg(long, global = true, default_value_t = false, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default config file.
    Init {
        /// Config file path.
        #[arg(long, default_value = DEFAULT_CONFIG_NAME)]
        path: PathBuf,

        /// Overwrite if it exists.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Refresh companies, prices, and the combined export.
    Sync {
        #[command(flatten)]
        paths: DatasetArgs,

        #[command(flatten)]
        download: DownloadArgs,

        #[command(flatten)]
        scrape: ScrapeArgs,
    },
    /// Refresh or list companies.
    Companies {
        /// Root data directory.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Companies CSV path.
        #[arg(long, alias = "output")]
        companies: Option<PathBuf>,

        /// Seconds between requests.
        #[arg(long)]
        rate_limit: Option<f64>,

        #[command(flatten)]
        scrape: ScrapeArgs,

        /// Print the company list.
        #[arg(long, default_value_t = false)]
        list: bool,
    },
    /// Download historical prices.
    Prices {
        /// Root data directory.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Companies CSV path.
        #[arg(long, alias = "input")]
        companies: Option<PathBuf>,

        /// History data directory.
        #[arg(long, alias = "output-dir")]
        history_dir: Option<PathBuf>,

        #[command(flatten)]
        download: DownloadArgs,

        #[command(flatten)]
        scrape: ScrapeArgs,
    },
    /// Export the combined dataset.
    Export {
        /// Root data directory.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// History data directory.
        #[arg(long)]
        history_dir: Option<PathBuf>,

        /// Combined CSV path.
        #[arg(long, alias = "output")]
        combined: Option<PathBuf>,

        /// Export format (csv).
        #[arg(long, default_value = "csv")]
        format: String,
    },
    /// Show local dataset status.
    Status {
        #[command(flatten)]
        paths: DatasetArgs,
    },
}

#[derive(Args)]
struct DatasetArgs {
    /// Root data directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Companies CSV path.
    #[arg(long, alias = "output")]
    companies: Option<PathBuf>,

    /// History data directory.
    #[arg(long, alias = "output-dir")]
    history_dir: Option<PathBuf>,

    /// Combined CSV path.
    #[arg(long)]
    combined: Option<PathBuf>,
}

#[derive(Args)]
struct DownloadArgs {
    /// Cache folder.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Disable caching.
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    /// Seconds between requests.
    #[arg(long)]
    rate_limit: Option<f64>,

    /// Comma-separated stock symbols to download.
    #[arg(long)]
    symbols: Option<String>,

    /// Start date (YYYY-MM-DD or MM-DD-YYYY).
    #[arg(long = "from", alias = "start-date")]
    start_date: Option<String>,

    /// End date (YYYY-MM-DD or MM-DD-YYYY).
    #[arg(long = "to", alias = "end-date")]
    end_date: Option<String>,

    /// Limit number of companies (0 for no limit).
    #[arg(long)]
    max_companies: Option<i64>,
}

#[derive(Args)]
struct ScrapeArgs {
    /// Limit number of directory pages.
    #[arg(long)]
    max_pages: Option<u32>,

    /// Refresh companies and prices.
    #[arg(long, default_value_t = false)]
    refresh: bool,
}

impl DownloadArgs {
    fn apply(&self, overrides: &mut ConfigOverrides) {
        overrides.cache_dir = self.cache_dir.clone();
        overrides.no_cache = self.no_cache;
        overrides.rate_limit = self.rate_limit;
        overrides.symbols = self.symbols.clone();
        overrides.start_date = self.start_date.clone();
        overrides.end_date = self.end_date.clone();
        overrides.max_companies = self.max_companies;
    }
}

impl DatasetArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            data_dir: self.data_dir.clone(),
            companies_csv: self.companies.clone(),
            history_dir: self.history_dir.clone(),
            combined_csv: self.combined.clone(),
            ..Default::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init { path, force } => run_init(&path, force),
        Commands::Sync {
            paths,
            download,
            scrape,
        } => {
            let mut overrides = paths.overrides();
            download.apply(&mut overrides);
            run_sync(resolve_config(config_path, &overrides), &scrape)
        }
        Commands::Companies {
            data_dir,
            companies,
            rate_limit,
            scrape,
            list,
        } => {
            let overrides = ConfigOverrides {
                data_dir,
                companies_csv: companies,
                rate_limit,
                ..Default::default()
            };
            run_companies(resolve_config(config_path, &overrides), &scrape, list)
        }
        Commands::Prices {
            data_dir,
            companies,
            history_dir,
            download,
            scrape,
        } => {
            let mut overrides = ConfigOverrides {
                data_dir,
                companies_csv: companies,
                history_dir,
                ..Default::default()
            };
            download.apply(&mut overrides);
            run_prices(resolve_config(config_path, &overrides), &scrape)
        }
        Commands::Export {
            data_dir,
            history_dir,
            combined,
            format,
        } => {
            let overrides = ConfigOverrides {
                data_dir,
                history_dir,
                combined_csv: combined,
                ..Default::default()
            };
            run_export(resolve_config(config_path, &overrides), &format)
        }
        Commands::Status { paths } => {
            run_status(resolve_config(config_path, &paths.overrides()));
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Load config and layer the command-line overrides on top. Config problems
/// end the process with [`EXIT_CONFIG`].
fn resolve_config(path: Option<&Path>, overrides: &ConfigOverrides) -> Config {
    let loaded = load_config(path).and_then(|mut config| {
        config.apply_overrides(overrides)?;
        Ok(config)
    });
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(EXIT_CONFIG);
        }
    };

    for (flag, value) in [("start", &config.start_date), ("end", &config.end_date)] {
        if let Some(text) = value {
            if parse_input_date(text).is_none() {
                warn!("Unrecognized {flag} date '{text}'; sending it unchanged");
            }
        }
    }
    config
}

fn build_client(config: &Config) -> Result<PseClient> {
    PseClient::new(ClientConfig::with_rate_limit(config.rate_limit))
        .context("failed to build HTTP client")
}

fn run_init(path: &Path, force: bool) -> Result<()> {
    let created = match write_default_config(path, force) {
        Ok(created) => created,
        Err(e) => {
            error!("{e}");
            std::process::exit(EXIT_CONFIG);
        }
    };
    if created {
        println!("Created config at {}", path.display());
    } else {
        println!("Config already exists: {}", path.display());
    }
    Ok(())
}

fn run_sync(config: Config, scrape: &ScrapeArgs) -> Result<()> {
    let settings = SyncSettings::from_config(&config, scrape.refresh, scrape.max_pages);
    let report = sync_data(&settings).context("sync failed")?;

    println!("Companies: {}", report.companies);
    print_download_summary(&report.download);
    println!("Combined CSV: {}", report.combined_csv.display());
    Ok(())
}

fn run_companies(config: Config, scrape: &ScrapeArgs, list: bool) -> Result<()> {
    let paths = config.resolve_paths();
    let client = build_client(&config)?;
    let companies = ensure_companies_csv(
        &client,
        &paths.companies_csv,
        scrape.refresh,
        scrape.max_pages,
    )
    .with_context(|| format!("failed to prepare {}", paths.companies_csv.display()))?;

    if list {
        for company in &companies {
            println!("{}\t{}", company.stock_symbol, company.company_name);
        }
    }
    Ok(())
}

fn run_prices(config: Config, scrape: &ScrapeArgs) -> Result<()> {
    let settings = SyncSettings::from_config(&config, scrape.refresh, scrape.max_pages);
    let client = build_client(&config)?;
    let companies = ensure_companies_csv(
        &client,
        &settings.paths.companies_csv,
        scrape.refresh,
        scrape.max_pages,
    )
    .with_context(|| format!("failed to prepare {}", settings.paths.companies_csv.display()))?;

    let summary = download_prices(&client, &companies, &settings.download_options())
        .context("price download failed")?;
    print_download_summary(&summary);
    Ok(())
}

fn run_export(config: Config, format: &str) -> Result<()> {
    if !format.eq_ignore_ascii_case("csv") {
        error!("Only CSV export is supported right now.");
        std::process::exit(EXIT_CONFIG);
    }
    let paths = config.resolve_paths();
    export_prices(&paths.history_dir, &paths.combined_csv)
        .with_context(|| format!("failed to export {}", paths.combined_csv.display()))?;
    Ok(())
}

fn run_status(config: Config) {
    let paths = config.resolve_paths();
    let status = collect_status(&paths.companies_csv, &paths.history_dir, &paths.combined_csv);
    print_status(&status);
}

fn print_download_summary(summary: &DownloadSummary) {
    println!(
        "Prices: {} processed, {} written, {} already present, {} without data, {} failed",
        summary.processed,
        summary.written,
        summary.already_present,
        summary.empty,
        summary.failures.len()
    );
    for (symbol, err) in &summary.failures {
        eprintln!("  {symbol}: {err}");
    }
}

fn or_unknown<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map_or_else(|| "unknown".to_string(), ToString::to_string)
}

fn print_status(status: &DatasetStatus) {
    let companies = &status.companies;
    if companies.exists {
        println!(
            "Companies CSV: {} (rows={}, updated={})",
            companies.path.display(),
            or_unknown(&companies.rows),
            or_unknown(&companies.updated)
        );
    } else {
        println!("Companies CSV: missing ({})", companies.path.display());
    }

    let history = &status.history;
    if history.exists {
        println!("History dir: {} (files={})", history.path.display(), history.files);
    } else {
        println!("History dir: missing ({})", history.path.display());
    }

    let combined = &status.combined;
    if combined.exists {
        let range = combined
            .date_range
            .map_or_else(|| "unknown".to_string(), |(lo, hi)| format!("{lo} to {hi}"));
        println!(
            "Combined CSV: {} (rows={}, updated={}, range={range})",
            combined.path.display(),
            or_unknown(&combined.rows),
            or_unknown(&combined.updated)
        );
    } else {
        println!("Combined CSV: missing ({})", combined.path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_accepts_legacy_output_spellings() {
        let cli = Cli::try_parse_from([
            "pse",
            "sync",
            "--output",
            "list.csv",
            "--output-dir",
            "prices",
            "--start-date",
            "2024-01-01",
        ])
        .unwrap();
        let Commands::Sync { paths, download, .. } = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(paths.companies, Some(PathBuf::from("list.csv")));
        assert_eq!(paths.history_dir, Some(PathBuf::from("prices")));
        assert_eq!(download.start_date.as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["pse", "--quiet", "--verbose", "status"]).is_err());
    }
}
