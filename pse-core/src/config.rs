//! `pse.toml` configuration.
//!
//! Every key is optional. Relative paths are resolved against the directory
//! holding the config file, so a project can be run from anywhere. Derived
//! dataset paths (`companies.csv`, `history/`, `combined.csv`) sit under
//! `data_dir` unless given explicitly.

use crate::client::{DEFAULT_RATE_LIMIT_SECS, MAX_RATE_LIMIT_SECS};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_NAME: &str = "pse.toml";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_CACHE_DIR: &str = ".cache";

/// Template written by [`write_default_config`].
pub const DEFAULT_CONFIG_TEXT: &str = r#"# PSE EDGE data configuration

[paths]
# Root data directory (derived files live below this).
data_dir = "data"

# Optional explicit paths (override data_dir defaults).
# companies_csv = "data/companies.csv"
# history_dir = "data/history"
# combined_csv = "data/combined.csv"

# Response cache; set to "" or false to disable.
cache_dir = ".cache"

[network]
# Minimum seconds between requests (0 disables).
rate_limit = 0.6

[download]
# start_date = "1900-01-01"
# end_date = "2024-12-31"
# symbols = ["BDO", "ALI"]
# max_companies = 0
"#;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolved settings. Explicit dataset paths stay `None` until
/// [`Config::resolve_paths`] derives them.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub companies_csv: Option<PathBuf>,
    pub history_dir: Option<PathBuf>,
    pub combined_csv: Option<PathBuf>,
    /// `None` disables the response cache.
    pub cache_dir: Option<PathBuf>,
    pub rate_limit: f64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Upper-cased; empty means every company.
    pub symbols: Vec<String>,
    pub max_companies: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            companies_csv: None,
            history_dir: None,
            combined_csv: None,
            cache_dir: Some(PathBuf::from(DEFAULT_CACHE_DIR)),
            rate_limit: DEFAULT_RATE_LIMIT_SECS,
            start_date: None,
            end_date: None,
            symbols: Vec::new(),
            max_companies: None,
        }
    }
}

/// The three dataset locations, all concrete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetPaths {
    pub companies_csv: PathBuf,
    pub history_dir: PathBuf,
    pub combined_csv: PathBuf,
}

/// Command-line values layered over a loaded [`Config`].
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub companies_csv: Option<PathBuf>,
    pub history_dir: Option<PathBuf>,
    pub combined_csv: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub no_cache: bool,
    pub rate_limit: Option<f64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Comma-separated list, as typed.
    pub symbols: Option<String>,
    pub max_companies: Option<i64>,
}

impl Config {
    /// Dataset paths with `data_dir` defaults filled in.
    pub fn resolve_paths(&self) -> DatasetPaths {
        DatasetPaths {
            companies_csv: self
                .companies_csv
                .clone()
                .unwrap_or_else(|| self.data_dir.join("companies.csv")),
            history_dir: self
                .history_dir
                .clone()
                .unwrap_or_else(|| self.data_dir.join("history")),
            combined_csv: self
                .combined_csv
                .clone()
                .unwrap_or_else(|| self.data_dir.join("combined.csv")),
        }
    }

    /// Apply command-line overrides. A new `data_dir` drops derived paths that
    /// were not also given on the command line.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(data_dir) = &overrides.data_dir {
            self.data_dir = data_dir.clone();
            self.companies_csv = None;
            self.history_dir = None;
            self.combined_csv = None;
        }
        if let Some(path) = &overrides.companies_csv {
            self.companies_csv = Some(path.clone());
        }
        if let Some(path) = &overrides.history_dir {
            self.history_dir = Some(path.clone());
        }
        if let Some(path) = &overrides.combined_csv {
            self.combined_csv = Some(path.clone());
        }
        if let Some(path) = &overrides.cache_dir {
            self.cache_dir = Some(path.clone());
        }
        if overrides.no_cache {
            self.cache_dir = None;
        }
        if let Some(rate) = overrides.rate_limit {
            self.rate_limit = check_rate_limit("--rate-limit", rate)?;
        }
        if let Some(start) = overrides.start_date.as_deref().filter(|s| !s.is_empty()) {
            self.start_date = Some(start.to_string());
        }
        if let Some(end) = overrides.end_date.as_deref().filter(|s| !s.is_empty()) {
            self.end_date = Some(end.to_string());
        }
        if let Some(symbols) = &overrides.symbols {
            self.symbols = parse_symbol_list(symbols);
        }
        if let Some(max) = overrides.max_companies {
            self.max_companies = positive(max);
        }
        Ok(())
    }
}

/// Split a comma-separated symbol list, trimming and upper-casing, dropping blanks.
pub fn parse_symbol_list(text: &str) -> Vec<String> {
    normalize_symbols(text.split(','))
}

fn normalize_symbols<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    items
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_uppercase)
        .collect()
}

fn positive(value: i64) -> Option<usize> {
    usize::try_from(value).ok().filter(|&v| v > 0)
}

// ── On-disk shape ─────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    paths: RawPaths,
    network: RawNetwork,
    download: RawDownload,
    /// Accepted at top level when `[network]` does not set it.
    rate_limit: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPaths {
    data_dir: Option<PathBuf>,
    companies_csv: Option<PathBuf>,
    history_dir: Option<PathBuf>,
    combined_csv: Option<PathBuf>,
    cache_dir: Option<CacheSetting>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CacheSetting {
    Toggle(bool),
    Dir(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawNetwork {
    rate_limit: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDownload {
    start_date: Option<toml::Value>,
    end_date: Option<toml::Value>,
    symbols: Option<SymbolSetting>,
    max_companies: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SymbolSetting {
    List(Vec<String>),
    Csv(String),
}

fn check_rate_limit(key: &'static str, rate: f64) -> Result<f64, ConfigError> {
    if rate.is_finite() && (0.0..=MAX_RATE_LIMIT_SECS).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::Invalid {
            key,
            message: format!("must be between 0 and {MAX_RATE_LIMIT_SECS} seconds, got {rate}"),
        })
    }
}

fn resolve_path(path: PathBuf, base_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

fn date_text(key: &'static str, value: toml::Value) -> Result<Option<String>, ConfigError> {
    match value {
        toml::Value::String(s) if s.trim().is_empty() => Ok(None),
        toml::Value::String(s) => Ok(Some(s.trim().to_string())),
        toml::Value::Datetime(dt) => Ok(Some(dt.to_string())),
        other => Err(ConfigError::Invalid {
            key,
            message: format!("expected a date string, got {}", other.type_str()),
        }),
    }
}

/// Parse config text. `base_dir` anchors relative paths.
pub fn parse_config(content: &str, base_dir: &Path, source: &Path) -> Result<Config, ConfigError> {
    let raw: RawConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
        path: source.to_path_buf(),
        source: e,
    })?;

    let mut config = Config::default();
    let paths = raw.paths;

    config.data_dir = resolve_path(
        paths.data_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        base_dir,
    );
    config.companies_csv = paths.companies_csv.map(|p| resolve_path(p, base_dir));
    config.history_dir = paths.history_dir.map(|p| resolve_path(p, base_dir));
    config.combined_csv = paths.combined_csv.map(|p| resolve_path(p, base_dir));
    config.cache_dir = match paths.cache_dir {
        None | Some(CacheSetting::Toggle(true)) => {
            Some(resolve_path(PathBuf::from(DEFAULT_CACHE_DIR), base_dir))
        }
        Some(CacheSetting::Toggle(false)) => None,
        Some(CacheSetting::Dir(dir)) if dir.trim().is_empty() => None,
        Some(CacheSetting::Dir(dir)) => Some(resolve_path(PathBuf::from(dir), base_dir)),
    };

    if let Some(rate) = raw.network.rate_limit.or(raw.rate_limit) {
        config.rate_limit = check_rate_limit("network.rate_limit", rate)?;
    }

    let download = raw.download;
    if let Some(value) = download.start_date {
        config.start_date = date_text("download.start_date", value)?;
    }
    if let Some(value) = download.end_date {
        config.end_date = date_text("download.end_date", value)?;
    }
    config.symbols = match download.symbols {
        Some(SymbolSetting::List(items)) => normalize_symbols(items.iter().map(String::as_str)),
        Some(SymbolSetting::Csv(text)) => parse_symbol_list(&text),
        None => Vec::new(),
    };
    config.max_companies = download.max_companies.and_then(positive);

    Ok(config)
}

/// Locate the config file.
///
/// An explicit path must exist. Without one, `./pse.toml` is used when present.
pub fn find_config(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    match path {
        Some(p) if p.exists() => Ok(Some(p.to_path_buf())),
        Some(p) => Err(ConfigError::NotFound(p.to_path_buf())),
        None => {
            let candidate = PathBuf::from(DEFAULT_CONFIG_NAME);
            Ok(candidate.exists().then_some(candidate))
        }
    }
}

/// Load configuration, falling back to defaults when no file is found.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let Some(config_path) = find_config(path)? else {
        return Ok(Config::default());
    };

    let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Read {
        path: config_path.clone(),
        source: e,
    })?;
    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    parse_config(&content, &base_dir, &config_path)
}

/// Write [`DEFAULT_CONFIG_TEXT`] to `path`. Returns `false` when the file
/// already exists and `force` is not set.
pub fn write_default_config(path: &Path, force: bool) -> Result<bool, ConfigError> {
    if path.exists() && !force {
        return Ok(false);
    }
    let write_err = |e| ConfigError::Write {
        path: path.to_path_buf(),
        source: e,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, DEFAULT_CONFIG_TEXT).map_err(write_err)?;
    Ok(true)
}
