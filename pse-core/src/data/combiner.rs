//! Merge per-company dataset files into one combined dataset.

use crate::error::DataError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Header of the combined dataset file.
pub const COMBINED_CSV_HEADER: [&str; 8] = [
    "Symbol", "Company", "Date", "Value", "Open", "Close", "High", "Low",
];

/// Columns copied from each per-company row, in output order after Symbol/Company.
const COPIED_COLUMNS: [&str; 6] = ["Date", "Value", "Open", "Close", "High", "Low"];

/// `*.csv` files directly under `dir`, sorted by path.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>, DataError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(DataError::io(dir, e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| DataError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Split a dataset file stem into `(symbol, company)` on the first `_`.
pub fn split_file_stem(stem: &str) -> Option<(&str, &str)> {
    stem.split_once('_')
}

/// Combine every `*.csv` in `input_dir` into `output_path`.
///
/// With no input files nothing is written and the path is still returned.
/// Files whose stem has no `_` and records that fail to parse are skipped
/// with a warning.
pub fn combine_csvs(input_dir: &Path, output_path: &Path) -> Result<PathBuf, DataError> {
    let files = list_csv_files(input_dir)?;
    if files.is_empty() {
        warn!("No CSV files found in {}", input_dir.display());
        return Ok(output_path.to_path_buf());
    }

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DataError::io(parent, e))?;
    }

    let mut wtr = csv::Writer::from_path(output_path).map_err(|e| DataError::csv(output_path, e))?;
    wtr.write_record(COMBINED_CSV_HEADER)
        .map_err(|e| DataError::csv(output_path, e))?;

    let output_canon = fs::canonicalize(output_path).ok();
    let mut total_rows = 0usize;
    for file in &files {
        if is_same_file(file, output_canon.as_deref()) {
            continue;
        }
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some((symbol, company)) = split_file_stem(&stem) else {
            warn!("Skipping malformed filename: {stem}");
            continue;
        };

        total_rows += append_file(&mut wtr, file, symbol, company, output_path)?;
    }
    wtr.flush().map_err(|e| DataError::io(output_path, e))?;

    info!(
        "All files combined into: {} ({} files, {} rows)",
        output_path.display(),
        files.len(),
        total_rows
    );
    Ok(output_path.to_path_buf())
}

/// `true` when `file` resolves to the already-canonical `target`.
fn is_same_file(file: &Path, target: Option<&Path>) -> bool {
    match (target, fs::canonicalize(file)) {
        (Some(target), Ok(file)) => file == target,
        _ => false,
    }
}

fn append_file(
    wtr: &mut csv::Writer<fs::File>,
    file: &Path,
    symbol: &str,
    company: &str,
    output_path: &Path,
) -> Result<usize, DataError> {
    let mut rdr = match csv::ReaderBuilder::new().flexible(true).from_path(file) {
        Ok(rdr) => rdr,
        Err(e) => {
            warn!("Skipping unreadable file {}: {e}", file.display());
            return Ok(0);
        }
    };
    let headers = match rdr.headers() {
        Ok(headers) => headers.clone(),
        Err(e) => {
            warn!("Skipping {} (unreadable header): {e}", file.display());
            return Ok(0);
        }
    };
    let column = |name: &str| headers.iter().position(|h| h == name);
    let symbol_idx = column("Symbol");
    let copied_idx: Vec<Option<usize>> = COPIED_COLUMNS.iter().map(|&c| column(c)).collect();

    let mut written = 0usize;
    for (line, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping unreadable record {} in {}: {e}", line + 2, file.display());
                continue;
            }
        };
        let field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");

        let row_symbol = field(symbol_idx);
        let mut out = Vec::with_capacity(COMBINED_CSV_HEADER.len());
        out.push(if row_symbol.is_empty() { symbol } else { row_symbol });
        out.push(company);
        out.extend(copied_idx.iter().map(|&idx| field(idx)));

        wtr.write_record(&out)
            .map_err(|e| DataError::csv(output_path, e))?;
        written += 1;
    }
    Ok(written)
}
