//! Per-company dataset file writer.

use super::dates::format_output_date;
use crate::domain::{Company, HistoricalPrice};
use crate::error::DataError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Header of every per-company dataset file.
pub const HISTORY_CSV_HEADER: [&str; 7] = ["Date", "Symbol", "Value", "Open", "Close", "High", "Low"];

/// Dataset filename for a company: `{symbol}_{sanitized name}.csv`.
pub fn company_file_name(company: &Company) -> String {
    format!(
        "{}_{}.csv",
        company.stock_symbol,
        super::sanitize::sanitize_filename(&company.company_name)
    )
}

pub fn company_file_path(dir: &Path, company: &Company) -> PathBuf {
    dir.join(company_file_name(company))
}

/// Write `rows` to `path`, replacing any existing file.
///
/// Whether to call this at all (the existence check) is the caller's decision.
pub fn write_company_history(
    path: &Path,
    company: &Company,
    rows: &[HistoricalPrice],
) -> Result<(), DataError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DataError::io(parent, e))?;
    }

    let mut wtr = csv::Writer::from_path(path).map_err(|e| DataError::csv(path, e))?;
    wtr.write_record(HISTORY_CSV_HEADER)
        .map_err(|e| DataError::csv(path, e))?;

    for row in rows {
        let date = format_output_date(row.date);
        wtr.write_record([
            date.as_str(),
            row.symbol.as_str(),
            row.value.as_str(),
            row.open.as_str(),
            row.close.as_str(),
            row.high.as_str(),
            row.low.as_str(),
        ])
        .map_err(|e| DataError::csv(path, e))?;
    }
    wtr.flush().map_err(|e| DataError::io(path, e))?;

    debug!(
        "Wrote {} rows for {} to {}",
        rows.len(),
        company.stock_symbol,
        path.display()
    );
    Ok(())
}
