//! Summary of the local dataset files.

use super::combiner::list_csv_files;
use super::dates::parse_output_date;
use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Format of reported modification times (local time).
pub const STATUS_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompaniesStatus {
    pub path: PathBuf,
    pub exists: bool,
    /// Data rows, header excluded.
    pub rows: Option<usize>,
    pub updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryStatus {
    pub path: PathBuf,
    pub exists: bool,
    pub files: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombinedStatus {
    pub path: PathBuf,
    pub exists: bool,
    pub rows: Option<usize>,
    pub updated: Option<String>,
    /// Earliest and latest parseable `Date`.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetStatus {
    pub companies: CompaniesStatus,
    pub history: HistoryStatus,
    pub combined: CombinedStatus,
}

/// Inspect the three dataset locations. Never fails; unreadable parts are
/// reported as unknown (`None`).
pub fn collect_status(companies_csv: &Path, history_dir: &Path, combined_csv: &Path) -> DatasetStatus {
    let companies_exists = companies_csv.exists();
    let history_exists = history_dir.exists();
    let combined_exists = combined_csv.exists();

    DatasetStatus {
        companies: CompaniesStatus {
            path: companies_csv.to_path_buf(),
            exists: companies_exists,
            rows: companies_exists.then(|| count_csv_rows(companies_csv)).flatten(),
            updated: companies_exists.then(|| format_mtime(companies_csv)).flatten(),
        },
        history: HistoryStatus {
            path: history_dir.to_path_buf(),
            exists: history_exists,
            files: if history_exists {
                list_csv_files(history_dir).map(|f| f.len()).unwrap_or(0)
            } else {
                0
            },
        },
        combined: CombinedStatus {
            path: combined_csv.to_path_buf(),
            exists: combined_exists,
            rows: combined_exists.then(|| count_csv_rows(combined_csv)).flatten(),
            updated: combined_exists.then(|| format_mtime(combined_csv)).flatten(),
            date_range: combined_exists.then(|| combined_date_range(combined_csv)).flatten(),
        },
    }
}

fn format_mtime(path: &Path) -> Option<String> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Local>::from(modified).format(STATUS_TIME_FORMAT).to_string())
}

fn count_csv_rows(path: &Path) -> Option<usize> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .ok()?;
    Some(rdr.byte_records().filter(|r| r.is_ok()).count())
}

fn combined_date_range(path: &Path) -> Option<(NaiveDate, NaiveDate)> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_path(path).ok()?;
    let date_idx = rdr.headers().ok()?.iter().position(|h| h == "Date")?;

    let mut range: Option<(NaiveDate, NaiveDate)> = None;
    for record in rdr.records().flatten() {
        let Some(date) = record.get(date_idx).and_then(parse_output_date) else {
            continue;
        };
        range = Some(match range {
            None => (date, date),
            Some((lo, hi)) => (lo.min(date), hi.max(date)),
        });
    }
    range
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_everything() {
        let dir = tempfile::tempdir().unwrap();
        let status = collect_status(
            &dir.path().join("companies.csv"),
            &dir.path().join("history"),
            &dir.path().join("combined.csv"),
        );
        assert!(!status.companies.exists);
        assert_eq!(status.companies.rows, None);
        assert!(!status.history.exists);
        assert_eq!(status.history.files, 0);
        assert_eq!(status.combined.date_range, None);
    }

    #[test]
    fn counts_rows_files_and_date_range() {
        let dir = tempfile::tempdir().unwrap();
        let companies = dir.path().join("companies.csv");
        fs::write(
            &companies,
            "companyId,securityId,companyName,stockSymbol\n1,2,A,AA\n3,4,B,BB\n",
        )
        .unwrap();

        let history = dir.path().join("history");
        fs::create_dir_all(&history).unwrap();
        fs::write(history.join("AA_A.csv"), "Date\n").unwrap();
        fs::write(history.join("readme.txt"), "").unwrap();

        let combined = dir.path().join("combined.csv");
        fs::write(
            &combined,
            "Symbol,Company,Date,Value,Open,Close,High,Low\n\
             AA,A,15/03/2024,1,1,1,1,1\n\
             AA,A,not-a-date,1,1,1,1,1\n\
             AA,A,02/01/2023,1,1,1,1,1\n",
        )
        .unwrap();

        let status = collect_status(&companies, &history, &combined);
        assert_eq!(status.companies.rows, Some(2));
        assert!(status.companies.updated.is_some());
        assert_eq!(status.history.files, 1);
        assert_eq!(status.combined.rows, Some(3));
        assert_eq!(
            status.combined.date_range,
            Some((
                NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
            ))
        );
    }
}
