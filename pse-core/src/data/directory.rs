//! Company directory scraper and companies list persistence.
//!
//! The directory pages have no formal contract, so parsing is lossy: any row
//! that does not look like a company row is skipped and the rest are kept.
//! Markup changes degrade the result instead of halting the pipeline.

use crate::client::{PseClient, RequestOptions};
use crate::domain::Company;
use crate::error::DataError;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub const COMPANY_DIRECTORY_URL: &str = "https://edge.pse.com.ph/companyDirectory/search.ax";
pub const COMPANY_DIRECTORY_REFERER: &str = "https://edge.pse.com.ph/companyDirectory/form.do";

/// Header of the companies list CSV.
pub const COMPANIES_CSV_HEADER: [&str; 4] = ["companyId", "securityId", "companyName", "stockSymbol"];

static ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.list tbody tr").expect("row selector is valid"));
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("cell selector is valid"));
static ANCHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a").expect("anchor selector is valid"));
static CM_DETAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"cmDetail\('(\d+)',\s*'(\d+)'\)").expect("cmDetail pattern is valid")
});

pub fn directory_page_url(page: u32) -> String {
    format!("{COMPANY_DIRECTORY_URL}?pageNo={page}")
}

/// Extract every well-formed company row from one directory page.
pub fn parse_companies_from_html(page_html: &str) -> Vec<Company> {
    let doc = Html::parse_document(page_html);
    doc.select(&ROW).filter_map(parse_row).collect()
}

fn parse_row(row: ElementRef<'_>) -> Option<Company> {
    let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
    if cells.len() < 2 {
        return None;
    }

    let name_anchor = cells[0].select(&ANCHOR).next()?;
    let symbol_anchor = cells[1].select(&ANCHOR).next()?;

    let onclick = name_anchor.value().attr("onclick").unwrap_or("");
    let caps = CM_DETAIL.captures(onclick)?;

    let symbol = anchor_text(symbol_anchor);
    if symbol.is_empty() {
        return None;
    }

    Some(Company {
        company_id: caps[1].to_string(),
        security_id: caps[2].to_string(),
        company_name: anchor_text(name_anchor),
        stock_symbol: symbol,
    })
}

fn anchor_text(anchor: ElementRef<'_>) -> String {
    anchor.text().collect::<String>().trim().to_string()
}

/// Walk directory pages from 1 until a page has no rows, a fetch fails, or
/// `max_pages` is reached.
///
/// Never fails: a transport error or non-200 status ends pagination and the
/// companies gathered so far are returned.
pub fn scrape_companies(client: &PseClient, max_pages: Option<u32>) -> Vec<Company> {
    let mut all_companies = Vec::new();
    let mut page = 1u32;

    loop {
        if max_pages.is_some_and(|max| page > max) {
            break;
        }

        info!("Fetching page {page}");
        let options = RequestOptions::new().header("Referer", COMPANY_DIRECTORY_REFERER);
        let response = match client.get(&directory_page_url(page), options) {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Failed to fetch page {page}: {e}");
                break;
            }
        };
        if response.status != 200 {
            warn!("Failed to fetch page {page} (status {})", response.status);
            break;
        }

        let new_rows = parse_companies_from_html(&response.body);
        if new_rows.is_empty() {
            info!("No more data. Scraping complete.");
            break;
        }

        all_companies.extend(new_rows);
        page += 1;
    }

    all_companies
}

/// Write the companies list CSV, header included even when empty.
pub fn save_companies_csv(companies: &[Company], path: &Path) -> Result<(), DataError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DataError::io(parent, e))?;
    }

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| DataError::csv(path, e))?;
    wtr.write_record(COMPANIES_CSV_HEADER)
        .map_err(|e| DataError::csv(path, e))?;
    for company in companies {
        wtr.serialize(company).map_err(|e| DataError::csv(path, e))?;
    }
    wtr.flush().map_err(|e| DataError::io(path, e))?;

    info!("Saved {} companies to {}", companies.len(), path.display());
    Ok(())
}

/// Read a companies list CSV written by [`save_companies_csv`].
pub fn load_companies_csv(path: &Path) -> Result<Vec<Company>, DataError> {
    let mut rdr = csv::Reader::from_path(path).map_err(|e| DataError::csv(path, e))?;
    rdr.deserialize()
        .collect::<Result<Vec<Company>, _>>()
        .map_err(|e| DataError::csv(path, e))
}
