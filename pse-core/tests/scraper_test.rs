//! Directory scraping against a scripted transport.

mod common;

use common::{directory_page, mock_client, page_number, MockTransport};
use pse_core::client::HttpResponse;
use pse_core::data::directory::COMPANY_DIRECTORY_REFERER;
use pse_core::data::{load_companies_csv, scrape_companies};
use pse_core::domain::Company;
use pse_core::pipeline::ensure_companies_csv;
use pse_core::DataError;

fn two_page_directory() -> std::sync::Arc<MockTransport> {
    MockTransport::new(|req| {
        let body = match page_number(req) {
            Some(1) => directory_page(&[
                ("111", "222", "Acme Corp", "ACM"),
                ("112", "223", "Banco de Oro", "BDO"),
            ]),
            Some(2) => directory_page(&[("113", "224", "Ayala Land", "ALI")]),
            _ => directory_page(&[]),
        };
        Ok(HttpResponse::new(200, body))
    })
}

#[test]
fn stops_at_first_empty_page() {
    let transport = two_page_directory();
    let client = mock_client(&transport);

    let companies = scrape_companies(&client, None);

    assert_eq!(
        companies,
        vec![
            Company::new("111", "222", "Acme Corp", "ACM"),
            Company::new("112", "223", "Banco de Oro", "BDO"),
            Company::new("113", "224", "Ayala Land", "ALI"),
        ]
    );
    assert_eq!(transport.call_count(), 3);

    let calls = transport.calls();
    let pages: Vec<Option<u32>> = calls.iter().map(page_number).collect();
    assert_eq!(pages, vec![Some(1), Some(2), Some(3)]);
    assert!(calls
        .iter()
        .all(|c| c.header("referer") == Some(COMPANY_DIRECTORY_REFERER)));
}

#[test]
fn max_pages_caps_fetches() {
    let transport = two_page_directory();
    let client = mock_client(&transport);

    let companies = scrape_companies(&client, Some(1));

    assert_eq!(companies.len(), 2);
    assert_eq!(transport.call_count(), 1);
}

#[test]
fn non_200_returns_partial_results() {
    let transport = MockTransport::new(|req| match page_number(req) {
        Some(1) => Ok(HttpResponse::new(
            200,
            directory_page(&[("1", "2", "First", "FST")]),
        )),
        _ => Ok(HttpResponse::new(500, "oops")),
    });
    let client = mock_client(&transport);

    let companies = scrape_companies(&client, None);

    assert_eq!(companies.len(), 1);
    assert_eq!(transport.call_count(), 2);
}

#[test]
fn transport_failure_returns_partial_results() {
    let transport = MockTransport::new(|req| match page_number(req) {
        Some(1) => Ok(HttpResponse::new(
            200,
            directory_page(&[("1", "2", "First", "FST")]),
        )),
        _ => Err(DataError::Transport("connection reset".into())),
    });
    let client = mock_client(&transport);

    assert_eq!(scrape_companies(&client, None).len(), 1);
}

#[test]
fn existing_list_is_reused_without_network() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("companies.csv");

    let transport = two_page_directory();
    let client = mock_client(&transport);

    let first = ensure_companies_csv(&client, &path, false, None).unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(transport.call_count(), 3);

    let second = ensure_companies_csv(&client, &path, false, None).unwrap();
    assert_eq!(second, first);
    assert_eq!(transport.call_count(), 3);
    assert_eq!(load_companies_csv(&path).unwrap(), first);
}

#[test]
fn refresh_rescrapes_the_list() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("companies.csv");
    std::fs::write(&path, "companyId,securityId,companyName,stockSymbol\n9,9,Old,OLD\n").unwrap();

    let transport = two_page_directory();
    let client = mock_client(&transport);

    let companies = ensure_companies_csv(&client, &path, true, Some(2)).unwrap();
    assert_eq!(companies.len(), 3);
    assert_eq!(load_companies_csv(&path).unwrap(), companies);
}
