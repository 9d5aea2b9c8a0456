//! Historical price fetcher.
//!
//! One POST per company and date range, optionally served from or stored to a
//! [`ResponseCache`]. Items that fail to parse are dropped one by one; only a
//! payload that cannot be read at the top level fails the fetch.

use super::cache::{CacheKey, ResponseCache};
use super::dates::ensure_payload_date;
use crate::client::{PseClient, RequestOptions};
use crate::domain::{Company, HistoricalPrice};
use crate::error::DataError;
use serde_json::{json, Value};
use tracing::{debug, warn};

pub const HISTORICAL_DATA_URL: &str = "https://edge.pse.com.ph/common/DisclosureCht.ax";
pub const HISTORICAL_DATA_REFERER: &str = "https://edge.pse.com.ph/companyPage/stockData.do";

/// JSON body of a history request. Dates must already be payload-formatted.
pub fn history_payload(company: &Company, start_date: &str, end_date: &str) -> Value {
    json!({
        "cmpy_id": company.company_id,
        "security_id": company.security_id,
        "startDate": start_date,
        "endDate": end_date,
    })
}

/// Fetch and parse one company's price history for `[start_date, end_date]`.
///
/// With `refresh == false` a cache hit skips the network entirely. A cached
/// payload that no longer parses counts as a miss. Only payloads that parse
/// are written back; a failed cache write is logged and ignored.
pub fn fetch_historical_data(
    client: &PseClient,
    company: &Company,
    start_date: &str,
    end_date: &str,
    cache: &dyn ResponseCache,
    refresh: bool,
) -> Result<Vec<HistoricalPrice>, DataError> {
    let start = ensure_payload_date(start_date);
    let end = ensure_payload_date(end_date);
    let key = CacheKey::new(company, &start, &end);

    if !refresh {
        if let Some(payload) = cache.try_read(&key) {
            match parse_chart_data(&payload, &company.stock_symbol) {
                Ok(rows) => return Ok(rows),
                Err(e) => debug!("Ignoring cache file {}: {e}", key.file_name()),
            }
        }
    }

    let options = RequestOptions::new()
        .header("Referer", HISTORICAL_DATA_REFERER)
        .header("X-Requested-With", "XMLHttpRequest")
        .json(history_payload(company, &start, &end));
    let payload = client
        .post(HISTORICAL_DATA_URL, options)?
        .error_for_status(HISTORICAL_DATA_URL)?
        .json()?;

    let rows = parse_chart_data(&payload, &company.stock_symbol)?;

    if cache.is_enabled() {
        if let Err(e) = cache.write(&key, &payload) {
            warn!("Failed to write cache file {}: {e}", key.file_name());
        }
    }
    Ok(rows)
}

/// Turn a history response into price rows, dropping malformed items.
///
/// A missing or null `chartData` means no data; any other non-array value, or
/// a payload that is not a JSON object, is a [`DataError::MalformedPayload`].
pub fn parse_chart_data(payload: &Value, symbol: &str) -> Result<Vec<HistoricalPrice>, DataError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| DataError::MalformedPayload("history response is not a JSON object".into()))?;

    let items = match obj.get("chartData") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(DataError::MalformedPayload(format!(
                "chartData is not an array (got {})",
                json_kind(other)
            )))
        }
    };

    let rows: Vec<HistoricalPrice> = items
        .iter()
        .filter_map(|item| HistoricalPrice::from_chart_item(item, symbol))
        .collect();

    let dropped = items.len() - rows.len();
    if dropped > 0 {
        debug!("{symbol}: dropped {dropped} of {} chart items", items.len());
    }
    Ok(rows)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(date: &str, close: &str) -> Value {
        json!({
            "CHART_DATE": date,
            "VALUE": "100", "OPEN": "1.0", "CLOSE": close, "HIGH": "1.2", "LOW": "0.9"
        })
    }

    #[test]
    fn payload_shape() {
        let c = Company::new("111", "222", "Acme", "ACM");
        let body = history_payload(&c, "01-01-1900", "01-02-2024");
        assert_eq!(
            body,
            json!({"cmpy_id": "111", "security_id": "222", "startDate": "01-01-1900", "endDate": "01-02-2024"})
        );
    }

    #[test]
    fn three_valid_one_invalid_yields_three() {
        let payload = json!({"chartData": [
            item("Jan 02, 2024 00:00:00", "1.1"),
            {"VALUE": "1", "OPEN": "1", "CLOSE": "1", "HIGH": "1", "LOW": "1"},
            item("Jan 03, 2024 00:00:00", "1.2"),
            item("Jan 04, 2024 00:00:00", "1.3"),
        ]});
        let rows = parse_chart_data(&payload, "ACM").unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.symbol == "ACM"));
        assert_eq!(rows[2].close, "1.3");
    }

    #[test]
    fn missing_chart_data_is_empty() {
        assert!(parse_chart_data(&json!({}), "X").unwrap().is_empty());
        assert!(parse_chart_data(&json!({"chartData": null}), "X").unwrap().is_empty());
    }

    #[test]
    fn non_object_payload_is_malformed() {
        let err = parse_chart_data(&json!([1, 2]), "X").unwrap_err();
        assert!(matches!(err, DataError::MalformedPayload(_)));
    }

    #[test]
    fn non_array_chart_data_is_malformed() {
        let err = parse_chart_data(&json!({"chartData": "oops"}), "X").unwrap_err();
        assert!(matches!(err, DataError::MalformedPayload(_)));
    }
}
