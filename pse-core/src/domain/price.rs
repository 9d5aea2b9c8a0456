//! HistoricalPrice: one trading-day observation for one company.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Timestamp pattern of `CHART_DATE` in history responses, e.g. `Jan 02, 2024 00:00:00`.
pub const CHART_DATE_FORMAT: &str = "%b %d, %Y %H:%M:%S";

/// Daily price row.
///
/// Price columns are opaque text: the backend may emit placeholders instead of
/// numbers, so values are carried through verbatim rather than parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalPrice {
    pub date: NaiveDate,
    pub symbol: String,
    pub value: String,
    pub open: String,
    pub close: String,
    pub high: String,
    pub low: String,
}

impl HistoricalPrice {
    /// Build a row from one `chartData` item.
    ///
    /// Returns `None` when `CHART_DATE` is missing or does not match
    /// [`CHART_DATE_FORMAT`], or when any price field is absent or null.
    /// Partial rows are never produced.
    pub fn from_chart_item(item: &Value, symbol: &str) -> Option<Self> {
        let obj = item.as_object()?;
        let raw_date = obj.get("CHART_DATE")?.as_str()?;
        let date = NaiveDateTime::parse_from_str(raw_date, CHART_DATE_FORMAT)
            .ok()?
            .date();

        let field = |name: &str| obj.get(name).and_then(opaque_text);

        Some(Self {
            date,
            symbol: symbol.to_string(),
            value: field("VALUE")?,
            open: field("OPEN")?,
            close: field("CLOSE")?,
            high: field("HIGH")?,
            low: field("LOW")?,
        })
    }
}

/// Render a JSON scalar as text without reinterpreting it.
fn opaque_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
