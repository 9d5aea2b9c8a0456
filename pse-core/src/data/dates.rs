//! Date formats: the history endpoint's payload format and the dataset
//! presentation format.

use chrono::{NaiveDate, NaiveDateTime};

/// `startDate`/`endDate` format expected by the history endpoint.
pub const PAYLOAD_DATE_FORMAT: &str = "%m-%d-%Y";

/// `Date` column format in per-company and combined CSVs.
pub const OUTPUT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Start of the requested range when none is configured.
pub const DEFAULT_START_DATE: &str = "01-01-1900";

/// Text layouts accepted for user-supplied dates, tried in order.
const ACCEPTED_TEXT_FORMATS: [&str; 2] = ["%Y-%m-%d", PAYLOAD_DATE_FORMAT];

/// Anything that can be rendered as a history payload date.
pub trait PayloadDate {
    fn to_payload_date(&self) -> String;
}

impl PayloadDate for NaiveDate {
    fn to_payload_date(&self) -> String {
        self.format(PAYLOAD_DATE_FORMAT).to_string()
    }
}

impl PayloadDate for NaiveDateTime {
    fn to_payload_date(&self) -> String {
        self.date().to_payload_date()
    }
}

/// ISO or `MM-DD-YYYY` text is normalized; anything else passes through
/// trimmed, so a format the backend accepts but we do not know still works.
impl PayloadDate for str {
    fn to_payload_date(&self) -> String {
        let text = self.trim();
        parse_input_date(text)
            .map(|d| d.to_payload_date())
            .unwrap_or_else(|| text.to_string())
    }
}

impl PayloadDate for String {
    fn to_payload_date(&self) -> String {
        self.as_str().to_payload_date()
    }
}

/// Normalize a date into the payload format.
pub fn ensure_payload_date<D: PayloadDate + ?Sized>(value: &D) -> String {
    value.to_payload_date()
}

/// Parse a user-supplied date in any accepted text layout.
pub fn parse_input_date(text: &str) -> Option<NaiveDate> {
    ACCEPTED_TEXT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text.trim(), fmt).ok())
}

pub fn format_output_date(date: NaiveDate) -> String {
    date.format(OUTPUT_DATE_FORMAT).to_string()
}

pub fn parse_output_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, OUTPUT_DATE_FORMAT).ok()
}
