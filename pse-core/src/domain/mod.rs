//! Domain types for the PSE EDGE dataset

pub mod company;
pub mod price;

pub use company::Company;
pub use price::{HistoricalPrice, CHART_DATE_FORMAT};
