//! PSE Core: acquisition of Philippine Stock Exchange EDGE price history.
//!
//! This crate contains the whole data pipeline:
//! - Rate-limited, retrying HTTP client over a pluggable transport
//! - Company directory scraper and companies list persistence
//! - Historical price fetcher with an optional on-disk response cache
//! - Per-company dataset writer, combiner, and dataset status
//! - `pse.toml` configuration and the end-to-end sync pipeline

pub mod client;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod pipeline;

pub use error::{DataError, Result};
