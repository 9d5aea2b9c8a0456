//! Structured error types for acquisition and dataset operations.
//!
//! Displayable in CLI log lines. Per-company failures are reported through
//! these and never abort a batch; only the orchestration layer decides what
//! is fatal.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    /// Network failure, timeout, or retries exhausted without a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx status after the client's retries.
    #[error("upstream returned HTTP {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    /// Top-level response body could not be decoded.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

impl DataError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn csv(path: &std::path::Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.display().to_string(),
            source,
        }
    }

    /// Whether the client may retry the request that produced this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, DataError::Transport(_))
    }
}

impl From<reqwest::Error> for DataError {
    fn from(e: reqwest::Error) -> Self {
        DataError::Transport(e.to_string())
    }
}

pub type Result<T, E = DataError> = std::result::Result<T, E>;
