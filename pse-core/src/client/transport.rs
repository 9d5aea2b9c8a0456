//! Transport trait and the blocking reqwest implementation.
//!
//! The Transport trait abstracts the single network round-trip so the retry
//! wrapper and the rate-limited client can be layered over it, and so tests can
//! script responses without a network.

use crate::error::DataError;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

/// One outbound request, fully resolved (headers merged, timeout chosen).
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub json: Option<Value>,
    pub timeout: Duration,
}

impl HttpRequest {
    /// Value of a request header, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A received response with its body already read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Parsed `Retry-After` header in whole seconds, if present.
    pub retry_after: Option<u64>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into [`DataError::UpstreamStatus`].
    pub fn error_for_status(self, url: &str) -> Result<Self, DataError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(DataError::UpstreamStatus {
                status: self.status,
                url: url.to_string(),
            })
        }
    }

    /// Decode the body as JSON.
    pub fn json(&self) -> Result<Value, DataError> {
        serde_json::from_str(&self.body)
            .map_err(|e| DataError::MalformedPayload(format!("response is not JSON: {e}")))
    }
}

/// A single request/response exchange. No retry, no rate limiting.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, DataError>;
}

/// Blocking reqwest transport with the browser-like default headers the
/// EDGE site expects.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, DataError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json, text/html, */*; q=0.01"),
        );
        headers.insert(
            reqwest::header::CONNECTION,
            reqwest::header::HeaderValue::from_static("keep-alive"),
        );

        let client = reqwest::blocking::Client::builder()
            .user_agent("Mozilla/5.0")
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, DataError> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .timeout(request.timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.json {
            builder = builder.json(body);
        }

        let resp = builder.send()?;
        let status = resp.status().as_u16();
        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = resp.text()?;

        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }
}
