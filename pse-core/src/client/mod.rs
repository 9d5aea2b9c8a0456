//! Rate-limited, retrying HTTP client for the PSE EDGE endpoints.
//!
//! Layering, outermost first:
//! - [`PseClient`]: rate limit, default timeout, header merging
//! - [`RetryingTransport`]: bounded retry with exponential backoff
//! - [`Transport`]: one network round-trip (reqwest, or a mock in tests)

pub mod rate_limit;
pub mod retry;
pub mod transport;

pub use rate_limit::RateLimiter;
pub use retry::{RetryPolicy, RetryingTransport};
pub use reqwest::Method;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

use crate::error::DataError;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Seconds between request starts when nothing else is configured.
pub const DEFAULT_RATE_LIMIT_SECS: f64 = 0.6;

/// Largest accepted spacing between requests, in seconds.
pub const MAX_RATE_LIMIT_SECS: f64 = 3600.0;

/// Per-request timeout when the caller does not give one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client construction parameters.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Minimum seconds between request starts; 0 disables.
    pub rate_limit_seconds: f64,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rate_limit_seconds: DEFAULT_RATE_LIMIT_SECS,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_rate_limit(rate_limit_seconds: f64) -> Self {
        Self {
            rate_limit_seconds,
            ..Self::default()
        }
    }
}

/// Per-call options: extra headers, JSON body, timeout override.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    pub json: Option<Value>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// HTTP client shared by every stage of a run.
///
/// All requests through one instance draw from a single rate budget.
pub struct PseClient {
    transport: RetryingTransport,
    limiter: RateLimiter,
    timeout: Duration,
}

impl PseClient {
    /// Client over the real network.
    pub fn new(config: ClientConfig) -> Result<Self, DataError> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new()?);
        Ok(Self::with_transport(transport, config))
    }

    /// Client over an arbitrary transport (retry and rate limit still apply).
    pub fn with_transport(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            transport: RetryingTransport::new(transport, config.retry),
            limiter: RateLimiter::from_secs_f64(config.rate_limit_seconds),
            timeout: config.timeout,
        }
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.transport.policy()
    }

    /// Send one request, waiting for the rate budget first.
    ///
    /// Returns the final response whatever its status; fails only when no
    /// response could be obtained.
    pub fn request(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse, DataError> {
        self.limiter.acquire();

        let request = HttpRequest {
            method,
            url: url.to_string(),
            headers: options.headers,
            json: options.json,
            timeout: options.timeout.unwrap_or(self.timeout),
        };
        self.transport.execute(&request)
    }

    pub fn get(&self, url: &str, options: RequestOptions) -> Result<HttpResponse, DataError> {
        self.request(Method::GET, url, options)
    }

    pub fn post(&self, url: &str, options: RequestOptions) -> Result<HttpResponse, DataError> {
        self.request(Method::POST, url, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Transport for Recorder {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, DataError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(HttpResponse::new(200, "{}"))
        }
    }

    fn quiet_config() -> ClientConfig {
        ClientConfig {
            rate_limit_seconds: 0.0,
            retry: RetryPolicy::none(),
            ..ClientConfig::default()
        }
    }

    #[test]
    fn default_timeout_applies_when_unset() {
        let rec = Arc::new(Recorder::default());
        let client = PseClient::with_transport(rec.clone(), quiet_config());
        client.get("https://example.test/a", RequestOptions::new()).unwrap();
        client
            .post(
                "https://example.test/b",
                RequestOptions::new().timeout(Duration::from_secs(5)),
            )
            .unwrap();

        let seen = rec.seen.lock().unwrap();
        assert_eq!(seen[0].timeout, DEFAULT_TIMEOUT);
        assert_eq!(seen[0].method, Method::GET);
        assert_eq!(seen[1].timeout, Duration::from_secs(5));
        assert_eq!(seen[1].method, Method::POST);
    }

    #[test]
    fn options_carry_headers_and_body() {
        let rec = Arc::new(Recorder::default());
        let client = PseClient::with_transport(rec.clone(), quiet_config());
        let body = serde_json::json!({"k": "v"});
        client
            .post(
                "https://example.test/",
                RequestOptions::new()
                    .header("X-Requested-With", "XMLHttpRequest")
                    .json(body.clone()),
            )
            .unwrap();

        let seen = rec.seen.lock().unwrap();
        assert_eq!(seen[0].header("x-requested-with"), Some("XMLHttpRequest"));
        assert_eq!(seen[0].json.as_ref(), Some(&body));
    }

    #[test]
    fn default_config_values() {
        let c = ClientConfig::default();
        assert_eq!(c.rate_limit_seconds, 0.6);
        assert_eq!(c.timeout, Duration::from_secs(30));
        assert_eq!(c.retry.max_retries, 4);
    }

    #[test]
    fn client_spaces_requests_by_rate_limit() {
        let rec = Arc::new(Recorder::default());
        let client = PseClient::with_transport(
            rec,
            ClientConfig {
                rate_limit_seconds: 0.03,
                retry: RetryPolicy::none(),
                ..ClientConfig::default()
            },
        );
        let start = std::time::Instant::now();
        for _ in 0..3 {
            client.get("https://example.test/", RequestOptions::new()).unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(55));
    }
}
