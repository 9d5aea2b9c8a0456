//! Retry policy and the retrying transport wrapper.
//!
//! The policy is plain data (attempt count, backoff, retryable statuses and
//! methods); [`RetryingTransport`] applies it to any inner [`Transport`].

use super::transport::{HttpRequest, HttpResponse, Transport};
use crate::error::DataError;
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Statuses for which the server may send a `Retry-After` we should honor.
const RETRY_AFTER_STATUSES: [u16; 2] = [429, 503];

/// Retry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub backoff_base: Duration,
    /// Upper bound on any single wait, including `Retry-After`.
    pub backoff_max: Duration,
    pub retryable_statuses: Vec<u16>,
    pub retryable_methods: Vec<Method>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(120),
            retryable_statuses: vec![429, 500, 502, 503, 504],
            retryable_methods: vec![Method::GET, Method::POST],
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn retries_method(&self, method: &Method) -> bool {
        self.retryable_methods.contains(method)
    }

    pub fn retries_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Exponential backoff before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.backoff_base
            .saturating_mul(factor)
            .min(self.backoff_max)
    }

    fn wait_before(&self, retry: u32, response: Option<&HttpResponse>) -> Duration {
        let server_hint = response
            .filter(|r| RETRY_AFTER_STATUSES.contains(&r.status))
            .and_then(|r| r.retry_after);
        match server_hint {
            Some(secs) => Duration::from_secs(secs).min(self.backoff_max),
            None => self.backoff(retry),
        }
    }
}

/// Wraps a transport with bounded retry on transient failures.
///
/// A retryable status that survives every attempt is returned as the final
/// response; a transport error that survives every attempt is returned as the
/// final error. Nothing is swallowed.
pub struct RetryingTransport {
    inner: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl RetryingTransport {
    pub fn new(inner: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl Transport for RetryingTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, DataError> {
        let method_retryable = self.policy.retries_method(&request.method);
        let mut retry = 0u32;

        loop {
            let result = self.inner.execute(request);
            let can_retry = method_retryable && retry < self.policy.max_retries;

            let wait = match &result {
                Ok(resp) if can_retry && self.policy.retries_status(resp.status) => {
                    debug!(
                        "HTTP {} from {} (retry {}/{})",
                        resp.status,
                        request.url,
                        retry + 1,
                        self.policy.max_retries
                    );
                    self.policy.wait_before(retry + 1, Some(resp))
                }
                Err(e) if can_retry && e.is_transient() => {
                    debug!(
                        "{e} for {} (retry {}/{})",
                        request.url,
                        retry + 1,
                        self.policy.max_retries
                    );
                    self.policy.wait_before(retry + 1, None)
                }
                _ => return result,
            };

            retry += 1;
            if !wait.is_zero() {
                std::thread::sleep(wait);
            }
        }
    }
}
