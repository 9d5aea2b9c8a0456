//! Shared helpers: a scripted transport and markup/payload builders.

#![allow(dead_code)]

use pse_core::client::{ClientConfig, HttpRequest, HttpResponse, PseClient, RetryPolicy, Transport};
use pse_core::DataError;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

type Responder = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, DataError> + Send + Sync>;

/// Transport that answers from a closure and records every request.
pub struct MockTransport {
    responder: Responder,
    calls: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new(
        responder: impl Fn(&HttpRequest) -> Result<HttpResponse, DataError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, DataError> {
        self.calls.lock().unwrap().push(request.clone());
        (self.responder)(request)
    }
}

/// No rate limit, no retries.
pub fn quick_config() -> ClientConfig {
    ClientConfig {
        rate_limit_seconds: 0.0,
        retry: RetryPolicy::none(),
        ..ClientConfig::default()
    }
}

pub fn mock_client(transport: &Arc<MockTransport>) -> PseClient {
    PseClient::with_transport(transport.clone(), quick_config())
}

/// `pageNo` query value of a directory request.
pub fn page_number(request: &HttpRequest) -> Option<u32> {
    request
        .url
        .split("pageNo=")
        .nth(1)
        .and_then(|n| n.parse().ok())
}

/// `cmpy_id` of a history request body.
pub fn history_company_id(request: &HttpRequest) -> Option<String> {
    request
        .json
        .as_ref()
        .and_then(|body| body.get("cmpy_id"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Directory page with one row per `(company_id, security_id, name, symbol)`.
pub fn directory_page(rows: &[(&str, &str, &str, &str)]) -> String {
    let body: String = rows
        .iter()
        .map(|(cid, sid, name, symbol)| {
            format!(
                "<tr><td><a href=\"#\" onclick=\"cmDetail('{cid}','{sid}');return false;\">{name}</a></td>\
                 <td><a href=\"#\">{symbol}</a></td><td>Sector</td></tr>"
            )
        })
        .collect();
    format!(
        "<html><body><table class=\"list\"><thead><tr><th>Name</th><th>Symbol</th></tr></thead>\
         <tbody>{body}</tbody></table></body></html>"
    )
}

/// History response with one item per `(chart date, close)`.
pub fn chart_payload(items: &[(&str, &str)]) -> Value {
    let data: Vec<Value> = items
        .iter()
        .map(|(date, close)| {
            json!({
                "CHART_DATE": date,
                "VALUE": "1,000.00",
                "OPEN": "1.00",
                "CLOSE": close,
                "HIGH": "1.50",
                "LOW": "0.90",
            })
        })
        .collect();
    json!({ "chartData": data })
}

pub fn ok_json(value: &Value) -> Result<HttpResponse, DataError> {
    Ok(HttpResponse::new(200, value.to_string()))
}
