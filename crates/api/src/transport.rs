//! Blocking HTTP transport used by the workflow engine.
//!
//! Steps run one at a time and each step waits for its response, so the
//! engine-facing surface is synchronous. [`ReqwestTransport`] drives the async
//! reqwest client through `block_on_future`.

use std::time::{Duration, Instant};

use dashprobe_types::HttpMethod;
use dashprobe_util::{
    block_on_future, http::parse_response_body, http::status_error_message, http::truncate_response_preview, is_sensitive_header, redact_sensitive,
};
use indexmap::IndexMap;
use reqwest::{
    Method,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::ProbeClient;

/// Default per-request timeout when a caller does not supply one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A fully substituted request ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: IndexMap<String, String>,
    pub body: Option<Value>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: IndexMap::new(),
            body: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// A success (2xx) response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Parsed JSON body; non-JSON text is kept as a string, empty bodies are null.
    pub body: Value,
}

/// Everything that keeps a request from producing a success response.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String, body: Value },

    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

impl TransportError {
    /// Numeric status code for error responses; `None` for transport-level failures.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Response body attached to an error response.
    pub fn body(&self) -> Option<&Value> {
        match self {
            TransportError::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Send one request and wait for its outcome.
///
/// Implementations perform exactly one attempt; retries are not part of the contract.
pub trait HttpTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// reqwest-backed transport.
pub struct ReqwestTransport {
    client: ProbeClient,
}

impl ReqwestTransport {
    pub fn new(client: ProbeClient) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let headers = build_header_map(&request.headers)?;
        if !request.headers.is_empty() {
            debug!(headers = %describe_headers(&request.headers), "request headers");
        }
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &request.url)
            .headers(headers)
            .timeout(request.timeout);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let method = request.method;
        let url = request.url.clone();
        let timeout = request.timeout;
        let future = async move { Ok(execute(builder, method, url, timeout).await) };

        block_on_future(future).unwrap_or_else(|error| {
            Err(TransportError::Network {
                message: format!("could not drive request: {error}"),
            })
        })
    }
}

async fn execute(builder: reqwest::RequestBuilder, method: HttpMethod, url: String, timeout: Duration) -> Result<HttpResponse, TransportError> {
    let start = Instant::now();
    debug!(%method, url = %redact_sensitive(&url), timeout_ms = timeout.as_millis(), "http request started");

    let response = builder.send().await.map_err(|error| map_reqwest_error(error, timeout))?;
    let status = response.status();
    let text = response.text().await.map_err(|error| map_reqwest_error(error, timeout))?;
    let body = parse_response_body(&text);

    if !status.is_success() {
        let message = status_error_message(status.as_u16()).unwrap_or_else(|| truncate_response_preview(&redact_sensitive(&text), 200));
        warn!(
            %method,
            url = %redact_sensitive(&url),
            status = status.as_u16(),
            duration_ms = start.elapsed().as_millis(),
            "http request returned an error status"
        );
        return Err(TransportError::Status {
            status: status.as_u16(),
            message,
            body,
        });
    }

    debug!(
        %method,
        url = %redact_sensitive(&url),
        status = status.as_u16(),
        body_len = text.len(),
        duration_ms = start.elapsed().as_millis(),
        "http request completed"
    );
    Ok(HttpResponse {
        status: status.as_u16(),
        body,
    })
}

fn map_reqwest_error(error: reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        return TransportError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        };
    }
    if error.is_builder() {
        return TransportError::InvalidRequest {
            message: redact_sensitive(&error.to_string()),
        };
    }
    TransportError::Network {
        message: redact_sensitive(&error.to_string()),
    }
}

/// `Name: value` pairs for logging, with credential-bearing values masked.
fn describe_headers(headers: &IndexMap<String, String>) -> String {
    headers
        .iter()
        .map(|(name, value)| {
            if is_sensitive_header(name) {
                format!("{name}: [REDACTED]")
            } else {
                format!("{name}: {}", redact_sensitive(value))
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn build_header_map(headers: &IndexMap<String, String>) -> Result<HeaderMap, TransportError> {
    let mut header_map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|error| TransportError::InvalidRequest {
            message: format!("header name '{name}': {error}"),
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|error| TransportError::InvalidRequest {
            message: format!("header '{name}' value: {error}"),
        })?;
        header_map.insert(header_name, header_value);
    }
    Ok(header_map)
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_code_only_for_error_responses() {
        let status = TransportError::Status {
            status: 403,
            message: "Forbidden".into(),
            body: json!({ "message": "Forbidden" }),
        };
        assert_eq!(status.status_code(), Some(403));
        assert_eq!(status.body(), Some(&json!({ "message": "Forbidden" })));
        assert_eq!(TransportError::Timeout { timeout_ms: 10 }.status_code(), None);
    }

    #[test]
    fn rejects_invalid_header_names() {
        let mut headers = IndexMap::new();
        headers.insert("bad header".to_string(), "x".to_string());
        let error = build_header_map(&headers).expect_err("invalid header");
        assert!(matches!(error, TransportError::InvalidRequest { .. }));
    }

    #[test]
    fn maps_every_method() {
        assert_eq!(to_reqwest_method(HttpMethod::Patch), Method::PATCH);
        assert_eq!(to_reqwest_method(HttpMethod::Put), Method::PUT);
    }

    #[test]
    fn logged_headers_mask_credentials() {
        let headers = IndexMap::from([
            ("Authorization".to_string(), "Bearer token-1".to_string()),
            ("X-Api-Key".to_string(), "k-123".to_string()),
            ("X-Probe".to_string(), "abc".to_string()),
        ]);
        assert_eq!(
            describe_headers(&headers),
            "Authorization: [REDACTED], X-Api-Key: [REDACTED], X-Probe: abc"
        );
    }
}
