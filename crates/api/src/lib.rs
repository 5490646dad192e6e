//! Dashprobe HTTP client utilities.
//!
//! This crate provides the HTTP surface the workflow engine talks to:
//!
//! - [`ProbeClient`]: a `reqwest::Client` with consistent User-Agent and Accept headers
//! - [`validate_base_url`]: sanity checks for operator-supplied base URLs
//! - [`transport`]: the blocking [`HttpTransport`] seam and its reqwest implementation
//!
//! # Example
//!
//! ```ignore
//! use dashprobe_api::{ProbeClient, ReqwestTransport, HttpRequest, HttpTransport};
//! use dashprobe_types::HttpMethod;
//!
//! let transport = ReqwestTransport::new(ProbeClient::new()?);
//! let response = transport.send(&HttpRequest::new(HttpMethod::Get, "https://api.example.com/api/health"))?;
//! println!("status: {}", response.status);
//! ```

use std::{env, time::Duration};

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, RequestBuilder, Url, header};
use tracing::debug;

pub mod transport;

pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};

/// Hostnames allowed to use plain HTTP.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1", "::1", "[::1]"];
/// Upper bound on establishing a connection, independent of the per-request timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin wrapper around a configured `reqwest::Client`.
///
/// Requests are built against absolute URLs because each workflow step carries
/// its own fully substituted URL.
#[derive(Debug, Clone)]
pub struct ProbeClient {
    pub http: Client,
    pub user_agent: String,
}

impl ProbeClient {
    /// Build a client with JSON accept headers and a dashprobe User-Agent.
    pub fn new() -> Result<Self> {
        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("build http client")?;

        Ok(Self {
            http,
            user_agent: format!("dashprobe/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
        })
    }

    /// Build a `reqwest::RequestBuilder` for a method and absolute URL.
    pub fn request(&self, method: reqwest::Method, url: &str) -> RequestBuilder {
        debug!(%url, %method, "building request");
        self.http.request(method, url).header(header::USER_AGENT, &self.user_agent)
    }
}

/// Validate that a base URL is acceptable as a probe target.
///
/// Rules:
/// - the URL must parse and include a host
/// - `localhost`/loopback hosts may use `http` or `https`
/// - every other host must use `https`
pub fn validate_base_url(base: &str) -> Result<()> {
    let parsed_base_url = Url::parse(base).map_err(|e| anyhow!("invalid base URL '{}': {}", base, e))?;

    let host_name = parsed_base_url
        .host_str()
        .ok_or_else(|| anyhow!("base URL '{}' must include a host", base))?;

    let is_local = LOCALHOST_DOMAINS.iter().any(|&allowed| host_name.eq_ignore_ascii_case(allowed));
    match parsed_base_url.scheme() {
        "https" => Ok(()),
        "http" if is_local => Ok(()),
        "http" => Err(anyhow!("base URL must use https for non-localhost hosts; got '{}'", base)),
        other => Err(anyhow!("base URL scheme '{}' is not supported; use https", other)),
    }
}
