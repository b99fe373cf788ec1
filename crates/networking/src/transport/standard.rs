//! `reqwest`-backed transport.

use super::{Transport, TransportError};
use crate::headers::HeaderMap;
use crate::request::PreparedRequest;
use crate::response::RawResponse;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use std::time::Duration;

/// Standard transport configuration.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Maximum redirects.
    pub max_redirects: usize,
    /// User agent string.
    pub user_agent: String,
    /// Maximum idle connections kept per host.
    pub pool_max_idle_per_host: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            max_redirects: 10,
            user_agent: format!("isf-http/{} ({})", env!("CARGO_PKG_VERSION"), std::env::consts::OS),
            pool_max_idle_per_host: 6,
        }
    }
}

/// Transport over a shared `reqwest::Client`.
#[derive(Clone, Debug)]
pub struct StandardTransport {
    inner: reqwest::Client,
}

impl StandardTransport {
    /// Create a transport with default configuration.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_config(&TransportConfig::default())
    }

    /// Create a transport with custom configuration.
    pub fn with_config(config: &TransportConfig) -> Result<Self, TransportError> {
        let inner = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self { inner })
    }

    /// Wrap an existing client.
    pub fn from_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Transport for StandardTransport {
    fn name(&self) -> &'static str {
        "standard"
    }

    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self.inner.request(request.method, request.url);
        if !request.timeout.is_zero() {
            builder = builder.timeout(request.timeout);
        }

        for (name, value) in request.headers.applicable() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| TransportError::InvalidHeader(name.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| TransportError::InvalidHeader(name.to_string()))?;
            builder = builder.header(name, value);
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(map_error)?;

        let status = response.status();
        let mut headers = HeaderMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.append(name.as_str(), v);
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| if e.is_timeout() { TransportError::Timeout } else { TransportError::Body(e.to_string()) })?;

        Ok(RawResponse::new(status, headers, body))
    }
}

fn map_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connection(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}
