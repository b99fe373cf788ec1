//! Transports perform a single HTTP exchange.
//!
//! [`StandardTransport`] is backed by `reqwest`. [`CrossDomainTransport`]
//! wraps another transport and restricts requests to what a legacy
//! cross-domain channel can carry. Which one a request uses is decided by
//! the client's [`Environment`](crate::origin::Environment).

mod cross_domain;
mod standard;

pub use cross_domain::CrossDomainTransport;
pub use standard::{StandardTransport, TransportConfig};

use crate::request::PreparedRequest;
use crate::response::RawResponse;
use async_trait::async_trait;
use http::Method;
use thiserror::Error;

/// Transport-level failures.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    #[error("Method not supported by {transport} transport: {method}")]
    UnsupportedMethod { transport: &'static str, method: Method },
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Timeout")]
    Timeout,
    #[error("Request error: {0}")]
    Request(String),
    #[error("Body error: {0}")]
    Body(String),
}

/// One HTTP exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Send the request and collect the full response.
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, TransportError>;
}
