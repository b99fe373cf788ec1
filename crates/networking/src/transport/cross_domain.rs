//! Transport for legacy cross-domain requests.

use super::{Transport, TransportError};
use crate::headers::is_cors_safelisted;
use crate::request::PreparedRequest;
use crate::response::RawResponse;
use async_trait::async_trait;
use http::Method;
use std::sync::Arc;

/// Sends cross-origin requests through an inner transport.
///
/// Method and headers pass through unchanged unless [`restricted`] is
/// enabled, in which case only GET/POST and CORS-safelisted request headers
/// are allowed.
///
/// [`restricted`]: CrossDomainTransport::restricted
#[derive(Clone)]
pub struct CrossDomainTransport {
    inner: Arc<dyn Transport>,
    restricted: bool,
}

impl CrossDomainTransport {
    pub fn new(inner: Arc<dyn Transport>) -> Self {
        Self {
            inner,
            restricted: false,
        }
    }

    /// Enforce the limits of a legacy cross-domain channel.
    pub fn restricted(mut self, enabled: bool) -> Self {
        self.restricted = enabled;
        self
    }

    fn restrict(&self, request: &mut PreparedRequest) -> Result<(), TransportError> {
        if request.method != Method::GET && request.method != Method::POST {
            return Err(TransportError::UnsupportedMethod {
                transport: self.name(),
                method: request.method.clone(),
            });
        }

        request.headers.retain(|name, _| {
            let keep = is_cors_safelisted(name);
            if !keep {
                tracing::debug!("Dropping header {} on cross-domain request", name);
            }
            keep
        });
        Ok(())
    }
}

#[async_trait]
impl Transport for CrossDomainTransport {
    fn name(&self) -> &'static str {
        "cross-domain"
    }

    async fn send(&self, mut request: PreparedRequest) -> Result<RawResponse, TransportError> {
        if self.restricted {
            self.restrict(&mut request)?;
        }
        self.inner.send(request).await
    }
}
