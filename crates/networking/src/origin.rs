//! Origins and the caller's page environment.

use std::fmt;
use url::Url;

/// Represents an origin (scheme, host, port tuple).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Origin {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
}

impl Origin {
    /// Parse an origin from a URL. Opaque schemes have no origin.
    pub fn from_url(url: &Url) -> Option<Self> {
        let scheme = url.scheme().to_lowercase();

        if matches!(scheme.as_str(), "data" | "file" | "blob" | "javascript") {
            return None;
        }

        let host = url.host_str()?.to_lowercase();
        let port = url.port_or_known_default();

        Some(Self { scheme, host, port })
    }

    /// Check if this origin is the same as another.
    pub fn is_same_origin(&self, other: &Origin) -> bool {
        self.scheme == other.scheme
            && self.host == other.host
            && self.effective_port() == other.effective_port()
    }

    /// Get the effective port (using default ports for known schemes).
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(match self.scheme.as_str() {
            "http" | "ws" => 80,
            "https" | "wss" => 443,
            _ => 0,
        })
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let default_port = match self.scheme.as_str() {
            "http" => Some(80),
            "https" => Some(443),
            _ => None,
        };

        match self.port {
            Some(port) if Some(port) != default_port => {
                write!(f, "{}://{}:{}", self.scheme, self.host, port)
            }
            _ => write!(f, "{}://{}", self.scheme, self.host),
        }
    }
}

/// Where requests are issued from.
///
/// `page_url` anchors relative request URLs and defines the page origin.
/// `legacy_cross_domain` declares that cross-origin requests must go through
/// the restricted cross-domain transport.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    pub page_url: Option<Url>,
    pub legacy_cross_domain: bool,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page URL.
    pub fn with_page_url(mut self, url: Url) -> Self {
        self.page_url = Some(url);
        self
    }

    /// Declare the legacy cross-domain capability.
    pub fn with_legacy_cross_domain(mut self, enabled: bool) -> Self {
        self.legacy_cross_domain = enabled;
        self
    }

    /// Origin of the page, if known.
    pub fn page_origin(&self) -> Option<Origin> {
        self.page_url.as_ref().and_then(Origin::from_url)
    }

    /// Resolve a request URL. The flag reports whether it was written in
    /// absolute form.
    pub fn resolve(&self, raw: &str) -> Result<(Url, bool), url::ParseError> {
        match Url::parse(raw) {
            Ok(url) => Ok((url, true)),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.page_url {
                Some(base) => Ok((base.join(raw)?, false)),
                None => Err(url::ParseError::RelativeUrlWithoutBase),
            },
            Err(err) => Err(err),
        }
    }

    /// Whether a request to `url` needs the cross-domain transport.
    pub fn needs_cross_domain(&self, url: &Url, absolute: bool) -> bool {
        if !self.legacy_cross_domain || !absolute {
            return false;
        }
        match (self.page_origin(), Origin::from_url(url)) {
            (Some(page), Some(target)) => !page.is_same_origin(&target),
            _ => false,
        }
    }
}
