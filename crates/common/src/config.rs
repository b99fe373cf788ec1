//! Process-wide API configuration.
//!
//! Higher-level callers compose request URLs and authorization headers from
//! an [`ApiConfig`]. The config can be passed around explicitly, or installed
//! once at startup with [`setup`] and read back with [`get`].

use crate::error::{ConfigError, ConfigResult};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Callback that yields the current access token, if any.
pub type TokenGetter = Arc<dyn Fn() -> Option<String> + Send + Sync>;

static GLOBAL: OnceCell<ApiConfig> = OnceCell::new();

/// Install the process-wide configuration. Only the first call succeeds.
pub fn setup(config: ApiConfig) -> ConfigResult<()> {
    GLOBAL.set(config).map_err(|_| ConfigError::AlreadyInitialized)?;
    tracing::debug!("API configuration installed");
    Ok(())
}

/// Get the process-wide configuration, if [`setup`] has been called.
pub fn get() -> Option<&'static ApiConfig> {
    GLOBAL.get()
}

/// Backend location and credentials.
#[derive(Clone)]
pub struct ApiConfig {
    /// URL scheme, without the `://`.
    pub protocol: String,
    /// Host name or address.
    pub host: String,
    /// Port; `None` uses the scheme default.
    pub port: Option<u16>,
    /// Path prefix prepended to every API path.
    pub prefix: String,
    get_token: Option<TokenGetter>,
}

impl ApiConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the protocol.
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Set the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the path prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the token getter.
    pub fn with_token_getter<F>(mut self, getter: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        self.get_token = Some(Arc::new(getter));
        self
    }

    /// `protocol://host[:port]`, without a trailing slash.
    pub fn origin(&self) -> ConfigResult<String> {
        let host = self.host.trim();
        if host.is_empty() || host.contains(['/', '?', '#']) {
            return Err(ConfigError::invalid_host(host));
        }
        let protocol = self.protocol.trim_end_matches("://");
        Ok(match self.port {
            Some(port) => format!("{}://{}:{}", protocol, host, port),
            None => format!("{}://{}", protocol, host),
        })
    }

    /// Build the full URL for an API path.
    ///
    /// Absolute URLs are returned as-is; anything else is placed under
    /// `origin + prefix`.
    pub fn url_for(&self, path: &str) -> ConfigResult<Url> {
        if let Ok(url) = Url::parse(path) {
            return Ok(url);
        }

        let prefix = self.prefix.trim_matches('/');
        let path = path.trim_start_matches('/');
        let mut full = self.origin()?;
        if !prefix.is_empty() {
            full.push('/');
            full.push_str(prefix);
        }
        full.push('/');
        full.push_str(path);

        Ok(Url::parse(&full)?)
    }

    /// Current token, if a getter is installed and it yields one.
    pub fn token(&self) -> Option<String> {
        self.get_token
            .as_ref()
            .and_then(|getter| getter())
            .filter(|token| !token.is_empty())
    }

    /// `Authorization` header value for the current token.
    pub fn authorization(&self) -> Option<String> {
        self.token().map(|token| format!("Bearer {}", token))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            protocol: "https".to_string(),
            host: "localhost".to_string(),
            port: None,
            prefix: String::new(),
            get_token: None,
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("prefix", &self.prefix)
            .field("get_token", &self.get_token.is_some())
            .finish()
    }
}
