//! Common error types.

use thiserror::Error;

/// Errors raised while building or installing an [`ApiConfig`](crate::ApiConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("API configuration already initialized")]
    AlreadyInitialized,

    #[error("URL parse error: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid host: {0}")]
    InvalidHost(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    pub fn invalid_host(msg: impl Into<String>) -> Self {
        Self::InvalidHost(msg.into())
    }
}
