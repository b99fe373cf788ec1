//! Shared configuration and error types for the ISF web utilities.

pub mod config;
pub mod error;

pub use config::{ApiConfig, TokenGetter};
pub use error::{ConfigError, ConfigResult};
