//! Core error types

use thiserror::Error;

/// Core error type for Keystone
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be parsed or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "toml")]
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result alias used across the core crate.
pub type Result<T> = std::result::Result<T, Error>;
