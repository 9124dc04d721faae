//! Configuration management for Keystone.
//!
//! Algorithm choices are kept as names here; the crates that own the
//! algorithms resolve and validate them when a context or session is built
//! from the configuration.

use serde::{Deserialize, Serialize};
#[cfg(feature = "toml")]
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub protection: ProtectionConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Defaults applied to a protocol context before protecting messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProtectionConfig {
    /// Salt length in bytes for password-based MAC parameters
    pub pbm_salt_len: usize,
    /// One-way function used to derive the PBM base key
    pub pbm_owf: String,
    /// Number of one-way function iterations
    pub pbm_iteration_count: u32,
    /// MAC algorithm applied with the derived key
    pub pbm_mac: String,
    /// Digest used for signature-based protection
    pub digest: String,
    /// Send messages without any protection
    pub unprotected_send: bool,
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            pbm_salt_len: 16,
            pbm_owf: "sha256".to_string(),
            pbm_iteration_count: 500,
            pbm_mac: "hmac-sha256".to_string(),
            digest: "sha256".to_string(),
            unprotected_send: false,
        }
    }
}

/// Defaults applied when opening store sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Property query handed to fetched loaders
    pub properties: Option<String>,
    /// Object type the caller is interested in ("certificate", "crl", ...)
    pub expect: Option<String>,
    /// Reuse a passphrase across decoders while pulling a single object
    pub passphrase_caching: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            properties: None,
            expect: None,
            passphrase_caching: true,
        }
    }
}

impl Config {
    #[cfg(feature = "toml")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            protection: ProtectionConfig::default(),
            store: StoreConfig::default(),
        }
    }

    /// Checks the numeric settings; algorithm names are checked by their owners.
    pub fn validate(&self) -> crate::Result<()> {
        if self.protection.pbm_salt_len == 0 {
            return Err(crate::Error::Config(
                "protection.pbm_salt_len must be positive".to_string(),
            ));
        }
        if self.protection.pbm_iteration_count == 0 {
            return Err(crate::Error::Config(
                "protection.pbm_iteration_count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
