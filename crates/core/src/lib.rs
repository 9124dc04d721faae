//! Shared foundations for the Keystone protocol toolkit.
//!
//! This crate provides the pieces every other Keystone crate leans on:
//! the common error type, the configuration file model and structured
//! logging initialisation.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{Config, ProtectionConfig, StoreConfig};
pub use error::{Error, Result};
