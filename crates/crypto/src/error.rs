//! Error types for cryptographic capability operations.

use thiserror::Error;

/// Errors raised by digests, MACs, keys and signature providers.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Signing failed: {0}")]
    SignatureFailed(String),

    #[error("Signature verification failed")]
    VerificationFailed,

    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
