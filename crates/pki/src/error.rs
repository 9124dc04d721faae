//! Error types for Keystone PKI operations.

use keystone_crypto::CryptoError;
use thiserror::Error;

/// Errors that can occur in certificate, CRL and chain operations.
#[derive(Debug, Error)]
pub enum PkiError {
    /// Distinguished name could not be parsed
    #[error("Invalid distinguished name: {0}")]
    InvalidName(String),

    /// No signature algorithm combines the digest and key type
    #[error("Unsupported signature algorithm: {0}")]
    UnsupportedSignatureAlgorithm(String),

    /// Signature did not verify under the supplied key
    #[error("Signature verification failed: {0}")]
    SignatureVerification(String),

    /// Certificate Authority errors
    #[error("CA error: {0}")]
    CertificateAuthority(String),

    /// Serialization errors
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Cryptographic errors
    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),
}

impl From<serde_json::Error> for PkiError {
    fn from(err: serde_json::Error) -> Self {
        PkiError::Encoding(err.to_string())
    }
}

/// Result type for PKI operations.
pub type PkiResult<T> = Result<T, PkiError>;
