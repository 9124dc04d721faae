//! Error types for message protection.

use keystone_crypto::CryptoError;
use keystone_pki::PkiError;
use thiserror::Error;

/// Errors raised while protecting or verifying protocol messages.
#[derive(Debug, Error)]
pub enum CmpError {
    /// Protection algorithm is absent, unknown, or its parameters are unusable
    #[error("Unknown protection algorithm: {0}")]
    UnknownAlgorithm(String),

    /// Password-based MAC requested without a shared secret
    #[error("Missing shared secret for password-based MAC")]
    MissingSecret,

    /// Signature requested without a private key
    #[error("Missing private key for signature protection")]
    MissingKey,

    /// Neither a shared secret nor a certificate with its key is configured
    #[error("Missing credentials: need a shared secret or a certificate and private key")]
    MissingCredentials,

    /// Private key does not belong to the configured certificate
    #[error("Private key does not match the certificate public key")]
    KeyCertMismatch,

    /// The protection value could not be computed
    #[error("Error calculating protection: {0}")]
    ProtectionComputation(#[source] Box<CmpError>),

    /// Null sender name and no sender key identifier
    #[error("Missing sender identification: sender is NULL-DN and no sender key id is set")]
    MissingSenderIdentification,

    /// Generic protection failure
    #[error("Error protecting message: {0}")]
    Protection(String),

    /// No signature algorithm exists for the key type and digest
    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// Canonical encoding failed
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Received protection did not verify
    #[error("Protection verification failed: {0}")]
    VerificationFailed(String),

    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("PKI error: {0}")]
    Pki(#[from] PkiError),
}

impl From<serde_json::Error> for CmpError {
    fn from(err: serde_json::Error) -> Self {
        CmpError::Encoding(err.to_string())
    }
}

/// Result type for protection operations.
pub type CmpResult<T> = Result<T, CmpError>;
