//! Error types for store sessions and loaders.

use thiserror::Error;

use crate::object::ObjectType;

/// Errors raised by store sessions, loaders and search criteria.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No candidate scheme produced a loader context
    #[error("Failed to open {uri}: {reason}")]
    OpenFailed { uri: String, reason: String },

    /// Filters cannot change once objects have been pulled
    #[error("Loading has already started")]
    AlreadyLoading,

    /// The loader does not implement the requested operation
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Typed accessor used on an object of another type
    #[error("Wrong object type: expected {expected}, got {actual}")]
    WrongObjectType {
        expected: ObjectType,
        actual: ObjectType,
    },

    /// Fingerprint length does not match the digest output size
    #[error("Fingerprint size mismatch: {digest} produces {expected} bytes, got {actual}")]
    FingerprintSizeMismatch {
        digest: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid scheme: {0}")]
    InvalidScheme(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// No passphrase was available for an encrypted object
    #[error("Passphrase entry cancelled")]
    PassphraseCancelled,

    /// Backend-specific failure
    #[error("Loader error: {0}")]
    Loader(String),

    /// The session has been closed
    #[error("Store session is closed")]
    Closed,
}

impl From<keystone_pki::PkiError> for StoreError {
    fn from(err: keystone_pki::PkiError) -> Self {
        StoreError::Decode(err.to_string())
    }
}

impl From<keystone_crypto::CryptoError> for StoreError {
    fn from(err: keystone_crypto::CryptoError) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_failures_map_to_decode() {
        let err: StoreError = keystone_pki::PkiError::InvalidName("cn".to_string()).into();
        assert!(matches!(err, StoreError::Decode(ref msg) if msg.contains("cn")));

        let err: StoreError = keystone_crypto::CryptoError::InvalidKey("short".to_string()).into();
        assert!(matches!(err, StoreError::Decode(ref msg) if msg.contains("short")));
    }
}
