//! Cryptographic capabilities for the Keystone protocol toolkit.
//!
//! This crate supplies the primitives the protection engine and the object
//! store consume: message digests, keyed MACs, the password-based MAC key
//! derivation, asymmetric signing keys and the tables that tie algorithm
//! identifiers to them.
//!
//! # Supported Algorithms
//!
//! - **Signatures**: Ed25519, ECDSA P-256 (with SHA-256/384/512 or BLAKE3 prehash)
//! - **Hashing**: SHA-256, SHA-384, SHA-512, BLAKE3
//! - **Message Authentication**: HMAC-SHA2, keyed BLAKE3, password-based MAC
//!
//! # Security Principles
//!
//! - Never roll custom cryptographic primitives
//! - Secrets must never be logged or hardcoded
//! - Private key and shared secret material is zeroized on drop

pub mod algorithm;
pub mod digest;
pub mod encoding;
pub mod error;
pub mod keys;
pub mod mac;
pub mod mac_signature;
pub mod pbm;

pub use algorithm::{
    find_digest_for_signature_oid, find_signature_algorithm, find_signature_oid,
    SignatureAlgorithm,
};
pub use digest::DigestAlgorithm;
pub use error::{CryptoError, CryptoResult};
pub use keys::{EncodedPublicKey, KeyType, PrivateKey, PublicKey};
pub use mac::{compute_mac, constant_time_eq, MacAlgorithm, MacState};
pub use mac_signature::{MacKey, MacSignatureContext, MacSignatureKind, SignatureRegistry};
pub use pbm::{PbmParameter, PASSWORD_BASED_MAC_OID};
