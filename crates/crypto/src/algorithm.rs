//! Signature algorithm identifiers.
//!
//! Maps signature OIDs to the digest and key type they combine, in both
//! directions. The password-based MAC OID lives in [`crate::pbm`] and is
//! deliberately absent here: it names no digest and no key type.

use crate::digest::DigestAlgorithm;
use crate::keys::KeyType;

/// One row of the signature algorithm table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureAlgorithm {
    pub oid: &'static str,
    pub name: &'static str,
    pub digest: DigestAlgorithm,
    pub key_type: KeyType,
}

pub const ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";
pub const ECDSA_WITH_SHA384: &str = "1.2.840.10045.4.3.3";
pub const ECDSA_WITH_SHA512: &str = "1.2.840.10045.4.3.4";
pub const ED25519: &str = "1.3.101.112";

const SIGNATURE_ALGORITHMS: &[SignatureAlgorithm] = &[
    SignatureAlgorithm {
        oid: ECDSA_WITH_SHA256,
        name: "ecdsa-with-SHA256",
        digest: DigestAlgorithm::Sha256,
        key_type: KeyType::EcdsaP256,
    },
    SignatureAlgorithm {
        oid: ECDSA_WITH_SHA384,
        name: "ecdsa-with-SHA384",
        digest: DigestAlgorithm::Sha384,
        key_type: KeyType::EcdsaP256,
    },
    SignatureAlgorithm {
        oid: ECDSA_WITH_SHA512,
        name: "ecdsa-with-SHA512",
        digest: DigestAlgorithm::Sha512,
        key_type: KeyType::EcdsaP256,
    },
    SignatureAlgorithm {
        oid: ED25519,
        name: "Ed25519",
        digest: DigestAlgorithm::Sha512,
        key_type: KeyType::Ed25519,
    },
];

pub fn signature_algorithms() -> &'static [SignatureAlgorithm] {
    SIGNATURE_ALGORITHMS
}

pub fn find_signature_algorithm(oid: &str) -> Option<&'static SignatureAlgorithm> {
    SIGNATURE_ALGORITHMS.iter().find(|alg| alg.oid == oid)
}

/// Digest a signature OID hashes with, if the OID is known.
pub fn find_digest_for_signature_oid(oid: &str) -> Option<DigestAlgorithm> {
    find_signature_algorithm(oid).map(|alg| alg.digest)
}

/// Signature OID combining `digest` with keys of `key_type`.
///
/// Ed25519 has a single identifier whose digest is fixed, so only SHA-512
/// resolves for it.
pub fn find_signature_oid(digest: DigestAlgorithm, key_type: KeyType) -> Option<&'static str> {
    SIGNATURE_ALGORITHMS
        .iter()
        .find(|alg| alg.digest == digest && alg.key_type == key_type)
        .map(|alg| alg.oid)
}
