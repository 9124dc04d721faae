//! Search criteria narrowing what a loader returns.

use keystone_crypto::DigestAlgorithm;
use keystone_pki::{DistinguishedName, SerialNumber};
use std::fmt;

use crate::error::{StoreError, StoreResult};
use crate::object::StoreObject;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchType {
    Name,
    IssuerSerial,
    KeyFingerprint,
    Alias,
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchType::Name => "name",
            SearchType::IssuerSerial => "issuer-serial",
            SearchType::KeyFingerprint => "key-fingerprint",
            SearchType::Alias => "alias",
        })
    }
}

/// Immutable search filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriterion {
    ByName(DistinguishedName),
    ByIssuerSerial {
        issuer: DistinguishedName,
        serial: SerialNumber,
    },
    ByKeyFingerprint {
        digest: Option<DigestAlgorithm>,
        fingerprint: Vec<u8>,
    },
    ByAlias(String),
}

impl SearchCriterion {
    pub fn by_name(name: DistinguishedName) -> Self {
        SearchCriterion::ByName(name)
    }

    pub fn by_issuer_serial(issuer: DistinguishedName, serial: SerialNumber) -> Self {
        SearchCriterion::ByIssuerSerial { issuer, serial }
    }

    /// Search by public key fingerprint.
    ///
    /// When `digest` is given the fingerprint length must equal its output
    /// size. Without a digest, SHA-256 fingerprints are matched.
    pub fn by_key_fingerprint(
        digest: Option<DigestAlgorithm>,
        fingerprint: impl Into<Vec<u8>>,
    ) -> StoreResult<Self> {
        let fingerprint = fingerprint.into();
        if let Some(digest) = digest {
            if fingerprint.len() != digest.output_size() {
                return Err(StoreError::FingerprintSizeMismatch {
                    digest: digest.name().to_string(),
                    expected: digest.output_size(),
                    actual: fingerprint.len(),
                });
            }
        }
        Ok(SearchCriterion::ByKeyFingerprint {
            digest,
            fingerprint,
        })
    }

    pub fn by_alias(alias: impl Into<String>) -> Self {
        SearchCriterion::ByAlias(alias.into())
    }

    pub fn search_type(&self) -> SearchType {
        match self {
            SearchCriterion::ByName(_) => SearchType::Name,
            SearchCriterion::ByIssuerSerial { .. } => SearchType::IssuerSerial,
            SearchCriterion::ByKeyFingerprint { .. } => SearchType::KeyFingerprint,
            SearchCriterion::ByAlias(_) => SearchType::Alias,
        }
    }

    /// Subject name, or issuer name for issuer-and-serial searches.
    pub fn name(&self) -> Option<&DistinguishedName> {
        match self {
            SearchCriterion::ByName(name) => Some(name),
            SearchCriterion::ByIssuerSerial { issuer, .. } => Some(issuer),
            _ => None,
        }
    }

    pub fn serial(&self) -> Option<&SerialNumber> {
        match self {
            SearchCriterion::ByIssuerSerial { serial, .. } => Some(serial),
            _ => None,
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            SearchCriterion::ByKeyFingerprint { fingerprint, .. } => Some(fingerprint),
            _ => None,
        }
    }

    pub fn string(&self) -> Option<&str> {
        match self {
            SearchCriterion::ByAlias(alias) => Some(alias),
            _ => None,
        }
    }

    pub fn digest(&self) -> Option<DigestAlgorithm> {
        match self {
            SearchCriterion::ByKeyFingerprint { digest, .. } => *digest,
            _ => None,
        }
    }

    /// Whether `object` satisfies the criterion. `Name` objects always do,
    /// since they only point at further objects.
    pub fn matches(&self, object: &StoreObject) -> bool {
        if let StoreObject::Name { .. } = object {
            return true;
        }
        match self {
            SearchCriterion::ByName(name) => match object {
                StoreObject::Certificate(cert) => cert.subject() == name,
                StoreObject::Crl(crl) => crl.issuer() == name,
                _ => false,
            },
            SearchCriterion::ByIssuerSerial { issuer, serial } => match object {
                StoreObject::Certificate(cert) => cert.issuer() == issuer && cert.serial() == serial,
                _ => false,
            },
            SearchCriterion::ByKeyFingerprint {
                digest,
                fingerprint,
            } => {
                let digest = digest.unwrap_or(DigestAlgorithm::Sha256);
                object
                    .subject_public_key()
                    .map_or(false, |key| key.fingerprint(digest) == *fingerprint)
            }
            // Aliases are a backend concept; generic objects carry none.
            SearchCriterion::ByAlias(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_crypto::{KeyType, PrivateKey};
    use std::sync::Arc;

    #[test]
    fn test_fingerprint_size_checked_at_construction() {
        let result = SearchCriterion::by_key_fingerprint(Some(DigestAlgorithm::Sha256), vec![0u8; 20]);
        assert!(matches!(
            result,
            Err(StoreError::FingerprintSizeMismatch {
                expected: 32,
                actual: 20,
                ..
            })
        ));
        assert!(SearchCriterion::by_key_fingerprint(None, vec![0u8; 20]).is_ok());
    }

    #[test]
    fn test_accessors() {
        let issuer = DistinguishedName::common_name("ca");
        let criterion = SearchCriterion::by_issuer_serial(issuer.clone(), SerialNumber::from(5));
        assert_eq!(criterion.search_type(), SearchType::IssuerSerial);
        assert_eq!(criterion.name(), Some(&issuer));
        assert_eq!(criterion.serial(), Some(&SerialNumber::from(5)));
        assert_eq!(criterion.bytes(), None);

        let alias = SearchCriterion::by_alias("signing");
        assert_eq!(alias.string(), Some("signing"));
        assert_eq!(alias.search_type(), SearchType::Alias);
    }

    #[test]
    fn test_fingerprint_matches_keys() {
        let key = PrivateKey::generate(KeyType::Ed25519);
        let fingerprint = key.public_key().fingerprint(DigestAlgorithm::Sha384);
        let criterion =
            SearchCriterion::by_key_fingerprint(Some(DigestAlgorithm::Sha384), fingerprint).unwrap();

        assert!(criterion.matches(&StoreObject::PublicKey(Arc::new(key.public_key()))));
        assert!(criterion.matches(&StoreObject::PrivateKey(Arc::new(key))));
        let other = PrivateKey::generate(KeyType::Ed25519);
        assert!(!criterion.matches(&StoreObject::PrivateKey(Arc::new(other))));
        assert!(criterion.matches(&StoreObject::new_name("dir/entry")));
    }
}
