//! Password-based MAC (RFC 4211, section 4.4).
//!
//! The MAC key is derived from a shared secret by hashing the secret with a
//! salt and re-hashing the result a configurable number of times. The
//! parameters travel with the message inside its protection algorithm
//! descriptor, so [`PbmParameter::decode`] treats its input as untrusted.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::digest::DigestAlgorithm;
use crate::error::{CryptoError, CryptoResult};
use crate::mac::{compute_mac, MacAlgorithm};

/// Object identifier of the password-based MAC algorithm.
pub const PASSWORD_BASED_MAC_OID: &str = "1.2.840.113533.7.66.13";

pub const MIN_ITERATION_COUNT: u32 = 100;
pub const MAX_ITERATION_COUNT: u32 = 100_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PbmParameter {
    #[serde(with = "crate::encoding::hex_bytes")]
    pub salt: Vec<u8>,
    pub owf: DigestAlgorithm,
    pub iteration_count: u32,
    pub mac: MacAlgorithm,
}

impl PbmParameter {
    /// Creates parameters with a fresh random salt of `salt_len` bytes.
    pub fn new(
        salt_len: usize,
        owf: DigestAlgorithm,
        iteration_count: u32,
        mac: MacAlgorithm,
    ) -> CryptoResult<Self> {
        let mut salt = vec![0u8; salt_len];
        rand::thread_rng().fill_bytes(&mut salt);
        let params = Self {
            salt,
            owf,
            iteration_count,
            mac,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> CryptoResult<()> {
        if self.salt.is_empty() {
            return Err(CryptoError::InvalidParameter {
                name: "salt".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if !(MIN_ITERATION_COUNT..=MAX_ITERATION_COUNT).contains(&self.iteration_count) {
            return Err(CryptoError::InvalidParameter {
                name: "iteration_count".to_string(),
                reason: format!(
                    "{} outside {}..={}",
                    self.iteration_count, MIN_ITERATION_COUNT, MAX_ITERATION_COUNT
                ),
            });
        }
        Ok(())
    }

    /// Computes the MAC of `data` keyed from `secret`.
    pub fn compute(&self, data: &[u8], secret: &[u8]) -> CryptoResult<Vec<u8>> {
        self.validate()?;

        let mut seed = Zeroizing::new(Vec::with_capacity(secret.len() + self.salt.len()));
        seed.extend_from_slice(secret);
        seed.extend_from_slice(&self.salt);

        let mut basekey = Zeroizing::new(self.owf.digest(&seed));
        for _ in 1..self.iteration_count {
            basekey = Zeroizing::new(self.owf.digest(&basekey));
        }

        compute_mac(self.mac, &basekey, data)
    }

    pub fn encode(&self) -> CryptoResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CryptoError::Encoding(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> CryptoResult<Self> {
        let params: Self =
            serde_json::from_slice(bytes).map_err(|e| CryptoError::Encoding(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> PbmParameter {
        PbmParameter {
            salt: vec![0x5a; 16],
            owf: DigestAlgorithm::Sha256,
            iteration_count: 500,
            mac: MacAlgorithm::HmacSha256,
        }
    }

    #[test]
    fn test_compute_is_deterministic() {
        let a = params().compute(b"protected part", b"hunter2").unwrap();
        let b = params().compute(b"protected part", b"hunter2").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_secret_salt_and_iterations_all_matter() {
        let base = params().compute(b"data", b"hunter2").unwrap();

        assert_ne!(base, params().compute(b"data", b"hunter3").unwrap());

        let mut salted = params();
        salted.salt[0] ^= 1;
        assert_ne!(base, salted.compute(b"data", b"hunter2").unwrap());

        let mut iterated = params();
        iterated.iteration_count += 1;
        assert_ne!(base, iterated.compute(b"data", b"hunter2").unwrap());
    }

    #[test]
    fn test_matches_manual_derivation() {
        let p = PbmParameter {
            iteration_count: 100,
            ..params()
        };
        let mut key = DigestAlgorithm::Sha256.digest(&[b"s3cret".as_slice(), &p.salt].concat());
        for _ in 1..100 {
            key = DigestAlgorithm::Sha256.digest(&key);
        }
        let expected = compute_mac(MacAlgorithm::HmacSha256, &key, b"msg").unwrap();
        assert_eq!(p.compute(b"msg", b"s3cret").unwrap(), expected);
    }

    #[test]
    fn test_new_draws_random_salt() {
        let a = PbmParameter::new(16, DigestAlgorithm::Sha256, 500, MacAlgorithm::HmacSha256)
            .unwrap();
        let b = PbmParameter::new(16, DigestAlgorithm::Sha256, 500, MacAlgorithm::HmacSha256)
            .unwrap();
        assert_eq!(a.salt.len(), 16);
        assert_ne!(a.salt, b.salt);
    }

    #[test]
    fn test_iteration_bounds() {
        assert!(PbmParameter::new(16, DigestAlgorithm::Sha256, 99, MacAlgorithm::HmacSha256).is_err());
        assert!(
            PbmParameter::new(16, DigestAlgorithm::Sha256, 100_001, MacAlgorithm::HmacSha256)
                .is_err()
        );
        assert!(PbmParameter::new(0, DigestAlgorithm::Sha256, 500, MacAlgorithm::HmacSha256).is_err());
    }

    #[test]
    fn test_encode_decode() {
        let p = params();
        let decoded = PbmParameter::decode(&p.encode().unwrap()).unwrap();
        assert_eq!(decoded, p);
    }

    #[test]
    fn test_decode_rejects_hostile_iteration_count() {
        let mut p = params();
        p.iteration_count = u32::MAX;
        let bytes = serde_json::to_vec(&p).unwrap();
        assert!(matches!(
            PbmParameter::decode(&bytes),
            Err(CryptoError::InvalidParameter { .. })
        ));
        assert!(matches!(
            PbmParameter::decode(b"not json"),
            Err(CryptoError::Encoding(_))
        ));
    }
}
