//! Keyed message authentication codes.
//!
//! [`MacAlgorithm`] names the HMAC variants that can appear in protocol
//! descriptors. [`MacState`] is the running computation shared by the
//! one-shot [`compute_mac`] and the streaming MAC signature providers.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;

use crate::digest::DigestAlgorithm;
use crate::error::{CryptoError, CryptoResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MacAlgorithm {
    HmacSha256,
    HmacSha384,
    HmacSha512,
}

impl MacAlgorithm {
    pub const ALL: [MacAlgorithm; 3] = [
        MacAlgorithm::HmacSha256,
        MacAlgorithm::HmacSha384,
        MacAlgorithm::HmacSha512,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MacAlgorithm::HmacSha256 => "hmac-sha256",
            MacAlgorithm::HmacSha384 => "hmac-sha384",
            MacAlgorithm::HmacSha512 => "hmac-sha512",
        }
    }

    pub fn oid(&self) -> &'static str {
        match self {
            MacAlgorithm::HmacSha256 => "1.2.840.113549.2.9",
            MacAlgorithm::HmacSha384 => "1.2.840.113549.2.10",
            MacAlgorithm::HmacSha512 => "1.2.840.113549.2.11",
        }
    }

    pub fn from_oid(oid: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.oid() == oid)
    }

    /// The HMAC variant built on `digest`, if there is one.
    pub fn for_digest(digest: DigestAlgorithm) -> Option<Self> {
        match digest {
            DigestAlgorithm::Sha256 => Some(MacAlgorithm::HmacSha256),
            DigestAlgorithm::Sha384 => Some(MacAlgorithm::HmacSha384),
            DigestAlgorithm::Sha512 => Some(MacAlgorithm::HmacSha512),
            DigestAlgorithm::Blake3 => None,
        }
    }

    pub fn output_size(&self) -> usize {
        match self {
            MacAlgorithm::HmacSha256 => 32,
            MacAlgorithm::HmacSha384 => 48,
            MacAlgorithm::HmacSha512 => 64,
        }
    }
}

impl fmt::Display for MacAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MacAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase().replace(['-', '_'], "");
        match normalized.as_str() {
            "hmacsha256" => Ok(MacAlgorithm::HmacSha256),
            "hmacsha384" => Ok(MacAlgorithm::HmacSha384),
            "hmacsha512" => Ok(MacAlgorithm::HmacSha512),
            _ => Err(CryptoError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// In-progress MAC computation.
#[derive(Clone)]
pub enum MacState {
    HmacSha256(Hmac<Sha256>),
    HmacSha384(Hmac<Sha384>),
    HmacSha512(Hmac<Sha512>),
    Blake3(Box<blake3::Hasher>),
}

impl MacState {
    pub fn hmac(algorithm: MacAlgorithm, key: &[u8]) -> CryptoResult<Self> {
        let invalid = |e: hmac::digest::InvalidLength| CryptoError::InvalidKey(e.to_string());
        Ok(match algorithm {
            MacAlgorithm::HmacSha256 => {
                MacState::HmacSha256(Hmac::<Sha256>::new_from_slice(key).map_err(invalid)?)
            }
            MacAlgorithm::HmacSha384 => {
                MacState::HmacSha384(Hmac::<Sha384>::new_from_slice(key).map_err(invalid)?)
            }
            MacAlgorithm::HmacSha512 => {
                MacState::HmacSha512(Hmac::<Sha512>::new_from_slice(key).map_err(invalid)?)
            }
        })
    }

    /// Keyed BLAKE3; the key must be exactly 32 bytes.
    pub fn blake3(key: &[u8]) -> CryptoResult<Self> {
        let key: [u8; blake3::KEY_LEN] = key.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!(
                "BLAKE3 key must be {} bytes, got {}",
                blake3::KEY_LEN,
                key.len()
            ))
        })?;
        Ok(MacState::Blake3(Box::new(blake3::Hasher::new_keyed(&key))))
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            MacState::HmacSha256(mac) => mac.update(data),
            MacState::HmacSha384(mac) => mac.update(data),
            MacState::HmacSha512(mac) => mac.update(data),
            MacState::Blake3(hasher) => {
                hasher.update(data);
            }
        }
    }

    pub fn finalize(self) -> Vec<u8> {
        match self {
            MacState::HmacSha256(mac) => mac.finalize().into_bytes().to_vec(),
            MacState::HmacSha384(mac) => mac.finalize().into_bytes().to_vec(),
            MacState::HmacSha512(mac) => mac.finalize().into_bytes().to_vec(),
            MacState::Blake3(hasher) => hasher.finalize().as_bytes().to_vec(),
        }
    }

    pub fn output_size(&self) -> usize {
        match self {
            MacState::HmacSha256(_) => 32,
            MacState::HmacSha384(_) => 48,
            MacState::HmacSha512(_) => 64,
            MacState::Blake3(_) => blake3::OUT_LEN,
        }
    }
}

impl fmt::Debug for MacState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            MacState::HmacSha256(_) => "hmac-sha256",
            MacState::HmacSha384(_) => "hmac-sha384",
            MacState::HmacSha512(_) => "hmac-sha512",
            MacState::Blake3(_) => "blake3-keyed",
        };
        f.debug_tuple("MacState").field(&kind).finish()
    }
}

/// One-shot MAC over `data`.
pub fn compute_mac(algorithm: MacAlgorithm, key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
    let mut state = MacState::hmac(algorithm, key)?;
    state.update(data);
    Ok(state.finalize())
}

/// Compares two tags without leaking where they differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_sha256_rfc4231_case_2() {
        let tag = compute_mac(
            MacAlgorithm::HmacSha256,
            b"Jefe",
            b"what do ya want for nothing?",
        )
        .unwrap();
        assert_eq!(
            hex::encode(tag),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let mut state = MacState::hmac(MacAlgorithm::HmacSha512, b"key").unwrap();
        state.update(b"split ");
        state.update(b"input");
        let streamed = state.finalize();

        let one_shot = compute_mac(MacAlgorithm::HmacSha512, b"key", b"split input").unwrap();
        assert_eq!(streamed, one_shot);
        assert_eq!(streamed.len(), MacAlgorithm::HmacSha512.output_size());
    }

    #[test]
    fn test_blake3_rejects_short_key() {
        assert!(matches!(
            MacState::blake3(&[0u8; 16]),
            Err(CryptoError::InvalidKey(_))
        ));
        assert!(MacState::blake3(&[7u8; 32]).is_ok());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"tag", b"tag"));
        assert!(!constant_time_eq(b"tag", b"taG"));
        assert!(!constant_time_eq(b"tag", b"tags"));
    }

    #[test]
    fn test_names_round_trip() {
        for alg in MacAlgorithm::ALL {
            assert_eq!(alg.name().parse::<MacAlgorithm>().unwrap(), alg);
            assert_eq!(MacAlgorithm::from_oid(alg.oid()), Some(alg));
        }
    }
}
