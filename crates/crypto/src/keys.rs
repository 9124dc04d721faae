//! Cryptographic key management
//!
//! Asymmetric keys are a closed set of Ed25519 and ECDSA P-256. Both sides
//! sign and verify through [`DigestAlgorithm`] so callers can drive either
//! key type from a signature algorithm identifier.

use ed25519_dalek::{Signer as _, Verifier as _};
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, Zeroizing};

use crate::digest::DigestAlgorithm;
use crate::error::{CryptoError, CryptoResult};

/// Length of key identifiers derived from public keys.
pub const KEY_IDENTIFIER_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyType {
    Ed25519,
    EcdsaP256,
}

impl KeyType {
    pub fn name(&self) -> &'static str {
        match self {
            KeyType::Ed25519 => "ed25519",
            KeyType::EcdsaP256 => "ecdsa-p256",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KeyType {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "ed25519" => Ok(KeyType::Ed25519),
            "ecdsa-p256" | "p256" | "p-256" => Ok(KeyType::EcdsaP256),
            _ => Err(CryptoError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// Private signing key.
#[derive(Clone)]
pub enum PrivateKey {
    Ed25519(ed25519_dalek::SigningKey),
    EcdsaP256(p256::ecdsa::SigningKey),
}

impl PrivateKey {
    pub fn generate(key_type: KeyType) -> Self {
        match key_type {
            KeyType::Ed25519 => {
                let mut secret = [0u8; 32];
                rand::thread_rng().fill_bytes(&mut secret);
                let key = ed25519_dalek::SigningKey::from_bytes(&secret);
                secret.zeroize();
                PrivateKey::Ed25519(key)
            }
            KeyType::EcdsaP256 => {
                PrivateKey::EcdsaP256(p256::ecdsa::SigningKey::random(&mut rand::rngs::OsRng))
            }
        }
    }

    /// Imports raw secret key bytes.
    pub fn from_bytes(key_type: KeyType, bytes: &[u8]) -> CryptoResult<Self> {
        match key_type {
            KeyType::Ed25519 => {
                let mut secret: [u8; 32] = bytes.try_into().map_err(|_| {
                    CryptoError::InvalidKey(format!(
                        "Ed25519 secret must be 32 bytes, got {}",
                        bytes.len()
                    ))
                })?;
                let key = ed25519_dalek::SigningKey::from_bytes(&secret);
                secret.zeroize();
                Ok(PrivateKey::Ed25519(key))
            }
            KeyType::EcdsaP256 => p256::ecdsa::SigningKey::from_slice(bytes)
                .map(PrivateKey::EcdsaP256)
                .map_err(|e| CryptoError::InvalidKey(e.to_string())),
        }
    }

    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        match self {
            PrivateKey::Ed25519(key) => Zeroizing::new(key.to_bytes().to_vec()),
            PrivateKey::EcdsaP256(key) => Zeroizing::new(key.to_bytes().to_vec()),
        }
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            PrivateKey::Ed25519(_) => KeyType::Ed25519,
            PrivateKey::EcdsaP256(_) => KeyType::EcdsaP256,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::Ed25519(key) => PublicKey::Ed25519(key.verifying_key()),
            PrivateKey::EcdsaP256(key) => PublicKey::EcdsaP256(*key.verifying_key()),
        }
    }

    /// Signs `data` using `digest`.
    ///
    /// Ed25519 hashes internally with SHA-512 and accepts no other digest.
    /// ECDSA signs the prehash and returns the fixed-size `r || s` encoding.
    pub fn sign(&self, digest: DigestAlgorithm, data: &[u8]) -> CryptoResult<Vec<u8>> {
        match self {
            PrivateKey::Ed25519(key) => {
                require_ed25519_digest(digest)?;
                Ok(key.sign(data).to_bytes().to_vec())
            }
            PrivateKey::EcdsaP256(key) => {
                let prehash = digest.digest(data);
                let signature: p256::ecdsa::Signature = key
                    .sign_prehash(&prehash)
                    .map_err(|e| CryptoError::SignatureFailed(e.to_string()))?;
                Ok(signature.to_bytes().to_vec())
            }
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("key_type", &self.key_type())
            .finish_non_exhaustive()
    }
}

/// Public verification key.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "EncodedPublicKey", into = "EncodedPublicKey")]
pub enum PublicKey {
    Ed25519(ed25519_dalek::VerifyingKey),
    EcdsaP256(p256::ecdsa::VerifyingKey),
}

impl PublicKey {
    pub fn from_bytes(key_type: KeyType, bytes: &[u8]) -> CryptoResult<Self> {
        match key_type {
            KeyType::Ed25519 => {
                let raw: [u8; 32] = bytes.try_into().map_err(|_| {
                    CryptoError::InvalidKey(format!(
                        "Ed25519 public key must be 32 bytes, got {}",
                        bytes.len()
                    ))
                })?;
                ed25519_dalek::VerifyingKey::from_bytes(&raw)
                    .map(PublicKey::Ed25519)
                    .map_err(|e| CryptoError::InvalidKey(e.to_string()))
            }
            KeyType::EcdsaP256 => p256::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
                .map(PublicKey::EcdsaP256)
                .map_err(|e| CryptoError::InvalidKey(e.to_string())),
        }
    }

    /// Raw encoding: 32 bytes for Ed25519, compressed SEC1 point for P-256.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            PublicKey::Ed25519(key) => key.to_bytes().to_vec(),
            PublicKey::EcdsaP256(key) => key.to_encoded_point(true).as_bytes().to_vec(),
        }
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            PublicKey::Ed25519(_) => KeyType::Ed25519,
            PublicKey::EcdsaP256(_) => KeyType::EcdsaP256,
        }
    }

    pub fn verify(&self, digest: DigestAlgorithm, data: &[u8], signature: &[u8]) -> CryptoResult<()> {
        match self {
            PublicKey::Ed25519(key) => {
                require_ed25519_digest(digest)?;
                let signature = ed25519_dalek::Signature::from_slice(signature)
                    .map_err(|_| CryptoError::VerificationFailed)?;
                key.verify(data, &signature)
                    .map_err(|_| CryptoError::VerificationFailed)
            }
            PublicKey::EcdsaP256(key) => {
                let signature = p256::ecdsa::Signature::from_slice(signature)
                    .map_err(|_| CryptoError::VerificationFailed)?;
                key.verify_prehash(&digest.digest(data), &signature)
                    .map_err(|_| CryptoError::VerificationFailed)
            }
        }
    }

    /// Key identifier: leading bytes of the SHA-256 of the raw public key.
    pub fn key_identifier(&self) -> Vec<u8> {
        let mut id = DigestAlgorithm::Sha256.digest(&self.to_bytes());
        id.truncate(KEY_IDENTIFIER_LEN);
        id
    }

    /// Digest of the raw public key, as used by fingerprint searches.
    pub fn fingerprint(&self, digest: DigestAlgorithm) -> Vec<u8> {
        digest.digest(&self.to_bytes())
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.key_type() == other.key_type() && self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PublicKey {}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("key_type", &self.key_type())
            .field("key", &hex::encode(self.to_bytes()))
            .finish()
    }
}

/// Serialized form of a public key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedPublicKey {
    pub key_type: KeyType,
    #[serde(with = "crate::encoding::hex_bytes")]
    pub key: Vec<u8>,
}

impl From<PublicKey> for EncodedPublicKey {
    fn from(key: PublicKey) -> Self {
        Self {
            key_type: key.key_type(),
            key: key.to_bytes(),
        }
    }
}

impl TryFrom<EncodedPublicKey> for PublicKey {
    type Error = CryptoError;

    fn try_from(encoded: EncodedPublicKey) -> Result<Self, Self::Error> {
        PublicKey::from_bytes(encoded.key_type, &encoded.key)
    }
}

fn require_ed25519_digest(digest: DigestAlgorithm) -> CryptoResult<()> {
    if digest != DigestAlgorithm::Sha512 {
        return Err(CryptoError::UnsupportedAlgorithm(format!(
            "Ed25519 with {digest}"
        )));
    }
    Ok(())
}
