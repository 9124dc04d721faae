//! MAC algorithms exposed through the digest-sign interface.
//!
//! Some protocols treat a keyed MAC as a "signature": the caller initialises
//! a signing context with a key, streams data through it and collects a
//! tag. [`MacSignatureContext`] provides that lifecycle for HMAC and keyed
//! BLAKE3, and [`SignatureRegistry`] maps provider names to them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::digest::DigestAlgorithm;
use crate::error::{CryptoError, CryptoResult};
use crate::mac::{MacAlgorithm, MacState};

/// Secret key for MAC signatures. Shared between contexts through `Arc`.
pub struct MacKey {
    secret: Zeroizing<Vec<u8>>,
}

impl MacKey {
    pub fn new(secret: impl Into<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self {
            secret: Zeroizing::new(secret.into()),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for MacKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacKey")
            .field("len", &self.secret.len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacSignatureKind {
    Hmac,
    Blake3,
}

impl MacSignatureKind {
    pub fn name(&self) -> &'static str {
        match self {
            MacSignatureKind::Hmac => "HMAC",
            MacSignatureKind::Blake3 => "BLAKE3",
        }
    }
}

/// Streaming MAC signing context. Cloning duplicates the running state.
#[derive(Debug, Clone)]
pub struct MacSignatureContext {
    kind: MacSignatureKind,
    key: Option<Arc<MacKey>>,
    state: Option<MacState>,
}

impl MacSignatureContext {
    pub fn new(kind: MacSignatureKind) -> Self {
        Self {
            kind,
            key: None,
            state: None,
        }
    }

    pub fn kind(&self) -> MacSignatureKind {
        self.kind
    }

    /// Binds `key` and starts a fresh computation.
    ///
    /// `digest` selects the HMAC hash (SHA-256 when absent). Keyed BLAKE3
    /// takes no digest.
    pub fn digest_sign_init(&mut self, digest: Option<&str>, key: Arc<MacKey>) -> CryptoResult<()> {
        let state = match self.kind {
            MacSignatureKind::Hmac => {
                let digest: DigestAlgorithm = digest.unwrap_or("sha256").parse()?;
                let algorithm = MacAlgorithm::for_digest(digest).ok_or_else(|| {
                    CryptoError::UnsupportedAlgorithm(format!("HMAC with {digest}"))
                })?;
                MacState::hmac(algorithm, key.as_bytes())?
            }
            MacSignatureKind::Blake3 => {
                if let Some(digest) = digest {
                    return Err(CryptoError::InvalidParameter {
                        name: "digest".to_string(),
                        reason: format!("keyed BLAKE3 does not take a digest ({digest})"),
                    });
                }
                MacState::blake3(key.as_bytes())?
            }
        };
        self.key = Some(key);
        self.state = Some(state);
        Ok(())
    }

    pub fn update(&mut self, data: &[u8]) -> CryptoResult<()> {
        self.state
            .as_mut()
            .ok_or_else(not_initialised)?
            .update(data);
        Ok(())
    }

    /// Produces the tag. The context must be re-initialised before reuse.
    pub fn finalize(&mut self) -> CryptoResult<Vec<u8>> {
        let state = self.state.take().ok_or_else(not_initialised)?;
        Ok(state.finalize())
    }

    /// Size of the tag [`finalize`](Self::finalize) will produce.
    pub fn output_size(&self) -> Option<usize> {
        self.state.as_ref().map(MacState::output_size)
    }

    pub fn key(&self) -> Option<&Arc<MacKey>> {
        self.key.as_ref()
    }
}

fn not_initialised() -> CryptoError {
    CryptoError::InvalidParameter {
        name: "context".to_string(),
        reason: "digest_sign_init has not been called".to_string(),
    }
}

/// Name-to-provider table for MAC signature algorithms.
///
/// Names are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct SignatureRegistry {
    providers: HashMap<String, MacSignatureKind>,
}

impl SignatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `HMAC` and `BLAKE3` providers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("HMAC", MacSignatureKind::Hmac);
        registry.register("BLAKE3", MacSignatureKind::Blake3);
        registry.register("BLAKE3-KEYED", MacSignatureKind::Blake3);
        registry
    }

    pub fn register(&mut self, name: &str, kind: MacSignatureKind) {
        tracing::debug!("Registering MAC signature provider {} => {}", name, kind.name());
        self.providers.insert(name.to_ascii_uppercase(), kind);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(&name.to_ascii_uppercase())
    }

    /// Creates a fresh signing context for `name`.
    pub fn fetch(&self, name: &str) -> CryptoResult<MacSignatureContext> {
        self.providers
            .get(&name.to_ascii_uppercase())
            .map(|kind| MacSignatureContext::new(*kind))
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
