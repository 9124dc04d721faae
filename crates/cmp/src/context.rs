//! Protocol context holding credentials and protection preferences.

use keystone_core::ProtectionConfig;
use keystone_crypto::{DigestAlgorithm, MacAlgorithm, PrivateKey};
use keystone_pki::Certificate;
use std::fmt;
use zeroize::Zeroizing;

use crate::error::{CmpError, CmpResult};

/// Long-lived, caller-owned state consulted when protecting messages.
///
/// A shared secret selects password-based MAC protection. Otherwise a
/// certificate together with its private key selects signature protection.
#[derive(Clone)]
pub struct ProtocolContext {
    secret_value: Option<Zeroizing<Vec<u8>>>,
    reference_value: Option<Vec<u8>>,
    private_key: Option<PrivateKey>,
    certificate: Option<Certificate>,
    untrusted: Option<Vec<Certificate>>,
    extra_certs_out: Vec<Certificate>,
    peer_certificate: Option<Certificate>,
    digest: DigestAlgorithm,
    pbm_salt_len: usize,
    pbm_salt: Option<Vec<u8>>,
    pbm_owf: DigestAlgorithm,
    pbm_iteration_count: u32,
    pbm_mac: MacAlgorithm,
    unprotected_send: bool,
}

impl Default for ProtocolContext {
    fn default() -> Self {
        Self {
            secret_value: None,
            reference_value: None,
            private_key: None,
            certificate: None,
            untrusted: None,
            extra_certs_out: Vec::new(),
            peer_certificate: None,
            digest: DigestAlgorithm::Sha256,
            pbm_salt_len: 16,
            pbm_salt: None,
            pbm_owf: DigestAlgorithm::Sha256,
            pbm_iteration_count: 500,
            pbm_mac: MacAlgorithm::HmacSha256,
            unprotected_send: false,
        }
    }
}

impl ProtocolContext {
    /// Create an empty context with default algorithm preferences.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with algorithm preferences taken from configuration.
    pub fn from_config(config: &ProtectionConfig) -> CmpResult<Self> {
        let parse_digest = |name: &str| {
            name.parse::<DigestAlgorithm>()
                .map_err(|_| CmpError::UnknownAlgorithm(name.to_string()))
        };
        let pbm_mac = config
            .pbm_mac
            .parse::<MacAlgorithm>()
            .map_err(|_| CmpError::UnknownAlgorithm(config.pbm_mac.clone()))?;

        Ok(Self {
            digest: parse_digest(&config.digest)?,
            pbm_salt_len: config.pbm_salt_len,
            pbm_owf: parse_digest(&config.pbm_owf)?,
            pbm_iteration_count: config.pbm_iteration_count,
            pbm_mac,
            unprotected_send: config.unprotected_send,
            ..Self::default()
        })
    }

    /// Shared secret for password-based MAC protection. Takes precedence
    /// over any certificate and key.
    pub fn set_secret_value(&mut self, secret: impl Into<Vec<u8>>) {
        self.secret_value = Some(Zeroizing::new(secret.into()));
    }

    /// Drop the shared secret, falling back to signature protection.
    pub fn clear_secret_value(&mut self) {
        self.secret_value = None;
    }

    /// Current shared secret, if any.
    pub fn secret_value(&self) -> Option<&[u8]> {
        self.secret_value.as_deref().map(Vec::as_slice)
    }

    /// Sender reference used as sender key id on the shared-secret path.
    pub fn set_reference_value(&mut self, reference: impl Into<Vec<u8>>) {
        self.reference_value = Some(reference.into());
    }

    pub fn reference_value(&self) -> Option<&[u8]> {
        self.reference_value.as_deref()
    }

    /// Set the own certificate and its private key together.
    pub fn set_credentials(&mut self, certificate: Certificate, private_key: PrivateKey) {
        self.certificate = Some(certificate);
        self.private_key = Some(private_key);
    }

    /// Own certificate for signature protection.
    pub fn set_certificate(&mut self, certificate: Option<Certificate>) {
        self.certificate = certificate;
    }

    /// Private key matching the own certificate.
    pub fn set_private_key(&mut self, private_key: Option<PrivateKey>) {
        self.private_key = private_key;
    }

    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    pub fn private_key(&self) -> Option<&PrivateKey> {
        self.private_key.as_ref()
    }

    /// Pool of intermediate certificates used to complete the own chain.
    pub fn set_untrusted(&mut self, certs: Option<Vec<Certificate>>) {
        self.untrusted = certs;
    }

    pub fn untrusted(&self) -> Option<&[Certificate]> {
        self.untrusted.as_deref()
    }

    /// Certificates to attach to every outgoing message.
    pub fn set_extra_certs_out(&mut self, certs: Vec<Certificate>) {
        self.extra_certs_out = certs;
    }

    pub fn extra_certs_out(&self) -> &[Certificate] {
        &self.extra_certs_out
    }

    /// Certificate expected to verify signature-protected responses.
    pub fn set_peer_certificate(&mut self, certificate: Option<Certificate>) {
        self.peer_certificate = certificate;
    }

    pub fn peer_certificate(&self) -> Option<&Certificate> {
        self.peer_certificate.as_ref()
    }

    /// Digest combined with the private key to pick the signature algorithm.
    pub fn set_digest(&mut self, digest: DigestAlgorithm) {
        self.digest = digest;
    }

    pub fn digest(&self) -> DigestAlgorithm {
        self.digest
    }

    /// Length of the random salt drawn when no fixed salt is set.
    pub fn set_pbm_salt_len(&mut self, len: usize) {
        self.pbm_salt_len = len;
    }

    pub fn pbm_salt_len(&self) -> usize {
        self.pbm_salt_len
    }

    /// Fixed PBM salt. When unset a fresh random salt is drawn per message.
    pub fn set_pbm_salt(&mut self, salt: Option<Vec<u8>>) {
        self.pbm_salt = salt;
    }

    pub fn pbm_salt(&self) -> Option<&[u8]> {
        self.pbm_salt.as_deref()
    }

    /// One-way function used to stretch the shared secret.
    pub fn set_pbm_owf(&mut self, owf: DigestAlgorithm) {
        self.pbm_owf = owf;
    }

    pub fn pbm_owf(&self) -> DigestAlgorithm {
        self.pbm_owf
    }

    /// Number of one-way function rounds applied to secret and salt.
    pub fn set_pbm_iteration_count(&mut self, count: u32) {
        self.pbm_iteration_count = count;
    }

    pub fn pbm_iteration_count(&self) -> u32 {
        self.pbm_iteration_count
    }

    /// MAC algorithm keyed with the stretched secret.
    pub fn set_pbm_mac(&mut self, mac: MacAlgorithm) {
        self.pbm_mac = mac;
    }

    pub fn pbm_mac(&self) -> MacAlgorithm {
        self.pbm_mac
    }

    /// Send messages without any protection.
    pub fn set_unprotected_send(&mut self, unprotected: bool) {
        self.unprotected_send = unprotected;
    }

    pub fn unprotected_send(&self) -> bool {
        self.unprotected_send
    }
}

impl fmt::Debug for ProtocolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolContext")
            .field("secret_value", &self.secret_value.as_ref().map(|_| "<redacted>"))
            .field("reference_value", &self.reference_value)
            .field("private_key", &self.private_key)
            .field("certificate", &self.certificate.as_ref().map(Certificate::subject))
            .field("untrusted", &self.untrusted.as_ref().map(Vec::len))
            .field("extra_certs_out", &self.extra_certs_out.len())
            .field("digest", &self.digest)
            .field("pbm_owf", &self.pbm_owf)
            .field("pbm_iteration_count", &self.pbm_iteration_count)
            .field("pbm_mac", &self.pbm_mac)
            .field("unprotected_send", &self.unprotected_send)
            .finish()
    }
}
