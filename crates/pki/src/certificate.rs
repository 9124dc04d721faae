//! X.509-style certificates.
//!
//! A [`Certificate`] is a signed [`TbsCertificate`]. The to-be-signed part is
//! serialized deterministically and signed with the issuer's key under the
//! signature algorithm recorded in the certificate itself.

use keystone_crypto::{
    find_signature_algorithm, find_signature_oid, DigestAlgorithm, PrivateKey, PublicKey,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PkiError, PkiResult};
use crate::name::DistinguishedName;

/// Certificate serial number as unsigned big-endian bytes.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerialNumber(#[serde(with = "keystone_crypto::encoding::hex_bytes")] Vec<u8>);

impl SerialNumber {
    /// Builds a serial from big-endian bytes, dropping redundant leading zeros.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        let trimmed = &bytes[first..];
        if trimmed.is_empty() {
            Self(vec![0])
        } else {
            Self(trimmed.to_vec())
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<u64> for SerialNumber {
    fn from(value: u64) -> Self {
        Self::from_bytes(&value.to_be_bytes())
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(&self.0))
    }
}

impl fmt::Debug for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SerialNumber({self})")
    }
}

/// Signed portion of a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TbsCertificate {
    pub serial: SerialNumber,
    /// OID of the algorithm the issuer signed with
    pub signature_algorithm: String,
    pub issuer: DistinguishedName,
    pub subject: DistinguishedName,
    /// Not valid before (Unix timestamp, seconds)
    pub not_before: u64,
    /// Not valid after (Unix timestamp, seconds)
    pub not_after: u64,
    pub public_key: PublicKey,
    #[serde(default, with = "keystone_crypto::encoding::hex_bytes_opt")]
    pub subject_key_id: Option<Vec<u8>>,
    #[serde(default, with = "keystone_crypto::encoding::hex_bytes_opt")]
    pub authority_key_id: Option<Vec<u8>>,
}

impl TbsCertificate {
    pub fn to_bytes(&self) -> PkiResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub tbs: TbsCertificate,
    #[serde(with = "keystone_crypto::encoding::hex_bytes")]
    pub signature: Vec<u8>,
}

impl Certificate {
    pub fn serial(&self) -> &SerialNumber {
        &self.tbs.serial
    }

    pub fn subject(&self) -> &DistinguishedName {
        &self.tbs.subject
    }

    pub fn issuer(&self) -> &DistinguishedName {
        &self.tbs.issuer
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.tbs.public_key
    }

    pub fn subject_key_id(&self) -> Option<&[u8]> {
        self.tbs.subject_key_id.as_deref()
    }

    pub fn authority_key_id(&self) -> Option<&[u8]> {
        self.tbs.authority_key_id.as_deref()
    }

    pub fn signature_algorithm(&self) -> &str {
        &self.tbs.signature_algorithm
    }

    pub fn is_valid_at(&self, unix_secs: u64) -> bool {
        self.tbs.not_before <= unix_secs && unix_secs <= self.tbs.not_after
    }

    /// Subject and issuer names are equal.
    pub fn is_self_issued(&self) -> bool {
        self.tbs.subject == self.tbs.issuer
    }

    /// Self-issued and, when an authority key id is present, it names this
    /// certificate's own key. The signature itself is not checked.
    pub fn is_self_signed(&self) -> bool {
        if !self.is_self_issued() {
            return false;
        }
        match (self.authority_key_id(), self.subject_key_id()) {
            (Some(akid), Some(skid)) => akid == skid,
            _ => true,
        }
    }

    /// Whether `key` is the private half of the certified public key.
    pub fn check_private_key(&self, key: &PrivateKey) -> bool {
        key.public_key() == self.tbs.public_key
    }

    /// Whether `issuer` could have issued this certificate by name and key id.
    pub fn names_issuer(&self, issuer: &Certificate) -> bool {
        if self.tbs.issuer != issuer.tbs.subject {
            return false;
        }
        match (self.authority_key_id(), issuer.subject_key_id()) {
            (Some(akid), Some(skid)) => akid == skid,
            _ => true,
        }
    }

    pub fn verify_signature(&self, issuer_key: &PublicKey) -> PkiResult<()> {
        let algorithm = find_signature_algorithm(&self.tbs.signature_algorithm).ok_or_else(|| {
            PkiError::UnsupportedSignatureAlgorithm(self.tbs.signature_algorithm.clone())
        })?;
        if algorithm.key_type != issuer_key.key_type() {
            return Err(PkiError::SignatureVerification(format!(
                "{} signature cannot be checked with a {} key",
                algorithm.name,
                issuer_key.key_type()
            )));
        }
        issuer_key
            .verify(algorithm.digest, &self.tbs.to_bytes()?, &self.signature)
            .map_err(|e| PkiError::SignatureVerification(e.to_string()))
    }

    pub fn encode(&self) -> PkiResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> PkiResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Digest of the full encoded certificate.
    pub fn fingerprint(&self, digest: DigestAlgorithm) -> PkiResult<Vec<u8>> {
        Ok(digest.digest(&self.encode()?))
    }
}

/// Builder for signed certificates.
#[derive(Debug, Clone)]
pub struct CertificateBuilder {
    subject: DistinguishedName,
    public_key: PublicKey,
    serial: SerialNumber,
    not_before: u64,
    not_after: u64,
    subject_key_id: Option<Vec<u8>>,
}

impl CertificateBuilder {
    /// Starts a certificate for `subject`, valid from now for one year, with
    /// a subject key id derived from `public_key`.
    pub fn new(subject: DistinguishedName, public_key: PublicKey) -> Self {
        let now = current_timestamp();
        let subject_key_id = Some(public_key.key_identifier());
        Self {
            subject,
            public_key,
            serial: SerialNumber::from(1),
            not_before: now,
            not_after: now + 365 * 24 * 60 * 60,
            subject_key_id,
        }
    }

    pub fn serial(mut self, serial: impl Into<SerialNumber>) -> Self {
        self.serial = serial.into();
        self
    }

    pub fn validity(mut self, not_before: u64, not_after: u64) -> Self {
        self.not_before = not_before;
        self.not_after = not_after;
        self
    }

    pub fn validity_days(mut self, days: u64) -> Self {
        self.not_before = current_timestamp();
        self.not_after = self.not_before + days * 24 * 60 * 60;
        self
    }

    /// Overrides the subject key id; `None` omits the extension.
    pub fn subject_key_id(mut self, id: Option<Vec<u8>>) -> Self {
        self.subject_key_id = id;
        self
    }

    /// Signs the certificate with its own key.
    pub fn self_signed(self, key: &PrivateKey, digest: DigestAlgorithm) -> PkiResult<Certificate> {
        let issuer = self.subject.clone();
        let authority_key_id = self.subject_key_id.clone();
        self.sign(issuer, authority_key_id, key, digest)
    }

    /// Signs the certificate as `issuer`, whose private key is `issuer_key`.
    pub fn issued_by(
        self,
        issuer: &Certificate,
        issuer_key: &PrivateKey,
        digest: DigestAlgorithm,
    ) -> PkiResult<Certificate> {
        if !issuer.check_private_key(issuer_key) {
            return Err(PkiError::CertificateAuthority(
                "issuer key does not match issuer certificate".to_string(),
            ));
        }
        self.sign(
            issuer.subject().clone(),
            issuer.tbs.subject_key_id.clone(),
            issuer_key,
            digest,
        )
    }

    fn sign(
        self,
        issuer: DistinguishedName,
        authority_key_id: Option<Vec<u8>>,
        key: &PrivateKey,
        digest: DigestAlgorithm,
    ) -> PkiResult<Certificate> {
        let signature_algorithm = find_signature_oid(digest, key.key_type()).ok_or_else(|| {
            PkiError::UnsupportedSignatureAlgorithm(format!("{} with {}", key.key_type(), digest))
        })?;
        let tbs = TbsCertificate {
            serial: self.serial,
            signature_algorithm: signature_algorithm.to_string(),
            issuer,
            subject: self.subject,
            not_before: self.not_before,
            not_after: self.not_after,
            public_key: self.public_key,
            subject_key_id: self.subject_key_id,
            authority_key_id,
        };
        let signature = key.sign(digest, &tbs.to_bytes()?)?;
        Ok(Certificate { tbs, signature })
    }
}

/// Get current timestamp in seconds.
pub(crate) fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
