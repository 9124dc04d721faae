//! Certificate revocation lists.

use keystone_crypto::{find_signature_algorithm, find_signature_oid, DigestAlgorithm, PrivateKey, PublicKey};
use serde::{Deserialize, Serialize};

use crate::certificate::SerialNumber;
use crate::error::{PkiError, PkiResult};
use crate::name::DistinguishedName;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokedCertificate {
    pub serial: SerialNumber,
    pub revocation_date: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TbsCertList {
    pub signature_algorithm: String,
    pub issuer: DistinguishedName,
    pub this_update: u64,
    pub next_update: Option<u64>,
    pub revoked: Vec<RevokedCertificate>,
}

/// Signed list of revoked serial numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRevocationList {
    pub tbs: TbsCertList,
    #[serde(with = "keystone_crypto::encoding::hex_bytes")]
    pub signature: Vec<u8>,
}

impl CertificateRevocationList {
    pub fn sign(
        issuer: DistinguishedName,
        revoked: Vec<RevokedCertificate>,
        this_update: u64,
        next_update: Option<u64>,
        key: &PrivateKey,
        digest: DigestAlgorithm,
    ) -> PkiResult<Self> {
        let signature_algorithm = find_signature_oid(digest, key.key_type()).ok_or_else(|| {
            PkiError::UnsupportedSignatureAlgorithm(format!("{} with {}", key.key_type(), digest))
        })?;
        let tbs = TbsCertList {
            signature_algorithm: signature_algorithm.to_string(),
            issuer,
            this_update,
            next_update,
            revoked,
        };
        let signature = key.sign(digest, &serde_json::to_vec(&tbs)?)?;
        Ok(Self { tbs, signature })
    }

    pub fn issuer(&self) -> &DistinguishedName {
        &self.tbs.issuer
    }

    pub fn is_revoked(&self, serial: &SerialNumber) -> bool {
        self.tbs.revoked.iter().any(|entry| &entry.serial == serial)
    }

    pub fn revoked(&self) -> &[RevokedCertificate] {
        &self.tbs.revoked
    }

    pub fn verify_signature(&self, issuer_key: &PublicKey) -> PkiResult<()> {
        let algorithm = find_signature_algorithm(&self.tbs.signature_algorithm).ok_or_else(|| {
            PkiError::UnsupportedSignatureAlgorithm(self.tbs.signature_algorithm.clone())
        })?;
        issuer_key
            .verify(algorithm.digest, &serde_json::to_vec(&self.tbs)?, &self.signature)
            .map_err(|e| PkiError::SignatureVerification(e.to_string()))
    }

    pub fn encode(&self) -> PkiResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> PkiResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_crypto::KeyType;

    #[test]
    fn test_signed_crl() {
        let key = PrivateKey::generate(KeyType::Ed25519);
        let crl = CertificateRevocationList::sign(
            DistinguishedName::common_name("ca"),
            vec![RevokedCertificate {
                serial: SerialNumber::from(7),
                revocation_date: 1_700_000_000,
            }],
            1_700_000_000,
            None,
            &key,
            DigestAlgorithm::Sha512,
        )
        .unwrap();

        assert!(crl.is_revoked(&SerialNumber::from(7)));
        assert!(!crl.is_revoked(&SerialNumber::from(8)));
        assert!(crl.verify_signature(&key.public_key()).is_ok());

        let other = PrivateKey::generate(KeyType::Ed25519);
        assert!(crl.verify_signature(&other.public_key()).is_err());

        let decoded = CertificateRevocationList::decode(&crl.encode().unwrap()).unwrap();
        assert_eq!(decoded, crl);
    }
}
