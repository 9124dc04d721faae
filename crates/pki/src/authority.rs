//! Certificate authority managing certificate lifecycle.

use keystone_crypto::{DigestAlgorithm, PrivateKey, PublicKey};
use std::collections::{BTreeMap, BTreeSet};

use crate::certificate::{current_timestamp, Certificate, CertificateBuilder, SerialNumber};
use crate::crl::{CertificateRevocationList, RevokedCertificate};
use crate::error::{PkiError, PkiResult};
use crate::name::DistinguishedName;

#[derive(Debug)]
pub struct CertificateAuthority {
    certificate: Certificate,
    /// CA private key (in production, use HSM)
    private_key: PrivateKey,
    digest: DigestAlgorithm,
    /// Issued certificates indexed by serial
    certificates: BTreeMap<SerialNumber, Certificate>,
    /// Revoked serials with revocation time
    revoked: BTreeMap<SerialNumber, u64>,
    next_serial: u64,
}

impl CertificateAuthority {
    /// Create a root CA with a fresh self-signed certificate.
    pub fn new_root(
        name: DistinguishedName,
        private_key: PrivateKey,
        digest: DigestAlgorithm,
        validity_days: u64,
    ) -> PkiResult<Self> {
        let certificate = CertificateBuilder::new(name, private_key.public_key())
            .validity_days(validity_days)
            .self_signed(&private_key, digest)?;
        tracing::info!("Created root CA {}", certificate.subject());
        Ok(Self::from_parts(certificate, private_key, digest))
    }

    /// Wrap an existing CA certificate and its key.
    pub fn from_parts(certificate: Certificate, private_key: PrivateKey, digest: DigestAlgorithm) -> Self {
        Self {
            certificate,
            private_key,
            digest,
            certificates: BTreeMap::new(),
            revoked: BTreeMap::new(),
            next_serial: 2,
        }
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn name(&self) -> &DistinguishedName {
        self.certificate.subject()
    }

    /// Issue an end-entity certificate.
    pub fn issue(
        &mut self,
        subject: DistinguishedName,
        public_key: PublicKey,
        validity_days: u64,
    ) -> PkiResult<Certificate> {
        let serial = SerialNumber::from(self.next_serial);
        self.next_serial += 1;

        let cert = CertificateBuilder::new(subject, public_key)
            .serial(serial.clone())
            .validity_days(validity_days)
            .issued_by(&self.certificate, &self.private_key, self.digest)?;

        tracing::debug!("Issued certificate {} for {}", serial, cert.subject());
        self.certificates.insert(serial, cert.clone());
        Ok(cert)
    }

    /// Issue a subordinate CA with a freshly generated key of the same type.
    pub fn issue_subordinate(
        &mut self,
        subject: DistinguishedName,
        validity_days: u64,
    ) -> PkiResult<CertificateAuthority> {
        let key = PrivateKey::generate(self.private_key.key_type());
        let cert = self.issue(subject, key.public_key(), validity_days)?;
        Ok(CertificateAuthority::from_parts(cert, key, self.digest))
    }

    /// Verify a certificate: issuer name, signature, revocation and validity.
    pub fn verify_certificate(&self, cert: &Certificate) -> PkiResult<()> {
        if cert.issuer() != self.name() {
            return Err(PkiError::CertificateAuthority(format!(
                "certificate issued by {}, not {}",
                cert.issuer(),
                self.name()
            )));
        }
        cert.verify_signature(self.certificate.public_key())?;
        if self.is_revoked(cert.serial()) {
            return Err(PkiError::CertificateAuthority(format!(
                "certificate {} is revoked",
                cert.serial()
            )));
        }
        if !cert.is_valid_at(current_timestamp()) {
            return Err(PkiError::CertificateAuthority(format!(
                "certificate {} is outside its validity period",
                cert.serial()
            )));
        }
        Ok(())
    }

    pub fn revoke(&mut self, serial: &SerialNumber) -> PkiResult<()> {
        if !self.certificates.contains_key(serial) {
            return Err(PkiError::CertificateAuthority(format!(
                "certificate {serial} not found"
            )));
        }
        tracing::info!("Revoking certificate {}", serial);
        self.revoked.insert(serial.clone(), current_timestamp());
        Ok(())
    }

    pub fn is_revoked(&self, serial: &SerialNumber) -> bool {
        self.revoked.contains_key(serial)
    }

    /// Signed CRL listing every revoked serial.
    pub fn generate_crl(&self, next_update_days: Option<u64>) -> PkiResult<CertificateRevocationList> {
        let now = current_timestamp();
        let revoked = self
            .revoked
            .iter()
            .map(|(serial, at)| RevokedCertificate {
                serial: serial.clone(),
                revocation_date: *at,
            })
            .collect();
        CertificateRevocationList::sign(
            self.name().clone(),
            revoked,
            now,
            next_update_days.map(|days| now + days * 24 * 60 * 60),
            &self.private_key,
            self.digest,
        )
    }

    pub fn get_certificate(&self, serial: &SerialNumber) -> Option<&Certificate> {
        self.certificates.get(serial)
    }

    /// All issued certificates in serial order.
    pub fn list_certificates(&self) -> Vec<&Certificate> {
        self.certificates.values().collect()
    }

    pub fn revoked_serials(&self) -> BTreeSet<SerialNumber> {
        self.revoked.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_crypto::KeyType;

    fn test_ca() -> CertificateAuthority {
        CertificateAuthority::new_root(
            DistinguishedName::common_name("test-ca"),
            PrivateKey::generate(KeyType::EcdsaP256),
            DigestAlgorithm::Sha256,
            365,
        )
        .unwrap()
    }

    fn subject_key() -> PublicKey {
        PrivateKey::generate(KeyType::Ed25519).public_key()
    }

    #[test]
    fn test_create_ca() {
        let ca = test_ca();
        assert_eq!(ca.name().get("CN"), Some("test-ca"));
        assert!(ca.certificate().is_self_signed());
    }

    #[test]
    fn test_issue_certificate() {
        let mut ca = test_ca();
        let cert = ca
            .issue(DistinguishedName::common_name("platform-1"), subject_key(), 30)
            .unwrap();
        assert_eq!(cert.issuer(), ca.name());
        assert!(ca.verify_certificate(&cert).is_ok());
        assert_eq!(ca.get_certificate(cert.serial()), Some(&cert));
    }

    #[test]
    fn test_revoke_certificate() {
        let mut ca = test_ca();
        let cert = ca
            .issue(DistinguishedName::common_name("platform-1"), subject_key(), 30)
            .unwrap();
        ca.revoke(cert.serial()).unwrap();

        assert!(ca.is_revoked(cert.serial()));
        assert!(ca.verify_certificate(&cert).is_err());

        let crl = ca.generate_crl(Some(7)).unwrap();
        assert!(crl.is_revoked(cert.serial()));
        assert!(crl.verify_signature(ca.certificate().public_key()).is_ok());
    }

    #[test]
    fn test_revoke_unknown_serial() {
        let mut ca = test_ca();
        assert!(ca.revoke(&SerialNumber::from(999)).is_err());
    }

    #[test]
    fn test_foreign_certificate_rejected() {
        let ca = test_ca();
        let mut other = test_ca();
        let foreign = other
            .issue(DistinguishedName::common_name("x"), subject_key(), 30)
            .unwrap();
        // Same issuer name, different key.
        assert!(ca.verify_certificate(&foreign).is_err());
    }

    #[test]
    fn test_subordinate_ca() {
        let mut root = test_ca();
        let mut sub = root
            .issue_subordinate(DistinguishedName::common_name("sub-ca"), 90)
            .unwrap();
        let leaf = sub
            .issue(DistinguishedName::common_name("leaf"), subject_key(), 30)
            .unwrap();
        assert!(root.verify_certificate(sub.certificate()).is_ok());
        assert!(sub.verify_certificate(&leaf).is_ok());
        assert_eq!(root.list_certificates().len(), 1);
    }
}
