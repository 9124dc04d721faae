//! Ordered certificate lists with duplicate and self-signed filtering.

use crate::certificate::Certificate;

/// Options for [`add_certificate`] and [`add_certificates`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddFlags {
    /// Insert at the front instead of appending.
    pub prepend: bool,
    /// Skip certificates structurally equal to one already in the list.
    pub no_dup: bool,
    /// Skip self-signed certificates.
    pub no_self_signed: bool,
}

impl AddFlags {
    pub const NONE: AddFlags = AddFlags {
        prepend: false,
        no_dup: false,
        no_self_signed: false,
    };

    pub const fn prepend(mut self) -> Self {
        self.prepend = true;
        self
    }

    pub const fn no_dup(mut self) -> Self {
        self.no_dup = true;
        self
    }

    pub const fn no_self_signed(mut self) -> Self {
        self.no_self_signed = true;
        self
    }
}

/// Adds `cert` to `list` according to `flags`. Returns whether it was added.
pub fn add_certificate(list: &mut Vec<Certificate>, cert: &Certificate, flags: AddFlags) -> bool {
    if flags.no_self_signed && cert.is_self_signed() {
        return false;
    }
    if flags.no_dup && list.contains(cert) {
        return false;
    }
    if flags.prepend {
        list.insert(0, cert.clone());
    } else {
        list.push(cert.clone());
    }
    true
}

/// Adds every certificate of `certs` in order. With `prepend` the added
/// certificates keep their relative order at the front of the list.
pub fn add_certificates<'a, I>(list: &mut Vec<Certificate>, certs: I, flags: AddFlags) -> usize
where
    I: IntoIterator<Item = &'a Certificate>,
{
    let mut added = 0;
    for cert in certs {
        let position = if flags.prepend { Some(added) } else { None };
        if flags.no_self_signed && cert.is_self_signed() {
            continue;
        }
        if flags.no_dup && list.contains(cert) {
            continue;
        }
        match position {
            Some(index) => list.insert(index, cert.clone()),
            None => list.push(cert.clone()),
        }
        added += 1;
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::CertificateBuilder;
    use crate::name::DistinguishedName;
    use keystone_crypto::{DigestAlgorithm, KeyType, PrivateKey};

    fn self_signed(cn: &str) -> (Certificate, PrivateKey) {
        let key = PrivateKey::generate(KeyType::Ed25519);
        let cert = CertificateBuilder::new(DistinguishedName::common_name(cn), key.public_key())
            .self_signed(&key, DigestAlgorithm::Sha512)
            .unwrap();
        (cert, key)
    }

    fn issued(cn: &str, issuer: &Certificate, issuer_key: &PrivateKey) -> Certificate {
        let key = PrivateKey::generate(KeyType::Ed25519);
        CertificateBuilder::new(DistinguishedName::common_name(cn), key.public_key())
            .issued_by(issuer, issuer_key, DigestAlgorithm::Sha512)
            .unwrap()
    }

    #[test]
    fn test_no_dup() {
        let (root, root_key) = self_signed("root");
        let leaf = issued("leaf", &root, &root_key);
        let mut list = vec![leaf.clone()];

        assert!(!add_certificate(&mut list, &leaf, AddFlags::NONE.no_dup()));
        assert!(add_certificate(&mut list, &leaf, AddFlags::NONE));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_no_self_signed() {
        let (root, root_key) = self_signed("root");
        let leaf = issued("leaf", &root, &root_key);
        let mut list = Vec::new();
        let added = add_certificates(
            &mut list,
            [&leaf, &root],
            AddFlags::NONE.no_self_signed(),
        );
        assert_eq!(added, 1);
        assert_eq!(list, vec![leaf]);
    }

    #[test]
    fn test_prepend_keeps_relative_order() {
        let (root, root_key) = self_signed("root");
        let a = issued("a", &root, &root_key);
        let b = issued("b", &root, &root_key);
        let c = issued("c", &root, &root_key);

        let mut list = vec![c.clone()];
        add_certificates(&mut list, [&a, &b], AddFlags::NONE.prepend());
        assert_eq!(list, vec![a.clone(), b.clone(), c.clone()]);

        assert!(add_certificate(&mut list, &root, AddFlags::NONE.prepend()));
        assert_eq!(list[0], root);
    }
}
