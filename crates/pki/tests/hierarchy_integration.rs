//! Integration tests for certificate hierarchies.
//!
//! Builds a root, an intermediate and end-entity certificates through the
//! certificate authority, then exercises chain building, revocation and
//! the certificate-list rules against them.

use keystone_crypto::{DigestAlgorithm, KeyType, PrivateKey};
use keystone_pki::{
    add_certificates, build_chain, AddFlags, Certificate, CertificateAuthority,
    CertificateRevocationList, DistinguishedName,
};

fn create_hierarchy() -> (CertificateAuthority, CertificateAuthority) {
    let mut root = CertificateAuthority::new_root(
        DistinguishedName::common_name("Keystone Root").with("O", "Keystone"),
        PrivateKey::generate(KeyType::EcdsaP256),
        DigestAlgorithm::Sha256,
        3650,
    )
    .expect("Failed to create root CA");
    let intermediate = root
        .issue_subordinate(
            DistinguishedName::common_name("Keystone Issuing").with("O", "Keystone"),
            365,
        )
        .expect("Failed to create intermediate CA");
    (root, intermediate)
}

#[test]
fn test_end_entity_chain_validates() {
    let (root, mut intermediate) = create_hierarchy();
    let key = PrivateKey::generate(KeyType::Ed25519);
    let leaf = intermediate
        .issue(DistinguishedName::common_name("node-7"), key.public_key(), 30)
        .expect("Failed to issue leaf");

    let pool = vec![root.certificate().clone(), intermediate.certificate().clone()];
    let chain = build_chain(&pool, &leaf);
    assert_eq!(chain.len(), 3);
    assert_eq!(chain[0], leaf);
    assert!(chain[2].is_self_signed());

    for pair in chain.windows(2) {
        assert!(pair[0].names_issuer(&pair[1]));
        pair[0]
            .verify_signature(pair[1].public_key())
            .expect("Each certificate should verify under its issuer");
    }
    assert_eq!(chain[2], *root.certificate());
}

#[test]
fn test_chain_for_extra_certificates_excludes_root() {
    let (root, mut intermediate) = create_hierarchy();
    let key = PrivateKey::generate(KeyType::EcdsaP256);
    let leaf = intermediate
        .issue(DistinguishedName::common_name("node-8"), key.public_key(), 30)
        .unwrap();

    let pool = vec![intermediate.certificate().clone(), root.certificate().clone()];
    let mut extra: Vec<Certificate> = vec![leaf.clone()];
    let added = add_certificates(
        &mut extra,
        &build_chain(&pool, &leaf),
        AddFlags::NONE.no_dup().no_self_signed(),
    );

    assert_eq!(added, 1);
    assert_eq!(extra, vec![leaf, intermediate.certificate().clone()]);
}

#[test]
fn test_revocation_round_trip_through_crl() {
    let (_root, mut intermediate) = create_hierarchy();
    let key = PrivateKey::generate(KeyType::Ed25519);
    let leaf = intermediate
        .issue(DistinguishedName::common_name("node-9"), key.public_key(), 30)
        .unwrap();

    intermediate.revoke(leaf.serial()).unwrap();
    let crl = intermediate.generate_crl(Some(1)).unwrap();
    let decoded = CertificateRevocationList::decode(&crl.encode().unwrap()).unwrap();

    assert!(decoded.is_revoked(leaf.serial()));
    assert_eq!(decoded.issuer(), intermediate.name());
    decoded
        .verify_signature(intermediate.certificate().public_key())
        .expect("CRL should verify under the issuing CA key");
}
