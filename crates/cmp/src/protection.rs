//! Protection engine: computes and verifies the protection value of a
//! message.
//!
//! The algorithm in the message header selects one of two closed paths. The
//! password-based MAC identifier selects a MAC keyed from the context's
//! shared secret. Any other identifier is treated as a signature algorithm
//! and uses the context's private key.

use keystone_crypto::{
    constant_time_eq, find_digest_for_signature_oid, find_signature_algorithm, PbmParameter,
    PASSWORD_BASED_MAC_OID,
};
use keystone_pki::Certificate;

use crate::context::ProtocolContext;
use crate::encode::encode_protected_part;
use crate::error::{CmpError, CmpResult};
use crate::message::{AlgorithmIdentifier, PkiMessage, ProtectionValue};

enum ProtectionPath<'a> {
    PasswordBasedMac(PbmParameter),
    Signature(&'a str),
}

impl<'a> ProtectionPath<'a> {
    fn select(alg: &'a AlgorithmIdentifier) -> CmpResult<Self> {
        if alg.oid != PASSWORD_BASED_MAC_OID {
            return Ok(ProtectionPath::Signature(&alg.oid));
        }
        let encoded = alg.parameters.as_deref().ok_or_else(|| {
            CmpError::UnknownAlgorithm("password-based MAC without parameters".to_string())
        })?;
        let params = PbmParameter::decode(encoded).map_err(|e| {
            CmpError::UnknownAlgorithm(format!("invalid password-based MAC parameters: {e}"))
        })?;
        Ok(ProtectionPath::PasswordBasedMac(params))
    }
}

fn protection_alg(msg: &PkiMessage) -> CmpResult<&AlgorithmIdentifier> {
    msg.header
        .protection_alg
        .as_ref()
        .ok_or_else(|| CmpError::UnknownAlgorithm("no protection algorithm in header".to_string()))
}

/// Computes the protection value for `msg` under the algorithm already set
/// in its header. Neither argument is modified.
pub fn calc_protection(ctx: &ProtocolContext, msg: &PkiMessage) -> CmpResult<ProtectionValue> {
    match ProtectionPath::select(protection_alg(msg)?)? {
        ProtectionPath::PasswordBasedMac(params) => {
            let secret = ctx.secret_value().ok_or(CmpError::MissingSecret)?;
            let protected_part = encode_protected_part(&msg.header, &msg.body)?;
            let tag = params.compute(&protected_part, secret)?;
            Ok(ProtectionValue::from_named_bits(tag))
        }
        ProtectionPath::Signature(oid) => {
            let key = ctx.private_key().ok_or(CmpError::MissingKey)?;
            let digest = find_digest_for_signature_oid(oid)
                .ok_or_else(|| CmpError::UnknownAlgorithm(oid.to_string()))?;
            let protected_part = encode_protected_part(&msg.header, &msg.body)?;
            let signature = key.sign(digest, &protected_part)?;
            Ok(ProtectionValue::from_bytes(signature))
        }
    }
}

/// Checks the protection of a received message.
///
/// MAC protection is recomputed from the shared secret and compared in
/// constant time. Signatures are checked against the context's peer
/// certificate, or the first extra certificate when none is configured.
pub fn verify_protection(ctx: &ProtocolContext, msg: &PkiMessage) -> CmpResult<()> {
    let received = msg
        .protection
        .as_ref()
        .ok_or_else(|| CmpError::VerificationFailed("message is not protected".to_string()))?;

    match ProtectionPath::select(protection_alg(msg)?)? {
        ProtectionPath::PasswordBasedMac(_) => {
            let expected = calc_protection(ctx, msg)?;
            if expected.unused_bits() == received.unused_bits()
                && constant_time_eq(expected.as_bytes(), received.as_bytes())
            {
                Ok(())
            } else {
                Err(CmpError::VerificationFailed("MAC mismatch".to_string()))
            }
        }
        ProtectionPath::Signature(oid) => {
            let algorithm = find_signature_algorithm(oid)
                .ok_or_else(|| CmpError::UnknownAlgorithm(oid.to_string()))?;
            let signer = signer_certificate(ctx, msg)?;
            if signer.public_key().key_type() != algorithm.key_type {
                return Err(CmpError::VerificationFailed(format!(
                    "{} signature but signer key is {}",
                    algorithm.name,
                    signer.public_key().key_type()
                )));
            }
            let protected_part = encode_protected_part(&msg.header, &msg.body)?;
            signer
                .public_key()
                .verify(algorithm.digest, &protected_part, received.as_bytes())
                .map_err(|e| CmpError::VerificationFailed(e.to_string()))
        }
    }
}

fn signer_certificate<'a>(ctx: &'a ProtocolContext, msg: &'a PkiMessage) -> CmpResult<&'a Certificate> {
    ctx.peer_certificate()
        .or_else(|| msg.extra_certs.as_ref().and_then(|certs| certs.first()))
        .ok_or_else(|| {
            CmpError::VerificationFailed("no certificate available to verify signature".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{BodyType, PkiBody, PkiHeader};
    use keystone_crypto::algorithm::{ECDSA_WITH_SHA256, ED25519};
    use keystone_crypto::{DigestAlgorithm, KeyType, MacAlgorithm, PrivateKey};
    use keystone_pki::DistinguishedName;

    fn message(alg: Option<AlgorithmIdentifier>) -> PkiMessage {
        let mut header = PkiHeader::new(
            DistinguishedName::common_name("client"),
            DistinguishedName::common_name("ca"),
        );
        header.protection_alg = alg;
        PkiMessage::new(header, PkiBody::new(BodyType::Ir, b"request".to_vec()))
    }

    fn pbm_alg() -> AlgorithmIdentifier {
        let params = PbmParameter::new(16, DigestAlgorithm::Sha256, 500, MacAlgorithm::HmacSha256)
            .unwrap();
        AlgorithmIdentifier::with_parameters(PASSWORD_BASED_MAC_OID, params.encode().unwrap())
    }

    #[test]
    fn test_pbm_protection() {
        let mut ctx = ProtocolContext::new();
        ctx.set_secret_value(b"hunter2".to_vec());
        let msg = message(Some(pbm_alg()));

        let value = calc_protection(&ctx, &msg).unwrap();
        assert!(!value.is_empty());
        assert_eq!(calc_protection(&ctx, &msg).unwrap(), value);
    }

    #[test]
    fn test_pbm_without_parameters_is_unknown_algorithm() {
        let mut ctx = ProtocolContext::new();
        ctx.set_secret_value(b"hunter2".to_vec());
        let msg = message(Some(AlgorithmIdentifier::new(PASSWORD_BASED_MAC_OID)));
        assert!(matches!(
            calc_protection(&ctx, &msg),
            Err(CmpError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn test_pbm_without_secret() {
        let ctx = ProtocolContext::new();
        let msg = message(Some(pbm_alg()));
        assert!(matches!(
            calc_protection(&ctx, &msg),
            Err(CmpError::MissingSecret)
        ));
    }

    #[test]
    fn test_signature_without_key() {
        let ctx = ProtocolContext::new();
        let msg = message(Some(AlgorithmIdentifier::new(ECDSA_WITH_SHA256)));
        assert!(matches!(calc_protection(&ctx, &msg), Err(CmpError::MissingKey)));
    }

    #[test]
    fn test_signature_unknown_oid() {
        let mut ctx = ProtocolContext::new();
        ctx.set_private_key(Some(PrivateKey::generate(KeyType::EcdsaP256)));
        let msg = message(Some(AlgorithmIdentifier::new("1.2.3.4")));
        assert!(matches!(
            calc_protection(&ctx, &msg),
            Err(CmpError::UnknownAlgorithm(oid)) if oid == "1.2.3.4"
        ));
    }

    #[test]
    fn test_missing_protection_algorithm() {
        let ctx = ProtocolContext::new();
        assert!(matches!(
            calc_protection(&ctx, &message(None)),
            Err(CmpError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn test_signature_protection_verifies() {
        let key = PrivateKey::generate(KeyType::Ed25519);
        let mut ctx = ProtocolContext::new();
        ctx.set_private_key(Some(key.clone()));

        let mut msg = message(Some(AlgorithmIdentifier::new(ED25519)));
        msg.protection = Some(calc_protection(&ctx, &msg).unwrap());

        let cert = keystone_pki::CertificateBuilder::new(
            DistinguishedName::common_name("client"),
            key.public_key(),
        )
        .self_signed(&key, DigestAlgorithm::Sha512)
        .unwrap();
        let mut receiver = ProtocolContext::new();
        receiver.set_peer_certificate(Some(cert));
        verify_protection(&receiver, &msg).unwrap();

        msg.body.content.push(0);
        assert!(matches!(
            verify_protection(&receiver, &msg),
            Err(CmpError::VerificationFailed(_))
        ));
    }

    #[test]
    fn test_pbm_verification_detects_wrong_secret() {
        let mut sender = ProtocolContext::new();
        sender.set_secret_value(b"hunter2".to_vec());
        let mut msg = message(Some(pbm_alg()));
        msg.protection = Some(calc_protection(&sender, &msg).unwrap());

        verify_protection(&sender, &msg).unwrap();

        let mut receiver = ProtocolContext::new();
        receiver.set_secret_value(b"hunter3".to_vec());
        assert!(matches!(
            verify_protection(&receiver, &msg),
            Err(CmpError::VerificationFailed(_))
        ));
    }

    #[test]
    fn test_unprotected_message_fails_verification() {
        let ctx = ProtocolContext::new();
        assert!(verify_protection(&ctx, &message(Some(pbm_alg()))).is_err());
    }
}
