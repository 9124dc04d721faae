//! Message protector.

use keystone_crypto::{find_signature_oid, PbmParameter, PASSWORD_BASED_MAC_OID};

use crate::context::ProtocolContext;
use crate::error::{CmpError, CmpResult};
use crate::extra_certs::add_extra_certs;
use crate::message::{AlgorithmIdentifier, PkiMessage};
use crate::protection::calc_protection;

/// Protects `msg` in place.
///
/// Any existing protection algorithm and value are removed first, so a
/// message can be protected again after its header changed. With
/// `unprotected_send` the message is left bare.
///
/// On [`CmpError::MissingSenderIdentification`] the freshly computed
/// protection stays attached to the message.
///
/// The PBM path draws a fresh random salt on every call, so protecting the
/// same message twice yields different protection values unless
/// [`ProtocolContext::set_pbm_salt`] fixes the salt. Signature protection
/// is deterministic.
pub fn protect(ctx: &ProtocolContext, msg: &mut PkiMessage) -> CmpResult<()> {
    msg.header.protection_alg = None;
    msg.protection = None;

    if ctx.unprotected_send() {
        tracing::debug!("Sending message without protection");
        return Ok(());
    }

    if ctx.secret_value().is_some() {
        let alg = pbm_algorithm(ctx).map_err(|e| CmpError::Protection(e.to_string()))?;
        msg.header.protection_alg = Some(alg);
        if msg.header.sender_kid.is_none() {
            if let Some(reference) = ctx.reference_value() {
                msg.header.sender_kid = Some(reference.to_vec());
            }
        }
    } else if let (Some(cert), Some(key)) = (ctx.certificate(), ctx.private_key()) {
        if !cert.check_private_key(key) {
            return Err(CmpError::KeyCertMismatch);
        }
        let oid = find_signature_oid(ctx.digest(), key.key_type()).ok_or_else(|| {
            CmpError::UnsupportedKeyType(format!("{} with {}", key.key_type(), ctx.digest()))
        })?;
        msg.header.protection_alg = Some(AlgorithmIdentifier::new(oid));

        let sender_kid = cert.subject_key_id().or_else(|| ctx.reference_value());
        if let Some(kid) = sender_kid {
            msg.header.sender_kid = Some(kid.to_vec());
        }
    } else {
        return Err(CmpError::MissingCredentials);
    }

    let protection =
        calc_protection(ctx, msg).map_err(|e| CmpError::ProtectionComputation(Box::new(e)))?;
    msg.protection = Some(protection);

    add_extra_certs(ctx, msg).map_err(|e| CmpError::Protection(e.to_string()))?;

    if msg.header.sender.is_null() && msg.header.sender_kid.is_none() {
        return Err(CmpError::MissingSenderIdentification);
    }

    tracing::info!(
        "Protected {:?} message with {}",
        msg.body.body_type,
        msg.header
            .protection_alg
            .as_ref()
            .map_or("<none>", |alg| alg.oid.as_str())
    );
    Ok(())
}

fn pbm_algorithm(ctx: &ProtocolContext) -> CmpResult<AlgorithmIdentifier> {
    let params = match ctx.pbm_salt() {
        Some(salt) => {
            let params = PbmParameter {
                salt: salt.to_vec(),
                owf: ctx.pbm_owf(),
                iteration_count: ctx.pbm_iteration_count(),
                mac: ctx.pbm_mac(),
            };
            params.validate()?;
            params
        }
        None => PbmParameter::new(
            ctx.pbm_salt_len(),
            ctx.pbm_owf(),
            ctx.pbm_iteration_count(),
            ctx.pbm_mac(),
        )?,
    };
    Ok(AlgorithmIdentifier::with_parameters(
        PASSWORD_BASED_MAC_OID,
        params.encode()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{BodyType, PkiBody, PkiHeader};
    use keystone_crypto::{DigestAlgorithm, KeyType, PrivateKey};
    use keystone_pki::{CertificateBuilder, DistinguishedName};

    fn message(sender: DistinguishedName) -> PkiMessage {
        PkiMessage::new(
            PkiHeader::new(sender, DistinguishedName::common_name("ca")),
            PkiBody::new(BodyType::Genm, b"general message".to_vec()),
        )
    }

    #[test]
    fn test_missing_credentials() {
        let ctx = ProtocolContext::new();
        let mut msg = message(DistinguishedName::common_name("client"));
        assert!(matches!(
            protect(&ctx, &mut msg),
            Err(CmpError::MissingCredentials)
        ));
    }

    #[test]
    fn test_key_certificate_mismatch() {
        let key = PrivateKey::generate(KeyType::EcdsaP256);
        let cert = CertificateBuilder::new(DistinguishedName::common_name("client"), key.public_key())
            .self_signed(&key, DigestAlgorithm::Sha256)
            .unwrap();
        let mut ctx = ProtocolContext::new();
        ctx.set_credentials(cert, PrivateKey::generate(KeyType::EcdsaP256));

        let mut msg = message(DistinguishedName::common_name("client"));
        assert!(matches!(protect(&ctx, &mut msg), Err(CmpError::KeyCertMismatch)));
    }

    #[test]
    fn test_unsupported_digest_for_key_type() {
        let key = PrivateKey::generate(KeyType::Ed25519);
        let cert = CertificateBuilder::new(DistinguishedName::common_name("client"), key.public_key())
            .self_signed(&key, DigestAlgorithm::Sha512)
            .unwrap();
        let mut ctx = ProtocolContext::new();
        ctx.set_credentials(cert, key);
        ctx.set_digest(DigestAlgorithm::Sha256);

        let mut msg = message(DistinguishedName::common_name("client"));
        assert!(matches!(
            protect(&ctx, &mut msg),
            Err(CmpError::UnsupportedKeyType(_))
        ));
    }

    #[test]
    fn test_invalid_pbm_settings() {
        let mut ctx = ProtocolContext::new();
        ctx.set_secret_value(b"secret".to_vec());
        ctx.set_pbm_iteration_count(1);
        let mut msg = message(DistinguishedName::common_name("client"));
        assert!(matches!(protect(&ctx, &mut msg), Err(CmpError::Protection(_))));
        assert!(msg.header.protection_alg.is_none());
    }

    #[test]
    fn test_signature_sender_kid_is_subject_key_id() {
        let key = PrivateKey::generate(KeyType::EcdsaP256);
        let cert = CertificateBuilder::new(DistinguishedName::common_name("client"), key.public_key())
            .self_signed(&key, DigestAlgorithm::Sha256)
            .unwrap();
        let ski = cert.subject_key_id().map(<[u8]>::to_vec);
        let mut ctx = ProtocolContext::new();
        ctx.set_reference_value(b"ref".to_vec());
        ctx.set_credentials(cert, key);

        let mut msg = message(DistinguishedName::common_name("client"));
        msg.header.sender_kid = Some(b"stale".to_vec());
        protect(&ctx, &mut msg).unwrap();
        assert_eq!(msg.header.sender_kid, ski);
    }

    #[test]
    fn test_signature_sender_kid_falls_back_to_reference() {
        let key = PrivateKey::generate(KeyType::EcdsaP256);
        let cert = CertificateBuilder::new(DistinguishedName::common_name("client"), key.public_key())
            .subject_key_id(None)
            .self_signed(&key, DigestAlgorithm::Sha256)
            .unwrap();
        let mut ctx = ProtocolContext::new();
        ctx.set_reference_value(b"ref".to_vec());
        ctx.set_credentials(cert, key);

        let mut msg = message(DistinguishedName::null());
        protect(&ctx, &mut msg).unwrap();
        assert_eq!(msg.header.sender_kid.as_deref(), Some(&b"ref"[..]));
    }

    #[test]
    fn test_missing_sender_identification_keeps_protection() {
        let mut ctx = ProtocolContext::new();
        ctx.set_secret_value(b"secret".to_vec());

        let mut msg = message(DistinguishedName::null());
        assert!(matches!(
            protect(&ctx, &mut msg),
            Err(CmpError::MissingSenderIdentification)
        ));
        assert!(msg.header.protection_alg.is_some());
        assert!(msg.protection.is_some());
    }

    #[test]
    fn test_pbm_keeps_explicit_sender_kid() {
        let mut ctx = ProtocolContext::new();
        ctx.set_secret_value(b"secret".to_vec());
        ctx.set_reference_value(b"ref".to_vec());

        let mut msg = message(DistinguishedName::null());
        msg.header.sender_kid = Some(b"explicit".to_vec());
        protect(&ctx, &mut msg).unwrap();
        assert_eq!(msg.header.sender_kid.as_deref(), Some(&b"explicit"[..]));
    }
}
