//! Extra certificates attached to outgoing messages.

use keystone_pki::{add_certificate, add_certificates, build_chain, AddFlags};

use crate::context::ProtocolContext;
use crate::error::CmpResult;
use crate::message::PkiMessage;

/// Fills `msg.extra_certs` from the context.
///
/// With signature credentials the own certificate comes first, followed by
/// its chain from the untrusted pool without the self-signed root. Staged
/// `extra_certs_out` are appended last. No certificate appears twice and an
/// empty result leaves the field absent.
pub fn add_extra_certs(ctx: &ProtocolContext, msg: &mut PkiMessage) -> CmpResult<()> {
    let mut certs = msg.extra_certs.take().unwrap_or_default();

    if let (Some(cert), Some(_)) = (ctx.certificate(), ctx.private_key()) {
        add_certificate(&mut certs, cert, AddFlags::NONE.prepend().no_dup());
        if let Some(untrusted) = ctx.untrusted() {
            let chain = build_chain(untrusted, cert);
            add_certificates(&mut certs, &chain, AddFlags::NONE.no_dup().no_self_signed());
        }
    }

    add_certificates(&mut certs, ctx.extra_certs_out(), AddFlags::NONE.no_dup());

    tracing::debug!("Message carries {} extra certificate(s)", certs.len());
    msg.extra_certs = (!certs.is_empty()).then_some(certs);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{BodyType, PkiBody, PkiHeader};
    use keystone_crypto::{DigestAlgorithm, KeyType, PrivateKey};
    use keystone_pki::{Certificate, CertificateBuilder, DistinguishedName};

    fn message() -> PkiMessage {
        PkiMessage::new(
            PkiHeader::new(DistinguishedName::null(), DistinguishedName::null()),
            PkiBody::new(BodyType::PkiConf, Vec::new()),
        )
    }

    fn self_signed(cn: &str) -> (Certificate, PrivateKey) {
        let key = PrivateKey::generate(KeyType::Ed25519);
        let cert = CertificateBuilder::new(DistinguishedName::common_name(cn), key.public_key())
            .self_signed(&key, DigestAlgorithm::Sha512)
            .unwrap();
        (cert, key)
    }

    #[test]
    fn test_empty_result_is_absent() {
        let ctx = ProtocolContext::new();
        let mut msg = message();
        msg.extra_certs = Some(Vec::new());
        add_extra_certs(&ctx, &mut msg).unwrap();
        assert!(msg.extra_certs.is_none());
    }

    #[test]
    fn test_certificate_without_key_is_not_attached() {
        let (cert, _) = self_signed("client");
        let mut ctx = ProtocolContext::new();
        ctx.set_certificate(Some(cert));
        let mut msg = message();
        add_extra_certs(&ctx, &mut msg).unwrap();
        assert!(msg.extra_certs.is_none());
    }

    #[test]
    fn test_own_certificate_first_and_staged_deduplicated() {
        let (own, own_key) = self_signed("client");
        let (other, _) = self_signed("other");
        let mut ctx = ProtocolContext::new();
        ctx.set_credentials(own.clone(), own_key);
        ctx.set_extra_certs_out(vec![other.clone(), own.clone(), other.clone()]);

        let mut msg = message();
        add_extra_certs(&ctx, &mut msg).unwrap();
        assert_eq!(msg.extra_certs, Some(vec![own, other]));
    }
}
