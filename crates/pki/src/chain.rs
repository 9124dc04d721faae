//! Certificate chain building.

use crate::certificate::Certificate;

/// Best-effort chain from `target` towards a root using certificates in
/// `pool`.
///
/// The result starts with `target`. Each next element is a pool certificate
/// whose subject names the previous certificate's issuer and whose key
/// verifies its signature. Building stops at a self-signed certificate, when
/// no issuer is found, or when an issuer would repeat.
pub fn build_chain(pool: &[Certificate], target: &Certificate) -> Vec<Certificate> {
    let mut chain = vec![target.clone()];
    let mut current = target;

    while !current.is_self_signed() {
        let issuer = pool.iter().find(|candidate| {
            current.names_issuer(candidate)
                && current.verify_signature(candidate.public_key()).is_ok()
                && !chain.contains(candidate)
        });
        match issuer {
            Some(issuer) => {
                chain.push(issuer.clone());
                current = issuer;
            }
            None => break,
        }
    }

    tracing::debug!(
        "Built chain of {} certificate(s) for {}",
        chain.len(),
        target.subject()
    );
    chain
}
