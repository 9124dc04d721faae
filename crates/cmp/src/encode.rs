//! Canonical encoding of the protected part of a message.

use serde::Serialize;

use crate::error::CmpResult;
use crate::message::{PkiBody, PkiHeader};

#[derive(Serialize)]
struct ProtectedPart<'a> {
    header: &'a PkiHeader,
    body: &'a PkiBody,
}

/// Deterministic bytes of (header, body) that protection is computed over.
///
/// The header includes the protection algorithm, so the descriptor must be
/// in place before the protection value is calculated.
pub fn encode_protected_part(header: &PkiHeader, body: &PkiBody) -> CmpResult<Vec<u8>> {
    Ok(serde_json::to_vec(&ProtectedPart { header, body })?)
}
