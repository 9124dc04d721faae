//! Certificate management protocol message model.

use keystone_crypto::encoding::{hex_bytes, hex_bytes_opt};
use keystone_pki::{Certificate, DistinguishedName};
use serde::{Deserialize, Serialize};

/// Algorithm OID with optional encoded parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmIdentifier {
    pub oid: String,
    #[serde(default, with = "hex_bytes_opt")]
    pub parameters: Option<Vec<u8>>,
}

impl AlgorithmIdentifier {
    pub fn new(oid: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            parameters: None,
        }
    }

    pub fn with_parameters(oid: impl Into<String>, parameters: Vec<u8>) -> Self {
        Self {
            oid: oid.into(),
            parameters: Some(parameters),
        }
    }
}

pub const PVNO_CMP2000: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkiHeader {
    pub pvno: u8,
    pub sender: DistinguishedName,
    pub recipient: DistinguishedName,
    #[serde(default, with = "hex_bytes_opt")]
    pub sender_kid: Option<Vec<u8>>,
    #[serde(default, with = "hex_bytes_opt")]
    pub recip_kid: Option<Vec<u8>>,
    #[serde(default, with = "hex_bytes_opt")]
    pub transaction_id: Option<Vec<u8>>,
    #[serde(default, with = "hex_bytes_opt")]
    pub sender_nonce: Option<Vec<u8>>,
    #[serde(default)]
    pub protection_alg: Option<AlgorithmIdentifier>,
}

impl PkiHeader {
    pub fn new(sender: DistinguishedName, recipient: DistinguishedName) -> Self {
        Self {
            pvno: PVNO_CMP2000,
            sender,
            recipient,
            sender_kid: None,
            recip_kid: None,
            transaction_id: None,
            sender_nonce: None,
            protection_alg: None,
        }
    }
}

/// Message body types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    Ir,
    Ip,
    Cr,
    Cp,
    P10cr,
    Kur,
    Kup,
    Rr,
    Rp,
    CertConf,
    PkiConf,
    Genm,
    Genp,
    Error,
    PollReq,
    PollRep,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkiBody {
    pub body_type: BodyType,
    /// Encoded body content; opaque to protection
    #[serde(with = "hex_bytes")]
    pub content: Vec<u8>,
}

impl PkiBody {
    pub fn new(body_type: BodyType, content: impl Into<Vec<u8>>) -> Self {
        Self {
            body_type,
            content: content.into(),
        }
    }
}

/// Bit string holding a MAC tag or signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionValue {
    #[serde(with = "hex_bytes")]
    bytes: Vec<u8>,
    unused_bits: u8,
}

impl ProtectionValue {
    /// Whole-byte bit string.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            unused_bits: 0,
        }
    }

    /// Bit string following the named-bit-list rule: trailing zero bits are
    /// not part of the value.
    pub fn from_named_bits(mut bytes: Vec<u8>) -> Self {
        while bytes.last() == Some(&0) {
            bytes.pop();
        }
        let unused_bits = bytes.last().map_or(0, |last| last.trailing_zeros() as u8);
        Self { bytes, unused_bits }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn unused_bits(&self) -> u8 {
        self.unused_bits
    }

    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8 - usize::from(self.unused_bits)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkiMessage {
    pub header: PkiHeader,
    pub body: PkiBody,
    #[serde(default)]
    pub protection: Option<ProtectionValue>,
    #[serde(default)]
    pub extra_certs: Option<Vec<Certificate>>,
}

impl PkiMessage {
    pub fn new(header: PkiHeader, body: PkiBody) -> Self {
        Self {
            header,
            body,
            protection: None,
            extra_certs: None,
        }
    }

    pub fn is_protected(&self) -> bool {
        self.protection.is_some()
    }

    pub fn encode(&self) -> crate::CmpResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> crate::CmpResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_bits_trims_trailing_zeros() {
        let value = ProtectionValue::from_named_bits(vec![0xAB, 0x80, 0x00, 0x00]);
        assert_eq!(value.as_bytes(), &[0xAB, 0x80]);
        assert_eq!(value.unused_bits(), 7);
        assert_eq!(value.bit_len(), 9);
    }

    #[test]
    fn test_named_bits_full_last_byte() {
        let value = ProtectionValue::from_named_bits(vec![0x01, 0xFF]);
        assert_eq!(value.unused_bits(), 0);
        assert_eq!(value.bit_len(), 16);
    }

    #[test]
    fn test_named_bits_all_zero() {
        let value = ProtectionValue::from_named_bits(vec![0; 4]);
        assert!(value.is_empty());
        assert_eq!(value.bit_len(), 0);
    }

    #[test]
    fn test_message_decode_accepts_missing_optionals() {
        let json = r#"{
            "header": {"pvno": 2, "sender": "CN=a", "recipient": ""},
            "body": {"body_type": "genm", "content": "00ff"}
        }"#;
        let msg = PkiMessage::decode(json.as_bytes()).unwrap();
        assert!(msg.header.recipient.is_null());
        assert_eq!(msg.body.content, vec![0x00, 0xFF]);
        assert!(!msg.is_protected());
        assert!(msg.extra_certs.is_none());
    }
}
