//! Objects produced by store loaders.

use keystone_crypto::{KeyType, PrivateKey, PublicKey};
use keystone_pki::{Certificate, CertificateRevocationList};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectType {
    /// Reference to another loadable object, such as a directory entry
    Name,
    Params,
    PublicKey,
    PrivateKey,
    Certificate,
    Crl,
    /// Data whose format the loader could not interpret itself
    EmbeddedBlob,
}

impl ObjectType {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectType::Name => "name",
            ObjectType::Params => "params",
            ObjectType::PublicKey => "public-key",
            ObjectType::PrivateKey => "private-key",
            ObjectType::Certificate => "certificate",
            ObjectType::Crl => "crl",
            ObjectType::EmbeddedBlob => "embedded-blob",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ObjectType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "name" => Ok(ObjectType::Name),
            "params" | "parameters" => Ok(ObjectType::Params),
            "public-key" | "pubkey" => Ok(ObjectType::PublicKey),
            "private-key" | "pkey" => Ok(ObjectType::PrivateKey),
            "certificate" | "cert" => Ok(ObjectType::Certificate),
            "crl" => Ok(ObjectType::Crl),
            "embedded-blob" | "embedded" => Ok(ObjectType::EmbeddedBlob),
            _ => Err(StoreError::InvalidArgument(format!("unknown object type {s:?}"))),
        }
    }
}

/// Key parameters without key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyParameters {
    pub key_type: KeyType,
}

/// A typed object pulled from a store.
///
/// Keys, certificates and CRLs are held behind `Arc` so a loader may keep a
/// handle to what it hands out.
#[derive(Debug, Clone)]
pub enum StoreObject {
    Name {
        name: String,
        description: Option<String>,
    },
    Params(Arc<KeyParameters>),
    PublicKey(Arc<PublicKey>),
    PrivateKey(Arc<PrivateKey>),
    Certificate(Arc<Certificate>),
    Crl(Arc<CertificateRevocationList>),
    EmbeddedBlob {
        format: String,
        data: Vec<u8>,
    },
}

impl StoreObject {
    pub fn new_name(name: impl Into<String>) -> Self {
        StoreObject::Name {
            name: name.into(),
            description: None,
        }
    }

    /// Attaches a description to a `Name` object.
    pub fn set_name_description(&mut self, desc: impl Into<String>) -> StoreResult<()> {
        match self {
            StoreObject::Name { description, .. } => {
                *description = Some(desc.into());
                Ok(())
            }
            other => Err(StoreError::InvalidArgument(format!(
                "cannot describe a {} object",
                other.object_type()
            ))),
        }
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            StoreObject::Name { .. } => ObjectType::Name,
            StoreObject::Params(_) => ObjectType::Params,
            StoreObject::PublicKey(_) => ObjectType::PublicKey,
            StoreObject::PrivateKey(_) => ObjectType::PrivateKey,
            StoreObject::Certificate(_) => ObjectType::Certificate,
            StoreObject::Crl(_) => ObjectType::Crl,
            StoreObject::EmbeddedBlob { .. } => ObjectType::EmbeddedBlob,
        }
    }

    fn wrong_type(&self, expected: ObjectType) -> StoreError {
        StoreError::WrongObjectType {
            expected,
            actual: self.object_type(),
        }
    }

    pub fn name(&self) -> StoreResult<&str> {
        match self {
            StoreObject::Name { name, .. } => Ok(name),
            other => Err(other.wrong_type(ObjectType::Name)),
        }
    }

    pub fn name_description(&self) -> StoreResult<Option<&str>> {
        match self {
            StoreObject::Name { description, .. } => Ok(description.as_deref()),
            other => Err(other.wrong_type(ObjectType::Name)),
        }
    }

    pub fn params(&self) -> StoreResult<Arc<KeyParameters>> {
        match self {
            StoreObject::Params(params) => Ok(Arc::clone(params)),
            other => Err(other.wrong_type(ObjectType::Params)),
        }
    }

    pub fn public_key(&self) -> StoreResult<Arc<PublicKey>> {
        match self {
            StoreObject::PublicKey(key) => Ok(Arc::clone(key)),
            other => Err(other.wrong_type(ObjectType::PublicKey)),
        }
    }

    pub fn private_key(&self) -> StoreResult<Arc<PrivateKey>> {
        match self {
            StoreObject::PrivateKey(key) => Ok(Arc::clone(key)),
            other => Err(other.wrong_type(ObjectType::PrivateKey)),
        }
    }

    pub fn certificate(&self) -> StoreResult<Arc<Certificate>> {
        match self {
            StoreObject::Certificate(cert) => Ok(Arc::clone(cert)),
            other => Err(other.wrong_type(ObjectType::Certificate)),
        }
    }

    pub fn crl(&self) -> StoreResult<Arc<CertificateRevocationList>> {
        match self {
            StoreObject::Crl(crl) => Ok(Arc::clone(crl)),
            other => Err(other.wrong_type(ObjectType::Crl)),
        }
    }

    /// Format tag and raw bytes of an embedded blob.
    pub fn embedded(&self) -> StoreResult<(&str, &[u8])> {
        match self {
            StoreObject::EmbeddedBlob { format, data } => Ok((format, data)),
            other => Err(other.wrong_type(ObjectType::EmbeddedBlob)),
        }
    }

    /// Public key of a key or certificate object.
    pub(crate) fn subject_public_key(&self) -> Option<PublicKey> {
        match self {
            StoreObject::PublicKey(key) => Some(PublicKey::clone(key)),
            StoreObject::PrivateKey(key) => Some(key.public_key()),
            StoreObject::Certificate(cert) => Some(cert.public_key().clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        let key = PrivateKey::generate(KeyType::Ed25519);
        let object = StoreObject::PublicKey(Arc::new(key.public_key()));

        assert_eq!(object.object_type(), ObjectType::PublicKey);
        assert_eq!(*object.public_key().unwrap(), key.public_key());
        assert!(matches!(
            object.certificate(),
            Err(StoreError::WrongObjectType {
                expected: ObjectType::Certificate,
                actual: ObjectType::PublicKey
            })
        ));
        assert!(object.name().is_err());
    }

    #[test]
    fn test_shared_handles() {
        let key = Arc::new(PrivateKey::generate(KeyType::EcdsaP256));
        let object = StoreObject::PrivateKey(Arc::clone(&key));
        let pulled = object.private_key().unwrap();
        assert!(Arc::ptr_eq(&key, &pulled));
        assert_eq!(Arc::strong_count(&key), 3);
    }

    #[test]
    fn test_name_description() {
        let mut object = StoreObject::new_name("file:///etc/keys/a.pem");
        assert_eq!(object.name_description().unwrap(), None);
        object.set_name_description("PEM file").unwrap();
        assert_eq!(object.name_description().unwrap(), Some("PEM file"));

        let mut blob = StoreObject::EmbeddedBlob {
            format: "PKCS12".to_string(),
            data: vec![1],
        };
        assert!(blob.set_name_description("x").is_err());
        assert_eq!(blob.embedded().unwrap(), ("PKCS12", &[1u8][..]));
    }

    #[test]
    fn test_object_type_names() {
        assert_eq!("cert".parse::<ObjectType>().unwrap(), ObjectType::Certificate);
        assert_eq!("PRIVATE_KEY".parse::<ObjectType>().unwrap(), ObjectType::PrivateKey);
        assert!("widget".parse::<ObjectType>().is_err());
    }
}
