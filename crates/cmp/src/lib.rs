//! Keystone certificate management protocol: message protection.
//!
//! A [`ProtocolContext`] carries either a shared secret or a certificate
//! with its private key. [`protect`] uses it to attach a password-based MAC
//! or a signature to a [`PkiMessage`], together with the certificates a
//! recipient needs to check it. [`verify_protection`] is the receiving side.
//!
//! ```no_run
//! use keystone_cmp::{protect, BodyType, PkiBody, PkiHeader, PkiMessage, ProtocolContext};
//! use keystone_pki::DistinguishedName;
//!
//! let mut ctx = ProtocolContext::new();
//! ctx.set_secret_value(b"hunter2".to_vec());
//! ctx.set_reference_value(b"client-ref".to_vec());
//!
//! let header = PkiHeader::new(DistinguishedName::null(), DistinguishedName::common_name("ca"));
//! let mut msg = PkiMessage::new(header, PkiBody::new(BodyType::Genm, Vec::new()));
//! protect(&ctx, &mut msg)?;
//! # Ok::<(), keystone_cmp::CmpError>(())
//! ```

pub mod context;
pub mod encode;
pub mod error;
pub mod extra_certs;
pub mod message;
pub mod protect;
pub mod protection;

pub use context::ProtocolContext;
pub use encode::encode_protected_part;
pub use error::{CmpError, CmpResult};
pub use extra_certs::add_extra_certs;
pub use message::{
    AlgorithmIdentifier, BodyType, PkiBody, PkiHeader, PkiMessage, ProtectionValue,
};
pub use protect::protect;
pub use protection::{calc_protection, verify_protection};
