//! Keystone PKI model.
//!
//! Certificates, revocation lists and the certificate authority that issues
//! them, plus the chain building and certificate-list rules used when a
//! protected message carries its signer's chain.

pub mod authority;
pub mod cert_list;
pub mod certificate;
pub mod chain;
pub mod crl;
pub mod error;
pub mod name;

pub use authority::CertificateAuthority;
pub use cert_list::{add_certificate, add_certificates, AddFlags};
pub use certificate::{Certificate, CertificateBuilder, SerialNumber, TbsCertificate};
pub use chain::build_chain;
pub use crl::{CertificateRevocationList, RevokedCertificate};
pub use error::{PkiError, PkiResult};
pub use name::DistinguishedName;
