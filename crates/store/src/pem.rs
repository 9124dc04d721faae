//! PEM armour for store files.
//!
//! A block is `-----BEGIN <label>-----`, optional `Name: value` headers
//! ended by a blank line, base64 content and the matching END line.
//! Certificates and CRLs carry their serialized form. Keys carry raw key
//! bytes with the key type in a `Key-Type` header. Encrypted private keys
//! derive their key with PBKDF2-HMAC-SHA256 and seal with ChaCha20-Poly1305.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use hmac::Hmac;
use keystone_crypto::{KeyType, PrivateKey, PublicKey};
use keystone_pki::{Certificate, CertificateRevocationList};
use rand::RngCore;
use sha2::Sha256;
use std::io::BufRead;
use zeroize::Zeroizing;

use crate::error::{StoreError, StoreResult};
use crate::object::KeyParameters;

pub const LABEL_CERTIFICATE: &str = "CERTIFICATE";
pub const LABEL_CRL: &str = "X509 CRL";
pub const LABEL_PRIVATE_KEY: &str = "PRIVATE KEY";
pub const LABEL_ENCRYPTED_PRIVATE_KEY: &str = "ENCRYPTED PRIVATE KEY";
pub const LABEL_PUBLIC_KEY: &str = "PUBLIC KEY";
pub const LABEL_PARAMETERS: &str = "PARAMETERS";

const HEADER_KEY_TYPE: &str = "Key-Type";
const HEADER_SALT: &str = "Kdf-Salt";
const HEADER_ITERATIONS: &str = "Kdf-Iterations";
const HEADER_NONCE: &str = "Nonce";

pub const DEFAULT_KDF_ITERATIONS: u32 = 100_000;
const KDF_SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const LINE_WIDTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemBlock {
    pub label: String,
    pub headers: Vec<(String, String)>,
    pub data: Vec<u8>,
}

impl PemBlock {
    pub fn new(label: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            headers: Vec::new(),
            data,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn required_header(&self, name: &str) -> StoreResult<&str> {
        self.header(name).ok_or_else(|| {
            StoreError::Decode(format!("{} block is missing the {} header", self.label, name))
        })
    }

    fn key_type(&self) -> StoreResult<KeyType> {
        Ok(self.required_header(HEADER_KEY_TYPE)?.parse()?)
    }

    pub fn to_pem(&self) -> String {
        let mut out = format!("-----BEGIN {}-----\n", self.label);
        for (name, value) in &self.headers {
            out.push_str(&format!("{name}: {value}\n"));
        }
        if !self.headers.is_empty() {
            out.push('\n');
        }
        let encoded = STANDARD.encode(&self.data);
        for chunk in encoded.as_bytes().chunks(LINE_WIDTH) {
            // base64 output is ASCII, so every chunk is valid UTF-8
            out.push_str(&String::from_utf8_lossy(chunk));
            out.push('\n');
        }
        out.push_str(&format!("-----END {}-----\n", self.label));
        out
    }
}

/// Incremental PEM parser; text outside blocks is ignored.
pub struct PemReader<R> {
    reader: R,
    line: String,
}

impl<R: BufRead> PemReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }

    fn read_line(&mut self) -> StoreResult<Option<&str>> {
        self.line.clear();
        if self.reader.read_line(&mut self.line)? == 0 {
            return Ok(None);
        }
        Ok(Some(self.line.trim()))
    }

    /// Next block, or `None` at end of input.
    pub fn next_block(&mut self) -> StoreResult<Option<PemBlock>> {
        let label = loop {
            match self.read_line()? {
                None => return Ok(None),
                Some(line) => {
                    if let Some(label) = strip_marker(line, "BEGIN") {
                        break label.to_string();
                    }
                }
            }
        };

        let mut headers = Vec::new();
        let mut body = String::new();
        let mut in_headers = true;
        loop {
            let line = self
                .read_line()?
                .ok_or_else(|| StoreError::Decode(format!("unterminated {label} block")))?
                .to_string();
            if let Some(end) = strip_marker(&line, "END") {
                if end != label {
                    return Err(StoreError::Decode(format!(
                        "{label} block closed by END {end}"
                    )));
                }
                break;
            }
            if in_headers {
                if let Some((name, value)) = line.split_once(':') {
                    headers.push((name.trim().to_string(), value.trim().to_string()));
                    continue;
                }
                in_headers = false;
                if line.is_empty() {
                    continue;
                }
            }
            body.push_str(&line);
        }

        let data = STANDARD
            .decode(body.as_bytes())
            .map_err(|e| StoreError::Decode(format!("{label} block: {e}")))?;
        Ok(Some(PemBlock {
            label,
            headers,
            data,
        }))
    }
}

fn strip_marker<'a>(line: &'a str, kind: &str) -> Option<&'a str> {
    line.strip_prefix("-----")?
        .strip_prefix(kind)?
        .strip_prefix(' ')?
        .strip_suffix("-----")
}

pub fn encode_certificate(cert: &Certificate) -> StoreResult<String> {
    Ok(PemBlock::new(LABEL_CERTIFICATE, cert.encode()?).to_pem())
}

pub fn encode_crl(crl: &CertificateRevocationList) -> StoreResult<String> {
    Ok(PemBlock::new(LABEL_CRL, crl.encode()?).to_pem())
}

pub fn encode_public_key(key: &PublicKey) -> String {
    PemBlock::new(LABEL_PUBLIC_KEY, key.to_bytes())
        .with_header(HEADER_KEY_TYPE, key.key_type().name())
        .to_pem()
}

pub fn encode_parameters(params: &KeyParameters) -> String {
    PemBlock::new(LABEL_PARAMETERS, Vec::new())
        .with_header(HEADER_KEY_TYPE, params.key_type.name())
        .to_pem()
}

/// Unencrypted private key. The returned text holds secret material.
pub fn encode_private_key(key: &PrivateKey) -> Zeroizing<String> {
    let block = PemBlock::new(LABEL_PRIVATE_KEY, key.to_bytes().to_vec())
        .with_header(HEADER_KEY_TYPE, key.key_type().name());
    let pem = Zeroizing::new(block.to_pem());
    drop(Zeroizing::new(block.data));
    pem
}

pub fn encode_encrypted_private_key(
    key: &PrivateKey,
    passphrase: &[u8],
    iterations: u32,
) -> StoreResult<String> {
    let mut salt = [0u8; KDF_SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    rand::thread_rng().fill_bytes(&mut nonce);

    let cipher = key_encryption_cipher(passphrase, &salt, iterations)?;
    let secret = key.to_bytes();
    let key_type = key.key_type();
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: &secret,
                aad: key_type.name().as_bytes(),
            },
        )
        .map_err(|e| StoreError::Loader(format!("key encryption failed: {e}")))?;

    Ok(PemBlock::new(LABEL_ENCRYPTED_PRIVATE_KEY, ciphertext)
        .with_header(HEADER_KEY_TYPE, key_type.name())
        .with_header(HEADER_SALT, hex::encode(salt))
        .with_header(HEADER_ITERATIONS, iterations.to_string())
        .with_header(HEADER_NONCE, hex::encode(nonce))
        .to_pem())
}

pub(crate) fn decode_certificate(block: &PemBlock) -> StoreResult<Certificate> {
    Ok(Certificate::decode(&block.data)?)
}

pub(crate) fn decode_crl(block: &PemBlock) -> StoreResult<CertificateRevocationList> {
    Ok(CertificateRevocationList::decode(&block.data)?)
}

pub(crate) fn decode_public_key(block: &PemBlock) -> StoreResult<PublicKey> {
    Ok(PublicKey::from_bytes(block.key_type()?, &block.data)?)
}

pub(crate) fn decode_parameters(block: &PemBlock) -> StoreResult<KeyParameters> {
    Ok(KeyParameters {
        key_type: block.key_type()?,
    })
}

pub(crate) fn decode_private_key(block: &PemBlock) -> StoreResult<PrivateKey> {
    Ok(PrivateKey::from_bytes(block.key_type()?, &block.data)?)
}

pub(crate) fn decrypt_private_key(block: &PemBlock, passphrase: &[u8]) -> StoreResult<PrivateKey> {
    let key_type = block.key_type()?;
    let salt = decode_hex_header(block, HEADER_SALT)?;
    let nonce = decode_hex_header(block, HEADER_NONCE)?;
    if nonce.len() != NONCE_LEN {
        return Err(StoreError::Decode(format!(
            "nonce must be {NONCE_LEN} bytes, got {}",
            nonce.len()
        )));
    }
    let iterations: u32 = block
        .required_header(HEADER_ITERATIONS)?
        .parse()
        .map_err(|e| StoreError::Decode(format!("{HEADER_ITERATIONS}: {e}")))?;

    let cipher = key_encryption_cipher(passphrase, &salt, iterations)?;
    let secret = Zeroizing::new(
        cipher
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &block.data,
                    aad: key_type.name().as_bytes(),
                },
            )
            .map_err(|_| {
                StoreError::Decode("private key decryption failed (wrong passphrase?)".to_string())
            })?,
    );
    Ok(PrivateKey::from_bytes(key_type, &secret)?)
}

fn decode_hex_header(block: &PemBlock, name: &str) -> StoreResult<Vec<u8>> {
    hex::decode(block.required_header(name)?)
        .map_err(|e| StoreError::Decode(format!("{name}: {e}")))
}

fn key_encryption_cipher(
    passphrase: &[u8],
    salt: &[u8],
    iterations: u32,
) -> StoreResult<ChaCha20Poly1305> {
    if iterations == 0 {
        return Err(StoreError::Decode("KDF iteration count must be positive".to_string()));
    }
    let mut key = Zeroizing::new([0u8; 32]);
    pbkdf2::pbkdf2::<Hmac<Sha256>>(passphrase, salt, iterations, key.as_mut_slice())
        .map_err(|e| StoreError::Loader(format!("key derivation failed: {e}")))?;
    ChaCha20Poly1305::new_from_slice(key.as_slice())
        .map_err(|e| StoreError::Loader(format!("invalid key encryption key: {e}")))
}
