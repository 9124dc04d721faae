//! Built-in loader for the `file` scheme.
//!
//! A regular file, or an attached stream, is read as a sequence of PEM
//! blocks and yields one object per block. A directory yields one `Name`
//! object per entry, which callers can open in turn.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::loader::{LoaderContext, LoaderParam, ParamKind, StoreLoader};
use crate::object::{ObjectType, StoreObject};
use crate::passphrase::PassphraseCache;
use crate::pem::{self, PemBlock, PemReader};
use crate::search::SearchCriterion;

const FILE_SCHEME: &str = "file";
const ATTACHED_URI: &str = "<attached stream>";

const FILE_PARAMS: &[ParamKind] = &[
    ParamKind::Expect,
    ParamKind::Subject,
    ParamKind::Digest,
    ParamKind::Fingerprint,
    ParamKind::UseSecureMemory,
];

#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader;

impl FileLoader {
    pub fn new() -> Self {
        Self
    }
}

impl StoreLoader for FileLoader {
    fn scheme(&self) -> &str {
        FILE_SCHEME
    }

    fn open(&self, uri: &str) -> StoreResult<Box<dyn LoaderContext>> {
        let path = uri_to_path(uri)?;
        let metadata = fs::metadata(&path)?;
        let source = if metadata.is_dir() {
            tracing::debug!("Opening directory {}", path.display());
            Source::Directory { path }
        } else {
            tracing::debug!("Opening file {}", path.display());
            let reader: Box<dyn BufRead> = Box::new(BufReader::new(fs::File::open(&path)?));
            Source::Pem(PemReader::new(reader))
        };
        Ok(Box::new(FileContext::new(uri, source)))
    }

    fn attach(&self, reader: Box<dyn BufRead>) -> StoreResult<Box<dyn LoaderContext>> {
        Ok(Box::new(FileContext::new(
            ATTACHED_URI,
            Source::Pem(PemReader::new(reader)),
        )))
    }

    fn settable_params(&self) -> &[ParamKind] {
        FILE_PARAMS
    }
}

/// Maps a `file` URI, or a bare path, to a local path.
///
/// Accepts `file:/p`, `file:///p` and `file://localhost/p`. Any other
/// authority is rejected.
pub fn uri_to_path(uri: &str) -> StoreResult<PathBuf> {
    let rest = match uri.get(..FILE_SCHEME.len() + 1) {
        Some(prefix) if prefix.eq_ignore_ascii_case("file:") => &uri[FILE_SCHEME.len() + 1..],
        _ => return Ok(PathBuf::from(uri)),
    };
    let Some(after) = rest.strip_prefix("//") else {
        return Ok(PathBuf::from(rest));
    };
    let (authority, path) = match after.find('/') {
        Some(idx) => after.split_at(idx),
        None => (after, ""),
    };
    if !authority.is_empty() && !authority.eq_ignore_ascii_case("localhost") {
        return Err(StoreError::InvalidArgument(format!(
            "file URI {uri:?} names non-local authority {authority:?}"
        )));
    }
    if path.is_empty() {
        return Err(StoreError::InvalidArgument(format!("file URI {uri:?} has no path")));
    }
    Ok(PathBuf::from(path))
}

enum Source {
    Directory { path: PathBuf },
    Pem(PemReader<Box<dyn BufRead>>),
    Closed,
}

struct FileContext {
    uri: String,
    source: Source,
    eof: bool,
    expect: Option<ObjectType>,
    search: Option<SearchCriterion>,
    secure_memory: bool,
}

impl FileContext {
    fn new(uri: &str, source: Source) -> Self {
        Self {
            uri: uri.to_string(),
            source,
            eof: false,
            expect: None,
            search: None,
            secure_memory: false,
        }
    }

    fn list_directory(&self, path: &Path) -> StoreResult<Vec<StoreObject>> {
        let mut entries = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort();
        let base = self.uri.trim_end_matches('/');
        Ok(entries
            .into_iter()
            .map(|entry| StoreObject::new_name(format!("{base}/{entry}")))
            .collect())
    }

    fn decode_block(
        &self,
        block: &PemBlock,
        passphrase: &mut PassphraseCache,
    ) -> StoreResult<StoreObject> {
        let object = match block.label.as_str() {
            pem::LABEL_CERTIFICATE => {
                StoreObject::Certificate(Arc::new(pem::decode_certificate(block)?))
            }
            pem::LABEL_CRL => StoreObject::Crl(Arc::new(pem::decode_crl(block)?)),
            pem::LABEL_PRIVATE_KEY => {
                StoreObject::PrivateKey(Arc::new(pem::decode_private_key(block)?))
            }
            pem::LABEL_ENCRYPTED_PRIVATE_KEY => {
                let secret = passphrase.obtain(&format!("Pass phrase for {}", self.uri))?;
                StoreObject::PrivateKey(Arc::new(pem::decrypt_private_key(block, &secret)?))
            }
            pem::LABEL_PUBLIC_KEY => {
                StoreObject::PublicKey(Arc::new(pem::decode_public_key(block)?))
            }
            pem::LABEL_PARAMETERS => {
                StoreObject::Params(Arc::new(pem::decode_parameters(block)?))
            }
            other => StoreObject::EmbeddedBlob {
                format: other.to_string(),
                data: block.data.clone(),
            },
        };
        Ok(object)
    }
}

/// Object type a block will decode to, judged from its label alone.
fn label_object_type(label: &str) -> ObjectType {
    match label {
        pem::LABEL_CERTIFICATE => ObjectType::Certificate,
        pem::LABEL_CRL => ObjectType::Crl,
        pem::LABEL_PRIVATE_KEY | pem::LABEL_ENCRYPTED_PRIVATE_KEY => ObjectType::PrivateKey,
        pem::LABEL_PUBLIC_KEY => ObjectType::PublicKey,
        pem::LABEL_PARAMETERS => ObjectType::Params,
        _ => ObjectType::EmbeddedBlob,
    }
}

impl LoaderContext for FileContext {
    fn load(&mut self, passphrase: &mut PassphraseCache) -> StoreResult<Vec<StoreObject>> {
        if self.eof {
            return Ok(Vec::new());
        }
        match &self.source {
            Source::Closed => return Err(StoreError::Closed),
            Source::Directory { path } => {
                let names = self.list_directory(path)?;
                self.eof = true;
                return Ok(names);
            }
            Source::Pem(_) => {}
        }
        loop {
            let Source::Pem(reader) = &mut self.source else {
                return Err(StoreError::Closed);
            };
            let Some(block) = reader.next_block()? else {
                self.eof = true;
                return Ok(Vec::new());
            };
            // Skip before decoding so unwanted encrypted keys never prompt.
            if let Some(expect) = self.expect {
                if label_object_type(&block.label) != expect {
                    continue;
                }
            }
            let object = self.decode_block(&block, passphrase)?;
            if let Some(search) = &self.search {
                if !search.matches(&object) {
                    continue;
                }
            }
            return Ok(vec![object]);
        }
    }

    fn eof(&self) -> bool {
        self.eof
    }

    fn set_params(&mut self, params: &[LoaderParam]) -> StoreResult<()> {
        for param in params {
            match param {
                LoaderParam::Expect(expect) => self.expect = *expect,
                LoaderParam::Search(criterion) => self.search = Some(criterion.clone()),
                LoaderParam::UseSecureMemory(enabled) => {
                    tracing::debug!("Secure memory for {}: {}", self.uri, enabled);
                    self.secure_memory = *enabled;
                }
                // The file loader performs no algorithm fetches of its own.
                LoaderParam::Properties(_) => {}
            }
        }
        Ok(())
    }

    fn close(&mut self) -> StoreResult<()> {
        tracing::debug!("Closing {} (secure memory: {})", self.uri, self.secure_memory);
        self.source = Source::Closed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_crypto::{DigestAlgorithm, KeyType, PrivateKey};
    use keystone_pki::{Certificate, CertificateBuilder, DistinguishedName};
    use std::io::Cursor;

    fn certificate(name: &str) -> (Certificate, PrivateKey) {
        let key = PrivateKey::generate(KeyType::EcdsaP256);
        let cert = CertificateBuilder::new(DistinguishedName::common_name(name), key.public_key())
            .self_signed(&key, DigestAlgorithm::Sha256)
            .unwrap();
        (cert, key)
    }

    fn attached(text: String) -> Box<dyn LoaderContext> {
        FileLoader::new()
            .attach(Box::new(Cursor::new(text.into_bytes())))
            .unwrap()
    }

    fn drain(ctx: &mut dyn LoaderContext, cache: &mut PassphraseCache) -> Vec<StoreObject> {
        let mut objects = Vec::new();
        while !ctx.eof() {
            objects.extend(ctx.load(cache).unwrap());
        }
        objects
    }

    #[test]
    fn test_uri_to_path() {
        assert_eq!(uri_to_path("/etc/ssl/a.pem").unwrap(), Path::new("/etc/ssl/a.pem"));
        assert_eq!(uri_to_path("file:/a.pem").unwrap(), Path::new("/a.pem"));
        assert_eq!(uri_to_path("FILE:///a.pem").unwrap(), Path::new("/a.pem"));
        assert_eq!(uri_to_path("file://localhost/a.pem").unwrap(), Path::new("/a.pem"));
        assert_eq!(uri_to_path("file:rel.pem").unwrap(), Path::new("rel.pem"));
        assert!(uri_to_path("file://remote/a.pem").is_err());
        assert!(uri_to_path("file://localhost").is_err());
    }

    #[test]
    fn test_blocks_map_to_object_types() {
        let (cert, key) = certificate("leaf");
        let text = format!(
            "{}{}{}{}",
            pem::encode_certificate(&cert).unwrap(),
            pem::encode_private_key(&key).as_str(),
            pem::encode_public_key(&key.public_key()),
            PemBlock::new("OPAQUE THING", b"blob".to_vec()).to_pem()
        );
        let mut ctx = attached(text);
        let objects = drain(ctx.as_mut(), &mut PassphraseCache::default());

        let types: Vec<ObjectType> = objects.iter().map(StoreObject::object_type).collect();
        assert_eq!(
            types,
            vec![
                ObjectType::Certificate,
                ObjectType::PrivateKey,
                ObjectType::PublicKey,
                ObjectType::EmbeddedBlob
            ]
        );
        assert_eq!(*objects[0].certificate().unwrap(), cert);
        assert_eq!(objects[3].embedded().unwrap(), ("OPAQUE THING", &b"blob"[..]));
    }

    #[test]
    fn test_expect_skips_encrypted_key_without_prompting() {
        let (cert, key) = certificate("leaf");
        let text = format!(
            "{}{}",
            pem::encode_encrypted_private_key(&key, b"secret", 1_000).unwrap(),
            pem::encode_certificate(&cert).unwrap()
        );
        let mut ctx = attached(text);
        ctx.set_params(&[LoaderParam::Expect(Some(ObjectType::Certificate))])
            .unwrap();

        // No passphrase source: decoding the key would fail.
        let objects = drain(ctx.as_mut(), &mut PassphraseCache::default());
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].object_type(), ObjectType::Certificate);
    }

    #[test]
    fn test_search_filters_blocks() {
        let (alice, _) = certificate("alice");
        let (bob, _) = certificate("bob");
        let text = format!(
            "{}{}",
            pem::encode_certificate(&alice).unwrap(),
            pem::encode_certificate(&bob).unwrap()
        );
        let mut ctx = attached(text);
        ctx.set_params(&[LoaderParam::Search(SearchCriterion::by_name(
            DistinguishedName::common_name("bob"),
        ))])
        .unwrap();

        let objects = drain(ctx.as_mut(), &mut PassphraseCache::default());
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].certificate().unwrap().subject(), bob.subject());
    }

    #[test]
    fn test_directory_lists_sorted_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.pem"), "").unwrap();
        fs::write(dir.path().join("a.pem"), "").unwrap();
        let uri = format!("file://{}", dir.path().display());

        let mut ctx = FileLoader::new().open(&uri).unwrap();
        let objects = ctx.load(&mut PassphraseCache::default()).unwrap();
        assert!(ctx.eof());
        let names: Vec<&str> = objects.iter().map(|o| o.name().unwrap()).collect();
        assert_eq!(names, vec![format!("{uri}/a.pem"), format!("{uri}/b.pem")]);
    }

    #[test]
    fn test_missing_file_fails_to_open() {
        assert!(matches!(
            FileLoader::new().open("/nonexistent/keystone/store.pem"),
            Err(StoreError::Io(_))
        ));
    }

    #[test]
    fn test_closed_context_errors() {
        let mut ctx = attached(String::new());
        ctx.close().unwrap();
        assert!(matches!(
            ctx.load(&mut PassphraseCache::default()),
            Err(StoreError::Closed)
        ));
    }
}
