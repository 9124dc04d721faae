//! Loader traits implemented by store backends.
//!
//! A [`StoreLoader`] is the per-scheme factory. Opening a URI or attaching
//! a stream yields a [`LoaderContext`], the stateful cursor a session pulls
//! objects from.

use std::io::BufRead;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectType, StoreObject};
use crate::passphrase::PassphraseCache;
use crate::search::{SearchCriterion, SearchType};

/// Parameter names a loader context may accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Properties,
    Expect,
    Subject,
    Issuer,
    Serial,
    Digest,
    Fingerprint,
    Alias,
    UseSecureMemory,
}

/// Parameter values pushed to a loader context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderParam {
    /// Property query the loader should apply to its own fetches
    Properties(String),
    /// Object type the caller is interested in; `None` means any
    Expect(Option<ObjectType>),
    Search(SearchCriterion),
    UseSecureMemory(bool),
}

pub trait StoreLoader: Send + Sync {
    /// URI scheme handled by this loader, in lowercase.
    fn scheme(&self) -> &str;

    fn open(&self, uri: &str) -> StoreResult<Box<dyn LoaderContext>>;

    fn attach(&self, _reader: Box<dyn BufRead>) -> StoreResult<Box<dyn LoaderContext>> {
        Err(StoreError::UnsupportedOperation(format!(
            "{} loader cannot attach to a stream",
            self.scheme()
        )))
    }

    /// Parameters [`LoaderContext::set_params`] understands.
    fn settable_params(&self) -> &[ParamKind] {
        &[]
    }

    fn supports_search(&self, search_type: SearchType) -> bool {
        let params = self.settable_params();
        match search_type {
            SearchType::Name => params.contains(&ParamKind::Subject),
            SearchType::IssuerSerial => {
                params.contains(&ParamKind::Issuer) && params.contains(&ParamKind::Serial)
            }
            SearchType::KeyFingerprint => params.contains(&ParamKind::Fingerprint),
            SearchType::Alias => params.contains(&ParamKind::Alias),
        }
    }
}

pub trait LoaderContext {
    /// Pulls the next batch of objects.
    ///
    /// Usually one object. Extra objects are queued by the session and
    /// handed out in order. An empty batch with [`eof`](Self::eof) still
    /// false means the loader consumed input without producing an object.
    fn load(&mut self, passphrase: &mut PassphraseCache) -> StoreResult<Vec<StoreObject>>;

    fn eof(&self) -> bool;

    fn set_params(&mut self, params: &[LoaderParam]) -> StoreResult<()>;

    fn close(&mut self) -> StoreResult<()>;
}
