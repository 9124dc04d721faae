//! Store sessions: URI resolution and pull-based iteration.

use std::collections::VecDeque;
use std::fmt;
use std::io::BufRead;
use std::sync::Arc;

use keystone_core::StoreConfig;

use crate::error::{StoreError, StoreResult};
use crate::loader::{LoaderContext, LoaderParam, ParamKind, StoreLoader};
use crate::object::{ObjectType, StoreObject};
use crate::passphrase::{PassphraseCache, PassphraseSource};
use crate::registry::LoaderRegistry;
use crate::search::{SearchCriterion, SearchType};

const FILE_SCHEME: &str = "file";

/// Hook applied to every pulled object; `None` discards the object.
pub type PostProcess = Box<dyn FnMut(StoreObject) -> Option<StoreObject>>;

/// Schemes to try for `uri`, in order.
///
/// `file` always comes first so that local paths win. A `scheme:` prefix
/// other than `file` adds that scheme as a second candidate; when it is
/// followed by `//` the input cannot be a local path and `file` is dropped.
pub fn candidate_schemes(uri: &str) -> Vec<String> {
    let mut schemes = vec![FILE_SCHEME.to_string()];
    if let Some((scheme, rest)) = uri.split_once(':') {
        if !scheme.eq_ignore_ascii_case(FILE_SCHEME) {
            if rest.starts_with("//") {
                schemes.clear();
            }
            schemes.push(scheme.to_string());
        }
    }
    schemes
}

/// Options applied when a session is opened.
pub struct OpenOptions {
    properties: Option<String>,
    passphrase: Option<Box<dyn PassphraseSource>>,
    post_process: Option<PostProcess>,
    passphrase_caching: bool,
    expect: Option<ObjectType>,
}

impl OpenOptions {
    /// Create options with passphrase caching on and nothing else set.
    pub fn new() -> Self {
        Self {
            properties: None,
            passphrase: None,
            post_process: None,
            passphrase_caching: true,
            expect: None,
        }
    }

    /// Options from the `[store]` configuration section. Fails if the
    /// configured expected type is unknown.
    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        let expect = config
            .expect
            .as_deref()
            .map(str::parse::<ObjectType>)
            .transpose()?;
        Ok(Self {
            properties: config.properties.clone(),
            passphrase_caching: config.passphrase_caching,
            expect,
            ..Self::new()
        })
    }

    /// Property query pushed to loaders fetched from providers.
    pub fn properties(mut self, properties: impl Into<String>) -> Self {
        self.properties = Some(properties.into());
        self
    }

    /// Source asked for passphrases when encrypted objects are decoded.
    pub fn passphrase_source(mut self, source: impl PassphraseSource + 'static) -> Self {
        self.passphrase = Some(Box::new(source));
        self
    }

    /// Hook run on every object the loader yields. Returning `None` drops
    /// the object and the session pulls the next one.
    pub fn post_process(
        mut self,
        hook: impl FnMut(StoreObject) -> Option<StoreObject> + 'static,
    ) -> Self {
        self.post_process = Some(Box::new(hook));
        self
    }

    /// Remember the first passphrase for the rest of the session.
    pub fn passphrase_caching(mut self, enabled: bool) -> Self {
        self.passphrase_caching = enabled;
        self
    }

    /// Expected object type, applied before the first pull.
    pub fn expect(mut self, expect: ObjectType) -> Self {
        self.expect = Some(expect);
        self
    }
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OpenOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenOptions")
            .field("properties", &self.properties)
            .field("passphrase", &self.passphrase.is_some())
            .field("post_process", &self.post_process.is_some())
            .field("passphrase_caching", &self.passphrase_caching)
            .field("expect", &self.expect)
            .finish()
    }
}

/// Closes a loader context on drop unless ownership is taken.
struct LoaderContextGuard(Option<Box<dyn LoaderContext>>);

impl LoaderContextGuard {
    fn new(ctx: Box<dyn LoaderContext>) -> Self {
        Self(Some(ctx))
    }

    fn set_params(&mut self, params: &[LoaderParam]) -> StoreResult<()> {
        match self.0.as_mut() {
            Some(ctx) => ctx.set_params(params),
            None => Err(StoreError::Closed),
        }
    }

    fn into_inner(mut self) -> Option<Box<dyn LoaderContext>> {
        self.0.take()
    }
}

impl Drop for LoaderContextGuard {
    fn drop(&mut self) {
        if let Some(mut ctx) = self.0.take() {
            if let Err(err) = ctx.close() {
                tracing::warn!("Failed to close abandoned loader context: {}", err);
            }
        }
    }
}

/// A cursor over the objects behind one URI or attached stream.
///
/// Sessions are single-threaded. Iteration cannot be rewound; reopen to
/// start over. A backend failure ends iteration and leaves [`error`]
/// set so callers can tell failure from exhaustion.
///
/// [`error`]: StoreSession::error
pub struct StoreSession {
    uri: String,
    scheme: String,
    loader: Arc<dyn StoreLoader>,
    ctx: Option<Box<dyn LoaderContext>>,
    passphrase: PassphraseCache,
    post_process: Option<PostProcess>,
    expected_type: Option<ObjectType>,
    search: Option<SearchCriterion>,
    cache: Option<VecDeque<StoreObject>>,
    loading: bool,
    error: bool,
    last_error: Option<StoreError>,
}

impl StoreSession {
    /// Opens `uri` with the first candidate scheme that yields a loader
    /// context. Registered loaders are preferred over fetched ones.
    pub fn open(registry: &LoaderRegistry, uri: &str, options: OpenOptions) -> StoreResult<Self> {
        let mut reason = None;
        for scheme in candidate_schemes(uri) {
            let attempt = match registry.get(&scheme) {
                Some(loader) => {
                    tracing::debug!("Trying registered loader for scheme {}", scheme);
                    loader
                        .open(uri)
                        .map(|ctx| (loader, LoaderContextGuard::new(ctx)))
                }
                None => match registry.fetch(&scheme, options.properties.as_deref()) {
                    Some(loader) => {
                        tracing::debug!("Trying fetched loader for scheme {}", scheme);
                        loader.open(uri).and_then(|ctx| {
                            let guard = apply_properties(ctx, options.properties.as_deref())?;
                            Ok((loader, guard))
                        })
                    }
                    None => {
                        tracing::debug!("No loader for scheme {}", scheme);
                        reason = Some(format!("no loader for scheme {scheme:?}"));
                        continue;
                    }
                },
            };
            match attempt {
                Ok((loader, guard)) => return Self::assemble(uri, scheme, loader, guard, options),
                Err(err) => {
                    tracing::debug!("Scheme {} cannot open {}: {}", scheme, uri, err);
                    reason = Some(err.to_string());
                }
            }
        }
        Err(StoreError::OpenFailed {
            uri: uri.to_string(),
            reason: reason.unwrap_or_else(|| "no candidate scheme".to_string()),
        })
    }

    /// Reads objects from `reader` with the loader for `scheme`, `file` by
    /// default.
    pub fn attach(
        registry: &LoaderRegistry,
        reader: Box<dyn BufRead>,
        scheme: Option<&str>,
        options: OpenOptions,
    ) -> StoreResult<Self> {
        let scheme = scheme.unwrap_or(FILE_SCHEME).to_ascii_lowercase();
        let uri = format!("{scheme}:<stream>");
        let open_failed = |reason: String| StoreError::OpenFailed {
            uri: uri.clone(),
            reason,
        };

        let (loader, guard) = match registry.get(&scheme) {
            Some(loader) => {
                let ctx = loader.attach(reader).map_err(|e| open_failed(e.to_string()))?;
                (loader, LoaderContextGuard::new(ctx))
            }
            None => {
                let loader = registry
                    .fetch(&scheme, options.properties.as_deref())
                    .ok_or_else(|| open_failed(format!("no loader for scheme {scheme:?}")))?;
                let guard = loader
                    .attach(reader)
                    .and_then(|ctx| apply_properties(ctx, options.properties.as_deref()))
                    .map_err(|e| open_failed(e.to_string()))?;
                (loader, guard)
            }
        };
        Self::assemble(&uri, scheme, loader, guard, options)
    }

    fn assemble(
        uri: &str,
        scheme: String,
        loader: Arc<dyn StoreLoader>,
        guard: LoaderContextGuard,
        options: OpenOptions,
    ) -> StoreResult<Self> {
        let OpenOptions {
            passphrase,
            post_process,
            passphrase_caching,
            expect,
            ..
        } = options;

        let mut session = StoreSession {
            uri: uri.to_string(),
            scheme,
            loader,
            ctx: guard.into_inner(),
            passphrase: PassphraseCache::new(passphrase, passphrase_caching),
            post_process,
            expected_type: None,
            search: None,
            cache: None,
            loading: false,
            error: false,
            last_error: None,
        };
        // On failure the session is dropped, which closes the context.
        if expect.is_some() {
            session.set_expected_type(expect)?;
        }
        tracing::info!("Opened store session for {} ({})", session.uri, session.scheme);
        Ok(session)
    }

    /// URI the session was opened with.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Scheme of the loader serving this session.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Restricts iteration to objects of `expected` type. `Name` objects
    /// always pass so callers can follow them.
    pub fn set_expected_type(&mut self, expected: Option<ObjectType>) -> StoreResult<()> {
        if self.loading {
            return Err(StoreError::AlreadyLoading);
        }
        if self.accepts(ParamKind::Expect) {
            self.context_mut()?
                .set_params(&[LoaderParam::Expect(expected)])?;
        }
        self.expected_type = expected;
        Ok(())
    }

    /// Current expected type, if any.
    pub fn expected_type(&self) -> Option<ObjectType> {
        self.expected_type
    }

    /// Narrows iteration to objects matching `criterion`. Must be called
    /// before the first pull and only for search types the loader supports.
    pub fn set_search_criterion(&mut self, criterion: SearchCriterion) -> StoreResult<()> {
        if self.loading {
            return Err(StoreError::AlreadyLoading);
        }
        let search_type = criterion.search_type();
        if !self.supports_search(search_type) {
            return Err(StoreError::UnsupportedOperation(format!(
                "{} loader cannot search by {}",
                self.scheme, search_type
            )));
        }
        self.context_mut()?
            .set_params(&[LoaderParam::Search(criterion.clone())])?;
        self.search = Some(criterion);
        Ok(())
    }

    /// Criterion set with [`set_search_criterion`](Self::set_search_criterion).
    pub fn search_criterion(&self) -> Option<&SearchCriterion> {
        self.search.as_ref()
    }

    /// Whether the loader can search by `search_type`.
    pub fn supports_search(&self, search_type: SearchType) -> bool {
        self.loader.supports_search(search_type)
    }

    /// Asks the loader to keep decoded secrets in secure memory.
    pub fn set_use_secure_memory(&mut self, enabled: bool) -> StoreResult<()> {
        if !self.accepts(ParamKind::UseSecureMemory) {
            return Err(StoreError::UnsupportedOperation(format!(
                "{} loader has no secure memory control",
                self.scheme
            )));
        }
        self.context_mut()?
            .set_params(&[LoaderParam::UseSecureMemory(enabled)])
    }

    /// True once the loader is exhausted and no queued objects remain.
    pub fn eof(&self) -> bool {
        self.cache.as_ref().map_or(true, VecDeque::is_empty)
            && self.ctx.as_ref().map_or(true, |ctx| ctx.eof())
    }

    /// True if iteration ended because the backend failed.
    pub fn error(&self) -> bool {
        self.error
    }

    /// The error that set [`error`](Self::error), kept for inspection.
    pub fn last_error(&self) -> Option<&StoreError> {
        self.last_error.as_ref()
    }

    /// Closes the loader context and reports its close failure.
    /// Dropping the session also closes it and only logs that error.
    pub fn close(mut self) -> StoreResult<()> {
        self.release()
    }

    fn accepts(&self, kind: ParamKind) -> bool {
        self.loader.settable_params().contains(&kind)
    }

    fn context_mut(&mut self) -> StoreResult<&mut Box<dyn LoaderContext>> {
        self.ctx.as_mut().ok_or(StoreError::Closed)
    }

    /// Next object from the queue or the backend; `None` when nothing more
    /// can be produced.
    fn pull(&mut self) -> Option<StoreObject> {
        if let Some(cache) = self.cache.as_mut() {
            if let Some(object) = cache.pop_front() {
                if cache.is_empty() {
                    self.cache = None;
                }
                return Some(object);
            }
            self.cache = None;
        }

        let ctx = self.ctx.as_mut()?;
        loop {
            if ctx.eof() {
                return None;
            }
            match ctx.load(&mut self.passphrase) {
                Ok(batch) => {
                    let mut batch = VecDeque::from(batch);
                    if let Some(object) = batch.pop_front() {
                        if !batch.is_empty() {
                            self.cache = Some(batch);
                        }
                        return Some(object);
                    }
                }
                // A loader may report exhaustion by failing its last pull.
                Err(err) if ctx.eof() => {
                    tracing::debug!("Loading from {} ended: {}", self.uri, err);
                    return None;
                }
                Err(err) => {
                    tracing::warn!("Loading from {} failed: {}", self.uri, err);
                    self.error = true;
                    self.last_error = Some(err);
                    return None;
                }
            }
        }
    }

    fn release(&mut self) -> StoreResult<()> {
        self.cache = None;
        self.passphrase.clear();
        match self.ctx.take() {
            Some(mut ctx) => {
                tracing::info!("Closing store session for {}", self.uri);
                ctx.close()
            }
            None => Ok(()),
        }
    }
}

impl Iterator for StoreSession {
    type Item = StoreObject;

    fn next(&mut self) -> Option<StoreObject> {
        loop {
            if self.error || self.eof() {
                return None;
            }
            self.loading = true;

            let object = self.pull()?;

            let object = match self.post_process.as_mut() {
                Some(hook) => match hook(object) {
                    Some(object) => object,
                    None => continue,
                },
                None => object,
            };

            let object_type = object.object_type();
            if let Some(expected) = self.expected_type {
                if object_type != ObjectType::Name && object_type != expected {
                    continue;
                }
            }

            self.passphrase.clear();
            tracing::debug!("Got a {}", object_type);
            return Some(object);
        }
    }
}

impl Drop for StoreSession {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            tracing::warn!("Failed to close store session for {}: {}", self.uri, err);
        }
    }
}

impl fmt::Debug for StoreSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSession")
            .field("uri", &self.uri)
            .field("scheme", &self.scheme)
            .field("expected_type", &self.expected_type)
            .field("search", &self.search)
            .field("queued", &self.cache.as_ref().map_or(0, VecDeque::len))
            .field("loading", &self.loading)
            .field("error", &self.error)
            .finish()
    }
}

fn apply_properties(
    ctx: Box<dyn LoaderContext>,
    properties: Option<&str>,
) -> StoreResult<LoaderContextGuard> {
    let mut guard = LoaderContextGuard::new(ctx);
    if let Some(properties) = properties {
        guard.set_params(&[LoaderParam::Properties(properties.to_string())])?;
    }
    Ok(guard)
}
