//! Scheme-to-loader registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::file::FileLoader;
use crate::loader::StoreLoader;

/// Source of loaders that are looked up on demand rather than registered.
pub trait LoaderProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Loader for `scheme` satisfying `properties`, if this provider has one.
    fn fetch(&self, scheme: &str, properties: Option<&str>) -> Option<Arc<dyn StoreLoader>>;
}

/// Explicitly constructed table of store loaders.
///
/// Registered loaders take precedence over loaders fetched from providers.
/// Schemes are matched case-insensitively.
#[derive(Default)]
pub struct LoaderRegistry {
    loaders: HashMap<String, Arc<dyn StoreLoader>>,
    providers: Vec<Arc<dyn LoaderProvider>>,
}

impl LoaderRegistry {
    /// Create an empty registry without loaders or providers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `file` loader.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.loaders.insert("file".to_string(), Arc::new(FileLoader::new()));
        registry
    }

    /// Registers `loader` under its lowercased scheme. Fails on an invalid
    /// scheme or one that is already taken.
    pub fn register(&mut self, loader: Arc<dyn StoreLoader>) -> StoreResult<()> {
        let scheme = loader.scheme().to_ascii_lowercase();
        validate_scheme(&scheme)?;
        if self.loaders.contains_key(&scheme) {
            return Err(StoreError::InvalidScheme(format!(
                "a loader for {scheme:?} is already registered"
            )));
        }
        tracing::debug!("Registering loader for scheme {}", scheme);
        self.loaders.insert(scheme, loader);
        Ok(())
    }

    /// Removes and returns the loader for `scheme`.
    pub fn unregister(&mut self, scheme: &str) -> Option<Arc<dyn StoreLoader>> {
        self.loaders.remove(&scheme.to_ascii_lowercase())
    }

    /// Registered loader for `scheme`, ignoring case.
    pub fn get(&self, scheme: &str) -> Option<Arc<dyn StoreLoader>> {
        self.loaders.get(&scheme.to_ascii_lowercase()).cloned()
    }

    /// Adds a provider consulted by [`fetch`](Self::fetch) in insertion order.
    pub fn add_provider(&mut self, provider: Arc<dyn LoaderProvider>) {
        tracing::debug!("Adding loader provider {}", provider.name());
        self.providers.push(provider);
    }

    /// First loader any provider offers for `scheme`.
    pub fn fetch(&self, scheme: &str, properties: Option<&str>) -> Option<Arc<dyn StoreLoader>> {
        let scheme = scheme.to_ascii_lowercase();
        self.providers
            .iter()
            .find_map(|provider| provider.fetch(&scheme, properties))
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.loaders.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }
}

impl fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderRegistry")
            .field("schemes", &self.schemes())
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// URI scheme syntax: a letter followed by letters, digits, `+`, `-` or `.`.
fn validate_scheme(scheme: &str) -> StoreResult<()> {
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidScheme(scheme.to_string()))
    }
}
