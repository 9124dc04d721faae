//! Passphrase retrieval for encrypted store objects.

use std::fmt;
use zeroize::Zeroizing;

use crate::error::{StoreError, StoreResult};

/// Supplies passphrases on request. Returning `None` cancels.
pub trait PassphraseSource {
    fn obtain_passphrase(&mut self, prompt: &str) -> Option<Zeroizing<Vec<u8>>>;
}

impl<F> PassphraseSource for F
where
    F: FnMut(&str) -> Option<Zeroizing<Vec<u8>>>,
{
    fn obtain_passphrase(&mut self, prompt: &str) -> Option<Zeroizing<Vec<u8>>> {
        self(prompt)
    }
}

/// Fixed passphrase, for non-interactive use.
pub struct StaticPassphrase(Zeroizing<Vec<u8>>);

impl StaticPassphrase {
    pub fn new(passphrase: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(passphrase.into()))
    }
}

impl PassphraseSource for StaticPassphrase {
    fn obtain_passphrase(&mut self, _prompt: &str) -> Option<Zeroizing<Vec<u8>>> {
        Some(self.0.clone())
    }
}

/// Per-session passphrase state.
///
/// With caching enabled, the first passphrase obtained while pulling an
/// object is reused for the rest of that pull. The session clears it after
/// every object.
pub struct PassphraseCache {
    source: Option<Box<dyn PassphraseSource>>,
    caching: bool,
    cached: Option<Zeroizing<Vec<u8>>>,
}

impl PassphraseCache {
    pub fn new(source: Option<Box<dyn PassphraseSource>>, caching: bool) -> Self {
        Self {
            source,
            caching,
            cached: None,
        }
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    pub fn obtain(&mut self, prompt: &str) -> StoreResult<Zeroizing<Vec<u8>>> {
        if let Some(cached) = &self.cached {
            return Ok(cached.clone());
        }
        let source = self.source.as_mut().ok_or(StoreError::PassphraseCancelled)?;
        let passphrase = source
            .obtain_passphrase(prompt)
            .ok_or(StoreError::PassphraseCancelled)?;
        if self.caching {
            self.cached = Some(passphrase.clone());
        }
        Ok(passphrase)
    }

    pub fn clear(&mut self) {
        self.cached = None;
    }

    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }
}

impl Default for PassphraseCache {
    fn default() -> Self {
        Self::new(None, true)
    }
}

impl fmt::Debug for PassphraseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassphraseCache")
            .field("has_source", &self.source.is_some())
            .field("caching", &self.caching)
            .field("cached", &self.cached.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting_source(calls: Rc<Cell<u32>>) -> Box<dyn PassphraseSource> {
        Box::new(move |_prompt: &str| {
            calls.set(calls.get() + 1);
            Some(Zeroizing::new(b"pass".to_vec()))
        })
    }

    #[test]
    fn test_caching_reuses_until_cleared() {
        let calls = Rc::new(Cell::new(0));
        let mut cache = PassphraseCache::new(Some(counting_source(calls.clone())), true);

        assert_eq!(cache.obtain("p").unwrap().as_slice(), b"pass");
        assert_eq!(cache.obtain("p").unwrap().as_slice(), b"pass");
        assert_eq!(calls.get(), 1);

        cache.clear();
        assert!(!cache.is_cached());
        cache.obtain("p").unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_no_caching_asks_every_time() {
        let calls = Rc::new(Cell::new(0));
        let mut cache = PassphraseCache::new(Some(counting_source(calls.clone())), false);
        cache.obtain("p").unwrap();
        cache.obtain("p").unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_missing_or_cancelled_source() {
        let mut cache = PassphraseCache::default();
        assert!(matches!(cache.obtain("p"), Err(StoreError::PassphraseCancelled)));

        let cancel: Box<dyn PassphraseSource> = Box::new(|_: &str| -> Option<Zeroizing<Vec<u8>>> { None });
        let mut cache = PassphraseCache::new(Some(cancel), true);
        assert!(matches!(cache.obtain("p"), Err(StoreError::PassphraseCancelled)));
    }
}
