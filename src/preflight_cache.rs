use crate::clock::Clock;
use crate::origin::SecurityOrigin;
use crate::preflight::PreflightGrant;
use crate::request::Request;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    origin: String,
    url: Url,
    credentials: bool,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    grant: PreflightGrant,
    expires_at: Instant,
}

/// Successful preflights of one loading context, keyed by origin, target URL
/// and credentials mode.
pub struct PreflightCache {
    clock: Arc<dyn Clock>,
    entries: RefCell<HashMap<CacheKey, CacheEntry>>,
}

impl PreflightCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Records `grant` until its max-age elapses. Opaque origins and a zero
    /// max-age are not cached.
    pub fn insert(&self, origin: &SecurityOrigin, url: &Url, credentials: bool, grant: PreflightGrant) {
        if origin.is_opaque() || grant.max_age.is_zero() {
            return;
        }

        let expires_at = self.clock.now() + grant.max_age;
        let key = CacheKey {
            origin: origin.serialize(),
            url: url.clone(),
            credentials,
        };
        self.entries
            .borrow_mut()
            .insert(key, CacheEntry { grant, expires_at });
    }

    /// Whether an unexpired entry covers the method and headers of `request`.
    pub fn covers(&self, origin: &SecurityOrigin, request: &Request, credentials: bool) -> bool {
        if origin.is_opaque() {
            return false;
        }

        self.evict_expired();
        let key = CacheKey {
            origin: origin.serialize(),
            url: request.url().clone(),
            credentials,
        };
        self.entries
            .borrow()
            .get(&key)
            .is_some_and(|entry| entry.grant.covers(request, credentials))
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    fn evict_expired(&self) {
        let now = self.clock.now();
        self.entries
            .borrow_mut()
            .retain(|_, entry| entry.expires_at > now);
    }
}

impl std::fmt::Debug for PreflightCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreflightCache")
            .field("entries", &self.entries.borrow().len())
            .finish()
    }
}

#[cfg(test)]
#[path = "preflight_cache_test.rs"]
mod preflight_cache_test;
