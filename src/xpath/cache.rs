//! Expression cache
//!
//! Maps exact source text to a parsed or compiled value. Keys are not
//! normalized: `a/b` and `a / b` are separate entries.
//!
//! Concurrent first-time parses of the same text are resolved by "insert if
//! absent": the build runs outside the lock, and whichever thread inserts
//! first wins. Later finishers discard their own result and return the cached
//! one, so every caller sees the same instance. Failed builds are never
//! inserted.

use crate::error::Result;
use crate::options::CachePolicy;
use lru::LruCache;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Thread-safe source-text keyed cache
pub struct ExpressionCache<V> {
    label: &'static str,
    entries: Mutex<LruCache<String, V>>,
}

impl<V: Clone> ExpressionCache<V> {
    /// `label` only appears in log output
    pub fn new(label: &'static str, policy: CachePolicy) -> Self {
        let entries = match policy {
            CachePolicy::Unbounded => LruCache::unbounded(),
            CachePolicy::Bounded(capacity) => LruCache::new(capacity),
        };
        ExpressionCache {
            label,
            entries: Mutex::new(entries),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, V>> {
        // entries are only ever inserted whole, so a poisoned map is still consistent
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, source: &str) -> Option<V> {
        self.lock().get(source).cloned()
    }

    /// Cached value for `source`, building and inserting it on a miss
    pub fn get_or_try_insert_with<F>(&self, source: &str, build: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(value) = self.get(source) {
            log::trace!("{} cache hit: {:?}", self.label, source);
            return Ok(value);
        }

        log::debug!("{} cache miss: {:?}", self.label, source);
        let built = build()?;

        let mut entries = self.lock();
        if let Some(existing) = entries.get(source) {
            log::debug!("{} cache: discarding redundant build of {:?}", self.label, source);
            return Ok(existing.clone());
        }
        entries.put(source.to_string(), built.clone());
        Ok(built)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
