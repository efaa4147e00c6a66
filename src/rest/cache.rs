//! Memoization over a shared key-value cache.
//!
//! Keys are built from a key template whose `{}` slots are filled, in order,
//! with the call's arguments. Entries carry no expiry; they stay until the
//! backend evicts them or [`Cache::invalidate`] removes them. A miss is a read
//! followed by compute-then-write, so two concurrent misses on one key may
//! both compute and the last write wins.

use std::fmt::{Display, Write};
use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::WikiError;

/// Storage behind the cache facade.
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, WikiError>;
    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), WikiError>;
    fn delete(&self, key: &str) -> Result<(), WikiError>;
}

/// In-process backend.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, Vec<u8>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, WikiError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), WikiError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), WikiError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Interpolate `args` into the `{}` slots of `template`, left to right.
/// Slots without a matching argument become empty.
pub fn format_key(template: &str, args: &[&dyn Display]) -> String {
    let mut key = String::with_capacity(template.len() + 16);
    let mut args = args.iter();
    let mut pieces = template.split("{}").peekable();
    while let Some(piece) = pieces.next() {
        key.push_str(piece);
        if pieces.peek().is_some() {
            if let Some(arg) = args.next() {
                let _ = write!(key, "{}", arg);
            }
        }
    }
    key
}

#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
}

impl Cache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCache::new()))
    }

    /// Memoize computations under `key_template`.
    pub fn memoize<'a>(&'a self, key_template: &'a str) -> Memoized<'a> {
        Memoized { cache: self, key_template }
    }

    /// Evict the entry `key_template` formatted with `args` names.
    pub fn invalidate(&self, key_template: &str, args: &[&dyn Display]) -> Result<(), WikiError> {
        let key = format_key(key_template, args);
        debug!("Invalidating cache key '{}'", key);
        self.backend.delete(&key)
    }
}

/// A computation bound to a key template; see [`Cache::memoize`].
pub struct Memoized<'a> {
    cache: &'a Cache,
    key_template: &'a str,
}

impl Memoized<'_> {
    /// Return the cached value for `args`, computing and storing it on a miss.
    pub fn call<T, F>(&self, args: &[&dyn Display], compute: F) -> Result<T, WikiError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, WikiError>,
    {
        let key = format_key(self.key_template, args);
        let backend = &self.cache.backend;

        if let Some(bytes) = backend.get(&key)? {
            match serde_json::from_slice(&bytes) {
                Ok(value) => {
                    debug!("Cache hit for '{}'", key);
                    return Ok(value);
                }
                Err(e) => warn!("Discarding unreadable cache entry '{}': {}", key, e),
            }
        }

        debug!("Cache miss for '{}'", key);
        let value = compute()?;
        backend.set(&key, serde_json::to_vec(&value)?)?;
        Ok(value)
    }
}
