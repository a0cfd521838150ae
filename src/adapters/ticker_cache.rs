//! Bounded least-recently-used cache of per-ticker provider handles.
//!
//! Get-or-create is serialized by a single mutex, so two callers asking for
//! the same symbol never build two handles. Handles are shared as `Arc` and
//! must be immutable.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

pub const DEFAULT_CAPACITY: usize = 128;

#[derive(Debug)]
struct CacheEntry<H> {
    handle: Arc<H>,
    last_used: u64,
}

#[derive(Debug)]
struct CacheInner<H> {
    entries: HashMap<String, CacheEntry<H>>,
    clock: u64,
}

impl<H> CacheInner<H> {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

#[derive(Debug)]
pub struct TickerCache<H> {
    capacity: usize,
    inner: Mutex<CacheInner<H>>,
}

impl<H> Default for TickerCache<H> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<H> TickerCache<H> {
    /// A capacity of zero disables caching: every call builds a fresh handle.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                clock: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Return the cached handle for `key`, building it with `make` on a miss.
    /// A failed build caches nothing.
    pub fn get_or_try_insert_with<E, F>(&self, key: &str, make: F) -> Result<Arc<H>, E>
    where
        F: FnOnce(&str) -> Result<H, E>,
    {
        if self.capacity == 0 {
            return make(key).map(Arc::new);
        }

        let mut inner = self.lock();
        let now = inner.tick();
        if let Some(entry) = inner.entries.get_mut(key) {
            entry.last_used = now;
            return Ok(Arc::clone(&entry.handle));
        }

        let handle = Arc::new(make(key)?);
        if inner.entries.len() >= self.capacity {
            inner.evict_oldest();
        }
        inner.entries.insert(
            key.to_string(),
            CacheEntry {
                handle: Arc::clone(&handle),
                last_used: now,
            },
        );
        Ok(handle)
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    // Entries are only ever inserted whole, so a poisoned lock still holds a
    // consistent map.
    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner<H>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
