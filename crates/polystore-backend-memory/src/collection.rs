// SPDX-License-Identifier: MIT OR Apache-2.0
//! `TluruCollection` — a single collection's bounded, time-aware
//! least-recently-used cache: an entry
//! leaves either because it expired or because it is the
//! least-recently-used non-expired entry at capacity.

use chrono::{DateTime, Utc};
use lru::LruCache;
use polystore_core::entry::ManagedEntry;
use std::num::NonZeroUsize;

/// One collection's bounded cache.
pub struct TluruCollection {
    cache: LruCache<String, ManagedEntry>,
}

impl TluruCollection {
    /// Creates an empty collection bounded at `capacity` entries.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            cache: LruCache::new(capacity),
        }
    }

    /// Reads `key`, promoting it to most-recently-used. Returns `None` if
    /// absent or expired; an expired entry found on read is evicted
    /// immediately (lazy expiry).
    pub fn get(&mut self, key: &str, now: DateTime<Utc>) -> Option<ManagedEntry> {
        let expired = matches!(self.cache.peek(key), Some(e) if e.is_expired(now));
        if expired {
            self.cache.pop(key);
            return None;
        }
        self.cache.get(key).cloned()
    }

    /// Inserts `entry` under `key`, evicting to make room if the
    /// collection is at capacity and does not already contain `key`.
    ///
    /// Eviction preference: an already-expired entry first (scanned from
    /// least- to most-recently-used so the scan is cheap in the common
    /// case of one stale tail), falling back to the true least-recently-used
    /// entry only when nothing is expired.
    pub fn put(&mut self, key: String, entry: ManagedEntry, now: DateTime<Utc>) {
        if self.cache.len() >= self.cache.cap().get() && !self.cache.contains(&key) {
            if let Some(expired_key) = self.find_one_expired(now) {
                self.cache.pop(&expired_key);
            } else {
                self.cache.pop_lru();
            }
        }
        self.cache.put(key, entry);
    }

    /// Removes `key`, returning whether it existed (and was not already
    /// expired — an expired entry is treated as already gone).
    pub fn delete(&mut self, key: &str, now: DateTime<Utc>) -> bool {
        match self.cache.pop(key) {
            Some(entry) => !entry.is_expired(now),
            None => false,
        }
    }

    /// Reads `key` without mutating recency, for diagnostics/tests.
    pub fn peek(&self, key: &str) -> Option<&ManagedEntry> {
        self.cache.peek(key)
    }

    /// Lists up to `limit` non-expired keys in arbitrary (cache-internal)
    /// order: enumeration is best-effort and unordered.
    pub fn keys(&self, limit: usize, now: DateTime<Utc>) -> Vec<String> {
        self.cache
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .take(limit)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// `true` iff the collection holds no entries.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn find_one_expired(&self, now: DateTime<Utc>) -> Option<String> {
        self.cache
            .iter()
            .rev() // least-recently-used first
            .find(|(_, entry)| entry.is_expired(now))
            .map(|(k, _)| k.clone())
    }
}
