// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory TLRU reference backend: a per-collection
//! bounded cache with time-aware least-recently-used eviction.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;

use async_trait::async_trait;
use chrono::Utc;
use collection::TluruCollection;
use polystore_core::clock::{Clock, SystemClock};
use polystore_core::fanout;
use polystore_core::key::{validate_collection, validate_key};
use polystore_core::state::BaseStoreState;
use polystore_core::store::{Store, StoreAdmin, StoreValue, TtlSpec};
use polystore_core::{entry::ManagedEntry, Result};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Default per-collection capacity.
pub const DEFAULT_MAX_ENTRIES_PER_COLLECTION: usize = 10_000;

/// Default enumeration page size.
pub const DEFAULT_PAGE_LIMIT: usize = 10_000;

/// Configuration for [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    /// Collection used when a caller omits one.
    pub default_collection: String,
    /// Per-key length ceiling.
    pub max_key_length: usize,
    /// Per-collection entry capacity.
    pub max_entries_per_collection: NonZeroUsize,
    /// Page size for `enumerate_keys`/`enumerate_collections`.
    pub page_limit: usize,
    /// Data to seed every named collection with at construction time.
    pub seed: BTreeMap<String, BTreeMap<String, StoreValue>>,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            default_collection: "default_collection".to_string(),
            max_key_length: polystore_core::key::DEFAULT_MAX_KEY_LENGTH,
            max_entries_per_collection: NonZeroUsize::new(DEFAULT_MAX_ENTRIES_PER_COLLECTION)
                .expect("constant is non-zero"),
            page_limit: DEFAULT_PAGE_LIMIT,
            seed: BTreeMap::new(),
        }
    }
}

/// The in-memory TLRU reference `Store`.
///
/// Collections are created lazily on first write, or eagerly from
/// [`MemoryStoreConfig::seed`] at construction. All mutable state lives
/// behind short-lived `std::sync::Mutex` critical sections that never hold
/// the lock across an `.await` point.
#[derive(Debug)]
pub struct MemoryStore {
    config_max_key_length: usize,
    max_entries_per_collection: NonZeroUsize,
    page_limit: usize,
    state: BaseStoreState,
    collections: Mutex<BTreeMap<String, TluruCollection>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Builds a store from `config`, using [`SystemClock`] as the time
    /// source.
    #[must_use]
    pub fn new(config: MemoryStoreConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// As [`MemoryStore::new`], but with an injectable [`Clock`] — used by
    /// tests that need deterministic TTL behavior.
    #[must_use]
    pub fn with_clock(config: MemoryStoreConfig, clock: Arc<dyn Clock>) -> Self {
        let mut collections = BTreeMap::new();
        let now = clock.now();
        for (name, entries) in config.seed {
            let mut collection = TluruCollection::new(config.max_entries_per_collection);
            for (key, value) in entries {
                let entry = ManagedEntry {
                    value,
                    created_at: Some(now),
                    ttl: None,
                    expires_at: None,
                };
                collection.put(key, entry, now);
            }
            collections.insert(name, collection);
        }
        Self {
            config_max_key_length: config.max_key_length,
            max_entries_per_collection: config.max_entries_per_collection,
            page_limit: config.page_limit,
            state: BaseStoreState::new(config.default_collection),
            collections: Mutex::new(collections),
            clock,
        }
    }

    fn validate_args(&self, key: &str, collection: &str) -> Result<()> {
        validate_collection(collection)?;
        validate_key(key, self.config_max_key_length)?;
        Ok(())
    }

    fn with_collection_mut<R>(&self, name: &str, f: impl FnOnce(&mut TluruCollection) -> R) -> R {
        let mut guard = self.collections.lock().expect("memory store mutex poisoned");
        let collection = guard
            .entry(name.to_string())
            .or_insert_with(|| TluruCollection::new(self.max_entries_per_collection));
        f(collection)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<StoreValue>> {
        let collection = self.state.resolve_collection(collection).to_string();
        self.validate_args(key, &collection)?;
        let now = self.clock.now();
        let entry = self.with_collection_mut(&collection, |c| c.get(key, now));
        Ok(entry.map(|e| e.value))
    }

    async fn get_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<Option<StoreValue>>> {
        fanout::get_many(self, keys, collection).await
    }

    async fn ttl(
        &self,
        key: &str,
        collection: Option<&str>,
    ) -> Result<(Option<StoreValue>, Option<f64>)> {
        let collection = self.state.resolve_collection(collection).to_string();
        self.validate_args(key, &collection)?;
        let now = self.clock.now();
        let entry = self.with_collection_mut(&collection, |c| c.get(key, now));
        match entry {
            Some(e) => Ok((Some(e.value), e.remaining_ttl_secs(now))),
            None => Ok((None, None)),
        }
    }

    async fn ttl_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<(Option<StoreValue>, Option<f64>)>> {
        fanout::ttl_many(self, keys, collection).await
    }

    async fn put(
        &self,
        key: &str,
        value: StoreValue,
        collection: Option<&str>,
        ttl: Option<f64>,
    ) -> Result<()> {
        let collection = self.state.resolve_collection(collection).to_string();
        self.validate_args(key, &collection)?;
        let entry = ManagedEntry::new(value, ttl, self.clock.as_ref())?;
        let now = self.clock.now();
        self.with_collection_mut(&collection, |c| c.put(key.to_string(), entry, now));
        debug!(target: "polystore.backend.memory", collection = %collection, key, "put");
        Ok(())
    }

    async fn put_many(
        &self,
        keys: &[String],
        values: Vec<StoreValue>,
        collection: Option<&str>,
        ttl: TtlSpec,
    ) -> Result<()> {
        fanout::put_many(self, keys, values, collection, ttl).await
    }

    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<bool> {
        let collection = self.state.resolve_collection(collection).to_string();
        self.validate_args(key, &collection)?;
        let now = self.clock.now();
        Ok(self.with_collection_mut(&collection, |c| c.delete(key, now)))
    }

    async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> Result<usize> {
        fanout::delete_many(self, keys, collection).await
    }
}

#[async_trait]
impl StoreAdmin for MemoryStore {
    async fn enumerate_keys(
        &self,
        collection: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<String>> {
        let collection = self.state.resolve_collection(collection).to_string();
        let limit = limit.unwrap_or(self.page_limit);
        let now = self.clock.now();
        let keys = self.with_collection_mut(&collection, |c| c.keys(limit, now));
        Ok(keys)
    }

    async fn enumerate_collections(&self, limit: Option<usize>) -> Result<Vec<String>> {
        let limit = limit.unwrap_or(self.page_limit);
        let guard = self.collections.lock().expect("memory store mutex poisoned");
        Ok(guard.keys().take(limit).cloned().collect())
    }

    async fn destroy_collection(&self, collection: &str) -> Result<()> {
        validate_collection(collection)?;
        let mut guard = self.collections.lock().expect("memory store mutex poisoned");
        guard.remove(collection);
        Ok(())
    }

    async fn destroy_store(&self) -> Result<()> {
        let mut guard = self.collections.lock().expect("memory store mutex poisoned");
        guard.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystore_core::clock::FixedClock;
    use polystore_core::ErrorKind;
    use serde_json::{Map, Value};

    fn val(n: i64) -> StoreValue {
        let mut m = Map::new();
        m.insert("n".into(), Value::from(n));
        m
    }

    #[tokio::test]
    async fn round_trip_put_get() {
        let store = MemoryStore::new(MemoryStoreConfig::default());
        store.put("a", val(1), None, None).await.unwrap();
        assert_eq!(store.get("a", None).await.unwrap(), Some(val(1)));
    }

    #[tokio::test]
    async fn delete_then_get_is_none() {
        let store = MemoryStore::new(MemoryStoreConfig::default());
        store.put("a", val(1), None, None).await.unwrap();
        assert!(store.delete("a", None).await.unwrap());
        assert_eq!(store.get("a", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let store = MemoryStore::new(MemoryStoreConfig::default());
        store.put("k", val(1), Some("c1"), None).await.unwrap();
        assert_eq!(store.get("k", Some("c2")).await.unwrap(), None);
        assert_eq!(store.get("k", Some("c1")).await.unwrap(), Some(val(1)));
    }

    #[tokio::test]
    async fn get_many_is_positional() {
        let store = MemoryStore::new(MemoryStoreConfig::default());
        store.put("a", val(1), None, None).await.unwrap();
        let keys = vec!["a".to_string(), "missing".to_string()];
        let out = store.get_many(&keys, None).await.unwrap();
        assert_eq!(out, vec![Some(val(1)), None]);
    }

    #[tokio::test]
    async fn ttl_reports_remaining_seconds() {
        let now = Utc::now();
        let store = MemoryStore::with_clock(MemoryStoreConfig::default(), Arc::new(FixedClock(now)));
        store.put("a", val(1), None, Some(60.0)).await.unwrap();
        let (value, remaining) = store.ttl("a", None).await.unwrap();
        assert_eq!(value, Some(val(1)));
        assert_eq!(remaining, Some(60.0));
    }

    #[tokio::test]
    async fn expired_entry_reads_as_missing() {
        let clock = Arc::new(AdvanceableClock::new(Utc::now()));
        let store = MemoryStore::with_clock(MemoryStoreConfig::default(), clock.clone());
        store.put("a", val(1), None, Some(1.0)).await.unwrap();
        assert_eq!(store.get("a", None).await.unwrap(), Some(val(1)));
        clock.advance(chrono::Duration::seconds(2));
        assert_eq!(store.get("a", None).await.unwrap(), None);
    }

    /// Test-only clock whose `now()` can be advanced after construction, to
    /// simulate the passage of time without sleeping.
    struct AdvanceableClock(std::sync::Mutex<chrono::DateTime<Utc>>);

    impl AdvanceableClock {
        fn new(start: chrono::DateTime<Utc>) -> Self {
            Self(std::sync::Mutex::new(start))
        }

        fn advance(&self, by: chrono::Duration) {
            let mut guard = self.0.lock().unwrap();
            *guard = *guard + by;
        }
    }

    impl polystore_core::clock::Clock for AdvanceableClock {
        fn now(&self) -> chrono::DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    #[tokio::test]
    async fn rejects_invalid_ttl_before_touching_store() {
        let store = MemoryStore::new(MemoryStoreConfig::default());
        let err = store.put("a", val(1), None, Some(-1.0)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTtl);
        assert_eq!(store.get("a", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn destroy_collection_drops_only_that_collection() {
        let store = MemoryStore::new(MemoryStoreConfig::default());
        store.put("a", val(1), Some("c1"), None).await.unwrap();
        store.put("b", val(2), Some("c2"), None).await.unwrap();
        store.destroy_collection("c1").await.unwrap();
        assert_eq!(store.get("a", Some("c1")).await.unwrap(), None);
        assert_eq!(store.get("b", Some("c2")).await.unwrap(), Some(val(2)));
    }

    #[tokio::test]
    async fn destroy_store_drops_everything() {
        let store = MemoryStore::new(MemoryStoreConfig::default());
        store.put("a", val(1), Some("c1"), None).await.unwrap();
        store.put("b", val(2), Some("c2"), None).await.unwrap();
        store.destroy_store().await.unwrap();
        assert_eq!(store.get("a", Some("c1")).await.unwrap(), None);
        assert_eq!(store.get("b", Some("c2")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn seeded_collections_are_readable_at_construction() {
        let mut seed = BTreeMap::new();
        let mut entries = BTreeMap::new();
        entries.insert("k".to_string(), val(42));
        seed.insert("seeded".to_string(), entries);
        let config = MemoryStoreConfig {
            seed,
            ..MemoryStoreConfig::default()
        };
        let store = MemoryStore::new(config);
        assert_eq!(store.get("k", Some("seeded")).await.unwrap(), Some(val(42)));
    }
}
