// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-collection, per-operation hit/miss counters.

use async_trait::async_trait;
use polystore_core::{Result, Store, StoreValue, TtlSpec};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

const DEFAULT_COLLECTION: &str = "__default__";

/// Counters for a single `(collection, operation)` pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationCounts {
    pub count: u64,
    pub hit: u64,
    pub miss: u64,
}

#[derive(Default)]
struct Counters {
    count: AtomicU64,
    hit: AtomicU64,
    miss: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> OperationCounts {
        OperationCounts {
            count: self.count.load(Ordering::Relaxed),
            hit: self.hit.load(Ordering::Relaxed),
            miss: self.miss.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time view over every `(collection, operation)` counter
/// recorded so far, returned by [`Statistics::snapshot`].
pub type StatsSnapshot = HashMap<(String, &'static str), OperationCounts>;

/// Wraps a [`Store`], counting calls, hits and misses per collection and
/// operation. `count` is incremented before the inner call runs; `hit`/
/// `miss` after it returns, so a failed inner call still counts toward
/// `count` but neither hit nor miss.
#[derive(Debug)]
pub struct Statistics {
    inner: Arc<dyn Store>,
    counters: Mutex<HashMap<(String, &'static str), Arc<Counters>>>,
}

impl Statistics {
    /// Wraps `inner`, starting from empty counters.
    #[must_use]
    pub fn new(inner: Arc<dyn Store>) -> Self {
        Self { inner, counters: Mutex::new(HashMap::new()) }
    }

    fn slot(&self, collection: Option<&str>, operation: &'static str) -> Arc<Counters> {
        let key = (collection.unwrap_or(DEFAULT_COLLECTION).to_string(), operation);
        let mut counters = self.counters.lock().unwrap();
        counters.entry(key).or_default().clone()
    }

    /// Returns a snapshot of every counter recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        self.counters
            .lock()
            .unwrap()
            .iter()
            .map(|(key, counters)| (key.clone(), counters.snapshot()))
            .collect()
    }
}

#[async_trait]
impl Store for Statistics {
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<StoreValue>> {
        let counters = self.slot(collection, "get");
        counters.count.fetch_add(1, Ordering::Relaxed);
        let result = self.inner.get(key, collection).await?;
        if result.is_some() {
            counters.hit.fetch_add(1, Ordering::Relaxed);
        } else {
            counters.miss.fetch_add(1, Ordering::Relaxed);
        }
        Ok(result)
    }

    async fn get_many(&self, keys: &[String], collection: Option<&str>) -> Result<Vec<Option<StoreValue>>> {
        let counters = self.slot(collection, "get_many");
        counters.count.fetch_add(1, Ordering::Relaxed);
        let results = self.inner.get_many(keys, collection).await?;
        for result in &results {
            if result.is_some() {
                counters.hit.fetch_add(1, Ordering::Relaxed);
            } else {
                counters.miss.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(results)
    }

    async fn ttl(&self, key: &str, collection: Option<&str>) -> Result<(Option<StoreValue>, Option<f64>)> {
        let counters = self.slot(collection, "ttl");
        counters.count.fetch_add(1, Ordering::Relaxed);
        let result = self.inner.ttl(key, collection).await?;
        if result.0.is_some() {
            counters.hit.fetch_add(1, Ordering::Relaxed);
        } else {
            counters.miss.fetch_add(1, Ordering::Relaxed);
        }
        Ok(result)
    }

    async fn ttl_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<(Option<StoreValue>, Option<f64>)>> {
        let counters = self.slot(collection, "ttl_many");
        counters.count.fetch_add(1, Ordering::Relaxed);
        let results = self.inner.ttl_many(keys, collection).await?;
        for (value, _) in &results {
            if value.is_some() {
                counters.hit.fetch_add(1, Ordering::Relaxed);
            } else {
                counters.miss.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(results)
    }

    async fn put(&self, key: &str, value: StoreValue, collection: Option<&str>, ttl: Option<f64>) -> Result<()> {
        let counters = self.slot(collection, "put");
        counters.count.fetch_add(1, Ordering::Relaxed);
        self.inner.put(key, value, collection, ttl).await
    }

    async fn put_many(
        &self,
        keys: &[String],
        values: Vec<StoreValue>,
        collection: Option<&str>,
        ttl: TtlSpec,
    ) -> Result<()> {
        let counters = self.slot(collection, "put_many");
        counters.count.fetch_add(1, Ordering::Relaxed);
        self.inner.put_many(keys, values, collection, ttl).await
    }

    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<bool> {
        let counters = self.slot(collection, "delete");
        counters.count.fetch_add(1, Ordering::Relaxed);
        let existed = self.inner.delete(key, collection).await?;
        if existed {
            counters.hit.fetch_add(1, Ordering::Relaxed);
        } else {
            counters.miss.fetch_add(1, Ordering::Relaxed);
        }
        Ok(existed)
    }

    async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> Result<usize> {
        let counters = self.slot(collection, "delete_many");
        counters.count.fetch_add(1, Ordering::Relaxed);
        let deleted = self.inner.delete_many(keys, collection).await?;
        counters.hit.fetch_add(deleted as u64, Ordering::Relaxed);
        counters.miss.fetch_add((keys.len().saturating_sub(deleted)) as u64, Ordering::Relaxed);
        Ok(deleted)
    }
}
