// SPDX-License-Identifier: MIT OR Apache-2.0
//! Read-through cache in front of a primary store, invalidating on write.

use async_trait::async_trait;
use polystore_core::{Result, Store, StoreValue, TtlSpec};
use std::sync::Arc;

/// Wraps a `primary` store with a `cache` store checked first on read.
/// A cache miss fetches from `primary` and, on a hit there, populates
/// `cache` with `primary`'s remaining TTL (or no TTL if unknown). Every
/// write goes to `primary` and invalidates the corresponding `cache`
/// entry so a subsequent read can't observe a stale cached value.
#[derive(Debug)]
pub struct PassthroughCache {
    primary: Arc<dyn Store>,
    cache: Arc<dyn Store>,
}

impl PassthroughCache {
    /// Wraps `primary` with `cache` in front of it.
    #[must_use]
    pub fn new(primary: Arc<dyn Store>, cache: Arc<dyn Store>) -> Self {
        Self { primary, cache }
    }

    async fn read_through(&self, key: &str, collection: Option<&str>) -> Result<Option<StoreValue>> {
        if let Some(value) = self.cache.get(key, collection).await? {
            return Ok(Some(value));
        }
        let (value, ttl) = self.primary.ttl(key, collection).await?;
        if let Some(value) = &value {
            self.cache.put(key, value.clone(), collection, ttl).await?;
        }
        Ok(value)
    }
}

#[async_trait]
impl Store for PassthroughCache {
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<StoreValue>> {
        self.read_through(key, collection).await
    }

    async fn get_many(&self, keys: &[String], collection: Option<&str>) -> Result<Vec<Option<StoreValue>>> {
        let cached = self.cache.get_many(keys, collection).await?;
        let uncached_keys: Vec<String> = keys
            .iter()
            .zip(&cached)
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| k.clone())
            .collect();

        let mut fetched = if uncached_keys.is_empty() {
            Vec::new()
        } else {
            self.primary.ttl_many(&uncached_keys, collection).await?
        };
        fetched.reverse(); // pop() consumes in original order

        let mut results = Vec::with_capacity(keys.len());
        for (key, cached_value) in keys.iter().zip(cached.into_iter()) {
            match cached_value {
                Some(value) => results.push(Some(value)),
                None => {
                    let (value, ttl) = fetched.pop().expect("one fetched slot per uncached key");
                    if let Some(value) = &value {
                        self.cache.put(key, value.clone(), collection, ttl).await?;
                    }
                    results.push(value);
                }
            }
        }
        Ok(results)
    }

    async fn ttl(&self, key: &str, collection: Option<&str>) -> Result<(Option<StoreValue>, Option<f64>)> {
        let cached = self.cache.ttl(key, collection).await?;
        if cached.0.is_some() {
            return Ok(cached);
        }
        let (value, ttl) = self.primary.ttl(key, collection).await?;
        if let Some(value) = &value {
            self.cache.put(key, value.clone(), collection, ttl).await?;
        }
        Ok((value, ttl))
    }

    async fn ttl_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<(Option<StoreValue>, Option<f64>)>> {
        let cached = self.cache.ttl_many(keys, collection).await?;
        let uncached_keys: Vec<String> = keys
            .iter()
            .zip(&cached)
            .filter(|(_, (v, _))| v.is_none())
            .map(|(k, _)| k.clone())
            .collect();

        let mut fetched = if uncached_keys.is_empty() {
            Vec::new()
        } else {
            self.primary.ttl_many(&uncached_keys, collection).await?
        };
        fetched.reverse();

        let mut results = Vec::with_capacity(keys.len());
        for (key, cached_entry) in keys.iter().zip(cached.into_iter()) {
            match cached_entry {
                (Some(value), ttl) => results.push((Some(value), ttl)),
                (None, _) => {
                    let (value, ttl) = fetched.pop().expect("one fetched slot per uncached key");
                    if let Some(value) = &value {
                        self.cache.put(key, value.clone(), collection, ttl).await?;
                    }
                    results.push((value, ttl));
                }
            }
        }
        Ok(results)
    }

    async fn put(&self, key: &str, value: StoreValue, collection: Option<&str>, ttl: Option<f64>) -> Result<()> {
        self.primary.put(key, value, collection, ttl).await?;
        self.cache.delete(key, collection).await?;
        Ok(())
    }

    async fn put_many(
        &self,
        keys: &[String],
        values: Vec<StoreValue>,
        collection: Option<&str>,
        ttl: TtlSpec,
    ) -> Result<()> {
        self.primary.put_many(keys, values, collection, ttl).await?;
        self.cache.delete_many(keys, collection).await?;
        Ok(())
    }

    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<bool> {
        let existed = self.primary.delete(key, collection).await?;
        self.cache.delete(key, collection).await?;
        Ok(existed)
    }

    async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> Result<usize> {
        let deleted = self.primary.delete_many(keys, collection).await?;
        self.cache.delete_many(keys, collection).await?;
        Ok(deleted)
    }
}
