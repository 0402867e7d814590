// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fixed-prefix rewriting wrappers: [`PrefixCollections`]
//! prepends a prefix to collection names, [`PrefixKeys`] to key names.
//! Both strip the prefix again on enumeration.

use async_trait::async_trait;
use polystore_core::{Result, Store, StoreValue, TtlSpec};
use std::sync::Arc;

/// Wraps a [`Store`], prepending `prefix` to every collection name before
/// delegation and stripping it back off on enumeration.
#[derive(Debug)]
pub struct PrefixCollections {
    inner: Arc<dyn Store>,
    prefix: String,
    default_collection: String,
}

impl PrefixCollections {
    /// Wraps `inner`, prepending `prefix` to every collection name.
    /// `default_collection` is the unprefixed collection substituted when
    /// a caller omits one.
    #[must_use]
    pub fn new(inner: Arc<dyn Store>, prefix: impl Into<String>, default_collection: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
            default_collection: default_collection.into(),
        }
    }

    fn rewrite(&self, collection: Option<&str>) -> String {
        let original = collection.unwrap_or(&self.default_collection);
        format!("{}{}", self.prefix, original)
    }

    /// Strips this wrapper's prefix back off a raw collection name
    /// returned by the inner store's own enumeration, for callers with
    /// direct access to an admin-capable inner store.
    #[must_use]
    pub fn unwrap_prefix<'a>(&self, name: &'a str) -> &'a str {
        name.strip_prefix(self.prefix.as_str()).unwrap_or(name)
    }
}

#[async_trait]
impl Store for PrefixCollections {
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<StoreValue>> {
        self.inner.get(key, Some(&self.rewrite(collection))).await
    }

    async fn get_many(&self, keys: &[String], collection: Option<&str>) -> Result<Vec<Option<StoreValue>>> {
        self.inner.get_many(keys, Some(&self.rewrite(collection))).await
    }

    async fn ttl(&self, key: &str, collection: Option<&str>) -> Result<(Option<StoreValue>, Option<f64>)> {
        self.inner.ttl(key, Some(&self.rewrite(collection))).await
    }

    async fn ttl_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<(Option<StoreValue>, Option<f64>)>> {
        self.inner.ttl_many(keys, Some(&self.rewrite(collection))).await
    }

    async fn put(&self, key: &str, value: StoreValue, collection: Option<&str>, ttl: Option<f64>) -> Result<()> {
        self.inner.put(key, value, Some(&self.rewrite(collection)), ttl).await
    }

    async fn put_many(
        &self,
        keys: &[String],
        values: Vec<StoreValue>,
        collection: Option<&str>,
        ttl: TtlSpec,
    ) -> Result<()> {
        self.inner.put_many(keys, values, Some(&self.rewrite(collection)), ttl).await
    }

    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<bool> {
        self.inner.delete(key, Some(&self.rewrite(collection))).await
    }

    async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> Result<usize> {
        self.inner.delete_many(keys, Some(&self.rewrite(collection))).await
    }
}

/// Wraps a [`Store`], prepending `prefix` to every key before delegation
/// and stripping it back off on enumeration.
#[derive(Debug)]
pub struct PrefixKeys {
    inner: Arc<dyn Store>,
    prefix: String,
}

impl PrefixKeys {
    /// Wraps `inner`, prepending `prefix` to every key.
    #[must_use]
    pub fn new(inner: Arc<dyn Store>, prefix: impl Into<String>) -> Self {
        Self { inner, prefix: prefix.into() }
    }

    fn rewrite(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn rewrite_many(&self, keys: &[String]) -> Vec<String> {
        keys.iter().map(|k| self.rewrite(k)).collect()
    }

    /// Strips this wrapper's prefix back off a raw key returned by the
    /// inner store's own enumeration.
    #[must_use]
    pub fn unwrap_prefix<'a>(&self, key: &'a str) -> &'a str {
        key.strip_prefix(self.prefix.as_str()).unwrap_or(key)
    }
}

#[async_trait]
impl Store for PrefixKeys {
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<StoreValue>> {
        self.inner.get(&self.rewrite(key), collection).await
    }

    async fn get_many(&self, keys: &[String], collection: Option<&str>) -> Result<Vec<Option<StoreValue>>> {
        self.inner.get_many(&self.rewrite_many(keys), collection).await
    }

    async fn ttl(&self, key: &str, collection: Option<&str>) -> Result<(Option<StoreValue>, Option<f64>)> {
        self.inner.ttl(&self.rewrite(key), collection).await
    }

    async fn ttl_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<(Option<StoreValue>, Option<f64>)>> {
        self.inner.ttl_many(&self.rewrite_many(keys), collection).await
    }

    async fn put(&self, key: &str, value: StoreValue, collection: Option<&str>, ttl: Option<f64>) -> Result<()> {
        self.inner.put(&self.rewrite(key), value, collection, ttl).await
    }

    async fn put_many(
        &self,
        keys: &[String],
        values: Vec<StoreValue>,
        collection: Option<&str>,
        ttl: TtlSpec,
    ) -> Result<()> {
        self.inner.put_many(&self.rewrite_many(keys), values, collection, ttl).await
    }

    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<bool> {
        self.inner.delete(&self.rewrite(key), collection).await
    }

    async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> Result<usize> {
        self.inner.delete_many(&self.rewrite_many(keys), collection).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystore_backend_memory::{MemoryStore, MemoryStoreConfig};
    use serde_json::{Map, Value};

    fn val(n: i64) -> StoreValue {
        let mut m = Map::new();
        m.insert("x".into(), Value::from(n));
        m
    }

    #[tokio::test]
    async fn prefix_keys_round_trips() {
        let inner: Arc<dyn Store> = Arc::new(MemoryStore::new(MemoryStoreConfig::default()));
        let w = PrefixKeys::new(inner, "tenant1:");
        w.put("a", val(1), None, None).await.unwrap();
        assert_eq!(w.get("a", None).await.unwrap(), Some(val(1)));
    }

    #[tokio::test]
    async fn prefix_keys_isolates_tenants_sharing_one_inner_store() {
        let inner: Arc<dyn Store> = Arc::new(MemoryStore::new(MemoryStoreConfig::default()));
        let w1 = PrefixKeys::new(inner.clone(), "tenant1:");
        let w2 = PrefixKeys::new(inner, "tenant2:");
        w1.put("a", val(1), None, None).await.unwrap();
        assert_eq!(w2.get("a", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn prefix_collections_round_trips() {
        let inner: Arc<dyn Store> = Arc::new(MemoryStore::new(MemoryStoreConfig::default()));
        let w = PrefixCollections::new(inner, "tenant1__", "default_collection");
        w.put("a", val(1), Some("orders"), None).await.unwrap();
        assert_eq!(w.get("a", Some("orders")).await.unwrap(), Some(val(1)));
    }

    #[test]
    fn unwrap_prefix_strips_known_prefix_only() {
        let inner: Arc<dyn Store> = Arc::new(MemoryStore::new(MemoryStoreConfig::default()));
        let w = PrefixCollections::new(inner, "tenant1__", "default_collection");
        assert_eq!(w.unwrap_prefix("tenant1__orders"), "orders");
        assert_eq!(w.unwrap_prefix("unrelated"), "unrelated");
    }
}
