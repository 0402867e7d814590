// SPDX-License-Identifier: MIT OR Apache-2.0
//! Multiplexes every caller-visible collection onto one backing collection
//! by folding `collection` into the key.

use async_trait::async_trait;
use polystore_core::key::{compound_key, split_compound_key, DEFAULT_COMPOUND_SEP};
use polystore_core::{Result, Store, StoreValue, TtlSpec};
use std::sync::Arc;

/// Configuration for [`SingleCollection`].
#[derive(Debug, Clone)]
pub struct SingleCollectionConfig {
    /// The one collection every operation is rewritten to target.
    pub single_collection: String,
    /// Collection substituted when a caller omits one, before folding.
    pub default_collection: String,
    /// Separator joining `original_collection` and `key`.
    pub separator: String,
}

impl Default for SingleCollectionConfig {
    fn default() -> Self {
        Self {
            single_collection: "single_collection".to_string(),
            default_collection: "default_collection".to_string(),
            separator: DEFAULT_COMPOUND_SEP.to_string(),
        }
    }
}

/// Wraps a [`Store`], folding every `(collection, key)` pair into
/// `(single_collection, original_collection <sep> key)`.
#[derive(Debug)]
pub struct SingleCollection {
    inner: Arc<dyn Store>,
    config: SingleCollectionConfig,
}

impl SingleCollection {
    /// Wraps `inner`, multiplexing all collections onto one.
    #[must_use]
    pub fn new(inner: Arc<dyn Store>, config: SingleCollectionConfig) -> Self {
        Self { inner, config }
    }

    fn fold(&self, collection: Option<&str>, key: &str) -> String {
        let original = collection.unwrap_or(&self.config.default_collection);
        compound_key(original, key, &self.config.separator)
    }

    fn fold_keys(&self, collection: Option<&str>, keys: &[String]) -> Vec<String> {
        keys.iter().map(|k| self.fold(collection, k)).collect()
    }

    fn unfold(&self, folded: &str) -> String {
        split_compound_key(folded, &self.config.separator)
            .map(|(_, key)| key.to_string())
            .unwrap_or_else(|| folded.to_string())
    }
}

#[async_trait]
impl Store for SingleCollection {
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<StoreValue>> {
        let folded = self.fold(collection, key);
        self.inner.get(&folded, Some(&self.config.single_collection)).await
    }

    async fn get_many(&self, keys: &[String], collection: Option<&str>) -> Result<Vec<Option<StoreValue>>> {
        let folded = self.fold_keys(collection, keys);
        self.inner.get_many(&folded, Some(&self.config.single_collection)).await
    }

    async fn ttl(&self, key: &str, collection: Option<&str>) -> Result<(Option<StoreValue>, Option<f64>)> {
        let folded = self.fold(collection, key);
        self.inner.ttl(&folded, Some(&self.config.single_collection)).await
    }

    async fn ttl_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<(Option<StoreValue>, Option<f64>)>> {
        let folded = self.fold_keys(collection, keys);
        self.inner.ttl_many(&folded, Some(&self.config.single_collection)).await
    }

    async fn put(&self, key: &str, value: StoreValue, collection: Option<&str>, ttl: Option<f64>) -> Result<()> {
        let folded = self.fold(collection, key);
        self.inner.put(&folded, value, Some(&self.config.single_collection), ttl).await
    }

    async fn put_many(
        &self,
        keys: &[String],
        values: Vec<StoreValue>,
        collection: Option<&str>,
        ttl: TtlSpec,
    ) -> Result<()> {
        let folded = self.fold_keys(collection, keys);
        self.inner.put_many(&folded, values, Some(&self.config.single_collection), ttl).await
    }

    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<bool> {
        let folded = self.fold(collection, key);
        self.inner.delete(&folded, Some(&self.config.single_collection)).await
    }

    async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> Result<usize> {
        let folded = self.fold_keys(collection, keys);
        self.inner.delete_many(&folded, Some(&self.config.single_collection)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystore_backend_memory::{MemoryStore, MemoryStoreConfig};
    use polystore_core::StoreAdmin;
    use serde_json::{Map, Value};

    fn val(n: i64) -> StoreValue {
        let mut m = Map::new();
        m.insert("x".into(), Value::from(n));
        m
    }

    fn wrapped() -> (SingleCollection, Arc<MemoryStore>) {
        let inner = Arc::new(MemoryStore::new(MemoryStoreConfig::default()));
        let wrapper = SingleCollection::new(inner.clone(), SingleCollectionConfig::default());
        (wrapper, inner)
    }

    #[tokio::test]
    async fn collections_observed_separately_still_round_trip() {
        let (w, _inner) = wrapped();
        w.put("k", val(1), Some("c1"), None).await.unwrap();
        w.put("k", val(2), Some("c2"), None).await.unwrap();
        assert_eq!(w.get("k", Some("c1")).await.unwrap(), Some(val(1)));
        assert_eq!(w.get("k", Some("c2")).await.unwrap(), Some(val(2)));
    }

    #[tokio::test]
    async fn underlying_store_sees_only_the_single_collection() {
        let (w, inner) = wrapped();
        w.put("k", val(1), Some("c1"), None).await.unwrap();
        let names = inner.enumerate_collections(None).await.unwrap();
        assert_eq!(names, vec!["single_collection".to_string()]);
    }

    #[tokio::test]
    async fn unfold_strips_the_original_collection_prefix() {
        let w = SingleCollection::new(
            Arc::new(MemoryStore::new(MemoryStoreConfig::default())),
            SingleCollectionConfig::default(),
        );
        let folded = w.fold(Some("orders"), "42");
        assert_eq!(w.unfold(&folded), "42");
    }
}
