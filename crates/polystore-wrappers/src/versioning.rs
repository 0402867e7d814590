// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tags every stored value with an opaque version, auto-invalidating
//! stale or malformed envelopes on read.

use async_trait::async_trait;
use polystore_core::{Result, Store, StoreValue, TtlSpec};
use serde_json::Value;
use std::sync::Arc;

const VERSION_FIELD: &str = "__version__";
const DATA_FIELD: &str = "__versioned_data__";

/// Configuration for [`Versioning`].
#[derive(Debug, Clone)]
pub struct VersioningConfig {
    /// Opaque version tag compared on read.
    pub version: Value,
}

/// Wraps a [`Store`], stamping every write with a version tag and
/// treating reads whose tag doesn't match the configured version as a
/// miss — a cheap mechanism for invalidating stale entries after a
/// schema change without touching the backing store.
#[derive(Debug)]
pub struct Versioning {
    inner: Arc<dyn Store>,
    config: VersioningConfig,
}

impl Versioning {
    /// Wraps `inner`, tagging writes with `config.version`.
    #[must_use]
    pub fn new(inner: Arc<dyn Store>, config: VersioningConfig) -> Self {
        Self { inner, config }
    }

    fn wrap(&self, value: StoreValue) -> StoreValue {
        let mut wrapped = serde_json::Map::new();
        wrapped.insert(VERSION_FIELD.to_string(), self.config.version.clone());
        wrapped.insert(DATA_FIELD.to_string(), Value::Object(value));
        wrapped
    }

    /// Unwraps a stored value: if it carries a version envelope whose tag
    /// matches, returns the inner payload; if the envelope is present but
    /// the tag mismatches or the inner payload isn't an object, treats it
    /// as a miss; if no envelope is present, passes the value through
    /// unchanged (pre-existing, unversioned entries remain readable).
    fn unwrap(&self, value: StoreValue) -> Option<StoreValue> {
        match (value.get(VERSION_FIELD), value.get(DATA_FIELD)) {
            (Some(version), Some(data)) => {
                if *version == self.config.version {
                    data.as_object().cloned()
                } else {
                    None
                }
            }
            _ => Some(value),
        }
    }
}

#[async_trait]
impl Store for Versioning {
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<StoreValue>> {
        Ok(self.inner.get(key, collection).await?.and_then(|v| self.unwrap(v)))
    }

    async fn get_many(&self, keys: &[String], collection: Option<&str>) -> Result<Vec<Option<StoreValue>>> {
        Ok(self
            .inner
            .get_many(keys, collection)
            .await?
            .into_iter()
            .map(|v| v.and_then(|v| self.unwrap(v)))
            .collect())
    }

    async fn ttl(&self, key: &str, collection: Option<&str>) -> Result<(Option<StoreValue>, Option<f64>)> {
        let (value, ttl) = self.inner.ttl(key, collection).await?;
        let unwrapped = value.and_then(|v| self.unwrap(v));
        let ttl = if unwrapped.is_some() { ttl } else { None };
        Ok((unwrapped, ttl))
    }

    async fn ttl_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<(Option<StoreValue>, Option<f64>)>> {
        Ok(self
            .inner
            .ttl_many(keys, collection)
            .await?
            .into_iter()
            .map(|(value, ttl)| {
                let unwrapped = value.and_then(|v| self.unwrap(v));
                let ttl = if unwrapped.is_some() { ttl } else { None };
                (unwrapped, ttl)
            })
            .collect())
    }

    async fn put(&self, key: &str, value: StoreValue, collection: Option<&str>, ttl: Option<f64>) -> Result<()> {
        self.inner.put(key, self.wrap(value), collection, ttl).await
    }

    async fn put_many(
        &self,
        keys: &[String],
        values: Vec<StoreValue>,
        collection: Option<&str>,
        ttl: TtlSpec,
    ) -> Result<()> {
        let wrapped = values.into_iter().map(|v| self.wrap(v)).collect();
        self.inner.put_many(keys, wrapped, collection, ttl).await
    }

    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<bool> {
        self.inner.delete(key, collection).await
    }

    async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> Result<usize> {
        self.inner.delete_many(keys, collection).await
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

    fn memory() -> Arc<dyn Store> {
        Arc::new(MemoryStore::new(MemoryStoreConfig::default()))
    }

    #[tokio::test]
    async fn round_trips_through_matching_version() {
        let w = Versioning::new(memory(), VersioningConfig { version: Value::from(3) });
        w.put("a", val(1), None, None).await.unwrap();
        assert_eq!(w.get("a", None).await.unwrap(), Some(val(1)));
    }

    #[tokio::test]
    async fn mismatched_version_is_invalidated_as_a_miss() {
        let inner = memory();
        let writer = Versioning::new(inner.clone(), VersioningConfig { version: Value::from(1) });
        writer.put("a", val(1), None, None).await.unwrap();

        let reader = Versioning::new(inner, VersioningConfig { version: Value::from(2) });
        assert_eq!(reader.get("a", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unwrapped_preexisting_payload_passes_through_unchanged() {
        let inner = memory();
        inner.put("legacy", val(9), None, None).await.unwrap();

        let w = Versioning::new(inner, VersioningConfig { version: Value::from(1) });
        assert_eq!(w.get("legacy", None).await.unwrap(), Some(val(9)));
    }
}
