// SPDX-License-Identifier: MIT OR Apache-2.0
//! Blocks all write operations on the wrapped store.

use async_trait::async_trait;
use polystore_core::{ErrorKind, Result, Store, StoreError, StoreValue, TtlSpec};
use std::sync::Arc;

/// Configuration for [`ReadOnly`].
#[derive(Debug, Clone, Copy)]
pub struct ReadOnlyConfig {
    /// `true` to raise [`ErrorKind::ReadOnly`] on a write attempt; `false`
    /// to silently return the natural "nothing happened" value (`()` is
    /// unaffected either way — puts always return `Ok(())` when not
    /// raising, since there is no natural "no-op" value to report instead).
    pub raise_on_write: bool,
}

impl Default for ReadOnlyConfig {
    fn default() -> Self {
        Self { raise_on_write: true }
    }
}

/// Wraps a [`Store`], rejecting every write operation.
#[derive(Debug)]
pub struct ReadOnly {
    inner: Arc<dyn Store>,
    config: ReadOnlyConfig,
}

impl ReadOnly {
    /// Wraps `inner`, blocking `put`/`put_many`/`delete`/`delete_many`.
    #[must_use]
    pub fn new(inner: Arc<dyn Store>, config: ReadOnlyConfig) -> Self {
        Self { inner, config }
    }

    fn reject(&self, operation: &str) -> Result<()> {
        if self.config.raise_on_write {
            Err(StoreError::new(ErrorKind::ReadOnly, "store is read-only").with_context("operation", operation))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Store for ReadOnly {
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<StoreValue>> {
        self.inner.get(key, collection).await
    }

    async fn get_many(&self, keys: &[String], collection: Option<&str>) -> Result<Vec<Option<StoreValue>>> {
        self.inner.get_many(keys, collection).await
    }

    async fn ttl(&self, key: &str, collection: Option<&str>) -> Result<(Option<StoreValue>, Option<f64>)> {
        self.inner.ttl(key, collection).await
    }

    async fn ttl_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<(Option<StoreValue>, Option<f64>)>> {
        self.inner.ttl_many(keys, collection).await
    }

    async fn put(&self, _key: &str, _value: StoreValue, _collection: Option<&str>, _ttl: Option<f64>) -> Result<()> {
        self.reject("put")
    }

    async fn put_many(
        &self,
        _keys: &[String],
        _values: Vec<StoreValue>,
        _collection: Option<&str>,
        _ttl: TtlSpec,
    ) -> Result<()> {
        self.reject("put_many")
    }

    async fn delete(&self, _key: &str, _collection: Option<&str>) -> Result<bool> {
        self.reject("delete")?;
        Ok(false)
    }

    async fn delete_many(&self, _keys: &[String], _collection: Option<&str>) -> Result<usize> {
        self.reject("delete_many")?;
        Ok(0)
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
    async fn raises_on_write_by_default() {
        let w = ReadOnly::new(memory(), ReadOnlyConfig::default());
        let err = w.put("a", val(1), None, None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ReadOnly);
    }

    #[tokio::test]
    async fn delete_returns_false_without_raising_when_configured() {
        let w = ReadOnly::new(memory(), ReadOnlyConfig { raise_on_write: false });
        assert!(!w.delete("a", None).await.unwrap());
        assert_eq!(w.delete_many(&["a".to_string()], None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reads_pass_through_to_inner_store() {
        let inner = memory();
        inner.put("a", val(1), None, None).await.unwrap();
        let w = ReadOnly::new(inner, ReadOnlyConfig::default());
        assert_eq!(w.get("a", None).await.unwrap(), Some(val(1)));
    }
}
