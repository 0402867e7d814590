// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rejects or silently drops entries whose serialized size exceeds a
//! configured ceiling.

use async_trait::async_trait;
use polystore_core::clock::{Clock, SystemClock};
use polystore_core::serialization::dump_json;
use polystore_core::{entry::ManagedEntry, ErrorKind, Result, Store, StoreError, StoreValue, TtlSpec};
use std::sync::Arc;
use tracing::debug;

/// Configuration for [`LimitSize`].
#[derive(Debug, Clone)]
pub struct LimitSizeConfig {
    /// Maximum serialized byte length an entry may occupy.
    pub max_size: usize,
    /// `true` to raise [`ErrorKind::EntryTooLarge`] on a put that exceeds
    /// `max_size`; `false` to silently drop the oversize entry (bulk puts
    /// drop only the offending elements, preserving alignment).
    pub raise_on_error: bool,
}

/// Wraps a [`Store`], enforcing a maximum serialized entry size.
#[derive(Debug)]
pub struct LimitSize {
    inner: Arc<dyn Store>,
    config: LimitSizeConfig,
    clock: Arc<dyn Clock>,
}

impl LimitSize {
    /// Wraps `inner` with the given size ceiling, using [`SystemClock`].
    #[must_use]
    pub fn new(inner: Arc<dyn Store>, config: LimitSizeConfig) -> Self {
        Self::with_clock(inner, config, Arc::new(SystemClock))
    }

    /// As [`LimitSize::new`], but with an injectable [`Clock`] (only used
    /// to stamp the probe entry whose serialized size is measured; it is
    /// never persisted).
    #[must_use]
    pub fn with_clock(inner: Arc<dyn Store>, config: LimitSizeConfig, clock: Arc<dyn Clock>) -> Self {
        Self { inner, config, clock }
    }

    fn serialized_len(&self, value: &StoreValue, ttl: Option<f64>) -> Result<usize> {
        let entry = ManagedEntry::new(value.clone(), ttl, self.clock.as_ref())?;
        Ok(dump_json(&entry).len())
    }

    fn check(&self, value: &StoreValue, ttl: Option<f64>) -> Result<bool> {
        let len = self.serialized_len(value, ttl)?;
        if len > self.config.max_size {
            if self.config.raise_on_error {
                return Err(StoreError::new(ErrorKind::EntryTooLarge, "serialized entry exceeds max_size")
                    .with_context("size", len)
                    .with_context("max_size", self.config.max_size));
            }
            debug!(target: "polystore.wrappers.limit_size", size = len, max = self.config.max_size, "dropping oversize entry");
            return Ok(false);
        }
        Ok(true)
    }
}

#[async_trait]
impl Store for LimitSize {
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

    async fn put(&self, key: &str, value: StoreValue, collection: Option<&str>, ttl: Option<f64>) -> Result<()> {
        if self.check(&value, ttl)? {
            self.inner.put(key, value, collection, ttl).await
        } else {
            Ok(())
        }
    }

    async fn put_many(
        &self,
        keys: &[String],
        values: Vec<StoreValue>,
        collection: Option<&str>,
        ttl: TtlSpec,
    ) -> Result<()> {
        polystore_core::key::validate_equal_length(keys.len(), values.len(), "values")?;
        if let Some(ttl_len) = ttl.len() {
            polystore_core::key::validate_equal_length(keys.len(), ttl_len, "ttl")?;
        }
        let mut kept_keys = Vec::new();
        let mut kept_values = Vec::new();
        let mut kept_ttls = Vec::new();
        for (i, (key, value)) in keys.iter().zip(values.into_iter()).enumerate() {
            let entry_ttl = ttl.at(i);
            if self.check(&value, entry_ttl)? {
                kept_keys.push(key.clone());
                kept_values.push(value);
                kept_ttls.push(entry_ttl);
            }
        }
        if kept_keys.is_empty() {
            return Ok(());
        }
        self.inner
            .put_many(&kept_keys, kept_values, collection, TtlSpec::PerEntry(kept_ttls))
            .await
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

    fn val_of_len(n: usize) -> StoreValue {
        let mut m = Map::new();
        m.insert("x".into(), Value::from("a".repeat(n)));
        m
    }

    fn memory() -> Arc<dyn Store> {
        Arc::new(MemoryStore::new(MemoryStoreConfig::default()))
    }

    #[tokio::test]
    async fn allows_entries_under_the_limit() {
        let w = LimitSize::new(memory(), LimitSizeConfig { max_size: 1_000, raise_on_error: true });
        w.put("a", val_of_len(10), None, None).await.unwrap();
        assert!(w.get("a", None).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn raises_on_oversize_when_configured() {
        let w = LimitSize::new(memory(), LimitSizeConfig { max_size: 20, raise_on_error: true });
        let err = w.put("a", val_of_len(500), None, None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::EntryTooLarge);
    }

    #[tokio::test]
    async fn silently_drops_oversize_when_configured() {
        let w = LimitSize::new(memory(), LimitSizeConfig { max_size: 20, raise_on_error: false });
        w.put("a", val_of_len(500), None, None).await.unwrap();
        assert_eq!(w.get("a", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn bulk_put_drops_oversize_elements_preserving_alignment_of_kept_ones() {
        let w = LimitSize::new(memory(), LimitSizeConfig { max_size: 60, raise_on_error: false });
        let keys = vec!["small".to_string(), "big".to_string()];
        let values = vec![val_of_len(1), val_of_len(500)];
        w.put_many(&keys, values, None, TtlSpec::default()).await.unwrap();
        assert!(w.get("small", None).await.unwrap().is_some());
        assert_eq!(w.get("big", None).await.unwrap(), None);
    }
}
