// SPDX-License-Identifier: MIT OR Apache-2.0
//! Substitutes a configured default on miss instead of returning `None`.

use async_trait::async_trait;
use polystore_core::{Result, Store, StoreValue, TtlSpec};
use std::sync::Arc;

/// Configuration for [`DefaultValue`].
#[derive(Debug, Clone)]
pub struct DefaultValueConfig {
    /// Value substituted on a miss. Cloned fresh per call so callers never
    /// share mutable state through the default.
    pub default: StoreValue,
    /// Remaining TTL reported alongside the default from [`Store::ttl`].
    pub default_ttl: Option<f64>,
}

/// Wraps a [`Store`], returning a deep copy of a configured default value
/// instead of `None` on a miss. `delete` and bulk write operations are
/// unaffected; only the read paths substitute.
#[derive(Debug)]
pub struct DefaultValue {
    inner: Arc<dyn Store>,
    config: DefaultValueConfig,
}

impl DefaultValue {
    /// Wraps `inner` with the given default.
    #[must_use]
    pub fn new(inner: Arc<dyn Store>, config: DefaultValueConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl Store for DefaultValue {
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<StoreValue>> {
        match self.inner.get(key, collection).await? {
            Some(value) => Ok(Some(value)),
            None => Ok(Some(self.config.default.clone())),
        }
    }

    async fn get_many(&self, keys: &[String], collection: Option<&str>) -> Result<Vec<Option<StoreValue>>> {
        Ok(self
            .inner
            .get_many(keys, collection)
            .await?
            .into_iter()
            .map(|v| Some(v.unwrap_or_else(|| self.config.default.clone())))
            .collect())
    }

    async fn ttl(&self, key: &str, collection: Option<&str>) -> Result<(Option<StoreValue>, Option<f64>)> {
        match self.inner.ttl(key, collection).await? {
            (Some(value), ttl) => Ok((Some(value), ttl)),
            (None, _) => Ok((Some(self.config.default.clone()), self.config.default_ttl)),
        }
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
            .map(|(value, ttl)| match value {
                Some(value) => (Some(value), ttl),
                None => (Some(self.config.default.clone()), self.config.default_ttl),
            })
            .collect())
    }

    async fn put(&self, key: &str, value: StoreValue, collection: Option<&str>, ttl: Option<f64>) -> Result<()> {
        self.inner.put(key, value, collection, ttl).await
    }

    async fn put_many(
        &self,
        keys: &[String],
        values: Vec<StoreValue>,
        collection: Option<&str>,
        ttl: TtlSpec,
    ) -> Result<()> {
        self.inner.put_many(keys, values, collection, ttl).await
    }

    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<bool> {
        self.inner.delete(key, collection).await
    }

    async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> Result<usize> {
        self.inner.delete_many(keys, collection).await
    }
}
