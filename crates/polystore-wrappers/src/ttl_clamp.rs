// SPDX-License-Identifier: MIT OR Apache-2.0
//! Clamps every caller-supplied TTL into `[min_ttl, max_ttl]`, substituting
//! `missing_ttl` when the caller omitted one.

use async_trait::async_trait;
use polystore_core::{Result, Store, StoreValue, TtlSpec};
use std::sync::Arc;

/// Configuration for [`TtlClamp`].
#[derive(Debug, Clone)]
pub struct TtlClampConfig {
    /// Lower bound applied to any TTL, present or substituted.
    pub min_ttl: f64,
    /// Upper bound applied to any TTL, present or substituted.
    pub max_ttl: f64,
    /// TTL substituted when the caller omits one entirely. `None` leaves
    /// an omitted TTL omitted (a permanent entry is never forced to carry
    /// a TTL).
    pub missing_ttl: Option<f64>,
}

/// Wraps a [`Store`], clamping every TTL into a configured range.
#[derive(Debug)]
pub struct TtlClamp {
    inner: Arc<dyn Store>,
    config: TtlClampConfig,
}

impl TtlClamp {
    /// Wraps `inner` with the given clamp configuration.
    #[must_use]
    pub fn new(inner: Arc<dyn Store>, config: TtlClampConfig) -> Self {
        Self { inner, config }
    }

    fn clamp(&self, ttl: Option<f64>) -> Option<f64> {
        let ttl = ttl.or(self.config.missing_ttl)?;
        Some(ttl.clamp(self.config.min_ttl, self.config.max_ttl))
    }
}

#[async_trait]
impl Store for TtlClamp {
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
        self.inner.put(key, value, collection, self.clamp(ttl)).await
    }

    async fn put_many(
        &self,
        keys: &[String],
        values: Vec<StoreValue>,
        collection: Option<&str>,
        ttl: TtlSpec,
    ) -> Result<()> {
        let clamped = match ttl {
            TtlSpec::Scalar(t) => TtlSpec::Scalar(self.clamp(t)),
            TtlSpec::PerEntry(list) => {
                TtlSpec::PerEntry(list.into_iter().map(|t| self.clamp(t)).collect())
            }
        };
        self.inner.put_many(keys, values, collection, clamped).await
    }

    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<bool> {
        self.inner.delete(key, collection).await
    }

    async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> Result<usize> {
        self.inner.delete_many(keys, collection).await
    }
}
