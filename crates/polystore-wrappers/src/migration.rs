// SPDX-License-Identifier: MIT OR Apache-2.0
//! Drains one store into another without downtime: reads prefer the
//! destination, fall back to the source and copy forward.

use async_trait::async_trait;
use polystore_core::sanitize::{CharPredicate, SanitizationStrategy};
use polystore_core::{Result, Store, StoreValue, TtlSpec};
use std::sync::Arc;

/// Configuration for [`Migration`].
#[derive(Debug, Clone, Copy)]
pub struct MigrationConfig {
    /// Delete the source entry once it has been copied to the
    /// destination.
    pub delete_from_source: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self { delete_from_source: true }
    }
}

/// Wraps two stores, reading from `destination` first and falling back
/// to `source` on a miss, copying hits forward (respecting remaining
/// TTL) so the destination gradually absorbs `source`'s live entries.
/// Writes always go to `destination` only.
#[derive(Debug)]
pub struct Migration {
    source: Arc<dyn Store>,
    destination: Arc<dyn Store>,
    config: MigrationConfig,
}

impl Migration {
    /// Wraps `source`/`destination` with the given drain policy.
    #[must_use]
    pub fn new(source: Arc<dyn Store>, destination: Arc<dyn Store>, config: MigrationConfig) -> Self {
        Self { source, destination, config }
    }

    async fn fallback_get(&self, key: &str, collection: Option<&str>) -> Result<Option<StoreValue>> {
        if let Some(value) = self.destination.get(key, collection).await? {
            return Ok(Some(value));
        }
        let (value, ttl) = self.source.ttl(key, collection).await?;
        match value {
            Some(value) => {
                self.destination.put(key, value.clone(), collection, ttl).await?;
                if self.config.delete_from_source {
                    self.source.delete(key, collection).await?;
                }
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn fallback_ttl(&self, key: &str, collection: Option<&str>) -> Result<(Option<StoreValue>, Option<f64>)> {
        let dest_hit = self.destination.ttl(key, collection).await?;
        if dest_hit.0.is_some() {
            return Ok(dest_hit);
        }
        let (value, ttl) = self.source.ttl(key, collection).await?;
        match value {
            Some(value) => {
                self.destination.put(key, value.clone(), collection, ttl).await?;
                if self.config.delete_from_source {
                    self.source.delete(key, collection).await?;
                }
                Ok((Some(value), ttl))
            }
            None => Ok((None, None)),
        }
    }
}

#[async_trait]
impl Store for Migration {
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<StoreValue>> {
        self.fallback_get(key, collection).await
    }

    async fn get_many(&self, keys: &[String], collection: Option<&str>) -> Result<Vec<Option<StoreValue>>> {
        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            results.push(self.fallback_get(key, collection).await?);
        }
        Ok(results)
    }

    async fn ttl(&self, key: &str, collection: Option<&str>) -> Result<(Option<StoreValue>, Option<f64>)> {
        self.fallback_ttl(key, collection).await
    }

    async fn ttl_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<(Option<StoreValue>, Option<f64>)>> {
        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            results.push(self.fallback_ttl(key, collection).await?);
        }
        Ok(results)
    }

    async fn put(&self, key: &str, value: StoreValue, collection: Option<&str>, ttl: Option<f64>) -> Result<()> {
        self.destination.put(key, value, collection, ttl).await
    }

    async fn put_many(
        &self,
        keys: &[String],
        values: Vec<StoreValue>,
        collection: Option<&str>,
        ttl: TtlSpec,
    ) -> Result<()> {
        self.destination.put_many(keys, values, collection, ttl).await
    }

    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<bool> {
        let dest_existed = self.destination.delete(key, collection).await?;
        let source_existed = self.source.delete(key, collection).await?;
        Ok(dest_existed || source_existed)
    }

    async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> Result<usize> {
        let dest_deleted = self.destination.delete_many(keys, collection).await?;
        let source_deleted = self.source.delete_many(keys, collection).await?;
        Ok(dest_deleted.max(source_deleted))
    }
}

/// [`Migration`] specialization for a destination whose key-sanitization
/// policy differs from the source's: every key is re-derived through
/// `strategy` before it reaches `destination`, so a drain can also serve
/// as the vehicle for a sanitization-strategy change.
#[derive(Debug)]
pub struct SanitizationMigration {
    inner: Migration,
    strategy: SanitizationStrategy,
    max_length: usize,
    allowed_chars: CharPredicate,
}

impl SanitizationMigration {
    /// Wraps `source`/`destination`, re-deriving every destination-bound
    /// key through `strategy`.
    #[must_use]
    pub fn new(
        source: Arc<dyn Store>,
        destination: Arc<dyn Store>,
        config: MigrationConfig,
        strategy: SanitizationStrategy,
        max_length: usize,
        allowed_chars: CharPredicate,
    ) -> Self {
        Self { inner: Migration::new(source, destination, config), strategy, max_length, allowed_chars }
    }

    fn sanitize(&self, key: &str) -> Result<String> {
        self.strategy.apply(key, self.max_length, self.allowed_chars)
    }
}

#[async_trait]
impl Store for SanitizationMigration {
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<StoreValue>> {
        self.inner.get(&self.sanitize(key)?, collection).await
    }

    async fn get_many(&self, keys: &[String], collection: Option<&str>) -> Result<Vec<Option<StoreValue>>> {
        let sanitized = keys.iter().map(|k| self.sanitize(k)).collect::<Result<Vec<_>>>()?;
        self.inner.get_many(&sanitized, collection).await
    }

    async fn ttl(&self, key: &str, collection: Option<&str>) -> Result<(Option<StoreValue>, Option<f64>)> {
        self.inner.ttl(&self.sanitize(key)?, collection).await
    }

    async fn ttl_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<(Option<StoreValue>, Option<f64>)>> {
        let sanitized = keys.iter().map(|k| self.sanitize(k)).collect::<Result<Vec<_>>>()?;
        self.inner.ttl_many(&sanitized, collection).await
    }

    async fn put(&self, key: &str, value: StoreValue, collection: Option<&str>, ttl: Option<f64>) -> Result<()> {
        self.inner.put(&self.sanitize(key)?, value, collection, ttl).await
    }

    async fn put_many(
        &self,
        keys: &[String],
        values: Vec<StoreValue>,
        collection: Option<&str>,
        ttl: TtlSpec,
    ) -> Result<()> {
        let sanitized = keys.iter().map(|k| self.sanitize(k)).collect::<Result<Vec<_>>>()?;
        self.inner.put_many(&sanitized, values, collection, ttl).await
    }

    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<bool> {
        self.inner.delete(&self.sanitize(key)?, collection).await
    }

    async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> Result<usize> {
        let sanitized = keys.iter().map(|k| self.sanitize(k)).collect::<Result<Vec<_>>>()?;
        self.inner.delete_many(&sanitized, collection).await
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
    async fn reads_destination_first_without_touching_source() {
        let source = memory();
        let destination = memory();
        destination.put("a", val(1), None, None).await.unwrap();
        let w = Migration::new(source, destination, MigrationConfig::default());
        assert_eq!(w.get("a", None).await.unwrap(), Some(val(1)));
    }

    #[tokio::test]
    async fn falls_back_to_source_and_copies_forward() {
        let source = memory();
        let destination = memory();
        source.put("a", val(1), None, None).await.unwrap();
        let w = Migration::new(source.clone(), destination.clone(), MigrationConfig { delete_from_source: true });

        assert_eq!(w.get("a", None).await.unwrap(), Some(val(1)));
        assert_eq!(destination.get("a", None).await.unwrap(), Some(val(1)));
        assert_eq!(source.get("a", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn preserves_source_when_delete_from_source_is_disabled() {
        let source = memory();
        let destination = memory();
        source.put("a", val(1), None, None).await.unwrap();
        let w = Migration::new(source.clone(), destination, MigrationConfig { delete_from_source: false });

        w.get("a", None).await.unwrap();
        assert_eq!(source.get("a", None).await.unwrap(), Some(val(1)));
    }

    #[tokio::test]
    async fn writes_always_land_on_destination_only() {
        let source = memory();
        let destination = memory();
        let w = Migration::new(source.clone(), destination.clone(), MigrationConfig::default());

        w.put("a", val(1), None, None).await.unwrap();
        assert_eq!(destination.get("a", None).await.unwrap(), Some(val(1)));
        assert_eq!(source.get("a", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn sanitization_migration_re_keys_before_reaching_destination() {
        let source = memory();
        let destination = memory();
        let w = SanitizationMigration::new(
            source.clone(),
            destination.clone(),
            MigrationConfig::default(),
            SanitizationStrategy::Passthrough,
            64,
            polystore_core::sanitize::default_allowed_chars,
        );

        w.put("plain-key", val(1), None, None).await.unwrap();
        assert_eq!(destination.get("plain-key", None).await.unwrap(), Some(val(1)));
    }
}
