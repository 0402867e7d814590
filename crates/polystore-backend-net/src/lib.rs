// SPDX-License-Identifier: MIT OR Apache-2.0
//! Generic network Store backend template: a `Store`
//! implementation generic over a [`NetworkDriver`], so every remote
//! backend (Redis/Valkey, Memcached, Mongo, Dynamo, Elasticsearch, ...)
//! can be plugged in behind the same TTL-offload and serialization logic.
//! Wire-level drivers for actual remote systems are out of scope; this
//! crate ships only the template plus [`mock::MockDriver`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod driver;
pub mod mock;

pub use driver::{NetworkDriver, NetworkDriverAdmin};

use async_trait::async_trait;
use polystore_core::clock::{Clock, SystemClock};
use polystore_core::fanout;
use polystore_core::key::{validate_collection, validate_key};
use polystore_core::serialization::{dump_json, load_json};
use polystore_core::state::BaseStoreState;
use polystore_core::store::{Store, StoreAdmin, StoreValue, TtlSpec};
use polystore_core::{ManagedEntry, Result};
use std::sync::Arc;
use tracing::debug;

/// Configuration for [`NetworkStore`].
#[derive(Debug, Clone)]
pub struct NetworkStoreConfig {
    /// Collection used when a caller omits one.
    pub default_collection: String,
    /// Per-key length ceiling.
    pub max_key_length: usize,
    /// Enumeration page size for drivers that support it.
    pub page_limit: usize,
}

impl Default for NetworkStoreConfig {
    fn default() -> Self {
        Self {
            default_collection: "default_collection".to_string(),
            max_key_length: polystore_core::key::DEFAULT_MAX_KEY_LENGTH,
            page_limit: 10_000,
        }
    }
}

/// A `Store` generic over a [`NetworkDriver`], implementing the
/// serialization/expiration logic every remote backend shares while
/// delegating the actual network hop to the driver.
#[derive(Debug)]
pub struct NetworkStore<D: NetworkDriver> {
    driver: D,
    state: BaseStoreState,
    max_key_length: usize,
    page_limit: usize,
    clock: Arc<dyn Clock>,
}

impl<D: NetworkDriver> NetworkStore<D> {
    /// Wraps `driver` with the given configuration, using [`SystemClock`]
    /// as the time source.
    #[must_use]
    pub fn new(driver: D, config: NetworkStoreConfig) -> Self {
        Self::with_clock(driver, config, Arc::new(SystemClock))
    }

    /// As [`NetworkStore::new`], but with an injectable [`Clock`].
    #[must_use]
    pub fn with_clock(driver: D, config: NetworkStoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            driver,
            state: BaseStoreState::new(config.default_collection),
            max_key_length: config.max_key_length,
            page_limit: config.page_limit,
            clock,
        }
    }

    /// Runs the driver's `setup()` through the store-wide setup-once
    /// latch.
    pub async fn setup(&self) -> Result<()> {
        self.state.store_latch().ensure(|| self.driver.setup()).await
    }

    fn validate_args(&self, key: &str, collection: &str) -> Result<()> {
        validate_collection(collection)?;
        validate_key(key, self.max_key_length)?;
        Ok(())
    }

    async fn decode(&self, bytes: Vec<u8>) -> Result<Option<StoreValue>> {
        let now = self.clock.now();
        let text = String::from_utf8(bytes).map_err(|e| {
            polystore_error::StoreError::new(
                polystore_error::ErrorKind::DeserializationError,
                "entry bytes are not UTF-8",
            )
            .with_source(e)
        })?;
        let entry: ManagedEntry = load_json(&text, now)?;
        if !self.driver.native_ttl() && entry.is_expired(now) {
            return Ok(None);
        }
        Ok(Some(entry.value))
    }
}

#[async_trait]
impl<D: NetworkDriver> Store for NetworkStore<D> {
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<StoreValue>> {
        self.setup().await?;
        let collection = self.state.resolve_collection(collection);
        self.validate_args(key, collection)?;
        match self.driver.get_raw(collection, key).await? {
            Some(bytes) => self.decode(bytes).await,
            None => Ok(None),
        }
    }

    async fn get_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<Option<StoreValue>>> {
        fanout::get_many(self, keys, collection).await
    }

    async fn ttl(
        &self,
        key: &str,
        collection: Option<&str>,
    ) -> Result<(Option<StoreValue>, Option<f64>)> {
        self.setup().await?;
        let collection = self.state.resolve_collection(collection);
        self.validate_args(key, collection)?;
        let Some(bytes) = self.driver.get_raw(collection, key).await? else {
            return Ok((None, None));
        };
        let now = self.clock.now();
        let text = String::from_utf8(bytes).map_err(|e| {
            polystore_error::StoreError::new(
                polystore_error::ErrorKind::DeserializationError,
                "entry bytes are not UTF-8",
            )
            .with_source(e)
        })?;
        let entry: ManagedEntry = load_json(&text, now)?;
        if !self.driver.native_ttl() && entry.is_expired(now) {
            return Ok((None, None));
        }
        Ok((Some(entry.value), entry.remaining_ttl_secs(now)))
    }

    async fn ttl_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<(Option<StoreValue>, Option<f64>)>> {
        fanout::ttl_many(self, keys, collection).await
    }

    async fn put(
        &self,
        key: &str,
        value: StoreValue,
        collection: Option<&str>,
        ttl: Option<f64>,
    ) -> Result<()> {
        self.setup().await?;
        let collection = self.state.resolve_collection(collection);
        self.validate_args(key, collection)?;
        let entry = ManagedEntry::new(value, ttl, self.clock.as_ref())?;
        let bytes = dump_json(&entry).into_bytes();
        self.driver.put_raw(collection, key, bytes, ttl).await?;
        debug!(target: "polystore.backend.net", key, native_ttl = self.driver.native_ttl(), "put");
        Ok(())
    }

    async fn put_many(
        &self,
        keys: &[String],
        values: Vec<StoreValue>,
        collection: Option<&str>,
        ttl: TtlSpec,
    ) -> Result<()> {
        fanout::put_many(self, keys, values, collection, ttl).await
    }

    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<bool> {
        self.setup().await?;
        let collection = self.state.resolve_collection(collection);
        self.validate_args(key, collection)?;
        self.driver.delete_raw(collection, key).await
    }

    async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> Result<usize> {
        fanout::delete_many(self, keys, collection).await
    }
}

#[async_trait]
impl<D: NetworkDriverAdmin> StoreAdmin for NetworkStore<D> {
    async fn enumerate_keys(&self, collection: Option<&str>, limit: Option<usize>) -> Result<Vec<String>> {
        self.setup().await?;
        let collection = self.state.resolve_collection(collection);
        self.driver
            .enumerate_keys(collection, limit.unwrap_or(self.page_limit))
            .await
    }

    async fn enumerate_collections(&self, limit: Option<usize>) -> Result<Vec<String>> {
        self.setup().await?;
        self.driver.enumerate_collections(limit.unwrap_or(self.page_limit)).await
    }

    async fn destroy_collection(&self, collection: &str) -> Result<()> {
        validate_collection(collection)?;
        self.driver.destroy_collection(collection).await
    }

    async fn destroy_store(&self) -> Result<()> {
        self.driver.destroy_store().await
    }
}
