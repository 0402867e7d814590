// SPDX-License-Identifier: MIT OR Apache-2.0
//! The hooks every remote backend (Redis/Valkey, Memcached, Mongo, Dynamo,
//! Elasticsearch, ...) implements. Wire-level drivers for
//! actual remote systems are out of scope; this crate only
//! defines the interface plus a [`crate::mock::MockDriver`] test double.

use async_trait::async_trait;
use polystore_error::Result;

/// The generic network-backend template's connection hook surface.
#[async_trait]
pub trait NetworkDriver: Send + Sync + std::fmt::Debug {
    /// `true` if the backend can express TTL natively (e.g. Redis `SETEX`,
    /// Memcached's expiry field). When `false`, [`NetworkStore`] embeds
    /// `expires_at` in the payload and enforces expiry client-side after
    /// decoding.
    ///
    /// [`NetworkStore`]: crate::NetworkStore
    fn native_ttl(&self) -> bool;

    /// Opens/validates the connection, creating indexes or tables the
    /// backend needs if they're missing. Called through a setup-once
    /// latch by [`NetworkStore`](crate::NetworkStore); drivers don't need
    /// their own idempotence guard.
    async fn setup(&self) -> Result<()>;

    /// Reads one wire record. `None` means missing (the store layer still
    /// applies expiration filtering for non-native-TTL drivers).
    async fn get_raw(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>>;

    /// Writes one wire record. `ttl`, when `Some` and
    /// [`NetworkDriver::native_ttl`] is `true`, is pushed to the backend's
    /// own expiry mechanism; otherwise the caller has already embedded
    /// `expires_at` into `bytes` and the driver may ignore `ttl`.
    async fn put_raw(&self, collection: &str, key: &str, bytes: Vec<u8>, ttl: Option<f64>) -> Result<()>;

    /// Deletes one record, returning whether it existed.
    async fn delete_raw(&self, collection: &str, key: &str) -> Result<bool>;
}

/// Optional enumerate/destroy capabilities.
/// [`crate::NetworkStore<D>`] implements [`polystore_core::StoreAdmin`]
/// only when `D` also implements this trait.
#[async_trait]
pub trait NetworkDriverAdmin: NetworkDriver {
    /// Lists up to `limit` keys in `collection`.
    async fn enumerate_keys(&self, collection: &str, limit: usize) -> Result<Vec<String>>;

    /// Lists up to `limit` known collection/namespace names.
    async fn enumerate_collections(&self, limit: usize) -> Result<Vec<String>>;

    /// Drops an entire collection.
    async fn destroy_collection(&self, collection: &str) -> Result<()>;

    /// Drops everything this driver's connection owns.
    async fn destroy_store(&self) -> Result<()>;
}
