// SPDX-License-Identifier: MIT OR Apache-2.0
//! A uniform key-value store abstraction over many backends: values are
//! JSON-like dictionaries, partitioned into named collections, carrying
//! per-entry TTL. Concrete backends (in-memory TLRU, a local disk
//! file-cache, a generic network driver template) and a stack of
//! composable wrappers (TTL clamping, caching, size limits, read-only
//! enforcement, retries, timeouts, rate limiting, bulkhead isolation,
//! circuit breaking, prefixing, routing, versioning, encryption,
//! statistics, gradual migration) all implement the same [`Store`]
//! contract, so a wrapped store is itself a store.
//!
//! This crate re-exports the full public surface of the `polystore-*`
//! family and adds [`StoreBuilder`] for assembling a wrapper stack
//! without naming every intermediate `Arc<dyn Store>`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub use polystore_backend_file::{FileStore, FileStoreConfig};
pub use polystore_backend_memory::{
    MemoryStore, MemoryStoreConfig, DEFAULT_MAX_ENTRIES_PER_COLLECTION, DEFAULT_PAGE_LIMIT,
};
pub use polystore_backend_net::{mock, NetworkDriver, NetworkDriverAdmin, NetworkStore, NetworkStoreConfig};
pub use polystore_core::clock::{Clock, FixedClock, SystemClock};
pub use polystore_core::config::StoreConfig;
pub use polystore_core::entry::ManagedEntry;
pub use polystore_core::sanitize::{default_allowed_chars, CharPredicate, SanitizationStrategy};
pub use polystore_core::{ErrorCategory, ErrorKind, Result, Store, StoreAdmin, StoreError, StoreValue, TtlSpec};
pub use polystore_wrappers::*;

use std::sync::Arc;

/// Assembles a wrapper stack around a base [`Store`].
///
/// Each `with_*` call wraps the store accumulated so far and returns
/// the builder, so wrappers chain in the order they're applied: the
/// last one added is the outermost and sees every call first. Wrappers
/// that need a second collaborating store ([`PassthroughCache`],
/// [`Migration`]) treat the store accumulated so far as one side of the
/// pair and take the other as an argument. [`Routing`],
/// [`CollectionRouting`] and [`Statistics`]'s counter handle don't fit
/// this single-inner shape and are constructed directly instead.
pub struct StoreBuilder {
    store: Arc<dyn Store>,
}

impl std::fmt::Debug for StoreBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreBuilder").finish_non_exhaustive()
    }
}

impl StoreBuilder {
    /// Starts from a base backend.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    fn wrap(self, f: impl FnOnce(Arc<dyn Store>) -> Arc<dyn Store>) -> Self {
        Self { store: f(self.store) }
    }

    /// Wraps with [`TtlClamp`].
    #[must_use]
    pub fn with_ttl_clamp(self, config: TtlClampConfig) -> Self {
        self.wrap(|inner| Arc::new(TtlClamp::new(inner, config)))
    }

    /// Wraps with [`LimitSize`].
    #[must_use]
    pub fn with_limit_size(self, config: LimitSizeConfig) -> Self {
        self.wrap(|inner| Arc::new(LimitSize::new(inner, config)))
    }

    /// Wraps with [`ReadOnly`].
    #[must_use]
    pub fn with_read_only(self, config: ReadOnlyConfig) -> Self {
        self.wrap(|inner| Arc::new(ReadOnly::new(inner, config)))
    }

    /// Wraps with [`Retry`].
    #[must_use]
    pub fn with_retry(self, config: RetryConfig) -> Self {
        self.wrap(|inner| Arc::new(Retry::new(inner, config)))
    }

    /// Wraps with [`Timeout`].
    #[must_use]
    pub fn with_timeout(self, config: TimeoutConfig) -> Self {
        self.wrap(|inner| Arc::new(Timeout::new(inner, config)))
    }

    /// Wraps with [`Bulkhead`].
    #[must_use]
    pub fn with_bulkhead(self, config: BulkheadConfig) -> Self {
        self.wrap(|inner| Arc::new(Bulkhead::new(inner, config)))
    }

    /// Wraps with [`CircuitBreaker`].
    #[must_use]
    pub fn with_circuit_breaker(self, config: CircuitBreakerConfig) -> Self {
        self.wrap(|inner| Arc::new(CircuitBreaker::new(inner, config)))
    }

    /// Wraps with [`RateLimit`].
    #[must_use]
    pub fn with_rate_limit(self, config: RateLimitConfig) -> Self {
        self.wrap(|inner| Arc::new(RateLimit::new(inner, config)))
    }

    /// Wraps with [`PrefixKeys`].
    #[must_use]
    pub fn with_prefix_keys(self, prefix: impl Into<String>) -> Self {
        self.wrap(|inner| Arc::new(PrefixKeys::new(inner, prefix)))
    }

    /// Wraps with [`PrefixCollections`].
    #[must_use]
    pub fn with_prefix_collections(self, prefix: impl Into<String>, default_collection: impl Into<String>) -> Self {
        self.wrap(|inner| Arc::new(PrefixCollections::new(inner, prefix, default_collection)))
    }

    /// Wraps with [`SingleCollection`].
    #[must_use]
    pub fn with_single_collection(self, config: SingleCollectionConfig) -> Self {
        self.wrap(|inner| Arc::new(SingleCollection::new(inner, config)))
    }

    /// Wraps with [`Versioning`].
    #[must_use]
    pub fn with_versioning(self, config: VersioningConfig) -> Self {
        self.wrap(|inner| Arc::new(Versioning::new(inner, config)))
    }

    /// Wraps with [`Encryption`].
    #[must_use]
    pub fn with_encryption(self, config: EncryptionConfig) -> Self {
        self.wrap(|inner| Arc::new(Encryption::new(inner, config)))
    }

    /// Wraps with [`DefaultValue`].
    #[must_use]
    pub fn with_default_value(self, config: DefaultValueConfig) -> Self {
        self.wrap(|inner| Arc::new(DefaultValue::new(inner, config)))
    }

    /// Wraps with [`PassthroughCache`], treating the store accumulated so
    /// far as the primary and `cache` as the front.
    #[must_use]
    pub fn with_passthrough_cache(self, cache: Arc<dyn Store>) -> Self {
        self.wrap(|inner| Arc::new(PassthroughCache::new(inner, cache)))
    }

    /// Wraps with [`Migration`], treating the store accumulated so far
    /// as the drain source and `destination` as the new home.
    #[must_use]
    pub fn with_migration(self, destination: Arc<dyn Store>, config: MigrationConfig) -> Self {
        self.wrap(|inner| Arc::new(Migration::new(inner, destination, config)))
    }

    /// Wraps with [`SanitizationMigration`], re-keying every entry as it
    /// drains into `destination`.
    #[must_use]
    pub fn with_sanitization_migration(
        self,
        destination: Arc<dyn Store>,
        config: MigrationConfig,
        strategy: SanitizationStrategy,
        max_length: usize,
        allowed_chars: CharPredicate,
    ) -> Self {
        self.wrap(|inner| Arc::new(SanitizationMigration::new(inner, destination, config, strategy, max_length, allowed_chars)))
    }

    /// Wraps with [`Statistics`], returning the extended builder
    /// alongside a handle for reading counters later. `Statistics`
    /// doesn't fit the plain `with_*` shape because `snapshot` needs the
    /// concrete type, not just `Arc<dyn Store>`.
    #[must_use]
    pub fn with_statistics(self) -> (Self, Arc<Statistics>) {
        let stats = Arc::new(Statistics::new(self.store));
        (Self { store: stats.clone() }, stats)
    }

    /// Finishes assembly, returning the composed store.
    #[must_use]
    pub fn build(self) -> Arc<dyn Store> {
        self.store
    }
}
