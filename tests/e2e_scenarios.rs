// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end scenario tests exercising a composed wrapper stack over a
//! real backend, as opposed to the per-wrapper unit tests living
//! alongside each wrapper's own source.

use polystore::{
    CircuitBreakerConfig, DecryptionErrorPolicy, Encryption, EncryptionConfig, ErrorKind,
    MemoryStore, MemoryStoreConfig, PassthroughCache, RateLimit, RateLimitConfig,
    RateLimitStrategy, Store, StoreBuilder, TtlClampConfig, Versioning, VersioningConfig,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn val(pairs: &[(&str, Value)]) -> polystore::StoreValue {
    let mut m = Map::new();
    for (k, v) in pairs {
        m.insert((*k).to_string(), v.clone());
    }
    m
}

fn memory() -> Arc<dyn Store> {
    Arc::new(MemoryStore::new(MemoryStoreConfig::default()))
}

/// A store whose every call fails with a connection error, for exercising
/// the circuit breaker's tripped state.
#[derive(Debug, Default)]
struct AlwaysFails;

#[async_trait::async_trait]
impl Store for AlwaysFails {
    async fn get(&self, _key: &str, _collection: Option<&str>) -> polystore::Result<Option<polystore::StoreValue>> {
        Err(failure())
    }
    async fn get_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> polystore::Result<Vec<Option<polystore::StoreValue>>> {
        polystore_core::fanout::get_many(self, keys, collection).await
    }
    async fn ttl(
        &self,
        _key: &str,
        _collection: Option<&str>,
    ) -> polystore::Result<(Option<polystore::StoreValue>, Option<f64>)> {
        Err(failure())
    }
    async fn ttl_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> polystore::Result<Vec<(Option<polystore::StoreValue>, Option<f64>)>> {
        polystore_core::fanout::ttl_many(self, keys, collection).await
    }
    async fn put(
        &self,
        _key: &str,
        _value: polystore::StoreValue,
        _collection: Option<&str>,
        _ttl: Option<f64>,
    ) -> polystore::Result<()> {
        Err(failure())
    }
    async fn put_many(
        &self,
        keys: &[String],
        values: Vec<polystore::StoreValue>,
        collection: Option<&str>,
        ttl: polystore::TtlSpec,
    ) -> polystore::Result<()> {
        polystore_core::fanout::put_many(self, keys, values, collection, ttl).await
    }
    async fn delete(&self, _key: &str, _collection: Option<&str>) -> polystore::Result<bool> {
        Err(failure())
    }
    async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> polystore::Result<usize> {
        polystore_core::fanout::delete_many(self, keys, collection).await
    }
}

fn failure() -> polystore::StoreError {
    polystore::StoreError::new(ErrorKind::StoreConnectionError, "simulated backend outage")
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn s1_ttl_clamp_over_memory_store() {
    let store = StoreBuilder::new(memory())
        .with_ttl_clamp(TtlClampConfig { min_ttl: 10.0, max_ttl: 100.0, missing_ttl: None })
        .build();

    store.put("a", val(&[("x", Value::from(1))]), None, Some(5.0)).await.unwrap();
    let (value, ttl) = store.ttl("a", None).await.unwrap();
    assert_eq!(value, Some(val(&[("x", Value::from(1))])));
    let ttl = ttl.expect("clamped entry carries a ttl");
    assert!((9.0..=10.0).contains(&ttl), "expected remaining ttl near the 10s floor, got {ttl}");
}

#[tokio::test]
async fn s2_encryption_round_trip_is_opaque_at_rest() {
    let memory = memory();
    let encryption = Arc::new(Encryption::new(
        memory.clone(),
        EncryptionConfig { keys: vec![[7u8; 32]], on_decrypt_error: DecryptionErrorPolicy::Strict },
    ));

    encryption.put("u", val(&[("name", Value::from("alice"))]), None, None).await.unwrap();
    assert_eq!(encryption.get("u", None).await.unwrap(), Some(val(&[("name", Value::from("alice"))])));

    let raw = memory.get("u", None).await.unwrap().expect("entry exists");
    assert!(raw.contains_key("__encrypted_data__"));
    assert!(!raw.values().any(|v| v.as_str() == Some("alice")));
}

#[tokio::test]
async fn s3_versioning_invalidates_across_version_bump() {
    let memory = memory();
    let a = Versioning::new(memory.clone(), VersioningConfig { version: Value::from("1") });
    a.put("k", val(&[("schema", Value::from("old"))]), None, None).await.unwrap();

    let b = Versioning::new(memory, VersioningConfig { version: Value::from("2") });
    assert_eq!(b.get("k", None).await.unwrap(), None);
}

#[tokio::test]
async fn s4_circuit_breaker_trips_then_recovers_after_timeout() {
    let inner: Arc<dyn Store> = Arc::new(AlwaysFails);
    let breaker = StoreBuilder::new(inner.clone())
        .with_circuit_breaker(CircuitBreakerConfig {
            failure_threshold: 3,
            recovery_timeout: Duration::from_millis(30),
            success_threshold: 2,
            ..Default::default()
        })
        .build();

    for _ in 0..3 {
        let err = breaker.get("k", None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::StoreConnectionError);
    }

    let err = breaker.get("k", None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::CircuitOpen);

    tokio::time::sleep(Duration::from_millis(40)).await;

    // HalfOpen probe still reaches the (still failing) inner store.
    let err = breaker.get("k", None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::StoreConnectionError);
}

#[tokio::test]
async fn s5_rate_limit_sliding_window_bounds_successful_calls() {
    let rate_limited = RateLimit::new(
        memory(),
        RateLimitConfig { max_requests: 5, window: Duration::from_millis(200), strategy: RateLimitStrategy::Sliding },
    );

    for i in 0..5 {
        rate_limited.put(&format!("k{i}"), val(&[("x", Value::from(i))]), None, None).await.unwrap();
    }
    let err = rate_limited.put("k5", val(&[("x", Value::from(5))]), None, None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::RateLimitExceeded);

    tokio::time::sleep(Duration::from_millis(220)).await;
    rate_limited.put("k6", val(&[("x", Value::from(6))]), None, None).await.unwrap();
}

#[tokio::test]
async fn s6_passthrough_cache_read_through_and_write_invalidate() {
    let primary = memory();
    let cache = memory();
    primary.put("k", val(&[("v", Value::from(1))]), None, Some(100.0)).await.unwrap();

    let wrapped = PassthroughCache::new(primary, cache.clone());
    assert_eq!(wrapped.get("k", None).await.unwrap(), Some(val(&[("v", Value::from(1))])));
    let (_, cached_ttl) = cache.ttl("k", None).await.unwrap();
    assert!(cached_ttl.unwrap() <= 100.0);

    wrapped.put("k", val(&[("v", Value::from(2))]), None, None).await.unwrap();
    assert_eq!(cache.get("k", None).await.unwrap(), None);
    assert_eq!(wrapped.get("k", None).await.unwrap(), Some(val(&[("v", Value::from(2))])));
}
