// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bounds concurrent inflight operations with a waiting queue on top
//!. A counting semaphore admits up to `max_concurrent`
//! operations; an explicit `AtomicUsize` tracks how many callers are
//! presently waiting for a permit so a caller arriving when the stack is
//! fully saturated can fail fast instead of queuing forever.

use async_trait::async_trait;
use polystore_core::{ErrorKind, Result, Store, StoreError, StoreValue, TtlSpec};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Configuration for [`Bulkhead`].
#[derive(Debug, Clone, Copy)]
pub struct BulkheadConfig {
    /// Maximum operations allowed to run concurrently.
    pub max_concurrent: usize,
    /// Maximum additional operations allowed to queue for a permit.
    pub max_waiting: usize,
}

/// Wraps a [`Store`], admitting at most `max_concurrent` inflight
/// operations and queuing at most `max_waiting` more before failing fast.
#[derive(Debug)]
pub struct Bulkhead {
    inner: Arc<dyn Store>,
    semaphore: Arc<Semaphore>,
    waiting: Arc<AtomicUsize>,
    config: BulkheadConfig,
}

impl Bulkhead {
    /// Wraps `inner` with the given concurrency bounds.
    #[must_use]
    pub fn new(inner: Arc<dyn Store>, config: BulkheadConfig) -> Self {
        Self {
            inner,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            waiting: Arc::new(AtomicUsize::new(0)),
            config,
        }
    }

    /// Current number of operations queued for a permit (test/diagnostic
    /// introspection).
    #[must_use]
    pub fn waiting_count(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    async fn admit<T, Fut>(&self, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        // Admission check: `available_permits` undercounts if other
        // callers race in between, but the atomic `waiting` counter
        // caps actual overcommit at one extra arrival per racer, which is
        // the same bound a try_acquire-then-retry loop would give.
        if self.semaphore.available_permits() == 0
            && self.waiting.load(Ordering::SeqCst) >= self.config.max_waiting
        {
            return Err(StoreError::new(ErrorKind::BulkheadFull, "bulkhead has no inflight or waiting capacity")
                .with_context("max_concurrent", self.config.max_concurrent)
                .with_context("max_waiting", self.config.max_waiting));
        }

        self.waiting.fetch_add(1, Ordering::SeqCst);
        let permit = self.semaphore.clone().acquire_owned().await;
        self.waiting.fetch_sub(1, Ordering::SeqCst);

        let permit = match permit {
            Ok(permit) => permit,
            Err(_) => {
                return Err(StoreError::new(ErrorKind::BulkheadFull, "bulkhead semaphore closed"));
            }
        };

        let result = fut.await;
        drop(permit);
        result
    }
}

#[async_trait]
impl Store for Bulkhead {
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<StoreValue>> {
        self.admit(self.inner.get(key, collection)).await
    }

    async fn get_many(&self, keys: &[String], collection: Option<&str>) -> Result<Vec<Option<StoreValue>>> {
        self.admit(self.inner.get_many(keys, collection)).await
    }

    async fn ttl(&self, key: &str, collection: Option<&str>) -> Result<(Option<StoreValue>, Option<f64>)> {
        self.admit(self.inner.ttl(key, collection)).await
    }

    async fn ttl_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<(Option<StoreValue>, Option<f64>)>> {
        self.admit(self.inner.ttl_many(keys, collection)).await
    }

    async fn put(&self, key: &str, value: StoreValue, collection: Option<&str>, ttl: Option<f64>) -> Result<()> {
        self.admit(self.inner.put(key, value, collection, ttl)).await
    }

    async fn put_many(
        &self,
        keys: &[String],
        values: Vec<StoreValue>,
        collection: Option<&str>,
        ttl: TtlSpec,
    ) -> Result<()> {
        self.admit(self.inner.put_many(keys, values, collection, ttl)).await
    }

    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<bool> {
        self.admit(self.inner.delete(key, collection)).await
    }

    async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> Result<usize> {
        self.admit(self.inner.delete_many(keys, collection)).await
    }
}
