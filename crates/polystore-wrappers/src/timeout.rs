// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wraps every operation in a cancellable deadline.

use async_trait::async_trait;
use polystore_core::{ErrorKind, Result, Store, StoreError, StoreValue, TtlSpec};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Configuration for [`Timeout`].
#[derive(Debug, Clone, Copy)]
pub struct TimeoutConfig {
    /// Deadline applied to every operation.
    pub timeout: Duration,
}

async fn with_deadline<T, Fut>(timeout: Duration, operation: &str, fut: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(target: "polystore.wrappers.timeout", operation, timeout_ms = timeout.as_millis() as u64, "deadline elapsed");
            Err(StoreError::new(ErrorKind::TimeoutError, "operation exceeded its deadline")
                .with_context("operation", operation)
                .with_context("timeout_secs", timeout.as_secs_f64()))
        }
    }
}

/// Wraps a [`Store`], cancelling any operation that runs past a deadline.
///
/// Cancellation here is "best effort" in the same sense `tokio::time::timeout`
/// is: the inner future is dropped at the await point where the deadline
/// fires, but any side effect already committed by the backend before that
/// point is not rolled back.
#[derive(Debug)]
pub struct Timeout {
    inner: Arc<dyn Store>,
    config: TimeoutConfig,
}

impl Timeout {
    /// Wraps `inner` with the given deadline.
    #[must_use]
    pub fn new(inner: Arc<dyn Store>, config: TimeoutConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl Store for Timeout {
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<StoreValue>> {
        with_deadline(self.config.timeout, "get", self.inner.get(key, collection)).await
    }

    async fn get_many(&self, keys: &[String], collection: Option<&str>) -> Result<Vec<Option<StoreValue>>> {
        with_deadline(self.config.timeout, "get_many", self.inner.get_many(keys, collection)).await
    }

    async fn ttl(&self, key: &str, collection: Option<&str>) -> Result<(Option<StoreValue>, Option<f64>)> {
        with_deadline(self.config.timeout, "ttl", self.inner.ttl(key, collection)).await
    }

    async fn ttl_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<(Option<StoreValue>, Option<f64>)>> {
        with_deadline(self.config.timeout, "ttl_many", self.inner.ttl_many(keys, collection)).await
    }

    async fn put(&self, key: &str, value: StoreValue, collection: Option<&str>, ttl: Option<f64>) -> Result<()> {
        with_deadline(self.config.timeout, "put", self.inner.put(key, value, collection, ttl)).await
    }

    async fn put_many(
        &self,
        keys: &[String],
        values: Vec<StoreValue>,
        collection: Option<&str>,
        ttl: TtlSpec,
    ) -> Result<()> {
        with_deadline(self.config.timeout, "put_many", self.inner.put_many(keys, values, collection, ttl)).await
    }

    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<bool> {
        with_deadline(self.config.timeout, "delete", self.inner.delete(key, collection)).await
    }

    async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> Result<usize> {
        with_deadline(self.config.timeout, "delete_many", self.inner.delete_many(keys, collection)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use polystore_core::ErrorKind;
    use serde_json::{Map, Value};

    #[derive(Debug)]
    struct SlowStore {
        delay: Duration,
    }

    #[async_trait]
    impl Store for SlowStore {
        async fn get(&self, _key: &str, _collection: Option<&str>) -> Result<Option<StoreValue>> {
            tokio::time::sleep(self.delay).await;
            Ok(Some(Map::new()))
        }
        async fn get_many(&self, keys: &[String], collection: Option<&str>) -> Result<Vec<Option<StoreValue>>> {
            polystore_core::fanout::get_many(self, keys, collection).await
        }
        async fn ttl(&self, _key: &str, _collection: Option<&str>) -> Result<(Option<StoreValue>, Option<f64>)> {
            Ok((None, None))
        }
        async fn ttl_many(
            &self,
            keys: &[String],
            collection: Option<&str>,
        ) -> Result<Vec<(Option<StoreValue>, Option<f64>)>> {
            polystore_core::fanout::ttl_many(self, keys, collection).await
        }
        async fn put(&self, _key: &str, _value: StoreValue, _collection: Option<&str>, _ttl: Option<f64>) -> Result<()> {
            Ok(())
        }
        async fn put_many(
            &self,
            keys: &[String],
            values: Vec<StoreValue>,
            collection: Option<&str>,
            ttl: TtlSpec,
        ) -> Result<()> {
            polystore_core::fanout::put_many(self, keys, values, collection, ttl).await
        }
        async fn delete(&self, _key: &str, _collection: Option<&str>) -> Result<bool> {
            Ok(false)
        }
        async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> Result<usize> {
            polystore_core::fanout::delete_many(self, keys, collection).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn raises_timeout_error_when_inner_exceeds_deadline() {
        let inner = Arc::new(SlowStore { delay: Duration::from_secs(10) });
        let w = Timeout::new(inner, TimeoutConfig { timeout: Duration::from_millis(50) });
        let handle = tokio::spawn(async move { w.get("a", None).await });
        tokio::time::advance(Duration::from_millis(100)).await;
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.kind, ErrorKind::TimeoutError);
    }

    #[tokio::test]
    async fn passes_through_when_inner_finishes_in_time() {
        let inner = Arc::new(SlowStore { delay: Duration::from_millis(1) });
        let w = Timeout::new(inner, TimeoutConfig { timeout: Duration::from_secs(5) });
        assert!(w.get("a", None).await.unwrap().is_some());
    }
}
