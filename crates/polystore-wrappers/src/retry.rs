// SPDX-License-Identifier: MIT OR Apache-2.0
//! Retries a failing operation with exponential backoff.

use async_trait::async_trait;
use polystore_core::{Result, Store, StoreError, StoreValue, TtlSpec};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Decides whether a given error is eligible for retry. The default
/// treats every `StoreError` as retryable; pass a narrower predicate to
/// narrow which errors count as transient.
pub type RetryPredicate = fn(&StoreError) -> bool;

fn retry_all(_: &StoreError) -> bool {
    true
}

/// Configuration for [`Retry`].
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum retry attempts after the initial one. `0` disables retry.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Delay ceiling; `initial_delay * base^attempt` is capped at this.
    pub max_delay: Duration,
    /// Exponential growth base.
    pub exponential_base: f64,
    /// Predicate selecting which errors are retried; non-matching errors
    /// propagate on the first attempt.
    pub retry_on: RetryPredicate,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            exponential_base: 2.0,
            retry_on: retry_all,
        }
    }
}

/// Computes the backoff delay for a zero-indexed `attempt`, mirroring the
/// host layer's exponential-backoff-with-jitter helper.
#[must_use]
pub fn compute_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let factor = config.exponential_base.powi(attempt as i32);
    let nominal_ms = (config.initial_delay.as_millis() as f64 * factor) as u64;
    let capped_ms = nominal_ms.min(config.max_delay.as_millis() as u64);
    Duration::from_millis(capped_ms)
}

/// Runs `op` up to `config.max_retries + 1` times, sleeping between
/// retryable failures. Non-retryable errors propagate immediately.
pub async fn retry_async<T, F, Fut>(config: &RetryConfig, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_retries + 1;
    for attempt in 0..max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let is_last = attempt + 1 >= max_attempts;
                if !(config.retry_on)(&err) {
                    debug!(target: "polystore.wrappers.retry", kind = %err.kind, "non-retryable error, giving up");
                    return Err(err);
                }
                if is_last {
                    warn!(target: "polystore.wrappers.retry", kind = %err.kind, attempt, "max retries exhausted");
                    return Err(err);
                }
                let delay = compute_delay(config, attempt);
                warn!(target: "polystore.wrappers.retry", kind = %err.kind, attempt, delay_ms = delay.as_millis() as u64, "retrying after backoff");
                tokio::time::sleep(delay).await;
            }
        }
    }
    unreachable!("loop always returns on its final iteration")
}

/// Wraps a [`Store`], retrying every operation on a matching failure with
/// exponential backoff.
#[derive(Debug)]
pub struct Retry {
    inner: Arc<dyn Store>,
    config: RetryConfig,
}

impl Retry {
    /// Wraps `inner` with the given retry configuration.
    #[must_use]
    pub fn new(inner: Arc<dyn Store>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl Store for Retry {
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<StoreValue>> {
        retry_async(&self.config, || self.inner.get(key, collection)).await
    }

    async fn get_many(&self, keys: &[String], collection: Option<&str>) -> Result<Vec<Option<StoreValue>>> {
        retry_async(&self.config, || self.inner.get_many(keys, collection)).await
    }

    async fn ttl(&self, key: &str, collection: Option<&str>) -> Result<(Option<StoreValue>, Option<f64>)> {
        retry_async(&self.config, || self.inner.ttl(key, collection)).await
    }

    async fn ttl_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<(Option<StoreValue>, Option<f64>)>> {
        retry_async(&self.config, || self.inner.ttl_many(keys, collection)).await
    }

    async fn put(&self, key: &str, value: StoreValue, collection: Option<&str>, ttl: Option<f64>) -> Result<()> {
        retry_async(&self.config, || self.inner.put(key, value.clone(), collection, ttl)).await
    }

    async fn put_many(
        &self,
        keys: &[String],
        values: Vec<StoreValue>,
        collection: Option<&str>,
        ttl: TtlSpec,
    ) -> Result<()> {
        retry_async(&self.config, || {
            self.inner.put_many(keys, values.clone(), collection, ttl.clone())
        })
        .await
    }

    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<bool> {
        retry_async(&self.config, || self.inner.delete(key, collection)).await
    }

    async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> Result<usize> {
        retry_async(&self.config, || self.inner.delete_many(keys, collection)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use polystore_core::ErrorKind;
    use serde_json::{Map, Value};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Default)]
    struct FlakyStore {
        failures_remaining: AtomicU32,
    }

    #[async_trait]
    impl Store for FlakyStore {
        async fn get(&self, _key: &str, _collection: Option<&str>) -> Result<Option<StoreValue>> {
            if self.failures_remaining.load(Ordering::SeqCst) > 0 {
                self.failures_remaining.fetch_sub(1, Ordering::SeqCst);
                return Err(StoreError::new(ErrorKind::StoreConnectionError, "transient"));
            }
            Ok(None)
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

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            exponential_base: 2.0,
            retry_on: retry_all,
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures_within_budget() {
        let inner = Arc::new(FlakyStore { failures_remaining: AtomicU32::new(2) });
        let w = Retry::new(inner, fast_config(3));
        assert_eq!(w.get("a", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn propagates_after_exhausting_retries() {
        let inner = Arc::new(FlakyStore { failures_remaining: AtomicU32::new(10) });
        let w = Retry::new(inner, fast_config(2));
        let err = w.get("a", None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::StoreConnectionError);
    }

    #[test]
    fn delay_is_capped_at_max_delay() {
        let config = RetryConfig {
            max_retries: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            exponential_base: 2.0,
            retry_on: retry_all,
        };
        assert_eq!(compute_delay(&config, 10), Duration::from_millis(500));
    }
}
