// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bounds call throughput with a sliding or fixed window.

use async_trait::async_trait;
use polystore_core::clock::{Clock, SystemClock};
use polystore_core::{ErrorKind, Result, Store, StoreError, StoreValue, TtlSpec};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Window accounting strategy for [`RateLimit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitStrategy {
    /// A FIFO of request timestamps; entries older than `now - window` are
    /// dropped before each admission check.
    Sliding,
    /// A fixed window counter reset whenever `now >= window_start + window`.
    Fixed,
}

/// Configuration for [`RateLimit`].
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum admitted calls per window.
    pub max_requests: usize,
    /// Window duration.
    pub window: Duration,
    /// Accounting strategy.
    pub strategy: RateLimitStrategy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { max_requests: 100, window: Duration::from_secs(1), strategy: RateLimitStrategy::Sliding }
    }
}

enum WindowState {
    Sliding(VecDeque<std::time::Instant>),
    Fixed { window_start: std::time::Instant, count: usize },
}

/// Wraps a [`Store`], rejecting calls once a request budget is exhausted
/// within the current window.
#[derive(Debug)]
pub struct RateLimit {
    inner: Arc<dyn Store>,
    config: RateLimitConfig,
    state: Mutex<WindowState>,
    _clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for WindowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowState::Sliding(q) => f.debug_tuple("Sliding").field(&q.len()).finish(),
            WindowState::Fixed { count, .. } => f.debug_struct("Fixed").field("count", count).finish(),
        }
    }
}

impl RateLimit {
    /// Wraps `inner` with the given throughput budget.
    #[must_use]
    pub fn new(inner: Arc<dyn Store>, config: RateLimitConfig) -> Self {
        Self::with_clock(inner, config, Arc::new(SystemClock))
    }

    /// As [`RateLimit::new`], but with an injectable [`Clock`]. The clock
    /// is unused today — window accounting runs on `Instant` for
    /// monotonicity — and is kept for API symmetry with the other
    /// time-aware wrappers should window semantics need wall-clock
    /// alignment later.
    #[must_use]
    pub fn with_clock(inner: Arc<dyn Store>, config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        let state = match config.strategy {
            RateLimitStrategy::Sliding => WindowState::Sliding(VecDeque::new()),
            RateLimitStrategy::Fixed => {
                WindowState::Fixed { window_start: std::time::Instant::now(), count: 0 }
            }
        };
        Self { inner, config, state: Mutex::new(state), _clock: clock }
    }

    fn admit(&self) -> Result<()> {
        let now = std::time::Instant::now();
        let mut state = self.state.lock().unwrap();
        match &mut *state {
            WindowState::Sliding(timestamps) => {
                while let Some(&oldest) = timestamps.front() {
                    if now.duration_since(oldest) >= self.config.window {
                        timestamps.pop_front();
                    } else {
                        break;
                    }
                }
                if timestamps.len() >= self.config.max_requests {
                    return Err(rate_limit_exceeded(self.config.max_requests, self.config.window));
                }
                timestamps.push_back(now);
            }
            WindowState::Fixed { window_start, count } => {
                if now.duration_since(*window_start) >= self.config.window {
                    *window_start = now;
                    *count = 0;
                }
                if *count >= self.config.max_requests {
                    return Err(rate_limit_exceeded(self.config.max_requests, self.config.window));
                }
                *count += 1;
            }
        }
        Ok(())
    }

    async fn guarded<T, Fut>(&self, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        self.admit()?;
        fut.await
    }
}

fn rate_limit_exceeded(max_requests: usize, window: Duration) -> StoreError {
    StoreError::new(ErrorKind::RateLimitExceeded, "rate limit window exhausted")
        .with_context("max_requests", max_requests)
        .with_context("window_secs", window.as_secs_f64())
}

#[async_trait]
impl Store for RateLimit {
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<StoreValue>> {
        self.guarded(self.inner.get(key, collection)).await
    }

    async fn get_many(&self, keys: &[String], collection: Option<&str>) -> Result<Vec<Option<StoreValue>>> {
        self.guarded(self.inner.get_many(keys, collection)).await
    }

    async fn ttl(&self, key: &str, collection: Option<&str>) -> Result<(Option<StoreValue>, Option<f64>)> {
        self.guarded(self.inner.ttl(key, collection)).await
    }

    async fn ttl_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<(Option<StoreValue>, Option<f64>)>> {
        self.guarded(self.inner.ttl_many(keys, collection)).await
    }

    async fn put(&self, key: &str, value: StoreValue, collection: Option<&str>, ttl: Option<f64>) -> Result<()> {
        self.guarded(self.inner.put(key, value, collection, ttl)).await
    }

    async fn put_many(
        &self,
        keys: &[String],
        values: Vec<StoreValue>,
        collection: Option<&str>,
        ttl: TtlSpec,
    ) -> Result<()> {
        self.guarded(self.inner.put_many(keys, values, collection, ttl)).await
    }

    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<bool> {
        self.guarded(self.inner.delete(key, collection)).await
    }

    async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> Result<usize> {
        self.guarded(self.inner.delete_many(keys, collection)).await
    }
}
