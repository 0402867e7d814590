// SPDX-License-Identifier: MIT OR Apache-2.0
//! Closed / Open / HalfOpen circuit breaker FSM.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use polystore_core::clock::{Clock, SystemClock};
use polystore_core::ttl::chrono_duration_from_secs_f64;
use polystore_core::{ErrorKind, Result, Store, StoreError, StoreValue, TtlSpec};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Decides whether a given error counts toward the circuit's failure
/// tally. Errors this predicate rejects are neither counted as a failure
/// nor reset the counter.
pub type ErrorClassifier = fn(&StoreError) -> bool;

fn all_errors_count(_: &StoreError) -> bool {
    true
}

/// Configuration for [`CircuitBreaker`].
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive matching failures in `Closed` before tripping to `Open`.
    pub failure_threshold: u32,
    /// Wall-clock duration `Open` waits before probing in `HalfOpen`.
    pub recovery_timeout: Duration,
    /// Consecutive successes in `HalfOpen` before returning to `Closed`.
    pub success_threshold: u32,
    /// Predicate selecting which errors count as circuit failures.
    pub error_types: ErrorClassifier,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
            error_types: all_errors_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<DateTime<Utc>>,
}

/// Wraps a [`Store`], tripping open after repeated failures and probing
/// for recovery after a cooldown.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Arc<dyn Store>,
    config: CircuitBreakerConfig,
    fsm: Mutex<Inner>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Inner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inner")
            .field("state", &self.state)
            .field("consecutive_failures", &self.consecutive_failures)
            .field("consecutive_successes", &self.consecutive_successes)
            .finish()
    }
}

impl CircuitBreaker {
    /// Wraps `inner` with the given FSM configuration, using the real
    /// system clock for `recovery_timeout` bookkeeping.
    #[must_use]
    pub fn new(inner: Arc<dyn Store>, config: CircuitBreakerConfig) -> Self {
        Self::with_clock(inner, config, Arc::new(SystemClock))
    }

    /// As [`CircuitBreaker::new`], but with an injectable [`Clock`] for
    /// deterministic recovery-timeout tests.
    #[must_use]
    pub fn with_clock(inner: Arc<dyn Store>, config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            config,
            fsm: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
            }),
            clock,
        }
    }

    /// Current FSM state (test/diagnostic introspection).
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.fsm.lock().unwrap().state, CircuitState::Open)
    }

    fn admission_check(&self) -> Result<()> {
        let mut fsm = self.fsm.lock().unwrap();
        match fsm.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let now = self.clock.now();
                let elapsed = fsm.opened_at.map(|t| now - t).unwrap_or_else(chrono::Duration::zero);
                let recovery_timeout = chrono_duration_from_secs_f64(self.config.recovery_timeout.as_secs_f64());
                if elapsed >= recovery_timeout {
                    debug!(target: "polystore.wrappers.circuit_breaker", "recovery timeout elapsed, probing in half-open");
                    fsm.state = CircuitState::HalfOpen;
                    fsm.consecutive_successes = 0;
                    Ok(())
                } else {
                    let elapsed_secs = elapsed.num_milliseconds() as f64 / 1000.0;
                    Err(StoreError::new(ErrorKind::CircuitOpen, "circuit breaker is open")
                        .with_context("elapsed_secs", elapsed_secs)
                        .with_context("recovery_timeout_secs", self.config.recovery_timeout.as_secs_f64()))
                }
            }
        }
    }

    fn record_outcome(&self, result: &Result<()>) {
        let counts = match result {
            Ok(()) => true,
            Err(err) if (self.config.error_types)(err) => false,
            Err(_) => return, // unrelated error: neither success nor failure
        };
        let mut fsm = self.fsm.lock().unwrap();
        if counts {
            fsm.consecutive_failures = 0;
            match fsm.state {
                CircuitState::HalfOpen => {
                    fsm.consecutive_successes += 1;
                    if fsm.consecutive_successes >= self.config.success_threshold {
                        debug!(target: "polystore.wrappers.circuit_breaker", "success threshold reached, closing circuit");
                        fsm.state = CircuitState::Closed;
                        fsm.consecutive_successes = 0;
                    }
                }
                CircuitState::Closed | CircuitState::Open => {}
            }
        } else {
            match fsm.state {
                CircuitState::HalfOpen => {
                    warn!(target: "polystore.wrappers.circuit_breaker", "failure during half-open probe, reopening");
                    fsm.state = CircuitState::Open;
                    fsm.opened_at = Some(self.clock.now());
                    fsm.consecutive_successes = 0;
                }
                CircuitState::Closed => {
                    fsm.consecutive_failures += 1;
                    if fsm.consecutive_failures >= self.config.failure_threshold {
                        warn!(target: "polystore.wrappers.circuit_breaker", threshold = self.config.failure_threshold, "failure threshold reached, opening circuit");
                        fsm.state = CircuitState::Open;
                        fsm.opened_at = Some(self.clock.now());
                        fsm.consecutive_failures = 0;
                    }
                }
                CircuitState::Open => {}
            }
        }
    }

    async fn guarded<T, Fut>(&self, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        self.admission_check()?;
        let result = fut.await;
        self.record_outcome(&result.as_ref().map(|_| ()).map_err(clone_err));
        result
    }
}

fn clone_err(err: &StoreError) -> StoreError {
    StoreError::new(err.kind, err.message.clone())
}

#[async_trait]
impl Store for CircuitBreaker {
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
