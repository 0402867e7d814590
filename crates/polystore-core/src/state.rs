// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared `BaseStore` skeleton machinery: default-collection
//! resolution and setup-once latches.
//!
//! A setup latch is the atomic cell backing that guarantee —
//! `Uninitialized | Ready | Failed(error)` guarded by a single lock — so a
//! backend's `setup()`/`setup_collection(name)` runs at most once (or once
//! per collection), subsequent calls are no-ops once `Ready`, and a failed
//! setup is surfaced to every caller without being silently retried.

use polystore_error::{ErrorKind, Result, StoreError};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The state of a setup-once latch.
#[derive(Debug, Clone)]
enum LatchState {
    Uninitialized,
    Ready,
    Failed(Arc<StoreError>),
}

/// A single setup-once latch, guarding one idempotent fallible
/// initialization.
#[derive(Debug)]
pub struct Latch {
    state: Mutex<LatchState>,
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}

impl Latch {
    /// Creates a new, uninitialized latch.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LatchState::Uninitialized),
        }
    }

    /// Runs `setup` at most once. Concurrent callers serialize on the
    /// internal lock; once one caller's `setup` succeeds, every other
    /// caller (including ones already waiting on the lock) sees `Ready`
    /// and never re-runs it. A failure is recorded and replayed (not
    /// re-attempted) to every subsequent caller until the latch is
    /// [`Latch::reset`].
    pub async fn ensure<F, Fut>(&self, setup: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut guard = self.state.lock().await;
        match &*guard {
            LatchState::Ready => return Ok(()),
            LatchState::Failed(prev) => return Err(replay(prev)),
            LatchState::Uninitialized => {}
        }
        match setup().await {
            Ok(()) => {
                *guard = LatchState::Ready;
                Ok(())
            }
            Err(e) => {
                let shared = Arc::new(e);
                *guard = LatchState::Failed(Arc::clone(&shared));
                Err(replay(&shared))
            }
        }
    }

    /// `true` if the latch has already completed setup successfully.
    pub async fn is_ready(&self) -> bool {
        matches!(&*self.state.lock().await, LatchState::Ready)
    }

    /// Clears a failed latch back to `Uninitialized` so a subsequent
    /// `ensure` call will retry setup. Explicit reinitialization only —
    /// a failed setup is never retried automatically.
    pub async fn reset(&self) {
        let mut guard = self.state.lock().await;
        if matches!(&*guard, LatchState::Failed(_)) {
            *guard = LatchState::Uninitialized;
        }
    }
}

/// `StoreError` does not implement `Clone` (its boxed `source` can't be),
/// so a latch replays a failure by rebuilding an equivalent error from the
/// recorded kind/message/context, noting that the original cause chain was
/// already logged at the time of the first failure.
fn replay(prev: &StoreError) -> StoreError {
    let mut rebuilt = StoreError::new(prev.kind, prev.message.clone());
    for (k, v) in &prev.extra_info {
        rebuilt = rebuilt.with_context(k.clone(), v.clone());
    }
    rebuilt.with_context("replayed_from_failed_setup", true)
}

/// Shared skeleton every backend embeds: default-collection resolution and
/// a store-wide plus per-collection setup latch.
#[derive(Debug)]
pub struct BaseStoreState {
    default_collection: String,
    store_latch: Latch,
    collection_latches: Mutex<BTreeMap<String, Arc<Latch>>>,
}

impl BaseStoreState {
    /// Creates state with the given default collection name.
    #[must_use]
    pub fn new(default_collection: impl Into<String>) -> Self {
        Self {
            default_collection: default_collection.into(),
            store_latch: Latch::new(),
            collection_latches: Mutex::new(BTreeMap::new()),
        }
    }

    /// Resolves `collection`, falling back to the configured default when
    /// the caller omits one.
    #[must_use]
    pub fn resolve_collection<'a>(&'a self, collection: Option<&'a str>) -> &'a str {
        collection.unwrap_or(&self.default_collection)
    }

    /// The store's own setup latch (backing `setup()`).
    #[must_use]
    pub fn store_latch(&self) -> &Latch {
        &self.store_latch
    }

    /// Fetches (creating if absent) the latch for `collection`
    /// (backing `setup_collection(collection)`).
    pub async fn collection_latch(&self, collection: &str) -> Arc<Latch> {
        let mut map = self.collection_latches.lock().await;
        Arc::clone(
            map.entry(collection.to_string())
                .or_insert_with(|| Arc::new(Latch::new())),
        )
    }
}

/// Wraps a backend driver error as a [`ErrorKind::StoreConnectionError`]
/// or [`ErrorKind::StoreSetupError`], lowering a driver-specific failure
/// into the shared error taxonomy.
pub fn wrap_driver_error(
    kind: ErrorKind,
    message: impl Into<String>,
    source: impl std::error::Error + Send + Sync + 'static,
) -> StoreError {
    StoreError::new(kind, message).with_source(source)
}
