// SPDX-License-Identifier: MIT OR Apache-2.0
//! The Store Contract: the uniform operation surface every
//! backend and wrapper implements.

use async_trait::async_trait;
use polystore_error::Result;
use serde_json::{Map, Value};
use std::fmt;

/// The value type every operation moves: a JSON object, never a bare
/// scalar or array.
pub type StoreValue = Map<String, Value>;

/// TTL argument to `put_many`: either one TTL applied to every entry, or
/// one TTL per entry. `put_many` rejects a per-entry list whose length
/// does not match the keys list with `IncorrectTtlCount`.
#[derive(Debug, Clone, PartialEq)]
pub enum TtlSpec {
    /// Apply the same (optional) TTL to every entry in the batch.
    Scalar(Option<f64>),
    /// One TTL (or none) per entry, positionally aligned with `keys`.
    PerEntry(Vec<Option<f64>>),
}

impl Default for TtlSpec {
    fn default() -> Self {
        Self::Scalar(None)
    }
}

impl TtlSpec {
    /// Resolves the TTL for `index`, or `None` for a [`Self::Scalar`] of
    /// `None`. Panics if `self` is [`Self::PerEntry`] and `index` is out of
    /// bounds — callers must validate lengths with
    /// [`crate::key::validate_equal_length`] first.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<f64> {
        match self {
            Self::Scalar(ttl) => *ttl,
            Self::PerEntry(list) => list[index],
        }
    }

    /// Number of entries this spec explicitly covers, or `None` for a
    /// scalar (which applies uniformly regardless of batch size).
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Scalar(_) => None,
            Self::PerEntry(list) => Some(list.len()),
        }
    }

    /// `true` iff this is a [`Self::PerEntry`] spec with zero entries.
    /// A bare `Scalar` is never considered "empty".
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::PerEntry(list) if list.is_empty())
    }
}

/// The uniform contract every backend and wrapper implements.
///
/// A `Store` is cheap to share: implementations are expected to be used
/// behind an `Arc<dyn Store>`, and must therefore be `Send + Sync` with
/// all mutable state behind explicit synchronization.
#[async_trait]
pub trait Store: Send + Sync + fmt::Debug {
    /// Returns the value for `key` in `collection`, or `None` if missing or
    /// expired. `collection = None` resolves to the store's configured
    /// default collection.
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<StoreValue>>;

    /// Positional bulk form of [`Store::get`]: `result[i]` corresponds to
    /// `keys[i]`; a missing entry is `None` at that index, never dropped
    /// or reordered.
    async fn get_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<Option<StoreValue>>>;

    /// Returns `(value, remaining_seconds)` for `key`. `remaining_seconds`
    /// is `None` when the entry exists but carries no TTL.
    async fn ttl(
        &self,
        key: &str,
        collection: Option<&str>,
    ) -> Result<(Option<StoreValue>, Option<f64>)>;

    /// Positional bulk form of [`Store::ttl`].
    async fn ttl_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<(Option<StoreValue>, Option<f64>)>>;

    /// Stores `value` under `key`, validating `ttl` first.
    async fn put(
        &self,
        key: &str,
        value: StoreValue,
        collection: Option<&str>,
        ttl: Option<f64>,
    ) -> Result<()>;

    /// Positional bulk form of [`Store::put`]. Rejects with
    /// `IncorrectTtlCount` if `values.len() != keys.len()`, or if `ttl` is
    /// [`TtlSpec::PerEntry`] of a different length than `keys`.
    async fn put_many(
        &self,
        keys: &[String],
        values: Vec<StoreValue>,
        collection: Option<&str>,
        ttl: TtlSpec,
    ) -> Result<()>;

    /// Deletes `key`, returning whether it existed beforehand.
    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<bool>;

    /// Positional bulk form of [`Store::delete`], returning the count of
    /// keys that existed before the call.
    async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> Result<usize>;
}

/// Optional capabilities a `Store` may additionally expose. Split from
/// [`Store`] itself so a backend (or wrapper) that cannot offer
/// enumeration or destruction isn't forced to carry dead default methods,
/// and so wrappers never accidentally assume these exist on every store
/// in a stack.
#[async_trait]
pub trait StoreAdmin: Send + Sync {
    /// Lists up to `limit` keys in `collection` (default 10,000), in
    /// arbitrary order. Enumeration is best-effort: concurrent
    /// writers may cause keys to be seen zero or one times, never
    /// duplicated beyond a single page.
    async fn enumerate_keys(&self, collection: Option<&str>, limit: Option<usize>) -> Result<Vec<String>>;

    /// Lists up to `limit` known collection names, in arbitrary order.
    async fn enumerate_collections(&self, limit: Option<usize>) -> Result<Vec<String>>;

    /// Drops an entire collection and everything in it.
    async fn destroy_collection(&self, collection: &str) -> Result<()>;

    /// Drops every collection the store owns.
    async fn destroy_store(&self) -> Result<()>;
}
