// SPDX-License-Identifier: MIT OR Apache-2.0
//! Contract-boundary argument validation and compound-key composition.

use polystore_error::{ErrorKind, Result, StoreError};

/// Default per-key length limit (chars) when a [`crate::config::StoreConfig`]
/// does not override it.
pub const DEFAULT_MAX_KEY_LENGTH: usize = 1024;

/// Default compound-key separator.
pub const DEFAULT_COMPOUND_SEP: &str = "::";

/// Default prefix separator.
pub const DEFAULT_PREFIX_SEP: &str = "__";

/// Validates a key: non-empty, at most `max_length` characters.
pub fn validate_key(key: &str, max_length: usize) -> Result<()> {
    if key.is_empty() {
        return Err(StoreError::new(ErrorKind::InvalidKey, "key must not be empty"));
    }
    let len = key.chars().count();
    if len > max_length {
        return Err(StoreError::new(ErrorKind::InvalidKey, "key exceeds max_key_length")
            .with_context("key_length", len)
            .with_context("max_key_length", max_length));
    }
    Ok(())
}

/// Validates a collection name: non-empty.
pub fn validate_collection(collection: &str) -> Result<()> {
    if collection.is_empty() {
        return Err(StoreError::new(
            ErrorKind::InvalidKey,
            "collection must not be empty",
        ));
    }
    Ok(())
}

/// Validates a `put_many`/`delete_many` argument shape: `keys.len() ==
/// values.len()`, raising [`ErrorKind::IncorrectTtlCount`] on mismatch.
pub fn validate_equal_length(keys_len: usize, other_len: usize, other_name: &str) -> Result<()> {
    if keys_len != other_len {
        return Err(StoreError::new(
            ErrorKind::IncorrectTtlCount,
            format!("keys and {other_name} must have the same length"),
        )
        .with_context("keys_len", keys_len)
        .with_context(format!("{other_name}_len"), other_len));
    }
    Ok(())
}

/// Composes `collection` and `key` into a single flat identifier, as
/// required by backends that map multiple `(collection, key)` pairs into a
/// flat namespace.
///
/// ```
/// use polystore_core::key::compound_key;
///
/// assert_eq!(compound_key("users", "alice", "::"), "users::alice");
/// ```
#[must_use]
pub fn compound_key(collection: &str, key: &str, sep: &str) -> String {
    format!("{collection}{sep}{key}")
}

/// Splits a previously-composed compound key back into `(collection, key)`,
/// splitting on the *first* occurrence of `sep` (collections are not
/// expected to contain the separator).
#[must_use]
pub fn split_compound_key<'a>(compound: &'a str, sep: &str) -> Option<(&'a str, &'a str)> {
    compound.split_once(sep)
}
