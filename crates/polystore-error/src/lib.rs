// SPDX-License-Identifier: MIT OR Apache-2.0
//! Unified error taxonomy with stable error codes for polystore.
//!
//! Every polystore error carries an [`ErrorKind`] (a machine-readable,
//! stable string tag), a human-readable message, an optional cause
//! chain, and arbitrary key-value context (`extra_info` in spec terms).
//! Use the builder returned by [`StoreError::new`] to construct errors
//! fluently.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorKind`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Contract-boundary argument validation (keys, TTLs, bulk lengths).
    Contract,
    /// Encoding/decoding of the wire form.
    Serialization,
    /// Errors raised by a resilience or transformation wrapper.
    Wrapper,
    /// Backend setup or I/O failure.
    Backend,
    /// Encryption/decryption wrapper failure.
    Crypto,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Contract => "contract",
            Self::Serialization => "serialization",
            Self::Wrapper => "wrapper",
            Self::Backend => "backend",
            Self::Crypto => "crypto",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant serialises to a `SCREAMING_SNAKE_CASE` string that is
/// guaranteed not to change across patch releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    // -- Contract --
    /// `key` or `collection` violates length/emptiness constraints.
    InvalidKey,
    /// `ttl` is not a positive finite number.
    InvalidTtl,
    /// `put_many`'s ttl-list length mismatches its keys list.
    IncorrectTtlCount,
    /// A required key was absent (raised by `raise_on_missing` adapters).
    MissingKey,

    // -- Serialization --
    /// Value is not JSON-encodable.
    SerializationError,
    /// Wire bytes do not parse or violate the envelope schema.
    DeserializationError,

    // -- Wrapper --
    /// Serialized entry exceeds `LimitSize`'s configured maximum.
    EntryTooLarge,
    /// Serialized entry is below `LimitSize`'s configured minimum.
    EntryTooSmall,
    /// Write attempted on a store wrapped by `ReadOnly`.
    ReadOnly,
    /// `Bulkhead` has no inflight or waiting capacity left.
    BulkheadFull,
    /// `RateLimit`'s window capacity has been reached.
    RateLimitExceeded,
    /// `CircuitBreaker` is open; calls are rejected without reaching the inner store.
    CircuitOpen,
    /// `Timeout`'s deadline elapsed before the inner operation completed.
    TimeoutError,

    // -- Crypto --
    /// Encryption of a value failed.
    EncryptionError,
    /// Decryption of an envelope failed (strict `Encryption` policy).
    DecryptionError,
    /// Envelope declares an encryption version this wrapper does not recognise.
    EncryptionVersionError,

    // -- Backend --
    /// Backend or collection setup failed.
    StoreSetupError,
    /// Backend I/O failed outside of setup.
    StoreConnectionError,
    /// A resolved filesystem path escaped the allowed root.
    PathSecurityError,

    // -- Internal --
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl ErrorKind {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidKey | Self::InvalidTtl | Self::IncorrectTtlCount | Self::MissingKey => {
                ErrorCategory::Contract
            }
            Self::SerializationError | Self::DeserializationError => ErrorCategory::Serialization,
            Self::EntryTooLarge
            | Self::EntryTooSmall
            | Self::ReadOnly
            | Self::BulkheadFull
            | Self::RateLimitExceeded
            | Self::CircuitOpen
            | Self::TimeoutError => ErrorCategory::Wrapper,
            Self::EncryptionError | Self::DecryptionError | Self::EncryptionVersionError => {
                ErrorCategory::Crypto
            }
            Self::StoreSetupError | Self::StoreConnectionError | Self::PathSecurityError => {
                ErrorCategory::Backend
            }
            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Stable `&'static str` representation of the code (e.g. `"INVALID_TTL"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidKey => "INVALID_KEY",
            Self::InvalidTtl => "INVALID_TTL",
            Self::IncorrectTtlCount => "INCORRECT_TTL_COUNT",
            Self::MissingKey => "MISSING_KEY",
            Self::SerializationError => "SERIALIZATION_ERROR",
            Self::DeserializationError => "DESERIALIZATION_ERROR",
            Self::EntryTooLarge => "ENTRY_TOO_LARGE",
            Self::EntryTooSmall => "ENTRY_TOO_SMALL",
            Self::ReadOnly => "READ_ONLY",
            Self::BulkheadFull => "BULKHEAD_FULL",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::CircuitOpen => "CIRCUIT_OPEN",
            Self::TimeoutError => "TIMEOUT_ERROR",
            Self::EncryptionError => "ENCRYPTION_ERROR",
            Self::DecryptionError => "DECRYPTION_ERROR",
            Self::EncryptionVersionError => "ENCRYPTION_VERSION_ERROR",
            Self::StoreSetupError => "STORE_SETUP_ERROR",
            Self::StoreConnectionError => "STORE_CONNECTION_ERROR",
            Self::PathSecurityError => "PATH_SECURITY_ERROR",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Unified polystore error.
///
/// Carries a stable [`ErrorKind`], a human-readable message, an
/// optional source error for cause-chaining, and arbitrary structured
/// context (spec's `extra_info`).
///
/// # Builder usage
///
/// ```
/// use polystore_error::{StoreError, ErrorKind};
///
/// let err = StoreError::new(ErrorKind::InvalidTtl, "ttl must be positive")
///     .with_context("operation", "put")
///     .with_context("ttl", -1);
/// ```
#[derive(thiserror::Error)]
#[error("[{}] {message}", kind.as_str())]
pub struct StoreError {
    /// Machine-readable error code.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Arbitrary structured context for diagnostics (operation, collection,
    /// key, numeric bounds, etc.).
    pub extra_info: BTreeMap<String, serde_json::Value>,
}

impl StoreError {
    /// Create a new error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            extra_info: BTreeMap::new(),
        }
    }

    /// Attach a key-value pair to the diagnostic context.
    ///
    /// The value is converted via [`serde_json::to_value`]; if
    /// serialisation fails, the entry is silently skipped.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.extra_info.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Shorthand for `self.kind.category()`.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

impl fmt::Debug for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("StoreError");
        d.field("kind", &self.kind);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.extra_info.is_empty() {
            d.field("extra_info", &self.extra_info);
        }
        d.finish()
    }
}

/// Convenience alias used throughout polystore crates.
pub type Result<T> = std::result::Result<T, StoreError>;
