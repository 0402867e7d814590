// SPDX-License-Identifier: MIT OR Apache-2.0
//! [`ManagedEntry`] — the in-memory representation of one stored record.

use crate::clock::Clock;
use crate::ttl::{chrono_duration_from_secs_f64, validate_ttl};
use chrono::{DateTime, Utc};
use polystore_error::Result;
use serde_json::{Map, Value};

/// A value dictionary plus the timestamp metadata every backend stores
/// alongside it.
///
/// Exactly one of `ttl`/`expires_at` is authoritative at construction time;
/// the other is derived so that `expires_at == created_at + ttl` always
/// holds for entries that carry a TTL at all.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedEntry {
    /// The caller-supplied value.
    pub value: Map<String, Value>,
    /// When the entry was created. Always present for entries built via
    /// [`ManagedEntry::new`]; may be absent on an entry reconstructed from
    /// a wire payload that omitted it.
    pub created_at: Option<DateTime<Utc>>,
    /// TTL in seconds at construction time, if any.
    pub ttl: Option<f64>,
    /// Absolute expiry instant, if any.
    pub expires_at: Option<DateTime<Utc>>,
}

impl ManagedEntry {
    /// Builds a new entry for a fresh `put`, validating `ttl` and deriving
    /// `expires_at` from it via the given clock.
    ///
    /// ```
    /// use polystore_core::clock::SystemClock;
    /// use polystore_core::entry::ManagedEntry;
    /// use serde_json::Map;
    ///
    /// let entry = ManagedEntry::new(Map::new(), Some(60.0), &SystemClock).unwrap();
    /// assert!(entry.expires_at.is_some());
    /// ```
    pub fn new(value: Map<String, Value>, ttl: Option<f64>, clock: &dyn Clock) -> Result<Self> {
        if let Some(t) = ttl {
            validate_ttl(t)?;
        }
        let created_at = clock.now();
        let expires_at = ttl.map(|t| created_at + chrono_duration_from_secs_f64(t));
        Ok(Self {
            value,
            created_at: Some(created_at),
            ttl,
            expires_at,
        })
    }

    /// Reconstructs an entry from parts recovered off the wire, normalizing
    /// the ttl/expires_at pair: if only one of them is present, the other
    /// is derived relative to `created_at` (falling back to `reference_now`
    /// when `created_at` itself is absent).
    pub fn from_parts(
        value: Map<String, Value>,
        created_at: Option<DateTime<Utc>>,
        ttl: Option<f64>,
        expires_at: Option<DateTime<Utc>>,
        reference_now: DateTime<Utc>,
    ) -> Self {
        let anchor = created_at.unwrap_or(reference_now);
        let (ttl, expires_at) = match (ttl, expires_at) {
            (Some(t), None) => (Some(t), Some(anchor + chrono_duration_from_secs_f64(t))),
            (None, Some(e)) => {
                let derived = (e - anchor).num_milliseconds() as f64 / 1000.0;
                (Some(derived), Some(e))
            }
            (t, e) => (t, e),
        };
        Self {
            value,
            created_at,
            ttl,
            expires_at,
        }
    }

    /// `true` iff this entry carries an expiry that has already passed
    /// `now`. An entry with no `expires_at` never expires.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|e| e <= now)
    }

    /// Remaining seconds until expiry, or `None` if the entry has no TTL.
    /// Does not clamp negative results; callers check [`is_expired`]
    /// first.
    ///
    /// [`is_expired`]: ManagedEntry::is_expired
    #[must_use]
    pub fn remaining_ttl_secs(&self, now: DateTime<Utc>) -> Option<f64> {
        self.expires_at
            .map(|e| (e - now).num_milliseconds() as f64 / 1000.0)
    }
}
