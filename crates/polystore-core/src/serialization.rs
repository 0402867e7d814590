// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bidirectional mapping between [`ManagedEntry`] and its wire form.
//!
//! The canonical wire form is a JSON object with sorted keys:
//! `{"version": 1, "value": {...}, "created_at"?, "expires_at"?}`.
//! `ttl` is intentionally omitted from the canonical form and re-derived
//! from `expires_at` on load; a legacy `ttl` field is still accepted on read so payloads
//! written by an older encoding continue to load correctly.

use crate::entry::ManagedEntry;
use chrono::{DateTime, Utc};
use polystore_error::{ErrorKind, Result, StoreError};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Schema version stamped into every serialized entry.
pub const WIRE_VERSION: u64 = 1;

/// Encodes a [`ManagedEntry`] into a sorted-key map suitable for
/// `serde_json::to_string`.
///
/// ```
/// use polystore_core::clock::SystemClock;
/// use polystore_core::entry::ManagedEntry;
/// use polystore_core::serialization::dump_dict;
/// use serde_json::Map;
///
/// let entry = ManagedEntry::new(Map::new(), None, &SystemClock).unwrap();
/// let dict = dump_dict(&entry);
/// assert_eq!(dict["version"], serde_json::json!(1));
/// ```
#[must_use]
pub fn dump_dict(entry: &ManagedEntry) -> BTreeMap<String, Value> {
    let mut map = BTreeMap::new();
    map.insert("version".to_string(), Value::from(WIRE_VERSION));
    map.insert("value".to_string(), Value::Object(entry.value.clone()));
    if let Some(created_at) = entry.created_at {
        map.insert("created_at".to_string(), Value::from(to_iso8601(created_at)));
    }
    if let Some(expires_at) = entry.expires_at {
        map.insert("expires_at".to_string(), Value::from(to_iso8601(expires_at)));
    }
    map
}

/// Encodes a [`ManagedEntry`] as a JSON string with sorted keys.
#[must_use]
pub fn dump_json(entry: &ManagedEntry) -> String {
    serde_json::to_string(&dump_dict(entry)).expect("BTreeMap<String, Value> always serializes")
}

/// Decodes a previously-dumped map back into a [`ManagedEntry`].
///
/// A missing `value` field, or a `value` that is not a JSON object, is a
/// [`ErrorKind::DeserializationError`].
pub fn load_dict(map: &Map<String, Value>, now: DateTime<Utc>) -> Result<ManagedEntry> {
    let value = match map.get("value") {
        Some(Value::Object(obj)) => obj.clone(),
        Some(_) => {
            return Err(StoreError::new(
                ErrorKind::DeserializationError,
                "entry 'value' field is not a JSON object",
            ))
        }
        None => {
            return Err(StoreError::new(
                ErrorKind::DeserializationError,
                "entry missing required 'value' field",
            ))
        }
    };

    let created_at = match map.get("created_at") {
        Some(Value::String(s)) => Some(parse_iso8601(s)?),
        Some(Value::Null) | None => None,
        Some(_) => {
            return Err(StoreError::new(
                ErrorKind::DeserializationError,
                "'created_at' must be a string timestamp",
            ))
        }
    };

    let expires_at = match map.get("expires_at") {
        Some(Value::String(s)) => Some(parse_iso8601(s)?),
        Some(Value::Null) | None => None,
        Some(_) => {
            return Err(StoreError::new(
                ErrorKind::DeserializationError,
                "'expires_at' must be a string timestamp",
            ))
        }
    };

    // Legacy payloads may carry a raw `ttl` field instead of `expires_at`.
    let legacy_ttl = match map.get("ttl") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::Null) | None => None,
        Some(_) => {
            return Err(StoreError::new(
                ErrorKind::DeserializationError,
                "'ttl' must be numeric",
            ))
        }
    };

    Ok(ManagedEntry::from_parts(
        value,
        created_at,
        legacy_ttl,
        expires_at,
        now,
    ))
}

/// Decodes a JSON string produced by (or compatible with) [`dump_json`].
pub fn load_json(raw: &str, now: DateTime<Utc>) -> Result<ManagedEntry> {
    let value: Value = serde_json::from_str(raw).map_err(|e| {
        StoreError::new(ErrorKind::DeserializationError, "malformed entry JSON").with_source(e)
    })?;
    match value {
        Value::Object(map) => load_dict(&map, now),
        _ => Err(StoreError::new(
            ErrorKind::DeserializationError,
            "entry JSON must be an object",
        )),
    }
}

fn to_iso8601(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn parse_iso8601(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            StoreError::new(ErrorKind::DeserializationError, "invalid ISO-8601 timestamp")
                .with_context("raw", raw)
                .with_source(e)
        })
}
