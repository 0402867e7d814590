// SPDX-License-Identifier: MIT OR Apache-2.0
//! TTL validation and the seconds-based duration serde helpers used by
//! wrapper configuration structs.

use polystore_error::{ErrorKind, Result, StoreError};

/// Validates a caller-supplied TTL.
///
/// A TTL must be a strictly positive, finite number of seconds.
/// Negative, zero, `NaN`, and infinite values are rejected with
/// [`ErrorKind::InvalidTtl`] before any backend is touched.
///
/// ```
/// use polystore_core::ttl::validate_ttl;
///
/// assert!(validate_ttl(60.0).is_ok());
/// assert!(validate_ttl(0.0).is_err());
/// assert!(validate_ttl(-1.0).is_err());
/// assert!(validate_ttl(f64::NAN).is_err());
/// ```
pub fn validate_ttl(ttl: f64) -> Result<()> {
    if !ttl.is_finite() || ttl <= 0.0 {
        return Err(StoreError::new(
            ErrorKind::InvalidTtl,
            "ttl must be a positive, finite number of seconds",
        )
        .with_context("ttl", ttl.to_string()));
    }
    Ok(())
}

/// Converts a TTL in seconds to a [`chrono::Duration`], saturating at the
/// representable range rather than panicking on pathological inputs.
pub fn chrono_duration_from_secs_f64(secs: f64) -> chrono::Duration {
    chrono::Duration::milliseconds((secs * 1000.0).round() as i64)
}

/// Serde helpers representing a [`std::time::Duration`] as fractional
/// seconds, at the seconds granularity this domain's TTLs use.
pub mod serde_seconds {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    /// Serializes a [`Duration`] as `f64` seconds.
    pub fn serialize<S: Serializer>(val: &Duration, ser: S) -> std::result::Result<S::Ok, S::Error> {
        val.as_secs_f64().serialize(ser)
    }

    /// Deserializes a [`Duration`] from `f64` seconds.
    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Duration, D::Error> {
        let secs = f64::deserialize(de)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}

/// As [`serde_seconds`] but for `Option<Duration>`.
pub mod option_serde_seconds {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    /// Serializes an `Option<Duration>` as `Option<f64>` seconds.
    pub fn serialize<S: Serializer>(
        val: &Option<Duration>,
        ser: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        val.map(|d| d.as_secs_f64()).serialize(ser)
    }

    /// Deserializes an `Option<Duration>` from `Option<f64>` seconds.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        de: D,
    ) -> std::result::Result<Option<Duration>, D::Error> {
        let secs: Option<f64> = Option::deserialize(de)?;
        Ok(secs.map(|s| Duration::from_secs_f64(s.max(0.0))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_and_non_finite() {
        for bad in [0.0, -1.0, -0.001, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(validate_ttl(bad).is_err(), "expected {bad} to be rejected");
        }
    }

    #[test]
    fn accepts_positive_finite() {
        for good in [0.001, 1.0, 60.0, 3600.0, 1e9] {
            assert!(validate_ttl(good).is_ok(), "expected {good} to be accepted");
        }
    }

    #[test]
    fn error_carries_ttl_context() {
        let err = validate_ttl(-5.0).unwrap_err();
        assert_eq!(err.kind, polystore_error::ErrorKind::InvalidTtl);
        assert_eq!(err.extra_info["ttl"], serde_json::json!("-5"));
    }

    #[test]
    fn duration_roundtrip_via_seconds() {
        let d = chrono_duration_from_secs_f64(2.5);
        assert_eq!(d.num_milliseconds(), 2500);
    }
}
