// SPDX-License-Identifier: MIT OR Apache-2.0
//! Common backend configuration surface.

use crate::key::DEFAULT_MAX_KEY_LENGTH;
use crate::sanitize::SanitizationStrategy;
use serde::{Deserialize, Serialize};

/// Configuration recognized by every backend. Backend-specific options
/// (host/port/credentials/path, `max_entries_per_collection`,
/// `max_size_bytes`, and anything a wire-level driver would own) travel in
/// `extra` rather than being modeled centrally here — those concerns
/// belong to the individual backend crate or to the out-of-scope remote
/// drivers that serve as external collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Collection applied when a caller omits one.
    pub default_collection: String,
    /// Per-key length ceiling enforced at the contract boundary.
    pub max_key_length: usize,
    /// Optional name sanitization policy for backends with restrictive key
    /// formats. `None` means the backend accepts keys verbatim.
    pub sanitization_strategy: Option<SanitizationStrategy>,
    /// Backend-specific extensions not modeled centrally.
    pub extra: serde_json::Value,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_collection: "default_collection".to_string(),
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
            sanitization_strategy: None,
            extra: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

impl StoreConfig {
    /// Starts from [`StoreConfig::default`] with a different default
    /// collection name.
    #[must_use]
    pub fn with_default_collection(mut self, name: impl Into<String>) -> Self {
        self.default_collection = name.into();
        self
    }

    /// Starts from [`StoreConfig::default`] with a different max key
    /// length.
    #[must_use]
    pub fn with_max_key_length(mut self, max_key_length: usize) -> Self {
        self.max_key_length = max_key_length;
        self
    }

    /// Attaches a sanitization strategy.
    #[must_use]
    pub fn with_sanitization_strategy(mut self, strategy: SanitizationStrategy) -> Self {
        self.sanitization_strategy = Some(strategy);
        self
    }
}

// `SanitizationStrategy` carries only plain data (an enum tag plus, for
// `Hybrid`, a `char`), so it can derive Serialize/Deserialize without
// needing a custom representation for the `CharPredicate` fn pointer
// (which is never itself serialized; the allowed-character predicate is
// supplied by the caller at `apply()` time, not stored in the strategy).
impl Serialize for SanitizationStrategy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::Passthrough => map.serialize_entry("strategy", "passthrough")?,
            Self::HashExcessLength => map.serialize_entry("strategy", "hash_excess_length")?,
            Self::AlwaysHash => map.serialize_entry("strategy", "always_hash")?,
            Self::Hybrid { replacement } => {
                map.serialize_entry("strategy", "hybrid")?;
                map.serialize_entry("replacement", &replacement.to_string())?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SanitizationStrategy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            strategy: String,
            replacement: Option<String>,
        }
        let raw = Raw::deserialize(deserializer)?;
        match raw.strategy.as_str() {
            "passthrough" => Ok(Self::Passthrough),
            "hash_excess_length" => Ok(Self::HashExcessLength),
            "always_hash" => Ok(Self::AlwaysHash),
            "hybrid" => {
                let replacement = raw
                    .replacement
                    .and_then(|s| s.chars().next())
                    .unwrap_or('_');
                Ok(Self::Hybrid { replacement })
            }
            other => Err(serde::de::Error::custom(format!(
                "unknown sanitization strategy: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let cfg = StoreConfig::default();
        assert_eq!(cfg.default_collection, "default_collection");
        assert_eq!(cfg.max_key_length, DEFAULT_MAX_KEY_LENGTH);
        assert!(cfg.sanitization_strategy.is_none());
    }

    #[test]
    fn builder_methods_chain() {
        let cfg = StoreConfig::default()
            .with_default_collection("users")
            .with_max_key_length(250)
            .with_sanitization_strategy(SanitizationStrategy::AlwaysHash);
        assert_eq!(cfg.default_collection, "users");
        assert_eq!(cfg.max_key_length, 250);
        assert!(matches!(cfg.sanitization_strategy, Some(SanitizationStrategy::AlwaysHash)));
    }

    #[test]
    fn sanitization_strategy_serde_roundtrip() {
        for strategy in [
            SanitizationStrategy::Passthrough,
            SanitizationStrategy::HashExcessLength,
            SanitizationStrategy::AlwaysHash,
            SanitizationStrategy::Hybrid { replacement: '_' },
        ] {
            let json = serde_json::to_string(&strategy).unwrap();
            let back: SanitizationStrategy = serde_json::from_str(&json).unwrap();
            assert_eq!(format!("{strategy:?}"), format!("{back:?}"));
        }
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = StoreConfig::default().with_default_collection("orders");
        let json = serde_json::to_string(&cfg).unwrap();
        let back: StoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.default_collection, "orders");
    }
}
