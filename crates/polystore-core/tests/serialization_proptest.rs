// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property-based tests for [`ManagedEntry`] serialization and TTL validation.

use chrono::Utc;
use polystore_core::clock::SystemClock;
use polystore_core::entry::ManagedEntry;
use polystore_core::serialization::{dump_json, load_json};
use polystore_core::ttl::validate_ttl;
use proptest::prelude::*;
use serde_json::{Map, Value};

// ── Strategies ──────────────────────────────────────────────────────

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        ".{0,16}".prop_map(Value::from),
    ]
}

fn arb_value_map() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-z]{1,8}", arb_scalar(), 0..6)
        .prop_map(|m| m.into_iter().collect())
}

fn arb_ttl() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![Just(None), (0.001f64..1_000_000.0).prop_map(Some)]
}

// ── 1. Serialization idempotence (property 13) ──────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    #[test]
    fn dump_then_load_preserves_value_and_timestamps(value in arb_value_map(), ttl in arb_ttl()) {
        let entry = ManagedEntry::new(value, ttl, &SystemClock).unwrap();
        let decoded = load_json(&dump_json(&entry), Utc::now()).unwrap();
        prop_assert_eq!(decoded.value, entry.value);
        prop_assert_eq!(decoded.created_at, entry.created_at);
        prop_assert_eq!(decoded.expires_at, entry.expires_at);
    }
}

// ── 2. TTL rejection (property 14) ───────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    #[test]
    fn non_positive_ttl_is_always_rejected(ttl in -1_000_000.0f64..=0.0) {
        prop_assert!(validate_ttl(ttl).is_err());
    }

    #[test]
    fn positive_finite_ttl_is_always_accepted(ttl in 0.001f64..1_000_000.0) {
        prop_assert!(validate_ttl(ttl).is_ok());
    }
}
