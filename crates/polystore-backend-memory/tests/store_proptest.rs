// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property-based tests for [`MemoryStore`] against the universal `Store`
//! properties every backend must satisfy.

use polystore_backend_memory::{MemoryStore, MemoryStoreConfig};
use polystore_core::Store;
use proptest::prelude::*;
use serde_json::{Map, Value};

// ── Strategies ──────────────────────────────────────────────────────

fn arb_key() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,24}"
}

fn arb_value() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-z]{1,8}", any::<i64>().prop_map(Value::from), 0..4)
        .prop_map(|m| m.into_iter().collect())
}

fn rt() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()
}

// ── 1. Round-trip (property 1) ───────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]
    #[test]
    fn put_then_get_returns_the_same_value(key in arb_key(), value in arb_value()) {
        rt().block_on(async {
            let store = MemoryStore::new(MemoryStoreConfig::default());
            store.put(&key, value.clone(), None, None).await.unwrap();
            let got = store.get(&key, None).await.unwrap();
            prop_assert_eq!(got, Some(value));
            Ok(())
        })?;
    }
}

// ── 2. Delete-then-get (property 2) ──────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]
    #[test]
    fn delete_then_get_is_none(key in arb_key(), value in arb_value()) {
        rt().block_on(async {
            let store = MemoryStore::new(MemoryStoreConfig::default());
            store.put(&key, value, None, None).await.unwrap();
            prop_assert!(store.delete(&key, None).await.unwrap());
            prop_assert_eq!(store.get(&key, None).await.unwrap(), None);
            Ok(())
        })?;
    }
}

// ── 3. Isolation between collections (property 3) ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]
    #[test]
    fn collections_are_isolated(key in arb_key(), value in arb_value()) {
        rt().block_on(async {
            let store = MemoryStore::new(MemoryStoreConfig::default());
            store.put(&key, value, Some("c1"), None).await.unwrap();
            prop_assert_eq!(store.get(&key, Some("c2")).await.unwrap(), None);
            Ok(())
        })?;
    }
}

// ── 4. Bulk positional alignment (property 4) ────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]
    #[test]
    fn get_many_is_positionally_aligned(
        keys in prop::collection::vec(arb_key(), 1..8).prop_filter(
            "keys must be unique", |ks| {
                let mut sorted = ks.clone();
                sorted.sort();
                sorted.dedup();
                sorted.len() == ks.len()
            }
        ),
        present_mask in prop::collection::vec(any::<bool>(), 1..8),
    ) {
        rt().block_on(async {
            let store = MemoryStore::new(MemoryStoreConfig::default());
            let mut expected = Vec::with_capacity(keys.len());
            for (i, key) in keys.iter().enumerate() {
                if present_mask.get(i).copied().unwrap_or(false) {
                    let mut v = Map::new();
                    v.insert("i".to_string(), Value::from(i as i64));
                    store.put(key, v.clone(), None, None).await.unwrap();
                    expected.push(Some(v));
                } else {
                    expected.push(None);
                }
            }
            let got = store.get_many(&keys, None).await.unwrap();
            prop_assert_eq!(got, expected);
            Ok(())
        })?;
    }
}
