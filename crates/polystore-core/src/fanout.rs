// SPDX-License-Identifier: MIT OR Apache-2.0
//! Default bulk fan-out: backends without a native batch API
//! implement `get_many`/`ttl_many`/`put_many`/`delete_many` by positional
//! fan-out over their single-key methods. Backends with a native batch
//! call (a network driver's multi-get, say) override the trait method
//! directly instead of calling these.

use crate::key::validate_equal_length;
use crate::store::{Store, StoreValue, TtlSpec};
use polystore_error::Result;

/// Positional fan-out over [`Store::get`].
pub async fn get_many<S: Store + ?Sized>(
    store: &S,
    keys: &[String],
    collection: Option<&str>,
) -> Result<Vec<Option<StoreValue>>> {
    let mut out = Vec::with_capacity(keys.len());
    for key in keys {
        out.push(store.get(key, collection).await?);
    }
    Ok(out)
}

/// Positional fan-out over [`Store::ttl`].
pub async fn ttl_many<S: Store + ?Sized>(
    store: &S,
    keys: &[String],
    collection: Option<&str>,
) -> Result<Vec<(Option<StoreValue>, Option<f64>)>> {
    let mut out = Vec::with_capacity(keys.len());
    for key in keys {
        out.push(store.ttl(key, collection).await?);
    }
    Ok(out)
}

/// Positional fan-out over [`Store::put`].
///
/// Validates `values.len() == keys.len()` and, for [`TtlSpec::PerEntry`],
/// `ttl.len() == keys.len()`, before issuing any write.
pub async fn put_many<S: Store + ?Sized>(
    store: &S,
    keys: &[String],
    values: Vec<StoreValue>,
    collection: Option<&str>,
    ttl: TtlSpec,
) -> Result<()> {
    validate_equal_length(keys.len(), values.len(), "values")?;
    if let Some(ttl_len) = ttl.len() {
        validate_equal_length(keys.len(), ttl_len, "ttl")?;
    }
    for (i, (key, value)) in keys.iter().zip(values.into_iter()).enumerate() {
        store.put(key, value, collection, ttl.at(i)).await?;
    }
    Ok(())
}

/// Positional fan-out over [`Store::delete`], returning the count of keys
/// that existed before the call.
pub async fn delete_many<S: Store + ?Sized>(
    store: &S,
    keys: &[String],
    collection: Option<&str>,
) -> Result<usize> {
    let mut removed = 0usize;
    for key in keys {
        if store.delete(key, collection).await? {
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Map, Value};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct ToyStore {
        data: Mutex<std::collections::BTreeMap<String, StoreValue>>,
    }

    #[async_trait]
    impl Store for ToyStore {
        async fn get(&self, key: &str, _collection: Option<&str>) -> Result<Option<StoreValue>> {
            Ok(self.data.lock().unwrap().get(key).cloned())
        }
        async fn get_many(&self, keys: &[String], collection: Option<&str>) -> Result<Vec<Option<StoreValue>>> {
            get_many(self, keys, collection).await
        }
        async fn ttl(&self, key: &str, _collection: Option<&str>) -> Result<(Option<StoreValue>, Option<f64>)> {
            Ok((self.data.lock().unwrap().get(key).cloned(), None))
        }
        async fn ttl_many(&self, keys: &[String], collection: Option<&str>) -> Result<Vec<(Option<StoreValue>, Option<f64>)>> {
            ttl_many(self, keys, collection).await
        }
        async fn put(&self, key: &str, value: StoreValue, _collection: Option<&str>, _ttl: Option<f64>) -> Result<()> {
            self.data.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }
        async fn put_many(&self, keys: &[String], values: Vec<StoreValue>, collection: Option<&str>, ttl: TtlSpec) -> Result<()> {
            put_many(self, keys, values, collection, ttl).await
        }
        async fn delete(&self, key: &str, _collection: Option<&str>) -> Result<bool> {
            Ok(self.data.lock().unwrap().remove(key).is_some())
        }
        async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> Result<usize> {
            delete_many(self, keys, collection).await
        }
    }

    fn val(n: i64) -> StoreValue {
        let mut m = Map::new();
        m.insert("n".into(), Value::from(n));
        m
    }

    #[tokio::test]
    async fn get_many_is_positional_with_none_for_missing() {
        let store = ToyStore::default();
        store.put("a", val(1), None, None).await.unwrap();
        let keys = vec!["missing".to_string(), "a".to_string()];
        let out = store.get_many(&keys, None).await.unwrap();
        assert_eq!(out, vec![None, Some(val(1))]);
    }

    #[tokio::test]
    async fn put_many_rejects_length_mismatch() {
        let store = ToyStore::default();
        let keys = vec!["a".to_string(), "b".to_string()];
        let values = vec![val(1)];
        let err = store.put_many(&keys, values, None, TtlSpec::default()).await.unwrap_err();
        assert_eq!(err.kind, polystore_error::ErrorKind::IncorrectTtlCount);
    }

    #[tokio::test]
    async fn put_many_rejects_ttl_list_mismatch() {
        let store = ToyStore::default();
        let keys = vec!["a".to_string(), "b".to_string()];
        let values = vec![val(1), val(2)];
        let ttl = TtlSpec::PerEntry(vec![Some(1.0)]);
        let err = store.put_many(&keys, values, None, ttl).await.unwrap_err();
        assert_eq!(err.kind, polystore_error::ErrorKind::IncorrectTtlCount);
    }

    #[tokio::test]
    async fn delete_many_counts_only_existing_keys() {
        let store = ToyStore::default();
        store.put("a", val(1), None, None).await.unwrap();
        let keys = vec!["a".to_string(), "missing".to_string()];
        let removed = store.delete_many(&keys, None).await.unwrap();
        assert_eq!(removed, 1);
    }
}
