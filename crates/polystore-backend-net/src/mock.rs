// SPDX-License-Identifier: MIT OR Apache-2.0
//! An in-memory [`NetworkDriver`] test double, demonstrating both the
//! native-TTL and embedded-`expires_at` code paths a real remote driver
//! would pick between.

use crate::driver::{NetworkDriver, NetworkDriverAdmin};
use async_trait::async_trait;
use polystore_error::Result;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug, Clone)]
struct StoredRecord {
    bytes: Vec<u8>,
    /// Present only when the driver is configured with `native_ttl =
    /// true`; mirrors a backend's own expiry mechanism rather than the
    /// `expires_at` embedded in the payload by the store layer.
    native_expires_at: Option<Instant>,
}

/// In-memory stand-in for a remote driver, used only by this crate's own
/// tests. Constructed with `native_ttl = true` it pushes a separate
/// native expiry (and `get_raw`/`delete_raw` treat the record as gone past
/// it, never exposing it at all); with `native_ttl = false` it stores
/// whatever bytes it's given verbatim and relies entirely on the caller's
/// embedded `expires_at`.
#[derive(Debug)]
pub struct MockDriver {
    native_ttl: bool,
    data: Mutex<BTreeMap<(String, String), StoredRecord>>,
}

impl MockDriver {
    /// Creates a driver that relies on the store layer's embedded
    /// `expires_at` (the common case for backends without native TTL).
    #[must_use]
    pub fn client_side_ttl() -> Self {
        Self {
            native_ttl: false,
            data: Mutex::new(BTreeMap::new()),
        }
    }

    /// Creates a driver that simulates a backend-native TTL mechanism.
    #[must_use]
    pub fn native_ttl() -> Self {
        Self {
            native_ttl: true,
            data: Mutex::new(BTreeMap::new()),
        }
    }

    /// Number of records currently stored, expired or not (test
    /// introspection only).
    pub fn raw_len(&self) -> usize {
        self.data.lock().unwrap().len()
    }
}

#[async_trait]
impl NetworkDriver for MockDriver {
    fn native_ttl(&self) -> bool {
        self.native_ttl
    }

    async fn setup(&self) -> Result<()> {
        Ok(())
    }

    async fn get_raw(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let mut guard = self.data.lock().unwrap();
        let map_key = (collection.to_string(), key.to_string());
        if let Some(record) = guard.get(&map_key) {
            if let Some(expires_at) = record.native_expires_at {
                if Instant::now() >= expires_at {
                    guard.remove(&map_key);
                    return Ok(None);
                }
            }
            return Ok(Some(record.bytes.clone()));
        }
        Ok(None)
    }

    async fn put_raw(&self, collection: &str, key: &str, bytes: Vec<u8>, ttl: Option<f64>) -> Result<()> {
        let native_expires_at = if self.native_ttl {
            ttl.map(|secs| Instant::now() + std::time::Duration::from_secs_f64(secs))
        } else {
            None
        };
        self.data.lock().unwrap().insert(
            (collection.to_string(), key.to_string()),
            StoredRecord {
                bytes,
                native_expires_at,
            },
        );
        Ok(())
    }

    async fn delete_raw(&self, collection: &str, key: &str) -> Result<bool> {
        Ok(self
            .data
            .lock()
            .unwrap()
            .remove(&(collection.to_string(), key.to_string()))
            .is_some())
    }
}

#[async_trait]
impl NetworkDriverAdmin for MockDriver {
    async fn enumerate_keys(&self, collection: &str, limit: usize) -> Result<Vec<String>> {
        let guard = self.data.lock().unwrap();
        Ok(guard
            .keys()
            .filter(|(c, _)| c == collection)
            .take(limit)
            .map(|(_, k)| k.clone())
            .collect())
    }

    async fn enumerate_collections(&self, limit: usize) -> Result<Vec<String>> {
        let guard = self.data.lock().unwrap();
        let mut seen = std::collections::BTreeSet::new();
        for (c, _) in guard.keys() {
            seen.insert(c.clone());
        }
        Ok(seen.into_iter().take(limit).collect())
    }

    async fn destroy_collection(&self, collection: &str) -> Result<()> {
        self.data.lock().unwrap().retain(|(c, _), _| c != collection);
        Ok(())
    }

    async fn destroy_store(&self) -> Result<()> {
        self.data.lock().unwrap().clear();
        Ok(())
    }
}
