// SPDX-License-Identifier: MIT OR Apache-2.0
//! Envelope-encrypts stored values at rest with AES-256-GCM, supporting
//! multi-key rotation.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use polystore_core::{ErrorKind, Result, Store, StoreError, StoreValue, TtlSpec};
use serde_json::Value;
use std::sync::Arc;

const DATA_FIELD: &str = "__encrypted_data__";
const VERSION_FIELD: &str = "__encryption_version__";
const ENCRYPTION_VERSION: u64 = 1;

/// What to do when decrypting a stored envelope fails (key rotated out,
/// corrupted ciphertext).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptionErrorPolicy {
    /// Return the raw envelope as-is instead of raising.
    Lenient,
    /// Raise [`ErrorKind::DecryptionError`].
    Strict,
}

/// Configuration for [`Encryption`].
#[derive(Clone)]
pub struct EncryptionConfig {
    /// 32-byte AES-256 keys, newest first. New writes always use `keys[0]`.
    pub keys: Vec<[u8; 32]>,
    /// Behavior when none of `keys` can decrypt a stored envelope.
    pub on_decrypt_error: DecryptionErrorPolicy,
}

impl std::fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("keys", &format!("<{} key(s)>", self.keys.len()))
            .field("on_decrypt_error", &self.on_decrypt_error)
            .finish()
    }
}

/// Wraps a [`Store`], encrypting every value at rest and decrypting on
/// read. Keys are tried newest-first on decrypt so a rotated-out key
/// still reads entries written before the rotation.
#[derive(Debug)]
pub struct Encryption {
    inner: Arc<dyn Store>,
    config: EncryptionConfig,
}

impl Encryption {
    /// Wraps `inner` with the given key material. `config.keys` must be
    /// non-empty.
    #[must_use]
    pub fn new(inner: Arc<dyn Store>, config: EncryptionConfig) -> Self {
        assert!(!config.keys.is_empty(), "Encryption requires at least one key");
        Self { inner, config }
    }

    fn encrypt(&self, value: StoreValue) -> Result<StoreValue> {
        let plaintext = serde_json::to_vec(&Value::Object(value))
            .map_err(|e| StoreError::new(ErrorKind::EncryptionError, e.to_string()))?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.config.keys[0]));
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_ref())
            .map_err(|_| StoreError::new(ErrorKind::EncryptionError, "AEAD encryption failed"))?;
        let mut payload = nonce.to_vec();
        payload.extend_from_slice(&ciphertext);

        let mut envelope = serde_json::Map::new();
        envelope.insert(DATA_FIELD.to_string(), Value::from(BASE64.encode(payload)));
        envelope.insert(VERSION_FIELD.to_string(), Value::from(ENCRYPTION_VERSION));
        Ok(envelope)
    }

    fn decrypt(&self, value: StoreValue) -> Result<Option<StoreValue>> {
        let Some(Value::String(encoded)) = value.get(DATA_FIELD) else {
            return Ok(Some(value));
        };
        if let Some(version) = value.get(VERSION_FIELD).and_then(Value::as_u64) {
            if version > ENCRYPTION_VERSION {
                return Err(StoreError::new(
                    ErrorKind::EncryptionVersionError,
                    "envelope encryption version is newer than this wrapper supports",
                )
                .with_context("envelope_version", version)
                .with_context("supported_version", ENCRYPTION_VERSION));
            }
        }
        let raw = match BASE64.decode(encoded.as_bytes()) {
            Ok(raw) => raw,
            Err(_) => return self.on_decrypt_failure(value),
        };
        if raw.len() < 12 {
            return self.on_decrypt_failure(value);
        }
        let (nonce_bytes, ciphertext) = raw.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        for key in &self.config.keys {
            let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
            if let Ok(plaintext) = cipher.decrypt(nonce, ciphertext) {
                let decoded: Value = serde_json::from_slice(&plaintext)
                    .map_err(|e| StoreError::new(ErrorKind::DecryptionError, e.to_string()))?;
                return Ok(decoded.as_object().cloned());
            }
        }
        self.on_decrypt_failure(value)
    }

    fn on_decrypt_failure(&self, envelope: StoreValue) -> Result<Option<StoreValue>> {
        match self.config.on_decrypt_error {
            DecryptionErrorPolicy::Lenient => Ok(Some(envelope)),
            DecryptionErrorPolicy::Strict => {
                Err(StoreError::new(ErrorKind::DecryptionError, "no configured key could decrypt this entry"))
            }
        }
    }
}

#[async_trait]
impl Store for Encryption {
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<StoreValue>> {
        match self.inner.get(key, collection).await? {
            Some(value) => self.decrypt(value),
            None => Ok(None),
        }
    }

    async fn get_many(&self, keys: &[String], collection: Option<&str>) -> Result<Vec<Option<StoreValue>>> {
        let raw = self.inner.get_many(keys, collection).await?;
        raw.into_iter()
            .map(|v| match v {
                Some(value) => self.decrypt(value),
                None => Ok(None),
            })
            .collect()
    }

    async fn ttl(&self, key: &str, collection: Option<&str>) -> Result<(Option<StoreValue>, Option<f64>)> {
        let (value, ttl) = self.inner.ttl(key, collection).await?;
        let decrypted = match value {
            Some(value) => self.decrypt(value)?,
            None => None,
        };
        let ttl = if decrypted.is_some() { ttl } else { None };
        Ok((decrypted, ttl))
    }

    async fn ttl_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<(Option<StoreValue>, Option<f64>)>> {
        let raw = self.inner.ttl_many(keys, collection).await?;
        raw.into_iter()
            .map(|(value, ttl)| {
                let decrypted = match value {
                    Some(value) => self.decrypt(value)?,
                    None => None,
                };
                let ttl = if decrypted.is_some() { ttl } else { None };
                Ok((decrypted, ttl))
            })
            .collect()
    }

    async fn put(&self, key: &str, value: StoreValue, collection: Option<&str>, ttl: Option<f64>) -> Result<()> {
        self.inner.put(key, self.encrypt(value)?, collection, ttl).await
    }

    async fn put_many(
        &self,
        keys: &[String],
        values: Vec<StoreValue>,
        collection: Option<&str>,
        ttl: TtlSpec,
    ) -> Result<()> {
        let encrypted = values
            .into_iter()
            .map(|v| self.encrypt(v))
            .collect::<Result<Vec<_>>>()?;
        self.inner.put_many(keys, encrypted, collection, ttl).await
    }

    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<bool> {
        self.inner.delete(key, collection).await
    }

    async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> Result<usize> {
        self.inner.delete_many(keys, collection).await
    }
}
