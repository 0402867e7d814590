// SPDX-License-Identifier: MIT OR Apache-2.0
//! Local disk file-cache reference backend, backed by
//! `redb` — a durable, embedded, pure-Rust ACID key-value engine. One
//! `redb` table per collection, keyed by the sanitized key, valued by the
//! [`polystore_core::serialization::dump_json`] bytes of a `ManagedEntry`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use async_trait::async_trait;
use chrono::Utc;
use polystore_core::clock::{Clock, SystemClock};
use polystore_core::fanout;
use polystore_core::key::{validate_collection, validate_key};
use polystore_core::serialization::{dump_json, load_json};
use polystore_core::state::BaseStoreState;
use polystore_core::store::{Store, StoreAdmin, StoreValue, TtlSpec};
use polystore_core::{ErrorKind, ManagedEntry, Result, StoreError};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Configuration for [`FileStore`].
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Path to the `redb` database file.
    pub path: PathBuf,
    /// Collection used when a caller omits one.
    pub default_collection: String,
    /// Per-key length ceiling.
    pub max_key_length: usize,
    /// When `true`, missing parent directories of `path` are created at
    /// construction; when `false`, construction fails with
    /// [`ErrorKind::StoreSetupError`] if they are absent.
    pub create_dir_if_missing: bool,
    /// Soft cap on the database file's on-disk size. Enforced as a
    /// best-effort accounting check before each `put` rather than a hard
    /// `redb`-level limit.
    pub size_limit_bytes: Option<u64>,
    /// Enumeration page size.
    pub page_limit: usize,
}

impl FileStoreConfig {
    /// Starts from sane defaults for the given database file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            default_collection: "default_collection".to_string(),
            max_key_length: polystore_core::key::DEFAULT_MAX_KEY_LENGTH,
            create_dir_if_missing: true,
            size_limit_bytes: None,
            page_limit: 10_000,
        }
    }
}

/// The local disk file-cache reference `Store`.
#[derive(Debug)]
pub struct FileStore {
    db: Arc<redb::Database>,
    path: PathBuf,
    state: BaseStoreState,
    max_key_length: usize,
    size_limit_bytes: Option<u64>,
    page_limit: usize,
    clock: Arc<dyn Clock>,
}

impl FileStore {
    /// Opens (creating if absent) the `redb` database at `config.path`.
    pub async fn open(config: FileStoreConfig) -> Result<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock)).await
    }

    /// As [`FileStore::open`], but with an injectable [`Clock`].
    pub async fn open_with_clock(config: FileStoreConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        if config.create_dir_if_missing {
            if let Some(parent) = config.path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        StoreError::new(ErrorKind::StoreSetupError, "failed to create parent directory")
                            .with_context("path", parent.display().to_string())
                            .with_source(e)
                    })?;
                }
            }
        } else if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(StoreError::new(
                    ErrorKind::StoreSetupError,
                    "parent directory does not exist and create_dir_if_missing is false",
                )
                .with_context("path", parent.display().to_string()));
            }
        }

        let path = config.path.clone();
        let db = run_blocking(move || {
            redb::Database::create(&path).map_err(|e| {
                StoreError::new(ErrorKind::StoreSetupError, "failed to open redb database")
                    .with_context("path", path.display().to_string())
                    .with_source(e)
            })
        })
        .await?;

        Ok(Self {
            db: Arc::new(db),
            path: config.path,
            state: BaseStoreState::new(config.default_collection),
            max_key_length: config.max_key_length,
            size_limit_bytes: config.size_limit_bytes,
            page_limit: config.page_limit,
            clock,
        })
    }

    fn validate_args(&self, key: &str, collection: &str) -> Result<()> {
        validate_collection(collection)?;
        validate_key(key, self.max_key_length)?;
        Ok(())
    }

    fn check_size_limit(&self) -> Result<()> {
        let Some(limit) = self.size_limit_bytes else {
            return Ok(());
        };
        let size = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        if size > limit {
            return Err(StoreError::new(
                ErrorKind::StoreConnectionError,
                "file store size_limit_bytes exceeded",
            )
            .with_context("size_bytes", size)
            .with_context("size_limit_bytes", limit));
        }
        Ok(())
    }
}

/// Runs a blocking `redb` operation on the blocking thread pool, so the
/// async executor's worker threads are never blocked on disk I/O.
async fn run_blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        StoreError::new(ErrorKind::StoreConnectionError, "file store worker task panicked")
            .with_source(e)
    })?
}

fn table_def(collection: &str) -> redb::TableDefinition<'_, &str, &[u8]> {
    redb::TableDefinition::new(collection)
}

fn to_connection_error(context: &str, e: impl std::error::Error + Send + Sync + 'static) -> StoreError {
    StoreError::new(ErrorKind::StoreConnectionError, context).with_source(e)
}

fn get_raw(db: &redb::Database, collection: &str, key: &str) -> Result<Option<Vec<u8>>> {
    let txn = db
        .begin_read()
        .map_err(|e| to_connection_error("failed to begin redb read transaction", e))?;
    let table = match txn.open_table(table_def(collection)) {
        Ok(t) => t,
        Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
        Err(e) => return Err(to_connection_error("failed to open redb table", e)),
    };
    match table
        .get(key)
        .map_err(|e| to_connection_error("failed to read redb entry", e))?
    {
        Some(guard) => Ok(Some(guard.value().to_vec())),
        None => Ok(None),
    }
}

fn put_raw(db: &redb::Database, collection: &str, key: &str, bytes: &[u8]) -> Result<()> {
    let txn = db
        .begin_write()
        .map_err(|e| to_connection_error("failed to begin redb write transaction", e))?;
    {
        let mut table = txn
            .open_table(table_def(collection))
            .map_err(|e| to_connection_error("failed to open redb table", e))?;
        table
            .insert(key, bytes)
            .map_err(|e| to_connection_error("failed to write redb entry", e))?;
    }
    txn.commit()
        .map_err(|e| to_connection_error("failed to commit redb write transaction", e))?;
    Ok(())
}

fn delete_raw(db: &redb::Database, collection: &str, key: &str) -> Result<bool> {
    let txn = db
        .begin_write()
        .map_err(|e| to_connection_error("failed to begin redb write transaction", e))?;
    let existed = {
        match txn.open_table(table_def(collection)) {
            Ok(mut table) => table
                .remove(key)
                .map_err(|e| to_connection_error("failed to delete redb entry", e))?
                .is_some(),
            Err(redb::TableError::TableDoesNotExist(_)) => false,
            Err(e) => return Err(to_connection_error("failed to open redb table", e)),
        }
    };
    txn.commit()
        .map_err(|e| to_connection_error("failed to commit redb delete transaction", e))?;
    Ok(existed)
}

fn list_keys(db: &redb::Database, collection: &str, limit: usize, now: chrono::DateTime<Utc>) -> Result<Vec<String>> {
    let txn = db
        .begin_read()
        .map_err(|e| to_connection_error("failed to begin redb read transaction", e))?;
    let table = match txn.open_table(table_def(collection)) {
        Ok(t) => t,
        Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
        Err(e) => return Err(to_connection_error("failed to open redb table", e)),
    };
    let mut out = Vec::new();
    for row in table
        .iter()
        .map_err(|e| to_connection_error("failed to iterate redb table", e))?
    {
        let (key_guard, value_guard) = row.map_err(|e| to_connection_error("failed to read redb row", e))?;
        if out.len() >= limit {
            break;
        }
        let raw = std::str::from_utf8(value_guard.value())
            .map_err(|e| StoreError::new(ErrorKind::DeserializationError, "entry bytes are not UTF-8").with_source(e))?;
        let entry = load_json(raw, now)?;
        if !entry.is_expired(now) {
            out.push(key_guard.value().to_string());
        }
    }
    Ok(out)
}

fn list_collections(db: &redb::Database) -> Result<Vec<String>> {
    let txn = db
        .begin_read()
        .map_err(|e| to_connection_error("failed to begin redb read transaction", e))?;
    let names = txn
        .list_tables()
        .map_err(|e| to_connection_error("failed to list redb tables", e))?
        .map(|handle| handle.name().to_string())
        .collect();
    Ok(names)
}

#[async_trait]
impl Store for FileStore {
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<StoreValue>> {
        let collection = self.state.resolve_collection(collection).to_string();
        self.validate_args(key, &collection)?;
        let db = Arc::clone(&self.db);
        let key_owned = key.to_string();
        let now = self.clock.now();
        let raw = run_blocking(move || get_raw(&db, &collection, &key_owned)).await?;
        match raw {
            None => Ok(None),
            Some(bytes) => {
                let text = String::from_utf8(bytes).map_err(|e| {
                    StoreError::new(ErrorKind::DeserializationError, "entry bytes are not UTF-8").with_source(e)
                })?;
                let entry = load_json(&text, now)?;
                Ok((!entry.is_expired(now)).then_some(entry.value))
            }
        }
    }

    async fn get_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<Option<StoreValue>>> {
        fanout::get_many(self, keys, collection).await
    }

    async fn ttl(
        &self,
        key: &str,
        collection: Option<&str>,
    ) -> Result<(Option<StoreValue>, Option<f64>)> {
        let collection = self.state.resolve_collection(collection).to_string();
        self.validate_args(key, &collection)?;
        let db = Arc::clone(&self.db);
        let key_owned = key.to_string();
        let now = self.clock.now();
        let raw = run_blocking(move || get_raw(&db, &collection, &key_owned)).await?;
        match raw {
            None => Ok((None, None)),
            Some(bytes) => {
                let text = String::from_utf8(bytes).map_err(|e| {
                    StoreError::new(ErrorKind::DeserializationError, "entry bytes are not UTF-8").with_source(e)
                })?;
                let entry: ManagedEntry = load_json(&text, now)?;
                if entry.is_expired(now) {
                    Ok((None, None))
                } else {
                    let remaining = entry.remaining_ttl_secs(now);
                    Ok((Some(entry.value), remaining))
                }
            }
        }
    }

    async fn ttl_many(
        &self,
        keys: &[String],
        collection: Option<&str>,
    ) -> Result<Vec<(Option<StoreValue>, Option<f64>)>> {
        fanout::ttl_many(self, keys, collection).await
    }

    async fn put(
        &self,
        key: &str,
        value: StoreValue,
        collection: Option<&str>,
        ttl: Option<f64>,
    ) -> Result<()> {
        let collection = self.state.resolve_collection(collection).to_string();
        self.validate_args(key, &collection)?;
        self.check_size_limit()?;
        let entry = ManagedEntry::new(value, ttl, self.clock.as_ref())?;
        let bytes = dump_json(&entry).into_bytes();
        let db = Arc::clone(&self.db);
        let key_owned = key.to_string();
        run_blocking(move || put_raw(&db, &collection, &key_owned, &bytes)).await?;
        debug!(target: "polystore.backend.file", key, "put");
        Ok(())
    }

    async fn put_many(
        &self,
        keys: &[String],
        values: Vec<StoreValue>,
        collection: Option<&str>,
        ttl: TtlSpec,
    ) -> Result<()> {
        fanout::put_many(self, keys, values, collection, ttl).await
    }

    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<bool> {
        let collection = self.state.resolve_collection(collection).to_string();
        self.validate_args(key, &collection)?;
        let db = Arc::clone(&self.db);
        let key_owned = key.to_string();
        run_blocking(move || delete_raw(&db, &collection, &key_owned)).await
    }

    async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> Result<usize> {
        fanout::delete_many(self, keys, collection).await
    }
}

#[async_trait]
impl StoreAdmin for FileStore {
    async fn enumerate_keys(
        &self,
        collection: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<String>> {
        let collection = self.state.resolve_collection(collection).to_string();
        let limit = limit.unwrap_or(self.page_limit);
        let db = Arc::clone(&self.db);
        let now = self.clock.now();
        run_blocking(move || list_keys(&db, &collection, limit, now)).await
    }

    async fn enumerate_collections(&self, limit: Option<usize>) -> Result<Vec<String>> {
        let limit = limit.unwrap_or(self.page_limit);
        let db = Arc::clone(&self.db);
        let names = run_blocking(move || list_collections(&db)).await?;
        Ok(names.into_iter().take(limit).collect())
    }

    async fn destroy_collection(&self, collection: &str) -> Result<()> {
        validate_collection(collection)?;
        let db = Arc::clone(&self.db);
        let collection = collection.to_string();
        run_blocking(move || {
            let txn = db
                .begin_write()
                .map_err(|e| to_connection_error("failed to begin redb write transaction", e))?;
            txn.delete_table(table_def(&collection))
                .map_err(|e| to_connection_error("failed to delete redb table", e))?;
            txn.commit()
                .map_err(|e| to_connection_error("failed to commit redb delete transaction", e))?;
            Ok(())
        })
        .await
    }

    async fn destroy_store(&self) -> Result<()> {
        let db = Arc::clone(&self.db);
        run_blocking(move || {
            let names = list_collections(&db)?;
            let txn = db
                .begin_write()
                .map_err(|e| to_connection_error("failed to begin redb write transaction", e))?;
            for name in names {
                txn.delete_table(table_def(&name))
                    .map_err(|e| to_connection_error("failed to delete redb table", e))?;
            }
            txn.commit()
                .map_err(|e| to_connection_error("failed to commit redb delete transaction", e))?;
            Ok(())
        })
        .await
    }
}
