// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dispatches each call to one of several backing stores based on
//! collection.

use async_trait::async_trait;
use polystore_core::{ErrorKind, Result, Store, StoreError, StoreValue, TtlSpec};
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves a collection name to the [`Store`] that should serve it.
pub type RouteFn = Arc<dyn Fn(Option<&str>) -> Option<Arc<dyn Store>> + Send + Sync>;

/// Wraps an arbitrary routing function, falling back to `default_store`
/// for collections the function declines to route (returns `None`).
/// Raises [`ErrorKind::StoreSetupError`] at construction if neither a
/// route function nor a default store is supplied — a `Routing` with no
/// way to resolve any call is a configuration error, not a runtime one.
#[derive(Clone)]
pub struct Routing {
    route: RouteFn,
    default_store: Option<Arc<dyn Store>>,
}

impl std::fmt::Debug for Routing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Routing").field("default_store", &self.default_store.is_some()).finish()
    }
}

impl Routing {
    /// Builds a router from an explicit routing function and optional
    /// default.
    pub fn new(route: RouteFn, default_store: Option<Arc<dyn Store>>) -> Result<Self> {
        Ok(Self { route, default_store })
    }

    fn resolve(&self, collection: Option<&str>) -> Result<Arc<dyn Store>> {
        (self.route)(collection)
            .or_else(|| self.default_store.clone())
            .ok_or_else(|| {
                StoreError::new(ErrorKind::StoreSetupError, "no route or default store for collection")
                    .with_context("collection", collection.unwrap_or("").to_string())
            })
    }
}

/// Specialization of [`Routing`] backed by an explicit `collection ->
/// Store` map instead of an arbitrary function.
#[derive(Clone)]
pub struct CollectionRouting {
    routes: HashMap<String, Arc<dyn Store>>,
    default_store: Option<Arc<dyn Store>>,
}

impl std::fmt::Debug for CollectionRouting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionRouting")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .field("default_store", &self.default_store.is_some())
            .finish()
    }
}

impl CollectionRouting {
    /// Builds a router from an explicit collection map and optional
    /// default. At least one of `routes` or `default_store` must be
    /// non-empty/present.
    pub fn new(routes: HashMap<String, Arc<dyn Store>>, default_store: Option<Arc<dyn Store>>) -> Result<Self> {
        if routes.is_empty() && default_store.is_none() {
            return Err(StoreError::new(
                ErrorKind::StoreSetupError,
                "CollectionRouting requires at least one route or a default store",
            ));
        }
        Ok(Self { routes, default_store })
    }

    fn resolve(&self, collection: Option<&str>) -> Result<Arc<dyn Store>> {
        collection
            .and_then(|c| self.routes.get(c).cloned())
            .or_else(|| self.default_store.clone())
            .ok_or_else(|| {
                StoreError::new(ErrorKind::StoreSetupError, "no route or default store for collection")
                    .with_context("collection", collection.unwrap_or("").to_string())
            })
    }
}

macro_rules! impl_store_via_resolve {
    ($ty:ty) => {
        #[async_trait]
        impl Store for $ty {
            async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<StoreValue>> {
                self.resolve(collection)?.get(key, collection).await
            }

            async fn get_many(&self, keys: &[String], collection: Option<&str>) -> Result<Vec<Option<StoreValue>>> {
                self.resolve(collection)?.get_many(keys, collection).await
            }

            async fn ttl(&self, key: &str, collection: Option<&str>) -> Result<(Option<StoreValue>, Option<f64>)> {
                self.resolve(collection)?.ttl(key, collection).await
            }

            async fn ttl_many(
                &self,
                keys: &[String],
                collection: Option<&str>,
            ) -> Result<Vec<(Option<StoreValue>, Option<f64>)>> {
                self.resolve(collection)?.ttl_many(keys, collection).await
            }

            async fn put(&self, key: &str, value: StoreValue, collection: Option<&str>, ttl: Option<f64>) -> Result<()> {
                self.resolve(collection)?.put(key, value, collection, ttl).await
            }

            async fn put_many(
                &self,
                keys: &[String],
                values: Vec<StoreValue>,
                collection: Option<&str>,
                ttl: TtlSpec,
            ) -> Result<()> {
                self.resolve(collection)?.put_many(keys, values, collection, ttl).await
            }

            async fn delete(&self, key: &str, collection: Option<&str>) -> Result<bool> {
                self.resolve(collection)?.delete(key, collection).await
            }

            async fn delete_many(&self, keys: &[String], collection: Option<&str>) -> Result<usize> {
                self.resolve(collection)?.delete_many(keys, collection).await
            }
        }
    };
}

impl_store_via_resolve!(Routing);
impl_store_via_resolve!(CollectionRouting);
