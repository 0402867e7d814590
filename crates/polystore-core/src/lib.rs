// SPDX-License-Identifier: MIT OR Apache-2.0
//! Core data model and contract for polystore: [`entry::ManagedEntry`],
//! the [`serialization`] pipeline, TTL/time and key-sanitization
//! utilities, and the [`store::Store`] contract every backend and wrapper
//! implements.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod entry;
pub mod fanout;
pub mod key;
pub mod sanitize;
pub mod serialization;
pub mod state;
pub mod store;
pub mod ttl;

pub use entry::ManagedEntry;
pub use polystore_error::{ErrorCategory, ErrorKind, Result, StoreError};
pub use store::{Store, StoreAdmin, StoreValue, TtlSpec};
