//! annal - SQL-backed event store
//!
//! Persists append-only domain-event streams into relational tables,
//! presenting an event-store abstraction (create stream, append events,
//! read events, delete stream) over PostgreSQL or MySQL. Streams map to
//! physical tables through pluggable layout strategies; appends are
//! guarded by per-driver write locks; raw driver errors are classified
//! into a stable fault taxonomy before they reach callers.

pub mod backend;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod error;
pub mod event;
pub mod factory;
pub mod layout;
pub mod loader;
pub mod lock;
pub mod schema;
pub mod store;
pub mod stream;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{Result, StoreError};
pub use store::{Direction, EventStore, QueryFilter, TransactionalStore};
pub use stream::{Stream, StreamName};
