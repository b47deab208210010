//! Local-first storage layer for Aro.
//!
//! This module provides:
//! - A merge-on-write entity cache with explicit collection kinds
//! - Versioned dirty tracking for sync
//! - Per-collection pagination cursors
//! - Snapshot persistence to SQLite
//!
//! # Submodules
//!
//! - [`collection`] - Generic keyed collections with merge semantics
//! - [`cursor`] - Pagination cursors
//! - [`dirty`] - Dirty sets and flags
//! - [`persist`] - Key-value snapshot persistence
//! - [`schema`] - Database schema definitions
//! - [`store`] - The entity cache and its shared handle

pub mod collection;
pub mod cursor;
pub mod dirty;
pub mod persist;
pub mod schema;
pub mod store;

pub use collection::{Collection, Mergeable};
pub use cursor::{Cursors, PaginationCursor};
pub use dirty::{DirtyFlag, DirtySet, DirtySnapshot};
pub use persist::{KeyValueStore, MemoryKv, Persister, SqliteKv};
pub use store::{DirtyState, Origin, Reconciled, Store, StoreHandle};
