//! Synchronization with the Aro server.
//!
//! - **Push**: [`SyncEngine`] flushes dirty collections (workouts are
//!   deleted and re-created, everything else is upserted)
//! - **Pull**: [`Paginator`] performs the initial load and fetches further
//!   pages into the cache
//! - **Triggers**: [`LifecycleMonitor`] and [`Debouncer`] decide when to flush
//! - **Transport**: [`Remote`] is the server contract, [`HttpRemote`] the
//!   reqwest implementation
//!
//! Remote failures are retried per [`RetryPolicy`], then reported on the
//! [`EventBus`] rather than returned; the affected dirty marks stay set.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use aro::storage::StoreHandle;
//! use aro::sync::{HttpRemote, SyncEngine};
//!
//! let store = StoreHandle::default();
//! let engine = SyncEngine::new(store.clone(), Arc::new(HttpRemote::new(url)));
//! for (kind, outcome) in engine.flush_all().await {
//!     println!("{kind}: {outcome:?}");
//! }
//! ```

mod engine;
mod events;
mod http;
mod lifecycle;
mod pagination;
mod remote;
mod retry;

#[cfg(test)]
mod mock;

pub use engine::{sync_group, FlushOutcome, FlushReport, SyncEngine, SYNC_ORDER};
pub use events::{EventBus, SyncEvent};
pub use http::HttpRemote;
pub use lifecycle::{AppState, Debouncer, LifecycleEvent, LifecycleMonitor, DEFAULT_DEBOUNCE};
pub use pagination::{FetchOutcome, Paginator};
pub use remote::{
    Credentials, NewWorkout, PagePayload, PageRequest, PageResponse, PeriodDayMark, Remote,
    RemoteError, RemoteResult, Tombstoned,
};
pub use retry::{Exhausted, RetryPolicy};
