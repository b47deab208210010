//! Observable sync outcomes.
//!
//! Flushes and fetches never return remote errors to their caller. What
//! happened is published here instead, for a UI or a log sink to consume.

use tokio::sync::broadcast;

use crate::model::CollectionKind;

/// Buffered events per subscriber before the oldest are dropped.
const CHANNEL_CAPACITY: usize = 64;

/// One sync outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A flush pushed `upserted` changes and `deleted` removals.
    Flushed {
        kind: CollectionKind,
        upserted: usize,
        deleted: usize,
    },
    /// A flush gave up; the dirty marks are still in place.
    FlushFailed {
        kind: CollectionKind,
        error: String,
        attempts: u32,
    },
    /// A page was fetched and merged into the cache.
    Fetched {
        kind: CollectionKind,
        page: u32,
        received: usize,
        has_more: bool,
    },
    FetchFailed {
        kind: CollectionKind,
        error: String,
    },
}

/// Broadcast sender shared by the engine and the paginator.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn emit(&self, event: SyncEvent) {
        let _ = self.tx.send(event);
    }
}
