//! Flush triggers: app lifecycle transitions and debounced edits.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use super::engine::{FlushOutcome, SyncEngine};
use super::remote::Remote;
use crate::model::CollectionKind;

/// Quiet period after the last edit before a debounced flush fires.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(10);

/// Foreground state reported by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Active,
    Inactive,
    Background,
}

/// A lifecycle signal from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    AppState(AppState),
    PageHidden,
    PageVisible,
    Unload,
}

/// Tracks the foreground state and decides which signals warrant a flush.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleMonitor {
    state: AppState,
}

impl Default for LifecycleMonitor {
    fn default() -> Self {
        Self {
            state: AppState::Active,
        }
    }
}

impl LifecycleMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> AppState {
        self.state
    }

    /// Record `event`. Returns true when it should trigger a full flush:
    /// leaving the foreground, hiding the page, or unloading.
    pub fn observe(&mut self, event: LifecycleEvent) -> bool {
        match event {
            LifecycleEvent::AppState(next) => {
                let leaving = self.state == AppState::Active && next != AppState::Active;
                self.state = next;
                leaving
            }
            LifecycleEvent::PageHidden | LifecycleEvent::Unload => true,
            LifecycleEvent::PageVisible => false,
        }
    }
}

impl<R: Remote> SyncEngine<R> {
    /// Feed a lifecycle event through `monitor` and flush everything if it
    /// is a trigger.
    pub async fn on_lifecycle(
        &self,
        monitor: &mut LifecycleMonitor,
        event: LifecycleEvent,
    ) -> Option<Vec<(CollectionKind, FlushOutcome)>> {
        if !monitor.observe(event) {
            return None;
        }
        debug!(?event, "Lifecycle flush");
        Some(self.flush_all().await)
    }
}

enum Signal {
    Cancel,
    FlushNow,
}

struct Pending {
    signal: oneshot::Sender<Signal>,
    task: JoinHandle<bool>,
}

/// Coalesces bursts of edits into one `flush_all` after a quiet period.
///
/// Each [`trigger`](Self::trigger) restarts the timer. A pending flush is
/// never lost: [`teardown`](Self::teardown) runs it immediately, and
/// dropping the debouncer starts it in the background.
pub struct Debouncer<R: Remote + 'static> {
    engine: Arc<SyncEngine<R>>,
    delay: Duration,
    pending: Option<Pending>,
}

impl<R: Remote + 'static> Debouncer<R> {
    pub fn new(engine: Arc<SyncEngine<R>>, delay: Duration) -> Self {
        Self {
            engine,
            delay,
            pending: None,
        }
    }

    /// (Re)start the timer. Must be called inside a tokio runtime.
    pub fn trigger(&mut self) {
        if let Some(previous) = self.pending.take() {
            // Fails harmlessly if the previous timer already fired.
            let _ = previous.signal.send(Signal::Cancel);
        }

        let (tx, rx) = oneshot::channel();
        let engine = Arc::clone(&self.engine);
        let delay = self.delay;
        let task = tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                signal = rx => {
                    // A dropped sender means the debouncer went away: flush now.
                    if let Ok(Signal::Cancel) = signal {
                        return false;
                    }
                }
            }
            engine.flush_all().await;
            true
        });
        self.pending = Some(Pending { signal: tx, task });
    }

    /// Whether a triggered flush has not finished yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| !p.task.is_finished())
    }

    /// Run any pending flush now and wait for it. Returns true if a flush ran.
    pub async fn teardown(mut self) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        let _ = pending.signal.send(Signal::FlushNow);
        pending.task.await.unwrap_or(false)
    }
}
