//! Push-side synchronization.
//!
//! Each collection is flushed independently: snapshot the dirty marks,
//! send the changes, then clear only the marks that were not re-marked
//! while the request was in flight. Remote failures are logged and
//! published as [`SyncEvent::FlushFailed`]; they never propagate to the
//! caller, and the dirty marks stay in place for the next trigger.
//!
//! Workouts are not updated in place on the server. A changed workout is
//! deleted and re-created, and the server-assigned id replaces the local
//! one in the cache.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use super::events::{EventBus, SyncEvent};
use super::remote::{NewWorkout, PeriodDayMark, Remote, RemoteError};
use super::retry::{Exhausted, RetryPolicy};
use crate::model::{is_local_id, CollectionKind, Tag, TagId, TaggedDate, WeightEntry, WorkoutId};
use crate::storage::StoreHandle;

/// Collections in the order `flush_all` pushes them. Tags go before
/// tagged dates so freshly assigned tag ids are in place first.
pub const SYNC_ORDER: [CollectionKind; 6] = [
    CollectionKind::Settings,
    CollectionKind::Tags,
    CollectionKind::TaggedDates,
    CollectionKind::Workouts,
    CollectionKind::WeightEntries,
    CollectionKind::PeriodDays,
];

/// Templates share the workout collection and its dirty set.
#[must_use]
pub const fn sync_group(kind: CollectionKind) -> CollectionKind {
    match kind {
        CollectionKind::Templates => CollectionKind::Workouts,
        other => other,
    }
}

/// What one successful flush pushed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub upserted: usize,
    pub deleted: usize,
    /// Changes held back until a dependency syncs (tagged dates on local tags).
    pub deferred: usize,
}

/// Result of one flush trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was dirty.
    Clean,
    /// Another flush of the same collection is running; this one was dropped.
    InFlight,
    NotLoggedIn,
    Flushed(FlushReport),
    Failed { error: RemoteError, attempts: u32 },
}

impl FlushOutcome {
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

type FlushResult = Result<Option<FlushReport>, Exhausted>;

/// Releases a collection's in-flight latch when dropped.
struct FlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<CollectionKind>>,
    kind: CollectionKind,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.kind);
    }
}

/// Pushes dirty collections to a [`Remote`].
pub struct SyncEngine<R: Remote> {
    store: StoreHandle,
    remote: Arc<R>,
    retry: RetryPolicy,
    events: EventBus,
    in_flight: Mutex<HashSet<CollectionKind>>,
}

impl<R: Remote> SyncEngine<R> {
    pub fn new(store: StoreHandle, remote: Arc<R>) -> Self {
        Self {
            store,
            remote,
            retry: RetryPolicy::default(),
            events: EventBus::new(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    #[must_use]
    pub const fn store(&self) -> &StoreHandle {
        &self.store
    }

    fn try_begin(&self, kind: CollectionKind) -> Option<FlightGuard<'_>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(kind) {
            return None;
        }
        Some(FlightGuard {
            in_flight: &self.in_flight,
            kind,
        })
    }

    /// Push every dirty collection, one after another, in [`SYNC_ORDER`].
    pub async fn flush_all(&self) -> Vec<(CollectionKind, FlushOutcome)> {
        let mut outcomes = Vec::with_capacity(SYNC_ORDER.len());
        for kind in SYNC_ORDER {
            outcomes.push((kind, self.flush(kind).await));
        }
        outcomes
    }

    /// Push one collection's dirty entities.
    pub async fn flush(&self, kind: CollectionKind) -> FlushOutcome {
        let kind = sync_group(kind);
        let Some(_guard) = self.try_begin(kind) else {
            debug!(%kind, "Flush already in flight, skipping");
            return FlushOutcome::InFlight;
        };

        let Some(token) = self.store.read(|s| s.token().map(str::to_owned)) else {
            debug!(%kind, "Not logged in, skipping flush");
            return FlushOutcome::NotLoggedIn;
        };

        let result = match kind {
            CollectionKind::Settings => self.flush_settings(&token).await,
            CollectionKind::Tags => self.flush_tags(&token).await,
            CollectionKind::TaggedDates => self.flush_tagged_dates(&token).await,
            CollectionKind::Workouts | CollectionKind::Templates => {
                self.flush_workouts(&token).await
            }
            CollectionKind::WeightEntries => self.flush_weight_entries(&token).await,
            CollectionKind::PeriodDays => self.flush_period_days(&token).await,
        };

        match result {
            Ok(None) => FlushOutcome::Clean,
            Ok(Some(report)) => {
                info!(
                    %kind,
                    upserted = report.upserted,
                    deleted = report.deleted,
                    deferred = report.deferred,
                    "Flushed"
                );
                self.events.emit(SyncEvent::Flushed {
                    kind,
                    upserted: report.upserted,
                    deleted: report.deleted,
                });
                FlushOutcome::Flushed(report)
            }
            Err(Exhausted { error, attempts }) => {
                warn!(%kind, attempts, error = %error, "Flush failed, changes stay dirty");
                self.events.emit(SyncEvent::FlushFailed {
                    kind,
                    error: error.to_string(),
                    attempts,
                });
                FlushOutcome::Failed { error, attempts }
            }
        }
    }

    async fn flush_settings(&self, token: &str) -> FlushResult {
        let (version, settings) = self
            .store
            .read(|s| (s.dirty().settings.snapshot(), s.settings().clone()));
        let Some(version) = version else {
            return Ok(None);
        };

        self.retry
            .run("update settings", || self.remote.update_settings(token, &settings))
            .await?;

        self.store
            .write(|s| s.dirty_mut().settings.clear(version));
        Ok(Some(FlushReport {
            upserted: 1,
            ..FlushReport::default()
        }))
    }

    async fn flush_tags(&self, token: &str) -> FlushResult {
        let (snapshot, pending, delete_ids) = self.store.read(|s| {
            let snapshot = s.dirty().tags.snapshot();
            let pending: Vec<(TagId, u64, Tag)> = snapshot
                .changed
                .iter()
                .filter_map(|(id, v)| s.tag(*id).map(|t| (*id, *v, t.clone())))
                .collect();
            let delete_ids: Vec<TagId> = snapshot
                .removed
                .iter()
                .map(|(id, _)| *id)
                .filter(|id| !is_local_id(*id) && s.tag(*id).is_none())
                .collect();
            (snapshot, pending, delete_ids)
        });
        if snapshot.is_empty() {
            return Ok(None);
        }

        if !delete_ids.is_empty() {
            self.retry
                .run("delete tags", || self.remote.delete_tags(token, &delete_ids))
                .await?;
        }

        let saved = if pending.is_empty() {
            Vec::new()
        } else {
            let payload: Vec<Tag> = pending.iter().map(|(_, _, t)| t.clone()).collect();
            let saved = self
                .retry
                .run("upsert tags", || self.remote.upsert_tags(token, &payload))
                .await?;
            ensure_count("tags", payload.len(), saved.len())?;
            saved
        };

        self.store.write(|s| {
            for ((old_id, version, _), tag) in pending.iter().zip(saved) {
                s.reconcile_saved_tag(*old_id, *version, tag);
            }
            let dirty = &mut s.dirty_mut().tags;
            for (id, version) in &snapshot.removed {
                dirty.clear_removed(id, *version);
            }
            for (id, version) in &snapshot.changed {
                if !pending.iter().any(|(p, ..)| p == id) {
                    dirty.clear_changed(id, *version);
                }
            }
        });

        Ok(Some(FlushReport {
            upserted: pending.len(),
            deleted: delete_ids.len(),
            deferred: 0,
        }))
    }

    async fn flush_tagged_dates(&self, token: &str) -> FlushResult {
        let (snapshot, ready, deferred) = self.store.read(|s| {
            let snapshot = s.dirty().tagged_dates.snapshot();
            let (ready, deferred): (Vec<TaggedDate>, Vec<TaggedDate>) = snapshot
                .changed
                .iter()
                .filter_map(|(date, _)| s.tagged_date(date).cloned())
                .partition(|d| !d.tag_ids.iter().any(|&id| is_local_id(id)));
            (snapshot, ready, deferred)
        });
        if snapshot.is_empty() {
            return Ok(None);
        }
        if !deferred.is_empty() {
            debug!(count = deferred.len(), "Holding back tagged dates that reference unsynced tags");
        }

        if !ready.is_empty() {
            self.retry
                .run("upsert tagged dates", || {
                    self.remote.upsert_tagged_dates(token, &ready)
                })
                .await?;
        }

        self.store.write(|s| {
            let dirty = &mut s.dirty_mut().tagged_dates;
            for (date, version) in &snapshot.changed {
                if !deferred.iter().any(|d| &d.date == date) {
                    dirty.clear_changed(date, *version);
                }
            }
            for (date, version) in &snapshot.removed {
                dirty.clear_removed(date, *version);
            }
        });

        Ok(Some(FlushReport {
            upserted: ready.len(),
            deleted: 0,
            deferred: deferred.len(),
        }))
    }

    async fn flush_workouts(&self, token: &str) -> FlushResult {
        let (snapshot, pending, delete_ids) = self.store.read(|s| {
            let snapshot = s.dirty().workouts.snapshot();
            let pending: Vec<(WorkoutId, u64, NewWorkout)> = snapshot
                .changed
                .iter()
                .filter_map(|(id, v)| s.workout(*id).map(|w| (*id, *v, NewWorkout::from(w))))
                .collect();
            let removed = snapshot
                .removed
                .iter()
                .map(|(id, _)| *id)
                .filter(|id| s.workout(*id).is_none());
            let delete_ids: Vec<WorkoutId> = pending
                .iter()
                .map(|(id, ..)| *id)
                .chain(removed)
                .filter(|id| !is_local_id(*id))
                .collect();
            (snapshot, pending, delete_ids)
        });
        if snapshot.is_empty() {
            return Ok(None);
        }

        // A failed delete aborts before anything is re-created.
        if !delete_ids.is_empty() {
            self.retry
                .run("delete workouts", || {
                    self.remote.delete_workouts(token, &delete_ids)
                })
                .await?;
        }

        let created = if pending.is_empty() {
            Vec::new()
        } else {
            let payload: Vec<NewWorkout> = pending.iter().map(|(_, _, w)| w.clone()).collect();
            let created = self
                .retry
                .run("create workouts", || {
                    self.remote.create_workouts(token, &payload)
                })
                .await?;
            ensure_count("workouts", payload.len(), created.len())?;
            created
        };

        self.store.write(|s| {
            for ((old_id, version, _), workout) in pending.iter().zip(created) {
                s.reconcile_created_workout(*old_id, *version, workout);
            }
            let dirty = &mut s.dirty_mut().workouts;
            for (id, version) in &snapshot.removed {
                dirty.clear_removed(id, *version);
            }
            for (id, version) in &snapshot.changed {
                if !pending.iter().any(|(p, ..)| p == id) {
                    dirty.clear_changed(id, *version);
                }
            }
        });

        Ok(Some(FlushReport {
            upserted: pending.len(),
            deleted: delete_ids.len(),
            deferred: 0,
        }))
    }

    async fn flush_weight_entries(&self, token: &str) -> FlushResult {
        let (snapshot, entries) = self.store.read(|s| {
            let snapshot = s.dirty().weight_entries.snapshot();
            let entries: Vec<WeightEntry> = snapshot
                .changed
                .iter()
                .filter_map(|(date, _)| s.weight_entry(date).cloned())
                .collect();
            (snapshot, entries)
        });
        if snapshot.is_empty() {
            return Ok(None);
        }

        if !entries.is_empty() {
            self.retry
                .run("upsert weight entries", || {
                    self.remote.upsert_weight_entries(token, &entries)
                })
                .await?;
        }

        self.store
            .write(|s| s.dirty_mut().weight_entries.clear_flushed(&snapshot));
        Ok(Some(FlushReport {
            upserted: entries.len(),
            ..FlushReport::default()
        }))
    }

    async fn flush_period_days(&self, token: &str) -> FlushResult {
        let (snapshot, marks) = self.store.read(|s| {
            let snapshot = s.dirty().period_days.snapshot();
            let mut marks: Vec<PeriodDayMark> = Vec::new();
            for (date, _) in snapshot.changed.iter().chain(&snapshot.removed) {
                if marks.iter().any(|m| &m.date == date) {
                    continue;
                }
                marks.push(PeriodDayMark {
                    date: date.clone(),
                    marked: s.is_period_day(date),
                });
            }
            (snapshot, marks)
        });
        if snapshot.is_empty() {
            return Ok(None);
        }

        self.retry
            .run("set period days", || self.remote.set_period_days(token, &marks))
            .await?;

        self.store
            .write(|s| s.dirty_mut().period_days.clear_flushed(&snapshot));
        let unmarked = marks.iter().filter(|m| !m.marked).count();
        Ok(Some(FlushReport {
            upserted: marks.len() - unmarked,
            deleted: unmarked,
            deferred: 0,
        }))
    }
}

fn ensure_count(what: &str, sent: usize, received: usize) -> Result<(), Exhausted> {
    if sent == received {
        return Ok(());
    }
    Err(Exhausted {
        error: RemoteError::MissingResult(format!(
            "sent {sent} {what}, server returned {received}"
        )),
        attempts: 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Exercise, ExercisePatch, ExerciseType, SettingsPatch, TagPatch, Workout, WorkoutPatch,
    };
    use crate::storage::{Origin, Store};
    use crate::sync::mock::{Call, MockRemote};

    fn logged_in_store() -> StoreHandle {
        let mut store = Store::new();
        store.set_token(Some("jwt".into()));
        StoreHandle::new(store)
    }

    fn seed_workout(handle: &StoreHandle, id: WorkoutId) {
        let mut w = Workout::record(id, "2024-05-01");
        w.exercises = vec![Exercise {
            reps: vec![5, 5, 5],
            weight: 135,
            ..Exercise::new("Squat", ExerciseType::Resistance)
        }];
        handle.write(|s| {
            s.upsert_workout(id, w.into(), Origin::Server);
        });
    }

    fn engine(handle: &StoreHandle, remote: &Arc<MockRemote>) -> SyncEngine<MockRemote> {
        SyncEngine::new(handle.clone(), Arc::clone(remote)).with_retry(RetryPolicy::none())
    }

    /// Await `future`, failing the test instead of hanging on a stuck latch.
    async fn settle<T>(future: impl std::future::Future<Output = T>) -> T {
        tokio::time::timeout(std::time::Duration::from_secs(5), future)
            .await
            .expect("timed out")
    }

    #[tokio::test]
    async fn test_edit_flush_rekeys_workout() {
        let handle = logged_in_store();
        seed_workout(&handle, 1);
        let remote = Arc::new(MockRemote::with_next_id(42));
        let engine = engine(&handle, &remote);

        handle
            .write(|s| s.update_exercise(1, 0, ExercisePatch::reps(vec![5, 5, 6])))
            .unwrap();
        let outcome = engine.flush(CollectionKind::Workouts).await;

        assert!(matches!(outcome, FlushOutcome::Flushed(FlushReport { upserted: 1, deleted: 1, .. })));
        handle.read(|s| {
            assert!(s.workout(1).is_none());
            assert_eq!(s.workout(42).unwrap().exercises[0].reps, vec![5, 5, 6]);
            assert!(s.dirty().workouts.is_empty());
        });

        let calls = remote.calls();
        assert_eq!(calls[0], Call::DeleteWorkouts(vec![1]));
        match &calls[1] {
            Call::CreateWorkouts(payload) => {
                assert_eq!(payload.len(), 1);
                assert_eq!(payload[0].exercises[0].reps, vec![5, 5, 6]);
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_local_workout_is_created_without_delete() {
        let handle = logged_in_store();
        let remote = Arc::new(MockRemote::with_next_id(7));
        let engine = engine(&handle, &remote);

        let local = handle.write(|s| s.create_workout("2024-06-01"));
        engine.flush(CollectionKind::Workouts).await;

        assert_eq!(remote.calls().len(), 1);
        assert!(matches!(remote.calls()[0], Call::CreateWorkouts(_)));
        handle.read(|s| {
            assert!(s.workout(local).is_none());
            assert_eq!(s.workout(7).unwrap().tag, "2024-06-01");
        });
    }

    #[tokio::test]
    async fn test_clean_flush_sends_nothing() {
        let handle = logged_in_store();
        seed_workout(&handle, 1);
        let remote = Arc::new(MockRemote::default());
        let engine = engine(&handle, &remote);

        let outcomes = engine.flush_all().await;
        assert!(outcomes.iter().all(|(_, o)| *o == FlushOutcome::Clean));
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_not_logged_in_keeps_dirty() {
        let handle = StoreHandle::default();
        handle.write(|s| {
            s.set_weight("2024-05-01", 180, Origin::Local);
        });
        let remote = Arc::new(MockRemote::default());
        let engine = engine(&handle, &remote);

        let outcome = engine.flush(CollectionKind::WeightEntries).await;
        assert_eq!(outcome, FlushOutcome::NotLoggedIn);
        assert!(!handle.read(|s| s.dirty().is_clean()));
    }

    #[tokio::test]
    async fn test_failure_keeps_dirty_and_emits_event() {
        let handle = logged_in_store();
        seed_workout(&handle, 1);
        let remote = Arc::new(MockRemote::default());
        remote.fail_next("delete_workouts", RemoteError::Transport("offline".into()));
        let engine = engine(&handle, &remote);
        let mut events = engine.events().subscribe();

        handle.write(|s| {
            s.upsert_workout(1, WorkoutPatch::tag("2024-05-02"), Origin::Local);
        });
        let outcome = engine.flush(CollectionKind::Workouts).await;

        assert!(outcome.is_failure());
        // Delete failed, so nothing was re-created.
        assert_eq!(remote.calls().len(), 1);
        handle.read(|s| {
            assert!(s.workout(1).is_some());
            assert!(s.dirty().workouts.is_dirty(&1));
        });
        assert!(matches!(
            events.recv().await.unwrap(),
            SyncEvent::FlushFailed { kind: CollectionKind::Workouts, .. }
        ));

        // Next trigger succeeds.
        let outcome = engine.flush(CollectionKind::Workouts).await;
        assert!(matches!(outcome, FlushOutcome::Flushed(_)));
        assert!(handle.read(|s| s.dirty().workouts.is_empty()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_is_retried() {
        let handle = logged_in_store();
        handle.write(|s| {
            s.set_weight("2024-05-01", 180, Origin::Local);
        });
        let remote = Arc::new(MockRemote::default());
        remote.fail_next(
            "upsert_weight_entries",
            RemoteError::Status {
                status: 502,
                message: "bad gateway".into(),
            },
        );
        let engine = SyncEngine::new(handle.clone(), Arc::clone(&remote));

        let outcome = engine.flush(CollectionKind::WeightEntries).await;
        assert!(matches!(outcome, FlushOutcome::Flushed(_)));
        assert_eq!(remote.calls().len(), 2);
        assert!(handle.read(|s| s.dirty().is_clean()));
    }

    #[tokio::test]
    async fn test_edit_during_flush_stays_dirty() {
        let handle = logged_in_store();
        handle.write(|s| {
            s.set_weight("2024-05-01", 180, Origin::Local);
            s.set_weight("2024-05-02", 181, Origin::Local);
        });
        let remote = Arc::new(MockRemote::default());
        let (entered, release) = remote.pause("upsert_weight_entries");
        let engine = Arc::new(engine(&handle, &remote));

        let task = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.flush(CollectionKind::WeightEntries).await }
        });
        entered.notified().await;

        // Re-edit one flushed date and add a new one while the request is in flight.
        handle.write(|s| {
            s.set_weight("2024-05-01", 179, Origin::Local);
            s.set_weight("2024-05-03", 182, Origin::Local);
        });
        assert_eq!(
            settle(engine.flush(CollectionKind::WeightEntries)).await,
            FlushOutcome::InFlight
        );
        release.notify_one();
        settle(task).await.unwrap();

        handle.read(|s| {
            let dirty = &s.dirty().weight_entries;
            assert!(dirty.is_dirty(&"2024-05-01".to_string()));
            assert!(!dirty.is_dirty(&"2024-05-02".to_string()));
            assert!(dirty.is_dirty(&"2024-05-03".to_string()));
        });

        // The latch is released once the first flush finishes.
        assert!(matches!(
            settle(engine.flush(CollectionKind::WeightEntries)).await,
            FlushOutcome::Flushed(_)
        ));
    }

    #[tokio::test]
    async fn test_workout_edited_during_create_moves_and_stays_dirty() {
        let handle = logged_in_store();
        seed_workout(&handle, 1);
        let remote = Arc::new(MockRemote::with_next_id(42));
        let (entered, release) = remote.pause("create_workouts");
        let engine = Arc::new(engine(&handle, &remote));

        handle
            .write(|s| s.update_exercise(1, 0, ExercisePatch::reps(vec![5, 5, 6])))
            .unwrap();
        let task = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.flush(CollectionKind::Workouts).await }
        });
        entered.notified().await;
        handle
            .write(|s| s.update_exercise(1, 0, ExercisePatch::reps(vec![8, 8])))
            .unwrap();
        release.notify_one();
        settle(task).await.unwrap();

        handle.read(|s| {
            assert!(s.workout(1).is_none());
            assert_eq!(s.workout(42).unwrap().exercises[0].reps, vec![8, 8]);
            assert!(s.dirty().workouts.is_dirty(&42));
        });
    }

    #[tokio::test]
    async fn test_workout_removed_during_create_deletes_server_copy() {
        let handle = logged_in_store();
        seed_workout(&handle, 1);
        let remote = Arc::new(MockRemote::with_next_id(42));
        let (entered, release) = remote.pause("create_workouts");
        let engine = Arc::new(engine(&handle, &remote));

        handle
            .write(|s| s.update_exercise(1, 0, ExercisePatch::reps(vec![5, 5, 6])))
            .unwrap();
        let task = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.flush(CollectionKind::Workouts).await }
        });
        entered.notified().await;
        handle.write(|s| {
            s.remove_workout(1, Origin::Local);
        });
        release.notify_one();
        settle(task).await.unwrap();

        handle.read(|s| {
            assert!(s.workout(1).is_none());
            assert!(s.workout(42).is_none());
            assert!(s.dirty().workouts.is_removed(&42));
        });

        settle(engine.flush(CollectionKind::Workouts)).await;
        assert_eq!(remote.calls().last(), Some(&Call::DeleteWorkouts(vec![42])));
        assert!(handle.read(|s| s.dirty().workouts.is_empty()));
    }

    #[tokio::test]
    async fn test_tag_removed_during_upsert_stays_deleted() {
        let handle = logged_in_store();
        handle.write(|s| {
            s.upsert_tag(
                5,
                TagPatch {
                    name: Some("Heavy".into()),
                    color: None,
                },
                Origin::Server,
            );
            s.upsert_tag(
                5,
                TagPatch {
                    name: Some("Light".into()),
                    color: None,
                },
                Origin::Local,
            );
        });
        let remote = Arc::new(MockRemote::default());
        let (entered, release) = remote.pause("upsert_tags");
        let engine = Arc::new(engine(&handle, &remote));

        let task = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.flush(CollectionKind::Tags).await }
        });
        entered.notified().await;
        handle.write(|s| {
            s.remove_tag(5, Origin::Local);
        });
        release.notify_one();
        settle(task).await.unwrap();

        handle.read(|s| {
            assert!(s.tag(5).is_none());
            assert!(!s.dirty().tags.is_dirty(&5));
            assert!(s.dirty().tags.is_removed(&5));
        });

        settle(engine.flush(CollectionKind::Tags)).await;
        assert_eq!(remote.calls().last(), Some(&Call::DeleteTags(vec![5])));
        assert!(handle.read(|s| s.dirty().tags.is_empty()));
    }

    #[tokio::test]
    async fn test_removed_workout_is_deleted() {
        let handle = logged_in_store();
        seed_workout(&handle, 5);
        let local = handle.write(|s| s.create_workout("2024-06-01"));
        handle.write(|s| {
            s.remove_workout(5, Origin::Local);
            s.remove_workout(local, Origin::Local);
        });
        let remote = Arc::new(MockRemote::default());
        let engine = engine(&handle, &remote);

        engine.flush(CollectionKind::Templates).await;
        assert_eq!(remote.calls(), vec![Call::DeleteWorkouts(vec![5])]);
        assert!(handle.read(|s| s.dirty().workouts.is_empty()));
    }

    #[tokio::test]
    async fn test_tag_flush_remaps_dates_before_they_flush() {
        let handle = logged_in_store();
        let tag = handle.write(|s| {
            let tag = s.create_tag("Heavy", Some("#ff0000".into()));
            s.toggle_tagged_date("2024-05-01", tag);
            tag
        });
        let remote = Arc::new(MockRemote::with_next_id(17));
        let engine = engine(&handle, &remote);

        let outcomes = engine.flush_all().await;
        let dates = outcomes
            .iter()
            .find(|(k, _)| *k == CollectionKind::TaggedDates)
            .map(|(_, o)| o.clone());
        assert!(matches!(dates, Some(FlushOutcome::Flushed(FlushReport { upserted: 1, deferred: 0, .. }))));

        handle.read(|s| {
            assert!(s.tag(tag).is_none());
            assert_eq!(s.tag_ids_for("2024-05-01"), &[17]);
            assert!(s.dirty().is_clean());
        });
        assert!(remote.calls().contains(&Call::UpsertTaggedDates(vec![TaggedDate {
            date: "2024-05-01".into(),
            tag_ids: vec![17],
        }])));
    }

    #[tokio::test]
    async fn test_tagged_dates_wait_for_local_tags() {
        let handle = logged_in_store();
        handle.write(|s| {
            let tag = s.create_tag("Heavy", None);
            s.toggle_tagged_date("2024-05-01", tag);
        });
        let remote = Arc::new(MockRemote::default());
        let engine = engine(&handle, &remote);

        let outcome = engine.flush(CollectionKind::TaggedDates).await;
        assert!(matches!(outcome, FlushOutcome::Flushed(FlushReport { upserted: 0, deferred: 1, .. })));
        assert!(remote.calls().is_empty());
        assert!(handle.read(|s| s.dirty().tagged_dates.is_dirty(&"2024-05-01".to_string())));
    }

    #[tokio::test]
    async fn test_period_toggle_off_sends_unmark() {
        let handle = logged_in_store();
        handle.write(|s| {
            s.mark_period_day("2024-05-01", Origin::Server);
            s.toggle_period_day("2024-05-01");
            s.toggle_period_day("2024-05-02");
        });
        let remote = Arc::new(MockRemote::default());
        let engine = engine(&handle, &remote);

        engine.flush(CollectionKind::PeriodDays).await;
        let Call::SetPeriodDays(mut marks) = remote.calls().remove(0) else {
            panic!("expected period call");
        };
        marks.sort_by(|a, b| a.date.cmp(&b.date));
        assert_eq!(
            marks,
            vec![
                PeriodDayMark { date: "2024-05-01".into(), marked: false },
                PeriodDayMark { date: "2024-05-02".into(), marked: true },
            ]
        );
    }

    #[tokio::test]
    async fn test_settings_flush() {
        let handle = logged_in_store();
        handle.write(|s| {
            s.update_settings(
                SettingsPatch {
                    use_imperial: Some(false),
                },
                Origin::Local,
            );
        });
        let remote = Arc::new(MockRemote::default());
        let engine = engine(&handle, &remote);

        engine.flush(CollectionKind::Settings).await;
        assert_eq!(remote.calls().len(), 1);
        assert!(matches!(&remote.calls()[0], Call::UpdateSettings(s) if !s.use_imperial));
        assert!(handle.read(|s| s.dirty().is_clean()));
    }
}
