//! Pull-side synchronization: the initial load and "load more" pages.
//!
//! Server records are merged with [`Origin::Server`] so they never mark
//! anything dirty. Records the user changed locally and has not pushed
//! yet are left alone; the next flush decides their fate.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use super::events::{EventBus, SyncEvent};
use super::remote::{Credentials, PagePayload, PageRequest, Remote, RemoteError, RemoteResult};
use crate::model::{CollectionKind, SettingsPatch};
use crate::storage::{Origin, PaginationCursor, Store, StoreHandle};

/// Result of one "load more" request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The cursor says the server has nothing further.
    NoMore,
    /// A fetch for the same collection is already running.
    InFlight,
    NotLoggedIn,
    Fetched {
        page: u32,
        received: usize,
        has_more: bool,
    },
    Failed(RemoteError),
}

/// Releases the per-collection fetching latch when dropped.
struct FetchGuard<'a> {
    fetching: &'a Mutex<HashSet<CollectionKind>>,
    kind: CollectionKind,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.fetching
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.kind);
    }
}

/// Fetches pages from a [`Remote`] into the store.
pub struct Paginator<R: Remote> {
    store: StoreHandle,
    remote: Arc<R>,
    events: EventBus,
    fetching: Mutex<HashSet<CollectionKind>>,
}

impl<R: Remote> Paginator<R> {
    pub fn new(store: StoreHandle, remote: Arc<R>) -> Self {
        Self {
            store,
            remote,
            events: EventBus::new(),
            fetching: Mutex::new(HashSet::new()),
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    fn try_begin(&self, kind: CollectionKind) -> Option<FetchGuard<'_>> {
        let mut fetching = self
            .fetching
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !fetching.insert(kind) {
            return None;
        }
        Some(FetchGuard {
            fetching: &self.fetching,
            kind,
        })
    }

    /// Log in, then load the first page of everything.
    ///
    /// # Errors
    ///
    /// Returns the remote error if the credentials are rejected or the
    /// initial load fails. A failed load leaves the session token stored.
    pub async fn login(&self, credentials: &Credentials) -> RemoteResult<usize> {
        let token = self.remote.login(credentials).await?;
        self.load_initial(&token).await
    }

    /// Create an account, then load its (empty) first page.
    ///
    /// # Errors
    ///
    /// Returns the remote error if signup or the initial load fails.
    pub async fn signup(&self, credentials: &Credentials) -> RemoteResult<usize> {
        let token = self.remote.signup(credentials).await?;
        self.load_initial(&token).await
    }

    /// Replace the cache with page 1 of every collection.
    ///
    /// Stores `token` as the session, then resets every cursor to page 2
    /// with the server's has-more flags. Returns the number of records
    /// received.
    ///
    /// # Errors
    ///
    /// Returns the remote error when the fetch fails.
    pub async fn load_initial(&self, token: &str) -> RemoteResult<usize> {
        self.store.write(|s| s.set_token(Some(token.to_string())));

        let response = self
            .remote
            .fetch_page(token, &PageRequest::everything())
            .await
            .inspect_err(|e| warn!(error = %e, "Initial load failed"))?;

        let flags: Vec<(CollectionKind, bool)> = CollectionKind::PAGINATED
            .into_iter()
            .map(|kind| (kind, response.has_more(kind)))
            .collect();

        let received = self.store.write(|s| {
            s.clear_collections();
            let received = apply_payload(s, response.user);
            for (kind, has_more) in flags {
                s.cursors_mut()
                    .set(kind, PaginationCursor { page: 2, has_more });
            }
            received
        });

        info!(received, "Initial load complete");
        Ok(received)
    }

    /// Fetch the next page of `kind`, merge it, and advance its cursor.
    ///
    /// Failures are logged and published; the cursor stays where it was.
    pub async fn fetch_more(&self, kind: CollectionKind) -> FetchOutcome {
        let (cursor, token) = self.store.read(|s| {
            (s.cursors().get(kind), s.token().map(str::to_owned))
        });
        if !cursor.has_more {
            return FetchOutcome::NoMore;
        }
        let Some(token) = token else {
            return FetchOutcome::NotLoggedIn;
        };
        let Some(_guard) = self.try_begin(kind) else {
            debug!(%kind, "Fetch already in flight, skipping");
            return FetchOutcome::InFlight;
        };

        let request = PageRequest::for_kind(kind, cursor.page);
        let response = match self.remote.fetch_page(&token, &request).await {
            Ok(response) => response,
            Err(error) => {
                warn!(%kind, page = cursor.page, error = %error, "Page fetch failed");
                self.events.emit(SyncEvent::FetchFailed {
                    kind,
                    error: error.to_string(),
                });
                return FetchOutcome::Failed(error);
            }
        };

        let has_more = response.has_more(kind);
        let received = self.store.write(|s| {
            let received = apply_payload(s, response.user);
            s.cursors_mut().get_mut(kind).advance(has_more);
            received
        });

        debug!(%kind, page = cursor.page, received, has_more, "Fetched page");
        self.events.emit(SyncEvent::Fetched {
            kind,
            page: cursor.page,
            received,
            has_more,
        });
        FetchOutcome::Fetched {
            page: cursor.page,
            received,
            has_more,
        }
    }
}

/// Merge one page into the store as server writes. Returns the number of
/// records received, including tombstones and skipped records.
fn apply_payload(store: &mut Store, payload: PagePayload) -> usize {
    let mut received = 0;
    let mut skipped = 0;

    if let Some(settings) = payload.settings() {
        if store.dirty().settings.is_dirty() {
            skipped += 1;
        } else {
            store.update_settings(
                SettingsPatch {
                    use_imperial: Some(settings.use_imperial),
                },
                Origin::Server,
            );
        }
    }

    for item in payload.workouts {
        received += 1;
        let id = item.data.id;
        let dirty = &store.dirty().workouts;
        if dirty.is_dirty(&id) || dirty.is_removed(&id) {
            skipped += 1;
        } else if item.deleted {
            store.remove_workout(id, Origin::Server);
        } else {
            store.upsert_workout(id, item.data.into(), Origin::Server);
        }
    }

    for item in payload.tags {
        received += 1;
        let id = item.data.id;
        let dirty = &store.dirty().tags;
        if dirty.is_dirty(&id) || dirty.is_removed(&id) {
            skipped += 1;
        } else if item.deleted {
            store.remove_tag(id, Origin::Server);
        } else {
            store.upsert_tag(id, item.data.into(), Origin::Server);
        }
    }

    for item in payload.tagged_dates {
        received += 1;
        let date = item.data.date;
        if store.dirty().tagged_dates.is_dirty(&date) {
            skipped += 1;
        } else if item.deleted {
            store.remove_tagged_date(&date);
        } else {
            store.upsert_tagged_date(&date, item.data.tag_ids, Origin::Server);
        }
    }

    for item in payload.weight_entries {
        received += 1;
        let date = item.data.date;
        if store.dirty().weight_entries.is_dirty(&date) {
            skipped += 1;
        } else if item.deleted {
            store.remove_weight_entry(&date);
        } else {
            store.set_weight(&date, item.data.value, Origin::Server);
        }
    }

    for item in payload.period_days {
        received += 1;
        let date = item.data.date;
        let dirty = &store.dirty().period_days;
        if dirty.is_dirty(&date) || dirty.is_removed(&date) {
            skipped += 1;
        } else if item.deleted {
            store.unmark_period_day(&date, Origin::Server);
        } else {
            store.mark_period_day(&date, Origin::Server);
        }
    }

    if skipped > 0 {
        debug!(skipped, "Kept local changes over server records");
    }
    received
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PeriodDay, Tag, TaggedDate, WeightEntry, Workout, WorkoutPatch};
    use crate::sync::mock::{Call, MockRemote};
    use crate::sync::remote::{PageResponse, Tombstoned};
    use std::time::Duration;

    fn logged_in_store() -> StoreHandle {
        let mut store = Store::new();
        store.set_token(Some("jwt".into()));
        StoreHandle::new(store)
    }

    fn first_page() -> PageResponse {
        PageResponse {
            user: PagePayload {
                use_imperial: Some(false),
                workouts: vec![
                    Tombstoned::live(Workout::record(1, "2024-05-01")),
                    Tombstoned::live(Workout::template(2, "Push")),
                ],
                tags: vec![Tombstoned::live(Tag {
                    id: 3,
                    name: "Heavy".into(),
                    color: "#ff0000".into(),
                })],
                tagged_dates: vec![Tombstoned::live(TaggedDate {
                    date: "2024-05-01".into(),
                    tag_ids: vec![3],
                })],
                weight_entries: vec![Tombstoned::live(WeightEntry {
                    date: "2024-05-01".into(),
                    value: 180,
                })],
                period_days: Vec::new(),
            },
            more_workouts: true,
            ..PageResponse::default()
        }
    }

    #[tokio::test]
    async fn test_load_initial_replaces_cache_and_sets_cursors() {
        let handle = StoreHandle::default();
        handle.write(|s| {
            s.create_workout("2023-01-01");
        });
        let remote = Arc::new(MockRemote::default());
        remote.push_page(first_page());
        let paginator = Paginator::new(handle.clone(), Arc::clone(&remote));

        let received = paginator.load_initial("jwt").await.unwrap();
        assert_eq!(received, 5);

        handle.read(|s| {
            assert_eq!(s.token(), Some("jwt"));
            assert_eq!(s.workouts().len(), 2);
            assert_eq!(s.templates().count(), 1);
            assert!(!s.settings().use_imperial);
            assert_eq!(s.tag_ids_for("2024-05-01"), &[3]);
            assert!(s.dirty().is_clean());

            let workouts = s.cursors().get(CollectionKind::Workouts);
            assert_eq!(workouts, PaginationCursor { page: 2, has_more: true });
            assert!(!s.cursors().get(CollectionKind::Tags).has_more);
        });
        assert_eq!(remote.calls(), vec![Call::FetchPage(PageRequest::everything())]);
    }

    #[tokio::test]
    async fn test_login_stores_token() {
        let handle = StoreHandle::default();
        let remote = Arc::new(MockRemote::default());
        let paginator = Paginator::new(handle.clone(), Arc::clone(&remote));

        paginator
            .login(&Credentials {
                email: "a@b.c".into(),
                password: "pw".into(),
            })
            .await
            .unwrap();
        assert_eq!(handle.read(|s| s.token().map(str::to_owned)), Some("jwt-a@b.c".into()));
    }

    #[tokio::test]
    async fn test_rejected_login_stays_logged_out() {
        let handle = StoreHandle::default();
        let remote = Arc::new(MockRemote::default());
        remote.fail_next("login", RemoteError::Unauthorized("bad password".into()));
        let paginator = Paginator::new(handle.clone(), Arc::clone(&remote));

        let err = paginator
            .login(&Credentials {
                email: "a@b.c".into(),
                password: "nope".into(),
            })
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert!(!handle.read(Store::is_logged_in));
    }

    #[tokio::test]
    async fn test_fetch_more_advances_cursor() {
        let handle = logged_in_store();
        handle.write(|s| {
            s.cursors_mut().set(
                CollectionKind::Workouts,
                PaginationCursor { page: 2, has_more: true },
            );
        });
        let remote = Arc::new(MockRemote::default());
        remote.push_page(PageResponse {
            user: PagePayload {
                workouts: vec![Tombstoned::live(Workout::record(9, "2024-01-01"))],
                ..PagePayload::default()
            },
            more_workouts: false,
            ..PageResponse::default()
        });
        let paginator = Paginator::new(handle.clone(), Arc::clone(&remote));

        let outcome = paginator.fetch_more(CollectionKind::Workouts).await;
        assert_eq!(
            outcome,
            FetchOutcome::Fetched {
                page: 2,
                received: 1,
                has_more: false
            }
        );
        handle.read(|s| {
            assert!(s.workout(9).is_some());
            assert_eq!(
                s.cursors().get(CollectionKind::Workouts),
                PaginationCursor { page: 3, has_more: false }
            );
        });
        assert_eq!(
            remote.calls(),
            vec![Call::FetchPage(PageRequest::for_kind(CollectionKind::Workouts, 2))]
        );

        // Exhausted cursor makes no request.
        assert_eq!(
            paginator.fetch_more(CollectionKind::Workouts).await,
            FetchOutcome::NoMore
        );
        assert_eq!(remote.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_cursor() {
        let handle = logged_in_store();
        handle.write(|s| {
            s.cursors_mut().set(
                CollectionKind::Tags,
                PaginationCursor { page: 2, has_more: true },
            );
        });
        let remote = Arc::new(MockRemote::default());
        remote.fail_next("fetch_page", RemoteError::Transport("offline".into()));
        let paginator = Paginator::new(handle.clone(), Arc::clone(&remote));
        let mut events = paginator.events.subscribe();

        let outcome = paginator.fetch_more(CollectionKind::Tags).await;
        assert!(matches!(outcome, FetchOutcome::Failed(RemoteError::Transport(_))));
        assert_eq!(
            handle.read(|s| s.cursors().get(CollectionKind::Tags)),
            PaginationCursor { page: 2, has_more: true }
        );
        assert!(matches!(
            events.recv().await.unwrap(),
            SyncEvent::FetchFailed { kind: CollectionKind::Tags, .. }
        ));
    }

    #[tokio::test]
    async fn test_tombstones_remove_and_dirty_records_survive() {
        let handle = logged_in_store();
        handle.write(|s| {
            s.upsert_workout(1, Workout::record(1, "2024-05-01").into(), Origin::Server);
            s.upsert_workout(2, Workout::record(2, "2024-05-02").into(), Origin::Server);
            s.mark_period_day("2024-05-03", Origin::Server);
            s.upsert_workout(2, WorkoutPatch::tag("2024-05-09"), Origin::Local);
            s.cursors_mut().set(
                CollectionKind::Workouts,
                PaginationCursor { page: 2, has_more: true },
            );
        });
        let remote = Arc::new(MockRemote::default());
        remote.push_page(PageResponse {
            user: PagePayload {
                workouts: vec![
                    Tombstoned::deleted(Workout::record(1, "2024-05-01")),
                    Tombstoned::live(Workout::record(2, "2024-05-02")),
                ],
                period_days: vec![Tombstoned::deleted(PeriodDay {
                    date: "2024-05-03".into(),
                })],
                ..PagePayload::default()
            },
            ..PageResponse::default()
        });
        let paginator = Paginator::new(handle.clone(), Arc::clone(&remote));

        paginator.fetch_more(CollectionKind::Workouts).await;
        handle.read(|s| {
            assert!(s.workout(1).is_none());
            assert_eq!(s.workout(2).unwrap().tag, "2024-05-09");
            assert!(!s.is_period_day("2024-05-03"));
            assert!(s.dirty().workouts.is_dirty(&2));
            assert!(!s.dirty().workouts.is_removed(&1));
        });
    }

    #[tokio::test]
    async fn test_fetch_in_flight_is_skipped() {
        let handle = logged_in_store();
        handle.write(|s| {
            s.cursors_mut().set(
                CollectionKind::WeightEntries,
                PaginationCursor { page: 2, has_more: true },
            );
        });
        let remote = Arc::new(MockRemote::default());
        let (entered, release) = remote.pause("fetch_page");
        let paginator = Arc::new(Paginator::new(handle.clone(), Arc::clone(&remote)));

        let task = tokio::spawn({
            let paginator = Arc::clone(&paginator);
            async move { paginator.fetch_more(CollectionKind::WeightEntries).await }
        });
        entered.notified().await;
        let second = tokio::time::timeout(
            Duration::from_secs(5),
            paginator.fetch_more(CollectionKind::WeightEntries),
        );
        assert_eq!(second.await.expect("timed out"), FetchOutcome::InFlight);
        release.notify_one();
        let first = tokio::time::timeout(Duration::from_secs(5), task).await.expect("timed out");
        assert!(matches!(first.unwrap(), FetchOutcome::Fetched { page: 2, .. }));

        // The latch is released with the first fetch.
        let cursor = handle.read(|s| s.cursors().get(CollectionKind::WeightEntries));
        assert_eq!(cursor.page, 3);
        let third = tokio::time::timeout(
            Duration::from_secs(5),
            paginator.fetch_more(CollectionKind::WeightEntries),
        );
        assert!(!matches!(third.await.expect("timed out"), FetchOutcome::InFlight));
    }

    #[tokio::test]
    async fn test_not_logged_in() {
        let handle = StoreHandle::default();
        handle.write(|s| {
            s.cursors_mut().set(
                CollectionKind::Tags,
                PaginationCursor { page: 2, has_more: true },
            );
        });
        let paginator = Paginator::new(handle, Arc::new(MockRemote::default()));
        assert_eq!(
            paginator.fetch_more(CollectionKind::Tags).await,
            FetchOutcome::NotLoggedIn
        );
    }
}
