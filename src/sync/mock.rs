//! Scripted in-memory [`Remote`] for engine and paginator tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use super::remote::{
    Credentials, NewWorkout, PageRequest, PageResponse, PeriodDayMark, Remote, RemoteError,
    RemoteResult,
};
use crate::model::{is_local_id, Tag, TagId, TaggedDate, UserSettings, WeightEntry, Workout, WorkoutId};

/// One recorded request.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateWorkouts(Vec<NewWorkout>),
    DeleteWorkouts(Vec<WorkoutId>),
    UpsertTags(Vec<Tag>),
    DeleteTags(Vec<TagId>),
    UpsertTaggedDates(Vec<TaggedDate>),
    UpsertWeightEntries(Vec<WeightEntry>),
    SetPeriodDays(Vec<PeriodDayMark>),
    UpdateSettings(UserSettings),
    FetchPage(PageRequest),
    Login(String),
    Signup(String),
}

type Gate = (Arc<Notify>, Arc<Notify>);

pub struct MockRemote {
    next_id: AtomicI64,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<&'static str, VecDeque<RemoteError>>>,
    gates: Mutex<HashMap<&'static str, Gate>>,
    pages: Mutex<VecDeque<PageResponse>>,
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::with_next_id(1000)
    }
}

impl MockRemote {
    pub fn with_next_id(next_id: i64) -> Self {
        Self {
            next_id: AtomicI64::new(next_id),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            pages: Mutex::new(VecDeque::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Make the next call to `op` fail with `error`.
    pub fn fail_next(&self, op: &'static str, error: RemoteError) {
        self.failures
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Hold the next call to `op` until released.
    ///
    /// Returns `(entered, release)`: `entered` fires once the call is
    /// waiting, `release` lets it continue.
    pub fn pause(&self, op: &'static str) -> Gate {
        let gate = (Arc::new(Notify::new()), Arc::new(Notify::new()));
        self.gates.lock().unwrap().insert(op, gate.clone());
        gate
    }

    /// Queue a response for the next `fetch_page`.
    pub fn push_page(&self, page: PageResponse) {
        self.pages.lock().unwrap().push_back(page);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn assign_id(&self, id: i64) -> i64 {
        if is_local_id(id) {
            self.next_id.fetch_add(1, Ordering::SeqCst)
        } else {
            id
        }
    }

    async fn enter(&self, op: &'static str) -> RemoteResult<()> {
        let gate = self.gates.lock().unwrap().remove(op);
        if let Some((entered, release)) = gate {
            entered.notify_one();
            release.notified().await;
        }
        let failure = self
            .failures
            .lock()
            .unwrap()
            .get_mut(op)
            .and_then(VecDeque::pop_front);
        failure.map_or(Ok(()), Err)
    }
}

impl Remote for MockRemote {
    async fn create_workouts(&self, _token: &str, workouts: &[NewWorkout]) -> RemoteResult<Vec<Workout>> {
        self.record(Call::CreateWorkouts(workouts.to_vec()));
        self.enter("create_workouts").await?;
        Ok(workouts
            .iter()
            .map(|w| Workout {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                is_template: w.is_template,
                tag: w.tag.clone(),
                exercises: w.exercises.clone(),
            })
            .collect())
    }

    async fn delete_workouts(&self, _token: &str, ids: &[WorkoutId]) -> RemoteResult<()> {
        self.record(Call::DeleteWorkouts(ids.to_vec()));
        self.enter("delete_workouts").await
    }

    async fn upsert_tags(&self, _token: &str, tags: &[Tag]) -> RemoteResult<Vec<Tag>> {
        self.record(Call::UpsertTags(tags.to_vec()));
        self.enter("upsert_tags").await?;
        Ok(tags
            .iter()
            .map(|t| Tag {
                id: self.assign_id(t.id),
                ..t.clone()
            })
            .collect())
    }

    async fn delete_tags(&self, _token: &str, ids: &[TagId]) -> RemoteResult<()> {
        self.record(Call::DeleteTags(ids.to_vec()));
        self.enter("delete_tags").await
    }

    async fn upsert_tagged_dates(&self, _token: &str, dates: &[TaggedDate]) -> RemoteResult<()> {
        self.record(Call::UpsertTaggedDates(dates.to_vec()));
        self.enter("upsert_tagged_dates").await
    }

    async fn upsert_weight_entries(&self, _token: &str, entries: &[WeightEntry]) -> RemoteResult<()> {
        self.record(Call::UpsertWeightEntries(entries.to_vec()));
        self.enter("upsert_weight_entries").await
    }

    async fn set_period_days(&self, _token: &str, days: &[PeriodDayMark]) -> RemoteResult<()> {
        self.record(Call::SetPeriodDays(days.to_vec()));
        self.enter("set_period_days").await
    }

    async fn update_settings(&self, _token: &str, settings: &UserSettings) -> RemoteResult<()> {
        self.record(Call::UpdateSettings(settings.clone()));
        self.enter("update_settings").await
    }

    async fn fetch_page(&self, _token: &str, request: &PageRequest) -> RemoteResult<PageResponse> {
        self.record(Call::FetchPage(request.clone()));
        self.enter("fetch_page").await?;
        Ok(self.pages.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn login(&self, credentials: &Credentials) -> RemoteResult<String> {
        self.record(Call::Login(credentials.email.clone()));
        self.enter("login").await?;
        Ok(format!("jwt-{}", credentials.email))
    }

    async fn signup(&self, credentials: &Credentials) -> RemoteResult<String> {
        self.record(Call::Signup(credentials.email.clone()));
        self.enter("signup").await?;
        Ok(format!("jwt-{}", credentials.email))
    }
}
