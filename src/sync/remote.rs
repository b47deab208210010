//! Remote server contract.
//!
//! The engine and paginator only talk to the server through [`Remote`],
//! so tests can drive them with a scripted in-memory implementation.

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    CollectionKind, Exercise, PeriodDay, Tag, TagId, TaggedDate, UserSettings, WeightEntry,
    Workout, WorkoutId,
};

/// Result type for remote calls.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Failures talking to the server.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// Connection, timeout or other transport failure.
    #[error("Request failed: {0}")]
    Transport(String),

    /// Non-success status with the server's error message.
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The server answered but did not return the expected records.
    #[error("Missing result: {0}")]
    MissingResult(String),
}

impl RemoteError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Unauthorized(_) | Self::Decode(_) | Self::MissingResult(_) => false,
        }
    }

    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Email/password pair for login and signup.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Workout payload for creation. Carries no workout or exercise ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkout {
    pub is_template: bool,
    pub tag: String,
    pub exercises: Vec<Exercise>,
}

impl From<&Workout> for NewWorkout {
    fn from(workout: &Workout) -> Self {
        Self {
            is_template: workout.is_template,
            tag: workout.tag.clone(),
            exercises: workout
                .exercises
                .iter()
                .map(|e| Exercise {
                    id: None,
                    ..e.clone()
                })
                .collect(),
        }
    }
}

/// Period-day upsert: `marked = false` unmarks the date on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDayMark {
    pub date: String,
    pub marked: bool,
}

/// A paginated record that the server may flag as deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tombstoned<T> {
    #[serde(flatten)]
    pub data: T,
    #[serde(default)]
    pub deleted: bool,
}

impl<T> Tombstoned<T> {
    pub const fn live(data: T) -> Self {
        Self {
            data,
            deleted: false,
        }
    }

    pub const fn deleted(data: T) -> Self {
        Self {
            data,
            deleted: true,
        }
    }
}

/// Request body for the paginated user-info endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub page: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub get_settings: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub get_workouts: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub get_templates: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub get_tags: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub get_tagged_dates: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub get_weight_entries: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub get_period_days: bool,
}

impl PageRequest {
    /// Request one page of a single collection.
    #[must_use]
    pub fn for_kind(kind: CollectionKind, page: u32) -> Self {
        let mut request = Self {
            page,
            ..Self::default()
        };
        match kind {
            CollectionKind::Workouts => request.get_workouts = true,
            CollectionKind::Templates => request.get_templates = true,
            CollectionKind::Tags => request.get_tags = true,
            CollectionKind::TaggedDates => request.get_tagged_dates = true,
            CollectionKind::WeightEntries => request.get_weight_entries = true,
            CollectionKind::PeriodDays => request.get_period_days = true,
            CollectionKind::Settings => request.get_settings = true,
        }
        request
    }

    /// First page of every collection.
    #[must_use]
    pub const fn everything() -> Self {
        Self {
            page: 1,
            get_settings: true,
            get_workouts: true,
            get_templates: true,
            get_tags: true,
            get_tagged_dates: true,
            get_weight_entries: true,
            get_period_days: true,
        }
    }
}

/// Entities carried by one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PagePayload {
    pub use_imperial: Option<bool>,
    /// Records and templates together; `isTemplate` tells them apart.
    pub workouts: Vec<Tombstoned<Workout>>,
    pub tags: Vec<Tombstoned<Tag>>,
    pub tagged_dates: Vec<Tombstoned<TaggedDate>>,
    pub weight_entries: Vec<Tombstoned<WeightEntry>>,
    pub period_days: Vec<Tombstoned<PeriodDay>>,
}

impl PagePayload {
    #[must_use]
    pub fn settings(&self) -> Option<UserSettings> {
        self.use_imperial
            .map(|use_imperial| UserSettings { use_imperial })
    }
}

/// Response of the paginated user-info endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageResponse {
    pub user: PagePayload,
    pub more_workouts: bool,
    pub more_templates: bool,
    pub more_tags: bool,
    pub more_tagged_dates: bool,
    pub more_weight_entries: bool,
    pub more_period_days: bool,
}

impl PageResponse {
    /// Whether the server has further pages of `kind`.
    #[must_use]
    pub const fn has_more(&self, kind: CollectionKind) -> bool {
        match kind {
            CollectionKind::Workouts => self.more_workouts,
            CollectionKind::Templates => self.more_templates,
            CollectionKind::Tags => self.more_tags,
            CollectionKind::TaggedDates => self.more_tagged_dates,
            CollectionKind::WeightEntries => self.more_weight_entries,
            CollectionKind::PeriodDays => self.more_period_days,
            CollectionKind::Settings => false,
        }
    }
}

/// Server operations used by sync.
///
/// Every call carries the bearer token of the current session. Bulk
/// create/upsert calls return the stored records in request order.
pub trait Remote: Send + Sync {
    fn create_workouts(
        &self,
        token: &str,
        workouts: &[NewWorkout],
    ) -> impl Future<Output = RemoteResult<Vec<Workout>>> + Send;

    fn delete_workouts(
        &self,
        token: &str,
        ids: &[WorkoutId],
    ) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Create or update tags. Tags with local ids get server ids.
    fn upsert_tags(
        &self,
        token: &str,
        tags: &[Tag],
    ) -> impl Future<Output = RemoteResult<Vec<Tag>>> + Send;

    fn delete_tags(&self, token: &str, ids: &[TagId])
    -> impl Future<Output = RemoteResult<()>> + Send;

    fn upsert_tagged_dates(
        &self,
        token: &str,
        dates: &[TaggedDate],
    ) -> impl Future<Output = RemoteResult<()>> + Send;

    fn upsert_weight_entries(
        &self,
        token: &str,
        entries: &[WeightEntry],
    ) -> impl Future<Output = RemoteResult<()>> + Send;

    fn set_period_days(
        &self,
        token: &str,
        days: &[PeriodDayMark],
    ) -> impl Future<Output = RemoteResult<()>> + Send;

    fn update_settings(
        &self,
        token: &str,
        settings: &UserSettings,
    ) -> impl Future<Output = RemoteResult<()>> + Send;

    fn fetch_page(
        &self,
        token: &str,
        request: &PageRequest,
    ) -> impl Future<Output = RemoteResult<PageResponse>> + Send;

    /// Exchange credentials for a bearer token.
    fn login(&self, credentials: &Credentials)
    -> impl Future<Output = RemoteResult<String>> + Send;

    /// Create an account and return its bearer token.
    fn signup(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = RemoteResult<String>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExerciseType;

    #[test]
    fn test_transient_classification() {
        assert!(RemoteError::Transport("reset".into()).is_transient());
        assert!(RemoteError::Status { status: 503, message: String::new() }.is_transient());
        assert!(RemoteError::Status { status: 429, message: String::new() }.is_transient());
        assert!(!RemoteError::Status { status: 400, message: String::new() }.is_transient());
        assert!(!RemoteError::Unauthorized("expired".into()).is_transient());
    }

    #[test]
    fn test_new_workout_strips_exercise_ids() {
        let mut w = Workout::record(9, "2024-05-01");
        w.exercises.push(Exercise {
            id: Some(77),
            ..Exercise::new("Squat", ExerciseType::Resistance)
        });

        let payload = NewWorkout::from(&w);
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("id").is_none());
        assert!(json["exercises"][0].get("id").is_none());
        assert_eq!(json["tag"], "2024-05-01");
    }

    #[test]
    fn test_page_request_only_sends_set_flags() {
        let json = serde_json::to_value(PageRequest::for_kind(CollectionKind::WeightEntries, 3)).unwrap();
        assert_eq!(json, serde_json::json!({"page": 3, "getWeightEntries": true}));
    }

    #[test]
    fn test_tombstone_decoding() {
        let json = serde_json::json!({
            "user": {
                "periodDays": [
                    {"date": "2024-05-01", "value": 1},
                    {"date": "2024-05-02", "value": 1, "deleted": true}
                ]
            },
            "morePeriodDays": true
        });
        let page: PageResponse = serde_json::from_value(json).unwrap();
        assert_eq!(page.user.period_days.len(), 2);
        assert!(!page.user.period_days[0].deleted);
        assert!(page.user.period_days[1].deleted);
        assert!(page.has_more(CollectionKind::PeriodDays));
        assert!(!page.has_more(CollectionKind::Workouts));
    }
}
