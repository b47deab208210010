//! Workout and exercise models.
//!
//! A workout is either a dated record (`tag` holds an ISO date) or a
//! template (`tag` holds the template name). Exercises are only ever
//! written as a whole array; there is no element-level merge.

use serde::{Deserialize, Serialize};

use crate::storage::Mergeable;

/// Workout identity. Positive ids come from the server, negative ids are local.
pub type WorkoutId = i64;

/// Kind of exercise. Serialized as `0` (resistance) or `1` (cardio).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ExerciseType {
    #[default]
    Resistance,
    Cardio,
}

impl From<ExerciseType> for u8 {
    fn from(value: ExerciseType) -> Self {
        match value {
            ExerciseType::Resistance => 0,
            ExerciseType::Cardio => 1,
        }
    }
}

impl TryFrom<u8> for ExerciseType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Resistance),
            1 => Ok(Self::Cardio),
            other => Err(format!("Unknown exercise type: {other}")),
        }
    }
}

impl std::fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resistance => write!(f, "strength"),
            Self::Cardio => write!(f, "cardio"),
        }
    }
}

impl std::str::FromStr for ExerciseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strength" | "resistance" | "weights" => Ok(Self::Resistance),
            "cardio" => Ok(Self::Cardio),
            _ => Err(format!("Unknown exercise type: {s}")),
        }
    }
}

/// A single exercise inside a workout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub exercise_type: ExerciseType,
    pub name: String,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub reps: Vec<u32>,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub distance: u32,
}

impl Exercise {
    /// Create an exercise with zeroed metrics.
    #[must_use]
    pub fn new(name: impl Into<String>, exercise_type: ExerciseType) -> Self {
        Self {
            name: name.into(),
            exercise_type,
            ..Self::default()
        }
    }

    /// Average reps per set, or `None` when no sets were logged.
    #[must_use]
    pub fn average_reps(&self) -> Option<f64> {
        if self.reps.is_empty() {
            return None;
        }
        let total: u64 = self.reps.iter().map(|&r| u64::from(r)).sum();
        #[allow(clippy::cast_precision_loss)]
        Some(total as f64 / self.reps.len() as f64)
    }

    /// Apply an element-level edit in place.
    pub fn apply(&mut self, patch: ExercisePatch) {
        if let Some(exercise_type) = patch.exercise_type {
            self.exercise_type = exercise_type;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(weight) = patch.weight {
            self.weight = weight;
        }
        if let Some(reps) = patch.reps {
            self.reps = reps;
        }
        if let Some(duration) = patch.duration {
            self.duration = duration;
        }
        if let Some(distance) = patch.distance {
            self.distance = distance;
        }
    }
}

/// Partial exercise edit used by `Store::update_exercise`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExercisePatch {
    pub exercise_type: Option<ExerciseType>,
    pub name: Option<String>,
    pub weight: Option<u32>,
    pub reps: Option<Vec<u32>>,
    pub duration: Option<u32>,
    pub distance: Option<u32>,
}

impl ExercisePatch {
    #[must_use]
    pub fn reps(reps: Vec<u32>) -> Self {
        Self {
            reps: Some(reps),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn weight(weight: u32) -> Self {
        Self {
            weight: Some(weight),
            ..Self::default()
        }
    }
}

/// A workout record or template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub id: WorkoutId,
    #[serde(default)]
    pub is_template: bool,
    /// ISO date (`YYYY-MM-DD`) for records, display name for templates.
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

impl Workout {
    /// Dated workout with no exercises.
    #[must_use]
    pub fn record(id: WorkoutId, date: impl Into<String>) -> Self {
        Self {
            id,
            is_template: false,
            tag: date.into(),
            exercises: Vec::new(),
        }
    }

    /// Named template with no exercises.
    #[must_use]
    pub fn template(id: WorkoutId, name: impl Into<String>) -> Self {
        Self {
            id,
            is_template: true,
            tag: name.into(),
            exercises: Vec::new(),
        }
    }

    /// Date of a non-template workout, if its tag parses as one.
    #[must_use]
    pub fn date(&self) -> Option<chrono::NaiveDate> {
        if self.is_template {
            return None;
        }
        chrono::NaiveDate::parse_from_str(&self.tag, "%Y-%m-%d").ok()
    }
}

/// Partial workout write.
///
/// `exercises`, when present, replaces the whole array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkoutPatch {
    pub is_template: Option<bool>,
    pub tag: Option<String>,
    pub exercises: Option<Vec<Exercise>>,
}

impl WorkoutPatch {
    #[must_use]
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn exercises(exercises: Vec<Exercise>) -> Self {
        Self {
            exercises: Some(exercises),
            ..Self::default()
        }
    }
}

impl From<Workout> for WorkoutPatch {
    fn from(w: Workout) -> Self {
        Self {
            is_template: Some(w.is_template),
            tag: Some(w.tag),
            exercises: Some(w.exercises),
        }
    }
}

impl Mergeable for Workout {
    type Key = WorkoutId;
    type Patch = WorkoutPatch;

    fn key(&self) -> WorkoutId {
        self.id
    }

    fn from_patch(key: WorkoutId, patch: WorkoutPatch) -> Self {
        let mut workout = Self {
            id: key,
            ..Self::default()
        };
        workout.merge(patch);
        workout
    }

    fn merge(&mut self, patch: WorkoutPatch) {
        if let Some(is_template) = patch.is_template {
            self.is_template = is_template;
        }
        if let Some(tag) = patch.tag {
            self.tag = tag;
        }
        if let Some(exercises) = patch.exercises {
            self.exercises = exercises;
        }
    }

    fn into_patch(self) -> WorkoutPatch {
        self.into()
    }
}
