//! Data models for Aro.
//!
//! This module contains every cacheable entity:
//! - Workout / Exercise (workouts and templates)
//! - Tag / TaggedDate (calendar tagging)
//! - WeightEntry / PeriodDay (dated records)
//! - UserSettings
//!
//! Each entity has an identity (a server-assigned integer id or a natural
//! date key) and a patch type carrying the fields a partial write supplies.

pub mod record;
pub mod settings;
pub mod tag;
pub mod workout;

pub use record::{PeriodDay, WeightEntry, WeightPatch};
pub use settings::{SettingsPatch, UserSettings};
pub use tag::{Tag, TagId, TagPatch, TaggedDate};
pub use workout::{Exercise, ExercisePatch, ExerciseType, Workout, WorkoutId, WorkoutPatch};

use serde::{Deserialize, Serialize};

/// Returns true for identities allocated locally before the server saw them.
///
/// Local ids are negative; the server only ever assigns positive ids.
#[must_use]
pub const fn is_local_id(id: i64) -> bool {
    id < 0
}

/// Explicit tag for every synchronized/paginated collection.
///
/// Workouts and templates live in one cache collection but keep separate
/// pagination cursors, so they are distinct kinds here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Workouts,
    Templates,
    Tags,
    TaggedDates,
    WeightEntries,
    PeriodDays,
    Settings,
}

impl CollectionKind {
    /// Every kind, in flush order.
    pub const ALL: [Self; 7] = [
        Self::Settings,
        Self::Tags,
        Self::TaggedDates,
        Self::Workouts,
        Self::Templates,
        Self::WeightEntries,
        Self::PeriodDays,
    ];

    /// Kinds that the remote serves page by page.
    pub const PAGINATED: [Self; 6] = [
        Self::Workouts,
        Self::Templates,
        Self::Tags,
        Self::TaggedDates,
        Self::WeightEntries,
        Self::PeriodDays,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Workouts => "workouts",
            Self::Templates => "templates",
            Self::Tags => "tags",
            Self::TaggedDates => "tagged_dates",
            Self::WeightEntries => "weight_entries",
            Self::PeriodDays => "period_days",
            Self::Settings => "settings",
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CollectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "workouts" | "workout" => Ok(Self::Workouts),
            "templates" | "template" => Ok(Self::Templates),
            "tags" | "tag" => Ok(Self::Tags),
            "tagged_dates" | "dates" => Ok(Self::TaggedDates),
            "weight_entries" | "weights" | "weight" => Ok(Self::WeightEntries),
            "period_days" | "period" => Ok(Self::PeriodDays),
            "settings" => Ok(Self::Settings),
            _ => Err(format!("Unknown collection: {s}")),
        }
    }
}
