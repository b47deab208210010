//! Dated records: daily weight entries and period days.
//!
//! Both are keyed by their ISO date rather than a server id.

use serde::{Deserialize, Serialize};

use crate::storage::Mergeable;

/// Body weight logged for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub date: String,
    pub value: u32,
}

impl WeightEntry {
    #[must_use]
    pub fn date(&self) -> Option<chrono::NaiveDate> {
        chrono::NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()
    }
}

/// Replacement value for a weight entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightPatch(pub u32);

impl From<WeightEntry> for WeightPatch {
    fn from(entry: WeightEntry) -> Self {
        Self(entry.value)
    }
}

impl Mergeable for WeightEntry {
    type Key = String;
    type Patch = WeightPatch;

    fn key(&self) -> String {
        self.date.clone()
    }

    fn from_patch(key: String, patch: WeightPatch) -> Self {
        Self {
            date: key,
            value: patch.0,
        }
    }

    fn merge(&mut self, patch: WeightPatch) {
        self.value = patch.0;
    }

    fn into_patch(self) -> WeightPatch {
        self.into()
    }
}

/// A marked period day. Presence in the cache means "marked".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDay {
    pub date: String,
}

impl Mergeable for PeriodDay {
    type Key = String;
    type Patch = ();

    fn key(&self) -> String {
        self.date.clone()
    }

    fn from_patch(key: String, (): ()) -> Self {
        Self { date: key }
    }

    fn merge(&mut self, (): ()) {}

    fn into_patch(self) {}
}
