//! Plot points projected from the cache.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use super::months::{get_month_index, month_intervals, MonthInterval};
use super::simplify::{simplify, Vec2};
use crate::model::Exercise;
use crate::storage::Store;

/// One dated sample. Fields a source does not carry are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotPoint {
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_reps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl PlotPoint {
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self {
            date,
            weight: None,
            average_reps: None,
            distance: None,
            duration: None,
        }
    }

    /// Midnight UTC of `date`, in milliseconds since the epoch.
    #[must_use]
    pub fn timestamp_ms(&self) -> i64 {
        self.date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
    }

    #[must_use]
    pub const fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Weight => self.weight,
            Metric::AverageReps => self.average_reps,
            Metric::Distance => self.distance,
            Metric::Duration => self.duration,
        }
    }

    /// `(timestamp, value)` projection used for simplification.
    #[must_use]
    pub fn to_vec2(&self, metric: Metric) -> Vec2 {
        #[allow(clippy::cast_precision_loss)]
        let x = self.timestamp_ms() as f64;
        Vec2::new(x, self.value(metric).unwrap_or_default())
    }
}

/// Which value of a [`PlotPoint`] to chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Weight,
    AverageReps,
    Distance,
    Duration,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Weight => "weight",
            Self::AverageReps => "average_reps",
            Self::Distance => "distance",
            Self::Duration => "duration",
        })
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "weight" => Ok(Self::Weight),
            "reps" | "average_reps" => Ok(Self::AverageReps),
            "distance" => Ok(Self::Distance),
            "duration" => Ok(Self::Duration),
            _ => Err(format!("Unknown metric: {s}")),
        }
    }
}

/// How far back from the latest point to chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Range {
    Months(u32),
    #[default]
    All,
}

impl FromStr for Range {
    type Err = String;

    /// Accepts `all`, `6m` / `6`, or `1y`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s == "all" {
            return Ok(Self::All);
        }
        let (digits, per_unit) = if let Some(d) = s.strip_suffix('y') {
            (d, 12)
        } else {
            (s.strip_suffix('m').unwrap_or(&s), 1)
        };
        digits
            .parse::<u32>()
            .ok()
            .and_then(|n| n.checked_mul(per_unit))
            .map(Self::Months)
            .ok_or_else(|| format!("Invalid range: {s} (expected all, <n>m or <n>y)"))
    }
}

/// A date-sorted series with its month boundaries.
#[derive(Debug, Clone, Default)]
pub struct TimeSeries {
    points: Vec<PlotPoint>,
    intervals: Vec<MonthInterval>,
}

impl TimeSeries {
    /// Sort `points` by date and index their month boundaries.
    #[must_use]
    pub fn new(mut points: Vec<PlotPoint>) -> Self {
        points.sort_by_key(|p| p.date);
        let intervals = month_intervals(points.iter().map(|p| p.date));
        Self { points, intervals }
    }

    #[must_use]
    pub fn points(&self) -> &[PlotPoint] {
        &self.points
    }

    #[must_use]
    pub fn intervals(&self) -> &[MonthInterval] {
        &self.intervals
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points within `range` of the latest one.
    #[must_use]
    pub fn window(&self, range: Range) -> &[PlotPoint] {
        match range {
            Range::All => &self.points,
            Range::Months(n) => {
                let start = get_month_index(&self.intervals, n).min(self.points.len());
                &self.points[start..]
            }
        }
    }

    /// Windowed points carrying `metric`, simplified to at most `target`.
    #[must_use]
    pub fn simplified(&self, range: Range, metric: Metric, target: usize) -> Vec<PlotPoint> {
        let window: Vec<PlotPoint> = self
            .window(range)
            .iter()
            .filter(|p| p.value(metric).is_some())
            .cloned()
            .collect();
        simplify(&window, target, |p| p.to_vec2(metric))
    }
}

/// One point per dated workout containing an exercise named `name`
/// (case-insensitive). Several matching exercises in one workout combine:
/// heaviest weight, reps averaged over all their sets, summed distance and
/// duration.
#[must_use]
pub fn exercise_series(store: &Store, name: &str) -> TimeSeries {
    let name = name.trim();
    let points = store
        .records()
        .filter_map(|workout| {
            let date = workout.date()?;
            let matching: Vec<&Exercise> = workout
                .exercises
                .iter()
                .filter(|e| e.name.trim().eq_ignore_ascii_case(name))
                .collect();
            if matching.is_empty() {
                return None;
            }

            let reps: Vec<u32> = matching.iter().flat_map(|e| e.reps.iter().copied()).collect();
            let combined = Exercise {
                reps,
                ..Exercise::default()
            };
            Some(PlotPoint {
                weight: matching.iter().map(|e| e.weight).max().map(f64::from),
                average_reps: combined.average_reps(),
                distance: Some(matching.iter().map(|e| f64::from(e.distance)).sum()),
                duration: Some(matching.iter().map(|e| f64::from(e.duration)).sum()),
                ..PlotPoint::new(date)
            })
        })
        .collect();
    TimeSeries::new(points)
}

/// Body-weight entries as a series. Entries with unparseable dates are skipped.
#[must_use]
pub fn weight_series(store: &Store) -> TimeSeries {
    let points = store
        .weight_entries()
        .values()
        .filter_map(|entry| {
            Some(PlotPoint {
                weight: Some(f64::from(entry.value)),
                ..PlotPoint::new(entry.date()?)
            })
        })
        .collect();
    TimeSeries::new(points)
}
