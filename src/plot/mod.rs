//! Time-series derivation for charts.
//!
//! Everything here is a read-only projection of the cache: series are
//! rebuilt from a [`Store`](crate::storage::Store) on demand, windowed by
//! calendar months, and simplified with Ramer-Douglas-Peucker so a chart
//! never has to draw more points than it has pixels for.

mod months;
mod series;
mod simplify;

pub use months::{get_month_index, month_diff, month_intervals, MonthInterval};
pub use series::{exercise_series, weight_series, Metric, PlotPoint, Range, TimeSeries};
pub use simplify::{perpendicular_distance, ramer_douglas_peucker, simplify, Vec2};
