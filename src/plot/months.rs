//! Calendar-month boundaries in a date-sorted series.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Where a new calendar month begins in a sorted series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthInterval {
    /// Position of the first point in the new month.
    pub index: usize,
    /// Months elapsed since the previous interval's month.
    pub elapsed: u32,
}

/// Whole calendar months between `earliest` and `latest`, ignoring days.
#[must_use]
pub fn month_diff(earliest: NaiveDate, latest: NaiveDate) -> u32 {
    let years = latest.year() - earliest.year();
    let months = i64::from(latest.month()) - i64::from(earliest.month()) + 12 * i64::from(years);
    u32::try_from(months.unsigned_abs()).unwrap_or(u32::MAX)
}

/// Month boundaries of a date-sorted sequence.
///
/// The first interval is always `{index: 0, elapsed: 1}`, even for an
/// empty sequence.
pub fn month_intervals(dates: impl IntoIterator<Item = NaiveDate>) -> Vec<MonthInterval> {
    let mut intervals = vec![MonthInterval {
        index: 0,
        elapsed: 1,
    }];
    let mut prev: Option<NaiveDate> = None;
    for (index, date) in dates.into_iter().enumerate() {
        if let Some(p) = prev {
            if (p.year(), p.month()) != (date.year(), date.month()) {
                intervals.push(MonthInterval {
                    index,
                    elapsed: month_diff(p, date),
                });
            }
        }
        prev = Some(date);
    }
    intervals
}

/// Index of the first point at least `n` months before the latest one.
///
/// Walks the intervals from the end, summing `elapsed`; returns 0 when the
/// series spans fewer than `n` months.
#[must_use]
pub fn get_month_index(intervals: &[MonthInterval], n: u32) -> usize {
    let mut count: u32 = 0;
    for interval in intervals.iter().rev() {
        count = count.saturating_add(interval.elapsed);
        if count >= n {
            return interval.index;
        }
    }
    0
}
