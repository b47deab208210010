//! Input validation for CLI arguments.
//!
//! Dates, colors and unit names arrive as free text. Each normalizer
//! resolves in three tiers: exact match → synonym lookup → error with a
//! suggestion.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use chrono::{Days, Local, NaiveDate};

// ── Valid value sets ─────────────────────────────────────────

pub static VALID_UNITS: LazyLock<HashSet<&str>> =
    LazyLock::new(|| ["imperial", "metric"].into_iter().collect());

pub static UNIT_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("lbs", "imperial"),
        ("lb", "imperial"),
        ("pounds", "imperial"),
        ("us", "imperial"),
        ("kg", "metric"),
        ("kgs", "metric"),
        ("kilograms", "metric"),
        ("si", "metric"),
    ]
    .into_iter()
    .collect()
});

/// Relative day names accepted wherever a date is expected.
static RELATIVE_DAYS: LazyLock<HashMap<&str, u64>> =
    LazyLock::new(|| [("today", 0), ("yesterday", 1)].into_iter().collect());

/// Normalize a unit system name. Returns true for imperial.
pub fn normalize_units(input: &str) -> Result<bool, (String, Option<String>)> {
    let lower = input.trim().to_lowercase();

    let canonical = if VALID_UNITS.contains(lower.as_str()) {
        lower.as_str()
    } else if let Some(&canonical) = UNIT_SYNONYMS.get(lower.as_str()) {
        canonical
    } else {
        let suggestion = find_closest_match(&lower, &VALID_UNITS, &UNIT_SYNONYMS);
        return Err((input.to_string(), suggestion));
    };

    Ok(canonical == "imperial")
}

/// Normalize a calendar date to `YYYY-MM-DD`.
///
/// Accepts ISO dates (`2024-5-1` is padded), `today` and `yesterday`.
pub fn normalize_date(input: &str) -> Result<String, (String, Option<String>)> {
    let lower = input.trim().to_lowercase();

    if let Some(&back) = RELATIVE_DAYS.get(lower.as_str()) {
        let today = Local::now().date_naive();
        return today
            .checked_sub_days(Days::new(back))
            .map(|d| d.format("%Y-%m-%d").to_string())
            .ok_or_else(|| (input.to_string(), None));
    }

    NaiveDate::parse_from_str(&lower, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| (input.to_string(), Some("YYYY-MM-DD, today or yesterday".to_string())))
}

/// Today's date as `YYYY-MM-DD`.
#[must_use]
pub fn today() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Normalize a hex color to lowercase `#rrggbb`.
///
/// The leading `#` is optional and `#rgb` shorthand is expanded.
pub fn normalize_color(input: &str) -> Result<String, (String, Option<String>)> {
    let hex = input.trim().trim_start_matches('#').to_lowercase();
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err((input.to_string(), None));
    }

    match hex.len() {
        6 => Ok(format!("#{hex}")),
        3 => Ok(hex.chars().fold(String::from("#"), |mut out, c| {
            out.push(c);
            out.push(c);
            out
        })),
        _ => Err((input.to_string(), None)),
    }
}

/// Parse a comma-separated rep list such as `5,5,6`.
///
/// An empty string yields no sets.
pub fn parse_reps(input: &str) -> Result<Vec<u32>, (String, Option<String>)> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map_err(|_| (input.to_string(), Some(format!("'{s}' is not a rep count"))))
        })
        .collect()
}

/// Find the closest matching value across valid set and synonyms.
fn find_closest_match(
    input: &str,
    valid: &HashSet<&str>,
    synonyms: &HashMap<&str, &str>,
) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;

    for &v in valid.iter().chain(synonyms.keys()) {
        let dist = levenshtein_distance(input, v);
        if dist <= 3 && best.is_none_or(|(_, d)| dist < d) {
            let shown = synonyms.get(v).copied().unwrap_or(v);
            best = Some((shown, dist));
        }
    }

    best.map(|(v, _)| v.to_string())
}

// ── Levenshtein distance ─────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Names from `existing` within edit distance 3 of `searched`, ignoring case.
///
/// Returns up to `max` suggestions sorted by distance then alphabetically,
/// without duplicates.
#[must_use]
pub fn find_similar_names(searched: &str, existing: &[String], max: usize) -> Vec<String> {
    let searched = searched.to_lowercase();
    let mut candidates: Vec<(usize, &str)> = existing
        .iter()
        .map(|name| (levenshtein_distance(&searched, &name.to_lowercase()), name.as_str()))
        .filter(|(dist, _)| *dist <= 3)
        .collect();

    candidates.sort_unstable();
    candidates.dedup_by(|a, b| a.1.eq_ignore_ascii_case(b.1));

    candidates
        .into_iter()
        .take(max)
        .map(|(_, name)| name.to_string())
        .collect()
}
