//! Plot command implementations.
//!
//! Prints a windowed, simplified series: the same points a chart would draw.

use crate::cli::workspace::Workspace;
use crate::cli::{PlotArgs, PlotCommands};
use crate::error::{Error, Result};
use crate::plot::{exercise_series, month_intervals, weight_series, Metric, MonthInterval, Range, TimeSeries};
use crate::validate::find_similar_names;
use chrono::NaiveDate;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

const BAR_WIDTH: f64 = 40.0;

#[derive(Serialize)]
struct PlotOutput {
    series: String,
    metric: Metric,
    range: String,
    /// Points in the window before simplification.
    source_points: usize,
    points: Vec<PlotLine>,
    /// Month boundaries within `points`, for axis labels.
    months: Vec<MonthInterval>,
}

#[derive(Serialize)]
struct PlotLine {
    date: NaiveDate,
    timestamp: i64,
    value: f64,
}

/// Execute plot commands.
///
/// # Errors
///
/// Returns `InvalidArgument` for an unknown range or metric and
/// `ExerciseNameNotFound` when no dated workout logs the exercise.
pub fn execute(command: &PlotCommands, state: Option<&PathBuf>, json: bool) -> Result<()> {
    let workspace = Workspace::open(state)?;

    let (label, series, metric, args) = match command {
        PlotCommands::Exercise { name, metric, args } => {
            let metric: Metric = metric.parse().map_err(Error::InvalidArgument)?;
            let series = workspace.store().read(|s| exercise_series(s, name));
            if series.is_empty() {
                let known: Vec<String> = workspace.store().read(|s| {
                    s.records()
                        .flat_map(|w| w.exercises.iter().map(|e| e.name.trim().to_string()))
                        .collect()
                });
                return Err(Error::ExerciseNameNotFound {
                    name: name.clone(),
                    similar: find_similar_names(name, &known, 3),
                });
            }
            (name.trim().to_string(), series, metric, args)
        }
        PlotCommands::Weight { args } => {
            let series = workspace.store().read(weight_series);
            ("body weight".to_string(), series, Metric::Weight, args)
        }
    };

    let output = render(label, &series, metric, args, workspace.config().plot_points)?;

    if json {
        println!("{}", serde_json::to_string(&output)?);
    } else {
        print_chart(&output);
    }
    Ok(())
}

fn render(label: String, series: &TimeSeries, metric: Metric, args: &PlotArgs, default_points: usize) -> Result<PlotOutput> {
    let range: Range = args.range.parse().map_err(Error::InvalidArgument)?;
    let target = args.points.unwrap_or(default_points);

    let simplified = series.simplified(range, metric, target);
    let months = month_intervals(simplified.iter().map(|p| p.date));
    let points = simplified
        .iter()
        .filter_map(|p| {
            Some(PlotLine {
                date: p.date,
                timestamp: p.timestamp_ms(),
                value: p.value(metric)?,
            })
        })
        .collect();

    Ok(PlotOutput {
        series: label,
        metric,
        range: args.range.clone(),
        source_points: series.window(range).len(),
        points,
        months,
    })
}

fn print_chart(output: &PlotOutput) {
    println!(
        "{} {} {}",
        output.series.cyan().bold(),
        output.metric.to_string().dimmed(),
        format!("({} of {} points, range {})", output.points.len(), output.source_points, output.range).dimmed()
    );
    if output.points.is_empty() {
        println!("  {}", "(no data in range)".dimmed());
        return;
    }

    let max = output.points.iter().map(|p| p.value).fold(0.0_f64, f64::max);
    for line in &output.points {
        let width = if max > 0.0 { line.value / max * BAR_WIDTH } else { 0.0 };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bar = "█".repeat(width.round() as usize);
        println!("  {} {:>8.1} {}", line.date, line.value, bar.green());
    }
}
