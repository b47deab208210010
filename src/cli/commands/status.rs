//! Status command implementation.

use crate::cli::workspace::Workspace;
use crate::error::Result;
use crate::model::CollectionKind;
use serde::Serialize;
use std::path::PathBuf;

/// Output for status command.
#[derive(Serialize)]
struct StatusOutput {
    state_path: String,
    api_url: String,
    logged_in: bool,
    units: &'static str,
    cached: CacheCounts,
    /// Only collections with pending marks.
    pending: Vec<PendingOutput>,
    cursors: Vec<CursorOutput>,
}

#[derive(Serialize)]
struct CacheCounts {
    workouts: usize,
    templates: usize,
    tags: usize,
    tagged_dates: usize,
    weight_entries: usize,
    period_days: usize,
}

#[derive(Serialize)]
struct PendingOutput {
    collection: CollectionKind,
    count: usize,
}

#[derive(Serialize)]
struct CursorOutput {
    collection: CollectionKind,
    next_page: u32,
    has_more: bool,
}

/// Execute status command.
///
/// # Errors
///
/// Returns `NotInitialized` if no state file exists.
pub fn execute(state: Option<&PathBuf>, json: bool) -> Result<()> {
    let workspace = Workspace::open(state)?;
    let output = workspace.store().read(|s| StatusOutput {
        state_path: workspace.path().display().to_string(),
        api_url: workspace.config().api_url(),
        logged_in: s.is_logged_in(),
        units: s.settings().weight_unit(),
        cached: CacheCounts {
            workouts: s.records().count(),
            templates: s.templates().count(),
            tags: s.tags().len(),
            tagged_dates: s.tagged_dates().len(),
            weight_entries: s.weight_entries().len(),
            period_days: s.period_days().len(),
        },
        pending: s
            .dirty()
            .counts()
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(collection, count)| PendingOutput { collection, count })
            .collect(),
        cursors: s
            .cursors()
            .iter()
            .map(|(collection, cursor)| CursorOutput {
                collection,
                next_page: cursor.page,
                has_more: cursor.has_more,
            })
            .collect(),
    });

    if json {
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("Aro Status");
    println!("==========");
    println!();
    println!("State:   {}", output.state_path);
    println!("Server:  {}", output.api_url);
    if output.logged_in {
        println!("Session: logged in");
    } else {
        println!("Session: not logged in (changes stay local)");
    }
    println!("Units:   {}", output.units);
    println!();

    let c = &output.cached;
    println!("Cached:");
    println!("  Workouts:       {}", c.workouts);
    println!("  Templates:      {}", c.templates);
    println!("  Tags:           {}", c.tags);
    println!("  Tagged dates:   {}", c.tagged_dates);
    println!("  Weight entries: {}", c.weight_entries);
    println!("  Period days:    {}", c.period_days);

    if !output.pending.is_empty() {
        println!();
        println!("Pending push:");
        for p in &output.pending {
            println!("  {}: {}", p.collection, p.count);
        }
    }

    let more: Vec<&CursorOutput> = output.cursors.iter().filter(|c| c.has_more).collect();
    if !more.is_empty() {
        println!();
        println!("More on server:");
        for cursor in more {
            println!("  {} (next page {})", cursor.collection, cursor.next_page);
        }
    }

    Ok(())
}
