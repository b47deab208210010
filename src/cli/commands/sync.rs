//! Sync command implementations: push pending changes, fetch more pages.
//!
//! Remote failures are reported in the output but never fail the command;
//! whatever did not reach the server stays cached for the next push.

use crate::cli::workspace::{runtime, Workspace};
use crate::error::{Error, Result};
use crate::model::CollectionKind;
use crate::sync::{FetchOutcome, FlushOutcome};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct FlushLine {
    collection: CollectionKind,
    status: &'static str,
    upserted: usize,
    deleted: usize,
    deferred: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attempts: Option<u32>,
}

impl FlushLine {
    fn new(collection: CollectionKind, outcome: &FlushOutcome) -> Self {
        let mut line = Self {
            collection,
            status: "clean",
            upserted: 0,
            deleted: 0,
            deferred: 0,
            error: None,
            attempts: None,
        };
        match outcome {
            FlushOutcome::Clean => {}
            FlushOutcome::InFlight => line.status = "in_flight",
            FlushOutcome::NotLoggedIn => line.status = "not_logged_in",
            FlushOutcome::Flushed(report) => {
                line.status = "pushed";
                line.upserted = report.upserted;
                line.deleted = report.deleted;
                line.deferred = report.deferred;
            }
            FlushOutcome::Failed { error, attempts } => {
                line.status = "failed";
                line.error = Some(error.to_string());
                line.attempts = Some(*attempts);
            }
        }
        line
    }
}

#[derive(Serialize)]
struct SyncOutput {
    collections: Vec<FlushLine>,
    failed: usize,
}

#[derive(Serialize)]
struct PageLine {
    page: u32,
    received: usize,
    has_more: bool,
}

#[derive(Serialize)]
struct FetchOutput {
    collection: CollectionKind,
    pages: Vec<PageLine>,
    received: usize,
    has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Push every pending change, collection by collection.
///
/// # Errors
///
/// Returns `NotLoggedIn` without a session, or a storage error.
pub fn push(state: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut workspace = Workspace::open(state)?;
    if !workspace.is_logged_in() {
        return Err(Error::NotLoggedIn);
    }

    let engine = workspace.engine();
    let outcomes = runtime()?.block_on(engine.flush_all());
    workspace.save()?;

    let collections: Vec<FlushLine> = outcomes
        .iter()
        .map(|(kind, outcome)| FlushLine::new(*kind, outcome))
        .collect();
    let failed = outcomes.iter().filter(|(_, o)| o.is_failure()).count();

    if json {
        let output = SyncOutput {
            collections,
            failed,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    for line in &collections {
        let name = format!("{:<15}", line.collection.as_str());
        match line.status {
            "pushed" => {
                let mut detail = format!("{} saved, {} deleted", line.upserted, line.deleted);
                if line.deferred > 0 {
                    detail.push_str(&format!(", {} deferred", line.deferred));
                }
                println!("  {name} {}", detail.green());
            }
            "failed" => println!(
                "  {name} {} {}",
                "failed".yellow(),
                line.error.as_deref().unwrap_or_default().dimmed()
            ),
            other => println!("  {name} {}", other.replace('_', " ").dimmed()),
        }
    }
    if failed > 0 {
        println!();
        println!("{failed} collection(s) kept their changes; they will be retried on the next push.");
    }
    Ok(())
}

/// Fetch the next page of one collection, or every remaining page.
///
/// # Errors
///
/// Returns `InvalidArgument` for an unknown or non-paginated collection,
/// `NotLoggedIn` without a session, or a storage error.
pub fn fetch(collection: &str, all: bool, state: Option<&PathBuf>, json: bool) -> Result<()> {
    let kind: CollectionKind = collection.parse().map_err(Error::InvalidArgument)?;
    if !CollectionKind::PAGINATED.contains(&kind) {
        return Err(Error::InvalidArgument(format!(
            "{kind} is not a paginated collection"
        )));
    }

    let mut workspace = Workspace::open(state)?;
    if !workspace.is_logged_in() {
        return Err(Error::NotLoggedIn);
    }

    let paginator = workspace.paginator();
    let (pages, error) = runtime()?.block_on(async {
        let mut pages = Vec::new();
        loop {
            match paginator.fetch_more(kind).await {
                FetchOutcome::Fetched {
                    page,
                    received,
                    has_more,
                } => {
                    pages.push(PageLine {
                        page,
                        received,
                        has_more,
                    });
                    if !(all && has_more) {
                        return (pages, None);
                    }
                }
                FetchOutcome::Failed(e) => return (pages, Some(e.to_string())),
                FetchOutcome::NoMore | FetchOutcome::InFlight | FetchOutcome::NotLoggedIn => {
                    return (pages, None);
                }
            }
        }
    });
    workspace.save()?;

    let output = FetchOutput {
        collection: kind,
        received: pages.iter().map(|p| p.received).sum(),
        has_more: workspace.store().read(|s| s.cursors().get(kind).has_more),
        pages,
        error,
    };

    if json {
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if output.pages.is_empty() && output.error.is_none() {
        println!("Nothing more to fetch for {kind}");
    } else {
        println!(
            "Fetched {} records of {kind} in {} page(s)",
            output.received,
            output.pages.len()
        );
    }
    if let Some(err) = &output.error {
        println!("{} {}", "Fetch failed:".yellow(), err.dimmed());
    }
    if output.has_more {
        println!("{}", format!("More available: aro fetch {kind}").dimmed());
    }
    Ok(())
}
