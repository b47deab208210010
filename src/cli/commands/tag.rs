//! Calendar tag command implementations.

use crate::cli::workspace::{invalid, Workspace};
use crate::cli::TagCommands;
use crate::error::{Error, Result};
use crate::model::{Tag, TagId, TagPatch};
use crate::storage::Origin;
use crate::validate::{normalize_color, normalize_date};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct TagListOutput {
    tags: Vec<TagWithUsage>,
    count: usize,
}

#[derive(Serialize)]
struct TagWithUsage {
    #[serde(flatten)]
    tag: Tag,
    /// Dates carrying this tag.
    dates: usize,
}

#[derive(Serialize)]
struct ToggleOutput {
    date: String,
    tag_id: TagId,
    applied: bool,
    tag_ids: Vec<TagId>,
}

#[derive(Serialize)]
struct RemovedOutput {
    id: TagId,
    removed: bool,
}

/// Execute tag commands.
///
/// # Errors
///
/// Returns `TagNotFound` for unknown tags and `InvalidArgument` for
/// malformed colors or dates.
pub fn execute(command: &TagCommands, state: Option<&PathBuf>, offline: bool, json: bool) -> Result<()> {
    match command {
        TagCommands::New { name, color } => create(name, color.as_deref(), state, offline, json),
        TagCommands::Rename { id, name } => {
            let patch = TagPatch {
                name: Some(non_empty_name(name)?),
                color: None,
            };
            update(*id, patch, state, offline, json)
        }
        TagCommands::Color { id, color } => {
            let patch = TagPatch {
                name: None,
                color: Some(normalize_color(color).map_err(|e| invalid("color", e))?),
            };
            update(*id, patch, state, offline, json)
        }
        TagCommands::Remove { id } => remove(*id, state, offline, json),
        TagCommands::List => list(state, json),
        TagCommands::Toggle { id, date } => toggle(*id, date, state, offline, json),
    }
}

fn non_empty_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidArgument("tag name cannot be empty".to_string()));
    }
    Ok(name.to_string())
}

fn create(name: &str, color: Option<&str>, state: Option<&PathBuf>, offline: bool, json: bool) -> Result<()> {
    let name = non_empty_name(name)?;
    let color = color
        .map(|c| normalize_color(c).map_err(|e| invalid("color", e)))
        .transpose()?;

    let workspace = Workspace::open(state)?;
    let tag = workspace.store().write(|s| {
        let id = s.create_tag(&name, color);
        s.tag(id).cloned()
    });
    workspace.commit(offline)?;

    let tag = tag.ok_or_else(|| Error::Other("tag vanished after creation".to_string()))?;
    if crate::is_silent() {
        println!("{}", tag.id);
    } else {
        print_tag(&tag, json)?;
    }
    Ok(())
}

fn update(id: TagId, patch: TagPatch, state: Option<&PathBuf>, offline: bool, json: bool) -> Result<()> {
    let workspace = Workspace::open(state)?;
    let tag = workspace.store().write(|s| {
        if s.tag(id).is_none() {
            return Err(Error::TagNotFound { id });
        }
        Ok(s.upsert_tag(id, patch, Origin::Local).clone())
    })?;
    workspace.commit(offline)?;

    print_tag(&tag, json)
}

fn remove(id: TagId, state: Option<&PathBuf>, offline: bool, json: bool) -> Result<()> {
    let workspace = Workspace::open(state)?;
    let removed = workspace
        .store()
        .write(|s| s.remove_tag(id, Origin::Local))
        .ok_or(Error::TagNotFound { id })?;
    workspace.commit(offline)?;

    if json {
        let output = RemovedOutput { id, removed: true };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Removed tag {id} ({})", removed.name);
    }
    Ok(())
}

fn list(state: Option<&PathBuf>, json: bool) -> Result<()> {
    let workspace = Workspace::open(state)?;
    let mut tags: Vec<TagWithUsage> = workspace.store().read(|s| {
        s.tags()
            .values()
            .map(|tag| TagWithUsage {
                tag: tag.clone(),
                dates: s.tagged_dates().values().filter(|d| d.contains(tag.id)).count(),
            })
            .collect()
    });
    tags.sort_by(|a, b| a.tag.name.to_lowercase().cmp(&b.tag.name.to_lowercase()));

    if json {
        let output = TagListOutput {
            count: tags.len(),
            tags,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if tags.is_empty() {
        println!("No tags. Create one with: aro tag new \"Deload\" --color '#ff8800'");
        return Ok(());
    }
    for t in &tags {
        println!(
            "{} {} {} {}",
            format!("{:>6}", t.tag.id).cyan(),
            t.tag.name.bold(),
            t.tag.color.dimmed(),
            format!("({} dates)", t.dates).dimmed()
        );
    }
    Ok(())
}

fn toggle(id: TagId, date: &str, state: Option<&PathBuf>, offline: bool, json: bool) -> Result<()> {
    let date = normalize_date(date).map_err(|e| invalid("date", e))?;
    let workspace = Workspace::open(state)?;

    let (applied, tag_ids, name) = workspace.store().write(|s| {
        let name = s.tag(id).map(|t| t.name.clone()).ok_or(Error::TagNotFound { id })?;
        let applied = s.toggle_tagged_date(&date, id);
        Ok::<_, Error>((applied, s.tag_ids_for(&date).to_vec(), name))
    })?;
    workspace.commit(offline)?;

    if json {
        let output = ToggleOutput {
            date,
            tag_id: id,
            applied,
            tag_ids,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if applied {
        println!("Tagged {date} with {name}");
    } else {
        println!("Removed {name} from {date}");
    }
    Ok(())
}

fn print_tag(tag: &Tag, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(tag)?);
    } else {
        println!("{} {} {}", "Tag".cyan().bold(), tag.id, tag.name.bold());
        println!("  Color: {}", tag.color);
    }
    Ok(())
}
