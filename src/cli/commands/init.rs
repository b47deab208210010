//! Initialize the local state.
//!
//! Creates the SQLite state file (default `~/.aro/data/state.db`, or
//! `~/.aro/test/state.db` in test mode) and makes sure the config carries
//! an installation id, which scopes the persisted snapshot key.

use crate::cli::workspace::load_config;
use crate::config::{config_path, global_aro_dir, resolve_state_path};
use crate::error::{Error, Result};
use crate::storage::{Persister, SqliteKv};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

#[derive(Serialize)]
struct InitOutput {
    state: PathBuf,
    config: PathBuf,
    installation_id: String,
    reset: bool,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns `AlreadyInitialized` if the state file exists and `force` is not
/// set, or an error if the directory or database cannot be created.
pub fn execute(state: Option<&PathBuf>, force: bool, json: bool) -> Result<()> {
    let path = resolve_state_path(state.map(PathBuf::as_path))
        .ok_or_else(|| Error::Config("Could not determine state directory".to_string()))?;

    let existed = path.exists();
    if existed && !force {
        return Err(Error::AlreadyInitialized { path });
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Everything under ~/.aro is machine-local.
    if let Some(base_dir) = global_aro_dir().filter(|dir| path.starts_with(dir)) {
        let gitignore_path = base_dir.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(&gitignore_path, "# Local Aro state, never commit\n*\n")?;
        }
    }

    let config = load_config()?;
    let installation_id = config.installation_id.clone().unwrap_or_default();

    // Opening applies the schema.
    let mut persister = Persister::new(SqliteKv::open(&path)?, &installation_id);
    if existed {
        persister.clear()?;
    }

    if json {
        let output = InitOutput {
            state: path,
            config: config_path()?,
            installation_id,
            reset: existed,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        if existed {
            println!("Reset Aro state");
        } else {
            println!("Initialized Aro state");
        }
        println!("  State:  {}", path.display());
        println!("  Config: {}", config_path()?.display());
        println!();
        println!("Next: run 'aro login <email>' to sync, or start logging with 'aro workout new'.");
    }

    Ok(())
}
