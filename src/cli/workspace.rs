//! Shared setup for commands that read or edit the cached state.
//!
//! Each invocation loads the persisted snapshot, applies one command, then
//! saves. An edit behaves like a debounced change followed by teardown: if
//! a session exists, the pending flush runs before the process exits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::{resolve_state_path, Config};
use crate::error::{Error, Result};
use crate::storage::{Persister, SqliteKv, StoreHandle};
use crate::sync::{Debouncer, HttpRemote, Paginator, SyncEngine};

/// The loaded state file, its config, and the cache built from it.
pub struct Workspace {
    path: PathBuf,
    config: Config,
    persister: Persister<SqliteKv>,
    store: StoreHandle,
}

impl Workspace {
    /// Open the state file and load its snapshot.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` when the state file does not exist, or the
    /// underlying config/database error.
    pub fn open(state: Option<&PathBuf>) -> Result<Self> {
        let path = resolve_state_path(state.map(PathBuf::as_path)).ok_or(Error::NotInitialized)?;
        if !path.exists() {
            return Err(Error::NotInitialized);
        }

        let config = load_config()?;
        let installation_id = config.installation_id.clone().unwrap_or_default();
        let mut persister = Persister::new(SqliteKv::open(&path)?, &installation_id);
        let store = persister.load()?;
        debug!(path = %path.display(), key = persister.key(), "Opened workspace");

        Ok(Self {
            path,
            config,
            persister,
            store: StoreHandle::new(store),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &StoreHandle {
        &self.store
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.store.read(|s| s.is_logged_in())
    }

    fn remote(&self) -> Arc<HttpRemote> {
        Arc::new(HttpRemote::new(self.config.api_url()))
    }

    #[must_use]
    pub fn engine(&self) -> SyncEngine<HttpRemote> {
        SyncEngine::new(self.store.clone(), self.remote()).with_retry(self.config.retry.policy())
    }

    #[must_use]
    pub fn paginator(&self) -> Paginator<HttpRemote> {
        Paginator::new(self.store.clone(), self.remote())
    }

    /// Persist the current cache. Returns false when nothing changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    pub fn save(&mut self) -> Result<bool> {
        let snapshot = self.store.snapshot();
        self.persister.save(&snapshot)
    }

    /// Drop the session and every cached record, in memory and on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted key cannot be deleted.
    pub fn reset(&mut self) -> Result<()> {
        self.store.write(crate::storage::Store::reset);
        self.persister.clear()
    }

    /// Save an edit, then push it unless `offline` or logged out.
    ///
    /// Push failures are logged by the engine and leave the change cached;
    /// they never fail the command.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written or the async
    /// runtime cannot start.
    pub fn commit(mut self, offline: bool) -> Result<()> {
        self.save()?;
        if offline || !self.is_logged_in() {
            return Ok(());
        }

        let engine = Arc::new(self.engine());
        let mut debouncer = Debouncer::new(engine, self.config.debounce());
        let flushed = runtime()?.block_on(async move {
            debouncer.trigger();
            debouncer.teardown().await
        });
        debug!(flushed, "Push after edit");

        self.save()?;
        Ok(())
    }
}

/// Load the config, generating and saving an installation id on first use.
///
/// # Errors
///
/// Returns `Error::Config` if the file cannot be read, parsed or written.
pub fn load_config() -> Result<Config> {
    let mut config = Config::load()?;
    let (id, generated) = config.ensure_installation_id();
    if generated {
        debug!(installation_id = %id, "Generated installation id");
        config.save()?;
    }
    Ok(config)
}

/// Create the tokio runtime used by network commands.
///
/// # Errors
///
/// Returns `Error::Other` if the runtime cannot be created.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))
}

/// Turn a validator rejection into an `InvalidArgument` error.
#[must_use]
pub fn invalid(what: &str, (input, suggestion): (String, Option<String>)) -> Error {
    match suggestion {
        Some(s) => Error::InvalidArgument(format!("invalid {what} '{input}' (expected {s})")),
        None => Error::InvalidArgument(format!("invalid {what} '{input}'")),
    }
}
