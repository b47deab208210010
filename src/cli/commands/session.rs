//! Session commands: login, signup, logout.

use crate::cli::workspace::{runtime, Workspace};
use crate::cli::CredentialArgs;
use crate::error::Result;
use crate::sync::Credentials;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct LoginOutput {
    email: String,
    api_url: String,
    received: usize,
    created: bool,
}

#[derive(Serialize)]
struct LogoutOutput {
    logged_out: bool,
    was_logged_in: bool,
}

/// Log in and replace the cache with the server's first page.
///
/// # Errors
///
/// Returns the remote error if the credentials are rejected or the
/// initial load fails.
pub fn login(args: &CredentialArgs, state: Option<&PathBuf>, json: bool) -> Result<()> {
    authenticate(args, false, state, json)
}

/// Create an account, then log in to it.
///
/// # Errors
///
/// Returns the remote error if signup or the initial load fails.
pub fn signup(args: &CredentialArgs, state: Option<&PathBuf>, json: bool) -> Result<()> {
    authenticate(args, true, state, json)
}

fn authenticate(args: &CredentialArgs, create: bool, state: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut workspace = Workspace::open(state)?;
    let credentials = Credentials {
        email: args.email.trim().to_string(),
        password: args.password.clone(),
    };

    let paginator = workspace.paginator();
    let result = runtime()?.block_on(async {
        if create {
            paginator.signup(&credentials).await
        } else {
            paginator.login(&credentials).await
        }
    });

    // The token survives a failed initial load; keep it.
    workspace.save()?;
    let received = result?;

    if json {
        let output = LoginOutput {
            email: credentials.email,
            api_url: workspace.config().api_url(),
            received,
            created: create,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        let verb = if create { "Signed up" } else { "Logged in" };
        println!("{verb} as {}", credentials.email);
        println!("  Loaded {received} records from {}", workspace.config().api_url());
    }

    Ok(())
}

/// Forget the session and delete the persisted cache.
///
/// Changes that were never pushed are discarded.
///
/// # Errors
///
/// Returns an error if the persisted snapshot cannot be deleted.
pub fn logout(state: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut workspace = Workspace::open(state)?;
    let was_logged_in = workspace.is_logged_in();
    workspace.reset()?;

    if json {
        let output = LogoutOutput {
            logged_out: true,
            was_logged_in,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if was_logged_in {
        println!("Logged out. Local cache cleared.");
    } else {
        println!("Not logged in. Local cache cleared.");
    }

    Ok(())
}
