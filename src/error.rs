//! Error types for Aro.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=storage, 3=not_found, 4=validation, etc.)
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::model::{TagId, WorkoutId};
use crate::sync::RemoteError;

/// Result type alias for Aro operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Storage (exit 2)
    NotInitialized,
    AlreadyInitialized,
    DatabaseError,

    // Not Found (exit 3)
    WorkoutNotFound,
    ExerciseNotFound,
    TagNotFound,

    // Validation (exit 4)
    InvalidArgument,

    // Sync (exit 6)
    NotLoggedIn,
    RemoteError,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::WorkoutNotFound => "WORKOUT_NOT_FOUND",
            Self::ExerciseNotFound => "EXERCISE_NOT_FOUND",
            Self::TagNotFound => "TAG_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::NotLoggedIn => "NOT_LOGGED_IN",
            Self::RemoteError => "REMOTE_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::AlreadyInitialized | Self::DatabaseError => 2,
            Self::WorkoutNotFound | Self::ExerciseNotFound | Self::TagNotFound => 3,
            Self::InvalidArgument => 4,
            Self::NotLoggedIn | Self::RemoteError => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether the same command may succeed if simply run again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::InvalidArgument | Self::RemoteError | Self::DatabaseError)
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in Aro operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `aro init` first")]
    NotInitialized,

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("Workout not found: {id}")]
    WorkoutNotFound { id: WorkoutId },

    #[error("Workout {workout} has no exercise at index {index}")]
    ExerciseNotFound { workout: WorkoutId, index: usize },

    #[error("Tag not found: {id}")]
    TagNotFound { id: TagId },

    #[error("No logged exercise named '{name}'")]
    ExerciseNameNotFound { name: String, similar: Vec<String> },

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::WorkoutNotFound { .. } => ErrorCode::WorkoutNotFound,
            Self::ExerciseNotFound { .. } | Self::ExerciseNameNotFound { .. } => {
                ErrorCode::ExerciseNotFound
            }
            Self::TagNotFound { .. } => ErrorCode::TagNotFound,
            Self::NotLoggedIn => ErrorCode::NotLoggedIn,
            Self::Remote(_) => ErrorCode::RemoteError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => Some("Run `aro init` to create the local store".to_string()),

            Self::AlreadyInitialized { path } => Some(format!(
                "State already exists at {}. Use `--force` to start over.",
                path.display()
            )),

            Self::WorkoutNotFound { id } => Some(format!(
                "No workout with ID {id}. Use `aro workout list` to see cached workouts."
            )),

            Self::ExerciseNotFound { workout, .. } => Some(format!(
                "Use `aro workout show {workout}` to see exercise indexes."
            )),

            Self::ExerciseNameNotFound { similar, .. } if !similar.is_empty() => {
                Some(format!("Did you mean: {}?", similar.join(", ")))
            }

            Self::ExerciseNameNotFound { .. } => {
                Some("Exercise names are matched ignoring case. Use `aro workout show <id>` to check spelling.".to_string())
            }

            Self::TagNotFound { id } => Some(format!(
                "No tag with ID {id}. Use `aro tag list` to see cached tags."
            )),

            Self::NotLoggedIn => {
                Some("Run `aro login <email>` or `aro signup <email>` first".to_string())
            }

            Self::Remote(err) if err.is_unauthorized() => {
                Some("Session expired. Run `aro login <email>` again.".to_string())
            }

            Self::InvalidArgument(msg) => {
                if msg.contains("date") {
                    Some("Dates use the YYYY-MM-DD format, e.g. 2024-05-01".to_string())
                } else if msg.contains("color") {
                    Some("Colors use the #rrggbb format, e.g. #ff8800".to_string())
                } else if msg.contains("collection") {
                    Some(
                        "Valid collections: workouts, templates, tags, tagged_dates, \
                         weight_entries, period_days"
                            .to_string(),
                    )
                } else {
                    None
                }
            }

            Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Remote(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(Error::NotInitialized.exit_code(), 2);
        assert_eq!(Error::WorkoutNotFound { id: 3 }.exit_code(), 3);
        assert_eq!(Error::InvalidArgument("x".into()).exit_code(), 4);
        assert_eq!(Error::NotLoggedIn.exit_code(), 6);
        assert_eq!(Error::Other("x".into()).exit_code(), 1);
    }

    #[test]
    fn test_structured_json_includes_hint() {
        let json = Error::InvalidArgument("bad date '2024-13-01'".into()).to_structured_json();
        assert_eq!(json["error"]["code"], "INVALID_ARGUMENT");
        assert_eq!(json["error"]["retryable"], true);
        assert!(json["error"]["hint"].as_str().unwrap().contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_similar_exercise_hint() {
        let err = Error::ExerciseNameNotFound {
            name: "sqat".into(),
            similar: vec!["Squat".into()],
        };
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.hint().as_deref(), Some("Did you mean: Squat?"));
    }

    #[test]
    fn test_unauthorized_remote_hint() {
        let err = Error::Remote(RemoteError::Unauthorized("expired".into()));
        assert!(err.hint().unwrap().contains("login"));
    }
}
