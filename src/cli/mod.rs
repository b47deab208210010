//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;
pub mod workspace;

/// Aro - local-first workout log with background sync
#[derive(Parser, Debug)]
#[command(name = "aro", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// State file path (default: ~/.aro/data/state.db)
    #[arg(long, global = true, env = "ARO_STATE")]
    pub state: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Output only the new ID (for scripting)
    #[arg(long, global = true)]
    pub silent: bool,

    /// Keep changes local; skip the push that follows every edit
    #[arg(long, global = true, env = "ARO_OFFLINE")]
    pub offline: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the local state file and config
    Init {
        /// Discard any existing cached state
        #[arg(long)]
        force: bool,
    },

    /// Print version information
    Version,

    /// Log in and load the first page of every collection
    Login(CredentialArgs),

    /// Create an account and log in
    Signup(CredentialArgs),

    /// Forget the session and every cached record
    Logout,

    /// Show session, cache and cursor status
    Status,

    /// Workouts and templates
    Workout {
        #[command(subcommand)]
        command: WorkoutCommands,
    },

    /// Calendar tags
    Tag {
        #[command(subcommand)]
        command: TagCommands,
    },

    /// Body-weight log
    Weight {
        #[command(subcommand)]
        command: WeightCommands,
    },

    /// Period tracking
    Period {
        #[command(subcommand)]
        command: PeriodCommands,
    },

    /// User settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },

    /// Push every pending change to the server
    Sync,

    /// Fetch the next page of a collection
    Fetch {
        /// Collection (workouts, templates, tags, tagged_dates, weight_entries, period_days)
        collection: String,

        /// Keep fetching until the server has nothing more
        #[arg(long)]
        all: bool,
    },

    /// Progress charts as simplified series
    Plot {
        #[command(subcommand)]
        command: PlotCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Args, Debug)]
pub struct CredentialArgs {
    /// Account email
    pub email: String,

    /// Account password
    #[arg(long, env = "ARO_PASSWORD", hide_env_values = true)]
    pub password: String,
}

// ============================================================================
// Workout Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum WorkoutCommands {
    /// Start a workout on a date
    New {
        /// Date (YYYY-MM-DD, today, yesterday)
        #[arg(default_value = "today")]
        date: String,

        /// Copy the exercises of this template
        #[arg(long, allow_negative_numbers = true)]
        from: Option<i64>,
    },

    /// Create a named template
    Template {
        /// Template name
        name: String,
    },

    /// List cached workouts, newest first
    List {
        /// List templates instead of dated workouts
        #[arg(long)]
        templates: bool,

        /// Maximum workouts to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show one workout with its exercises
    Show {
        /// Workout ID
        #[arg(allow_negative_numbers = true)]
        id: i64,
    },

    /// Change a workout's date (or a template's name)
    Tag {
        /// Workout ID
        #[arg(allow_negative_numbers = true)]
        id: i64,

        /// New date or template name
        tag: String,
    },

    /// Delete a workout
    Remove {
        /// Workout ID
        #[arg(allow_negative_numbers = true)]
        id: i64,
    },

    /// Append an exercise
    AddExercise {
        /// Workout ID
        #[arg(allow_negative_numbers = true)]
        id: i64,

        /// Exercise name (default: "New exercise N")
        name: Option<String>,

        /// Exercise type (strength, cardio)
        #[arg(short = 't', long = "type", default_value = "strength")]
        exercise_type: String,
    },

    /// Edit an exercise by index
    SetExercise(SetExerciseArgs),

    /// Delete an exercise by index
    RemoveExercise {
        /// Workout ID
        #[arg(allow_negative_numbers = true)]
        id: i64,

        /// Exercise index (see `aro workout show`)
        index: usize,
    },
}

#[derive(Args, Debug)]
pub struct SetExerciseArgs {
    /// Workout ID
    #[arg(allow_negative_numbers = true)]
    pub id: i64,

    /// Exercise index (see `aro workout show`)
    pub index: usize,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// Exercise type (strength, cardio)
    #[arg(short = 't', long = "type")]
    pub exercise_type: Option<String>,

    /// Weight per set
    #[arg(short, long)]
    pub weight: Option<u32>,

    /// Reps per set, comma separated (e.g. 5,5,6)
    #[arg(short, long)]
    pub reps: Option<String>,

    /// Duration in seconds
    #[arg(long)]
    pub duration: Option<u32>,

    /// Distance
    #[arg(long)]
    pub distance: Option<u32>,
}

// ============================================================================
// Tag Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum TagCommands {
    /// Create a tag
    New {
        /// Tag name
        name: String,

        /// Hex color (#rrggbb)
        #[arg(short, long)]
        color: Option<String>,
    },

    /// Rename a tag
    Rename {
        /// Tag ID
        #[arg(allow_negative_numbers = true)]
        id: i64,

        /// New name
        name: String,
    },

    /// Change a tag's color
    Color {
        /// Tag ID
        #[arg(allow_negative_numbers = true)]
        id: i64,

        /// Hex color (#rrggbb)
        color: String,
    },

    /// Delete a tag and strip it from every date
    Remove {
        /// Tag ID
        #[arg(allow_negative_numbers = true)]
        id: i64,
    },

    /// List tags
    List,

    /// Apply or remove a tag on a date
    Toggle {
        /// Tag ID
        #[arg(allow_negative_numbers = true)]
        id: i64,

        /// Date (YYYY-MM-DD, today, yesterday)
        #[arg(default_value = "today")]
        date: String,
    },
}

// ============================================================================
// Record Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum WeightCommands {
    /// Log body weight for a date
    Set {
        /// Weight in the configured unit
        value: u32,

        /// Date (YYYY-MM-DD, today, yesterday)
        #[arg(short, long, default_value = "today")]
        date: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum PeriodCommands {
    /// Mark or unmark a period day
    Toggle {
        /// Date (YYYY-MM-DD, today, yesterday)
        #[arg(default_value = "today")]
        date: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Change settings
    Set {
        /// Unit system (imperial, metric)
        #[arg(long)]
        units: Option<String>,
    },
}

// ============================================================================
// Plot Commands
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct PlotArgs {
    /// Time range (all, 6m, 1y)
    #[arg(short, long, default_value = "all")]
    pub range: String,

    /// Maximum points after simplification (default from config)
    #[arg(short, long)]
    pub points: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum PlotCommands {
    /// Progress of one exercise across dated workouts
    Exercise {
        /// Exercise name (case-insensitive)
        name: String,

        /// Metric (weight, reps, distance, duration)
        #[arg(short, long, default_value = "weight")]
        metric: String,

        #[command(flatten)]
        args: PlotArgs,
    },

    /// Body-weight trend
    Weight {
        #[command(flatten)]
        args: PlotArgs,
    },
}
