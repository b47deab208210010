//! Dated records and settings: weight, period days, units.

use crate::cli::workspace::{invalid, Workspace};
use crate::cli::{PeriodCommands, SettingsCommands, WeightCommands};
use crate::error::{Error, Result};
use crate::model::{SettingsPatch, UserSettings, WeightEntry};
use crate::storage::Origin;
use crate::validate::{normalize_date, normalize_units};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct WeightOutput<'a> {
    #[serde(flatten)]
    entry: &'a WeightEntry,
    unit: &'static str,
}

#[derive(Serialize)]
struct PeriodOutput {
    date: String,
    marked: bool,
}

/// Execute weight commands.
///
/// # Errors
///
/// Returns `InvalidArgument` for a malformed date.
pub fn weight(command: &WeightCommands, state: Option<&PathBuf>, offline: bool, json: bool) -> Result<()> {
    match command {
        WeightCommands::Set { value, date } => {
            let date = normalize_date(date).map_err(|e| invalid("date", e))?;
            let workspace = Workspace::open(state)?;
            let (entry, unit) = workspace.store().write(|s| {
                let entry = s.set_weight(&date, *value, Origin::Local).clone();
                (entry, s.settings().weight_unit())
            });
            workspace.commit(offline)?;

            if json {
                let output = WeightOutput { entry: &entry, unit };
                println!("{}", serde_json::to_string(&output)?);
            } else {
                println!("Logged {} {unit} on {}", entry.value, entry.date);
            }
            Ok(())
        }
    }
}

/// Execute period commands.
///
/// # Errors
///
/// Returns `InvalidArgument` for a malformed date.
pub fn period(command: &PeriodCommands, state: Option<&PathBuf>, offline: bool, json: bool) -> Result<()> {
    match command {
        PeriodCommands::Toggle { date } => {
            let date = normalize_date(date).map_err(|e| invalid("date", e))?;
            let workspace = Workspace::open(state)?;
            let marked = workspace.store().write(|s| s.toggle_period_day(&date));
            workspace.commit(offline)?;

            if json {
                let output = PeriodOutput { date, marked };
                println!("{}", serde_json::to_string(&output)?);
            } else if marked {
                println!("Marked {date} as a period day");
            } else {
                println!("Unmarked {date}");
            }
            Ok(())
        }
    }
}

/// Execute settings commands.
///
/// # Errors
///
/// Returns `InvalidArgument` when no setting is given or a value is unknown.
pub fn settings(command: &SettingsCommands, state: Option<&PathBuf>, offline: bool, json: bool) -> Result<()> {
    match command {
        SettingsCommands::Set { units } => {
            let patch = SettingsPatch {
                use_imperial: units
                    .as_deref()
                    .map(|u| normalize_units(u).map_err(|e| invalid("units", e)))
                    .transpose()?,
            };
            if patch == SettingsPatch::default() {
                return Err(Error::InvalidArgument("nothing to change: pass --units".to_string()));
            }

            let workspace = Workspace::open(state)?;
            let settings: UserSettings = workspace.store().write(|s| {
                s.update_settings(patch, Origin::Local);
                s.settings().clone()
            });
            workspace.commit(offline)?;

            if json {
                println!("{}", serde_json::to_string(&settings)?);
            } else {
                println!("Units: {}", settings.weight_unit());
            }
            Ok(())
        }
    }
}
