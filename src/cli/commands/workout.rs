//! Workout and template command implementations.
//!
//! Exercises are addressed by their index within the workout, as shown by
//! `aro workout show`.

use crate::cli::workspace::{invalid, Workspace};
use crate::cli::{SetExerciseArgs, WorkoutCommands};
use crate::error::{Error, Result};
use crate::model::{Exercise, ExercisePatch, ExerciseType, Workout, WorkoutId, WorkoutPatch};
use crate::storage::Origin;
use crate::validate::{normalize_date, parse_reps};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct WorkoutListOutput {
    workouts: Vec<Workout>,
    count: usize,
    total: usize,
}

#[derive(Serialize)]
struct ExerciseOutput<'a> {
    workout: WorkoutId,
    index: usize,
    exercise: &'a Exercise,
}

#[derive(Serialize)]
struct RemovedOutput {
    id: WorkoutId,
    removed: bool,
}

/// Execute workout commands.
///
/// # Errors
///
/// Returns `WorkoutNotFound`/`ExerciseNotFound` for unknown targets and
/// `InvalidArgument` for malformed dates, types or rep lists.
pub fn execute(command: &WorkoutCommands, state: Option<&PathBuf>, offline: bool, json: bool) -> Result<()> {
    match command {
        WorkoutCommands::New { date, from } => create(date, *from, state, offline, json),
        WorkoutCommands::Template { name } => template(name, state, offline, json),
        WorkoutCommands::List { templates, limit } => list(*templates, *limit, state, json),
        WorkoutCommands::Show { id } => show(*id, state, json),
        WorkoutCommands::Tag { id, tag } => retag(*id, tag, state, offline, json),
        WorkoutCommands::Remove { id } => remove(*id, state, offline, json),
        WorkoutCommands::AddExercise {
            id,
            name,
            exercise_type,
        } => add_exercise(*id, name.as_deref(), exercise_type, state, offline, json),
        WorkoutCommands::SetExercise(args) => set_exercise(args, state, offline, json),
        WorkoutCommands::RemoveExercise { id, index } => {
            remove_exercise(*id, *index, state, offline, json)
        }
    }
}

fn parse_type(input: &str) -> Result<ExerciseType> {
    input
        .parse()
        .map_err(|_| invalid("exercise type", (input.to_string(), Some("strength or cardio".to_string()))))
}

fn create(date: &str, from: Option<WorkoutId>, state: Option<&PathBuf>, offline: bool, json: bool) -> Result<()> {
    let date = normalize_date(date).map_err(|e| invalid("date", e))?;
    let workspace = Workspace::open(state)?;

    let (workout, unit) = workspace.store().write(|s| {
        let exercises = match from {
            Some(template) => s
                .workout(template)
                .filter(|w| w.is_template)
                .map(|w| w.exercises.clone())
                .ok_or(Error::WorkoutNotFound { id: template })?,
            None => Vec::new(),
        };
        let id = s.create_workout(&date);
        let workout = s
            .upsert_workout(id, WorkoutPatch::exercises(exercises), Origin::Local)
            .clone();
        Ok::<_, Error>((workout, s.settings().weight_unit()))
    })?;
    workspace.commit(offline)?;

    print_created(&workout, unit, json)
}

fn template(name: &str, state: Option<&PathBuf>, offline: bool, json: bool) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidArgument("template name cannot be empty".to_string()));
    }

    let workspace = Workspace::open(state)?;
    let (workout, unit) = workspace.store().write(|s| {
        let id = s.create_template(name, Vec::new());
        (s.workout(id).cloned(), s.settings().weight_unit())
    });
    workspace.commit(offline)?;

    let workout = workout.ok_or_else(|| Error::Other("template vanished after creation".to_string()))?;
    print_created(&workout, unit, json)
}

fn print_created(workout: &Workout, unit: &str, json: bool) -> Result<()> {
    if crate::is_silent() {
        println!("{}", workout.id);
    } else if json {
        println!("{}", serde_json::to_string(workout)?);
    } else {
        print_workout(workout, unit);
    }
    Ok(())
}

fn list(templates: bool, limit: usize, state: Option<&PathBuf>, json: bool) -> Result<()> {
    let workspace = Workspace::open(state)?;
    let mut workouts: Vec<Workout> = workspace.store().read(|s| {
        if templates {
            s.templates().cloned().collect()
        } else {
            s.records().cloned().collect()
        }
    });

    if templates {
        workouts.sort_by(|a, b| a.tag.to_lowercase().cmp(&b.tag.to_lowercase()));
    } else {
        // ISO dates sort lexically; newest first.
        workouts.sort_by(|a, b| b.tag.cmp(&a.tag).then(b.id.cmp(&a.id)));
    }
    let total = workouts.len();
    workouts.truncate(limit);

    if json {
        let output = WorkoutListOutput {
            count: workouts.len(),
            total,
            workouts,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if workouts.is_empty() {
        if templates {
            println!("No templates. Create one with: aro workout template \"Leg day\"");
        } else {
            println!("No workouts. Start one with: aro workout new");
        }
        return Ok(());
    }

    for workout in &workouts {
        let names: Vec<&str> = workout.exercises.iter().map(|e| e.name.as_str()).collect();
        println!(
            "{} {} {}",
            format!("{:>6}", workout.id).cyan(),
            workout.tag.bold(),
            names.join(", ").dimmed()
        );
    }
    if total > workouts.len() {
        println!();
        println!("{}", format!("Showing {} of {total} (use --limit)", workouts.len()).dimmed());
    }
    Ok(())
}

fn show(id: WorkoutId, state: Option<&PathBuf>, json: bool) -> Result<()> {
    let workspace = Workspace::open(state)?;
    let (workout, unit) = workspace
        .store()
        .read(|s| (s.workout(id).cloned(), s.settings().weight_unit()));
    let workout = workout.ok_or(Error::WorkoutNotFound { id })?;

    if json {
        println!("{}", serde_json::to_string(&workout)?);
    } else {
        print_workout(&workout, unit);
    }
    Ok(())
}

fn retag(id: WorkoutId, tag: &str, state: Option<&PathBuf>, offline: bool, json: bool) -> Result<()> {
    let workspace = Workspace::open(state)?;
    let is_template = workspace
        .store()
        .read(|s| s.workout(id).map(|w| w.is_template))
        .ok_or(Error::WorkoutNotFound { id })?;

    // Records are keyed by date, templates by name.
    let tag = if is_template {
        tag.trim().to_string()
    } else {
        normalize_date(tag).map_err(|e| invalid("date", e))?
    };

    let (workout, unit) = workspace.store().write(|s| {
        let workout = s.upsert_workout(id, WorkoutPatch::tag(tag), Origin::Local).clone();
        (workout, s.settings().weight_unit())
    });
    workspace.commit(offline)?;

    if json {
        println!("{}", serde_json::to_string(&workout)?);
    } else {
        print_workout(&workout, unit);
    }
    Ok(())
}

fn remove(id: WorkoutId, state: Option<&PathBuf>, offline: bool, json: bool) -> Result<()> {
    let workspace = Workspace::open(state)?;
    let removed = workspace
        .store()
        .write(|s| s.remove_workout(id, Origin::Local))
        .ok_or(Error::WorkoutNotFound { id })?;
    workspace.commit(offline)?;

    if json {
        let output = RemovedOutput { id, removed: true };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Removed workout {id} ({})", removed.tag);
    }
    Ok(())
}

fn add_exercise(
    id: WorkoutId,
    name: Option<&str>,
    exercise_type: &str,
    state: Option<&PathBuf>,
    offline: bool,
    json: bool,
) -> Result<()> {
    let exercise_type = parse_type(exercise_type)?;
    let workspace = Workspace::open(state)?;

    let (index, exercise) = workspace.store().write(|s| {
        let index = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => s.add_exercise(id, Exercise::new(name, exercise_type))?,
            None => s.add_default_exercise(id, exercise_type)?,
        };
        let exercise = s
            .workout(id)
            .and_then(|w| w.exercises.get(index).cloned())
            .ok_or(Error::ExerciseNotFound { workout: id, index })?;
        Ok::<_, Error>((index, exercise))
    })?;
    workspace.commit(offline)?;

    print_exercise(id, index, &exercise, "Added", json)
}

fn set_exercise(args: &SetExerciseArgs, state: Option<&PathBuf>, offline: bool, json: bool) -> Result<()> {
    let patch = ExercisePatch {
        exercise_type: args.exercise_type.as_deref().map(parse_type).transpose()?,
        name: args.name.as_ref().map(|n| n.trim().to_string()),
        weight: args.weight,
        reps: args
            .reps
            .as_deref()
            .map(|r| parse_reps(r).map_err(|e| invalid("reps", e)))
            .transpose()?,
        duration: args.duration,
        distance: args.distance,
    };
    if patch == ExercisePatch::default() {
        return Err(Error::InvalidArgument(
            "nothing to change: pass --name, --type, --weight, --reps, --duration or --distance"
                .to_string(),
        ));
    }

    let workspace = Workspace::open(state)?;
    let (id, index) = (args.id, args.index);
    let exercise = workspace.store().write(|s| {
        s.update_exercise(id, index, patch)?;
        s.workout(id)
            .and_then(|w| w.exercises.get(index).cloned())
            .ok_or(Error::ExerciseNotFound { workout: id, index })
    })?;
    workspace.commit(offline)?;

    print_exercise(id, index, &exercise, "Updated", json)
}

fn remove_exercise(id: WorkoutId, index: usize, state: Option<&PathBuf>, offline: bool, json: bool) -> Result<()> {
    let workspace = Workspace::open(state)?;
    let exercise = workspace.store().write(|s| s.remove_exercise(id, index))?;
    workspace.commit(offline)?;

    print_exercise(id, index, &exercise, "Removed", json)
}

fn print_exercise(workout: WorkoutId, index: usize, exercise: &Exercise, verb: &str, json: bool) -> Result<()> {
    if json {
        let output = ExerciseOutput {
            workout,
            index,
            exercise,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{verb} exercise [{index}] {} in workout {workout}", exercise.name);
    }
    Ok(())
}

fn print_workout(workout: &Workout, unit: &str) {
    let label = if workout.is_template { "Template" } else { "Workout" };
    println!("{} {} {}", label.cyan().bold(), workout.id, workout.tag.bold());

    if workout.exercises.is_empty() {
        println!("  {}", "(no exercises)".dimmed());
        return;
    }
    for (index, exercise) in workout.exercises.iter().enumerate() {
        println!(
            "  {} {} {}",
            format!("[{index}]").dimmed(),
            exercise.name,
            describe(exercise, unit).dimmed()
        );
    }
}

fn describe(exercise: &Exercise, unit: &str) -> String {
    match exercise.exercise_type {
        ExerciseType::Resistance => {
            let reps: Vec<String> = exercise.reps.iter().map(ToString::to_string).collect();
            format!("{} {unit} x {}", exercise.weight, reps.join(","))
        }
        ExerciseType::Cardio => {
            format!("distance {} / {}s", exercise.distance, exercise.duration)
        }
    }
}
