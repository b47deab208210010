//! The entity cache.
//!
//! `Store` holds every collection the app works with, plus the session
//! token, pagination cursors and the dirty sets that drive sync. Every
//! write goes through [`Origin`]: local writes mark the touched identity
//! dirty, server writes never do.
//!
//! `StoreHandle` is the shared, explicitly passed reference used by the
//! sync engine and the CLI.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{
    is_local_id, CollectionKind, Exercise, ExercisePatch, ExerciseType, PeriodDay, SettingsPatch,
    Tag, TagId, TagPatch, TaggedDate, UserSettings, WeightEntry, WeightPatch, Workout, WorkoutId,
    WorkoutPatch,
};
use crate::storage::collection::Collection;
use crate::storage::cursor::Cursors;
use crate::storage::dirty::{DirtyFlag, DirtySet};

/// Who is performing a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// User-initiated change that must be pushed to the server.
    Local,
    /// Data received from the server. Never marks anything dirty.
    Server,
}

impl Origin {
    #[must_use]
    pub const fn is_local(self) -> bool {
        matches!(self, Self::Local)
    }
}

/// Dirty sets for every synchronized collection.
///
/// Kept out of the cache snapshot; [`Persister`](crate::storage::Persister)
/// stores it under its own key so unpushed edits survive a restart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DirtyState {
    /// Shared by workouts and templates.
    pub workouts: DirtySet<WorkoutId>,
    pub tags: DirtySet<TagId>,
    pub tagged_dates: DirtySet<String>,
    pub weight_entries: DirtySet<String>,
    pub period_days: DirtySet<String>,
    pub settings: DirtyFlag,
}

impl DirtyState {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.workouts.is_empty()
            && self.tags.is_empty()
            && self.tagged_dates.is_empty()
            && self.weight_entries.is_empty()
            && self.period_days.is_empty()
            && !self.settings.is_dirty()
    }

    /// Pending mark count per sync group, in flush order.
    #[must_use]
    pub fn counts(&self) -> Vec<(CollectionKind, usize)> {
        vec![
            (CollectionKind::Settings, usize::from(self.settings.is_dirty())),
            (CollectionKind::Tags, self.tags.len()),
            (CollectionKind::TaggedDates, self.tagged_dates.len()),
            (CollectionKind::Workouts, self.workouts.len()),
            (CollectionKind::WeightEntries, self.weight_entries.len()),
            (CollectionKind::PeriodDays, self.period_days.len()),
        ]
    }

    pub fn clear_all(&mut self) {
        self.workouts.clear_all();
        self.tags.clear_all();
        self.tagged_dates.clear_all();
        self.weight_entries.clear_all();
        self.period_days.clear_all();
        self.settings.clear_all();
    }
}

/// What happened to a locally created entity once the server answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Server copy replaced the local one and the mark was cleared.
    Replaced,
    /// Local copy was edited mid-flight; it moved to the new id and stays dirty.
    Rekeyed,
    /// Local copy was deleted mid-flight; the server id is queued for deletion.
    Orphaned,
}

const FIRST_LOCAL_ID: i64 = -1;

const fn first_local_id() -> i64 {
    FIRST_LOCAL_ID
}

/// In-memory cache of every synchronized collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    settings: UserSettings,
    #[serde(default)]
    workouts: Collection<Workout>,
    #[serde(default)]
    tags: Collection<Tag>,
    #[serde(default)]
    tagged_dates: Collection<TaggedDate>,
    #[serde(default)]
    weight_entries: Collection<WeightEntry>,
    #[serde(default)]
    period_days: Collection<PeriodDay>,
    #[serde(default)]
    cursors: Cursors,
    #[serde(default = "first_local_id")]
    next_local_id: i64,
    #[serde(skip)]
    dirty: DirtyState,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            token: None,
            settings: UserSettings::default(),
            workouts: Collection::new(),
            tags: Collection::new(),
            tagged_dates: Collection::new(),
            weight_entries: Collection::new(),
            period_days: Collection::new(),
            cursors: Cursors::default(),
            next_local_id: FIRST_LOCAL_ID,
            dirty: DirtyState::default(),
        }
    }
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything, including the session. Used on logout.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Drop cached collections, cursors and dirty marks but keep the session.
    pub fn clear_collections(&mut self) {
        self.settings = UserSettings::default();
        self.workouts.clear();
        self.tags.clear();
        self.tagged_dates.clear();
        self.weight_entries.clear();
        self.period_days.clear();
        self.cursors = Cursors::default();
        self.dirty.clear_all();
    }

    /// Install dirty marks saved alongside a snapshot.
    pub(crate) fn restore_dirty(&mut self, dirty: DirtyState) {
        self.dirty = dirty;
    }

    /// Re-mark entities that were created locally and never reached the
    /// server. Called after loading a snapshot, so local entities stay
    /// pending even when no dirty marks were saved with it.
    pub fn rehydrate(&mut self) {
        let workouts: Vec<_> = self
            .workouts
            .keys()
            .copied()
            .filter(|&id| is_local_id(id))
            .collect();
        for id in workouts {
            self.dirty.workouts.mark(id);
        }

        let tags: Vec<_> = self
            .tags
            .keys()
            .copied()
            .filter(|&id| is_local_id(id))
            .collect();
        for id in tags {
            self.dirty.tags.mark(id);
        }

        let dates: Vec<_> = self
            .tagged_dates
            .values()
            .filter(|d| d.tag_ids.iter().any(|&id| is_local_id(id)))
            .map(|d| d.date.clone())
            .collect();
        for date in dates {
            self.dirty.tagged_dates.mark(date);
        }
    }

    fn allocate_local_id(&mut self) -> i64 {
        let id = self.next_local_id;
        self.next_local_id -= 1;
        id
    }

    // ==================
    // Session
    // ==================

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    // ==================
    // Dirty state & cursors
    // ==================

    #[must_use]
    pub const fn dirty(&self) -> &DirtyState {
        &self.dirty
    }

    pub(crate) fn dirty_mut(&mut self) -> &mut DirtyState {
        &mut self.dirty
    }

    #[must_use]
    pub const fn cursors(&self) -> &Cursors {
        &self.cursors
    }

    pub fn cursors_mut(&mut self) -> &mut Cursors {
        &mut self.cursors
    }

    // ==================
    // Workout Operations
    // ==================

    #[must_use]
    pub fn workout(&self, id: WorkoutId) -> Option<&Workout> {
        self.workouts.get(&id)
    }

    #[must_use]
    pub const fn workouts(&self) -> &Collection<Workout> {
        &self.workouts
    }

    /// Dated (non-template) workouts.
    pub fn records(&self) -> impl Iterator<Item = &Workout> {
        self.workouts.values().filter(|w| !w.is_template)
    }

    pub fn templates(&self) -> impl Iterator<Item = &Workout> {
        self.workouts.values().filter(|w| w.is_template)
    }

    /// Merge `patch` onto the workout at `id`, creating it if absent.
    pub fn upsert_workout(&mut self, id: WorkoutId, patch: WorkoutPatch, origin: Origin) -> &Workout {
        if origin.is_local() {
            self.dirty.workouts.mark(id);
        }
        self.workouts.upsert(id, patch)
    }

    /// Remove a workout. Local removals are queued for deletion on the server.
    pub fn remove_workout(&mut self, id: WorkoutId, origin: Origin) -> Option<Workout> {
        let removed = self.workouts.remove(&id);
        if removed.is_some() && origin.is_local() {
            self.dirty.workouts.mark_removed(id);
        }
        removed
    }

    /// Create an empty dated workout under a fresh local id.
    pub fn create_workout(&mut self, date: &str) -> WorkoutId {
        let id = self.allocate_local_id();
        self.upsert_workout(id, Workout::record(id, date).into(), Origin::Local);
        id
    }

    /// Create a named template under a fresh local id.
    pub fn create_template(&mut self, name: &str, exercises: Vec<Exercise>) -> WorkoutId {
        let id = self.allocate_local_id();
        let mut template = Workout::template(id, name);
        template.exercises = exercises;
        self.upsert_workout(id, template.into(), Origin::Local);
        id
    }

    fn exercises_of(&self, id: WorkoutId) -> Result<Vec<Exercise>> {
        self.workouts
            .get(&id)
            .map(|w| w.exercises.clone())
            .ok_or(Error::WorkoutNotFound { id })
    }

    /// Append an exercise. Returns its index.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutNotFound` if `id` is not cached; nothing is marked dirty.
    pub fn add_exercise(&mut self, id: WorkoutId, exercise: Exercise) -> Result<usize> {
        let mut exercises = self.exercises_of(id)?;
        exercises.push(exercise);
        let index = exercises.len() - 1;
        self.upsert_workout(id, WorkoutPatch::exercises(exercises), Origin::Local);
        Ok(index)
    }

    /// Append an exercise named "New exercise N" with zeroed metrics.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutNotFound` if `id` is not cached.
    pub fn add_default_exercise(&mut self, id: WorkoutId, exercise_type: ExerciseType) -> Result<usize> {
        let count = self
            .exercises_of(id)?
            .iter()
            .filter(|e| e.name.contains("New exercise"))
            .count();
        let name = format!("New exercise {}", count + 1);
        self.add_exercise(id, Exercise::new(name, exercise_type))
    }

    /// Edit one exercise by index, replacing the whole exercise array.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutNotFound` or `ExerciseNotFound`; nothing is mutated.
    pub fn update_exercise(&mut self, id: WorkoutId, index: usize, patch: ExercisePatch) -> Result<()> {
        let mut exercises = self.exercises_of(id)?;
        let exercise = exercises
            .get_mut(index)
            .ok_or(Error::ExerciseNotFound { workout: id, index })?;
        exercise.apply(patch);
        self.upsert_workout(id, WorkoutPatch::exercises(exercises), Origin::Local);
        Ok(())
    }

    /// Remove one exercise by index.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutNotFound` or `ExerciseNotFound`; nothing is mutated.
    pub fn remove_exercise(&mut self, id: WorkoutId, index: usize) -> Result<Exercise> {
        let mut exercises = self.exercises_of(id)?;
        if index >= exercises.len() {
            return Err(Error::ExerciseNotFound { workout: id, index });
        }
        let removed = exercises.remove(index);
        self.upsert_workout(id, WorkoutPatch::exercises(exercises), Origin::Local);
        Ok(removed)
    }

    /// Swap a flushed workout for the server's copy under its new id.
    pub(crate) fn reconcile_created_workout(
        &mut self,
        old_id: WorkoutId,
        version: u64,
        created: Workout,
    ) -> Reconciled {
        let new_id = created.id;
        let unchanged = self.dirty.workouts.version(&old_id) == Some(version);

        match self.workouts.remove(&old_id) {
            None => {
                debug!(old_id, new_id, "Workout deleted during flush, queueing server copy for deletion");
                self.dirty.workouts.forget(&old_id);
                self.dirty.workouts.mark_removed(new_id);
                Reconciled::Orphaned
            }
            Some(_) if unchanged => {
                self.dirty.workouts.clear_changed(&old_id, version);
                self.workouts.upsert_entity(created);
                Reconciled::Replaced
            }
            Some(mut local) => {
                debug!(old_id, new_id, "Workout edited during flush, keeping local copy dirty");
                local.id = new_id;
                self.workouts.upsert_entity(local);
                self.dirty.workouts.rekey(&old_id, new_id);
                Reconciled::Rekeyed
            }
        }
    }

    // ==================
    // Tag Operations
    // ==================

    #[must_use]
    pub fn tag(&self, id: TagId) -> Option<&Tag> {
        self.tags.get(&id)
    }

    #[must_use]
    pub const fn tags(&self) -> &Collection<Tag> {
        &self.tags
    }

    pub fn upsert_tag(&mut self, id: TagId, patch: TagPatch, origin: Origin) -> &Tag {
        if origin.is_local() {
            self.dirty.tags.mark(id);
        }
        self.tags.upsert(id, patch)
    }

    /// Create a tag under a fresh local id.
    pub fn create_tag(&mut self, name: &str, color: Option<String>) -> TagId {
        let id = self.allocate_local_id();
        let patch = TagPatch {
            name: Some(name.to_string()),
            color,
        };
        self.upsert_tag(id, patch, Origin::Local);
        id
    }

    /// Remove a tag and strip it from every tagged date.
    pub fn remove_tag(&mut self, id: TagId, origin: Origin) -> Option<Tag> {
        let removed = self.tags.remove(&id)?;
        if origin.is_local() {
            self.dirty.tags.mark_removed(id);
        }

        let touched: Vec<String> = self
            .tagged_dates
            .values_mut()
            .filter(|d| d.contains(id))
            .map(|d| {
                d.tag_ids.retain(|&t| t != id);
                d.date.clone()
            })
            .collect();
        if origin.is_local() {
            for date in touched {
                self.dirty.tagged_dates.mark(date);
            }
        }
        Some(removed)
    }

    /// Apply a server response for a flushed tag.
    ///
    /// When the server assigned a new id, the tag moves to it and every
    /// tagged date referencing the old id is rewritten and marked dirty.
    pub(crate) fn reconcile_saved_tag(&mut self, old_id: TagId, version: u64, saved: Tag) -> Reconciled {
        let new_id = saved.id;
        let unchanged = self.dirty.tags.version(&old_id) == Some(version);

        if new_id == old_id {
            if self.tags.get(&old_id).is_none() {
                debug!(id = old_id, "Tag removed during flush, keeping its deletion queued");
                self.dirty.tags.unmark(&old_id);
                return Reconciled::Orphaned;
            }
            if unchanged {
                self.dirty.tags.clear_changed(&old_id, version);
                self.tags.upsert_entity(saved);
                return Reconciled::Replaced;
            }
            return Reconciled::Rekeyed;
        }

        let Some(mut local) = self.tags.remove(&old_id) else {
            debug!(old_id, new_id, "Tag deleted during flush, queueing server copy for deletion");
            self.dirty.tags.forget(&old_id);
            self.dirty.tags.mark_removed(new_id);
            return Reconciled::Orphaned;
        };

        let outcome = if unchanged {
            self.dirty.tags.clear_changed(&old_id, version);
            self.tags.upsert_entity(saved);
            Reconciled::Replaced
        } else {
            local.id = new_id;
            self.tags.upsert_entity(local);
            self.dirty.tags.rekey(&old_id, new_id);
            Reconciled::Rekeyed
        };

        let touched: Vec<String> = self
            .tagged_dates
            .values_mut()
            .filter(|d| d.contains(old_id))
            .map(|d| {
                for tag_id in &mut d.tag_ids {
                    if *tag_id == old_id {
                        *tag_id = new_id;
                    }
                }
                d.date.clone()
            })
            .collect();
        for date in touched {
            self.dirty.tagged_dates.mark(date);
        }

        outcome
    }

    // ==================
    // Tagged Date Operations
    // ==================

    #[must_use]
    pub fn tagged_date(&self, date: &str) -> Option<&TaggedDate> {
        self.tagged_dates.get(&date.to_string())
    }

    #[must_use]
    pub const fn tagged_dates(&self) -> &Collection<TaggedDate> {
        &self.tagged_dates
    }

    /// Tag ids applied to `date`; empty when the date has no entry.
    #[must_use]
    pub fn tag_ids_for(&self, date: &str) -> &[TagId] {
        self.tagged_date(date)
            .map(|d| d.tag_ids.as_slice())
            .unwrap_or_default()
    }

    /// Replace the tag-id set for `date`.
    pub fn upsert_tagged_date(&mut self, date: &str, tag_ids: Vec<TagId>, origin: Origin) -> &TaggedDate {
        if origin.is_local() {
            self.dirty.tagged_dates.mark(date.to_string());
        }
        self.tagged_dates.upsert(date.to_string(), tag_ids)
    }

    /// Add or remove one tag on `date`. Returns true if the tag is now applied.
    pub fn toggle_tagged_date(&mut self, date: &str, tag_id: TagId) -> bool {
        let mut entry = TaggedDate {
            date: date.to_string(),
            tag_ids: self.tag_ids_for(date).to_vec(),
        };
        entry.toggle(tag_id);
        let applied = entry.contains(tag_id);
        self.upsert_tagged_date(date, entry.tag_ids, Origin::Local);
        applied
    }

    /// Apply a server tombstone for `date`.
    pub fn remove_tagged_date(&mut self, date: &str) -> Option<TaggedDate> {
        self.tagged_dates.remove(&date.to_string())
    }

    // ==================
    // Weight Entry Operations
    // ==================

    #[must_use]
    pub fn weight_entry(&self, date: &str) -> Option<&WeightEntry> {
        self.weight_entries.get(&date.to_string())
    }

    #[must_use]
    pub const fn weight_entries(&self) -> &Collection<WeightEntry> {
        &self.weight_entries
    }

    pub fn set_weight(&mut self, date: &str, value: u32, origin: Origin) -> &WeightEntry {
        if origin.is_local() {
            self.dirty.weight_entries.mark(date.to_string());
        }
        self.weight_entries.upsert(date.to_string(), WeightPatch(value))
    }

    /// Apply a server tombstone for `date`.
    pub fn remove_weight_entry(&mut self, date: &str) -> Option<WeightEntry> {
        self.weight_entries.remove(&date.to_string())
    }

    // ==================
    // Period Day Operations
    // ==================

    #[must_use]
    pub fn is_period_day(&self, date: &str) -> bool {
        self.period_days.contains(&date.to_string())
    }

    #[must_use]
    pub const fn period_days(&self) -> &Collection<PeriodDay> {
        &self.period_days
    }

    pub fn mark_period_day(&mut self, date: &str, origin: Origin) {
        if origin.is_local() {
            self.dirty.period_days.mark(date.to_string());
        }
        self.period_days.upsert(date.to_string(), ());
    }

    pub fn unmark_period_day(&mut self, date: &str, origin: Origin) -> bool {
        let removed = self.period_days.remove(&date.to_string()).is_some();
        if removed && origin.is_local() {
            self.dirty.period_days.mark_removed(date.to_string());
        }
        removed
    }

    /// Flip the mark on `date`. Returns true if the day is now marked.
    pub fn toggle_period_day(&mut self, date: &str) -> bool {
        if self.is_period_day(date) {
            self.unmark_period_day(date, Origin::Local);
            false
        } else {
            self.mark_period_day(date, Origin::Local);
            true
        }
    }

    // ==================
    // Settings
    // ==================

    #[must_use]
    pub const fn settings(&self) -> &UserSettings {
        &self.settings
    }

    pub fn update_settings(&mut self, patch: SettingsPatch, origin: Origin) {
        if origin.is_local() {
            self.dirty.settings.mark();
        }
        self.settings.merge(patch);
    }
}

/// Shared handle to one [`Store`].
///
/// Cloning the handle shares the store. Closures passed to `read` and
/// `write` run under the lock and must not await.
#[derive(Debug, Clone, Default)]
pub struct StoreHandle(Arc<Mutex<Store>>);

impl StoreHandle {
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self(Arc::new(Mutex::new(store)))
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        // A panic inside a closure leaves the store structurally valid.
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn read<R>(&self, f: impl FnOnce(&Store) -> R) -> R {
        f(&self.lock())
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut Store) -> R) -> R {
        f(&mut self.lock())
    }

    /// Clone of the current state, for persistence.
    #[must_use]
    pub fn snapshot(&self) -> Store {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_workout() -> Store {
        let mut store = Store::new();
        let mut w = Workout::record(1, "2024-05-01");
        w.exercises = vec![Exercise {
            reps: vec![5, 5, 5],
            ..Exercise::new("Squat", ExerciseType::Resistance)
        }];
        store.upsert_workout(1, w.into(), Origin::Server);
        store
    }

    #[test]
    fn test_server_writes_never_mark_dirty() {
        let store = store_with_workout();
        assert!(store.dirty().is_clean());
        assert!(store.workout(1).is_some());
    }

    #[test]
    fn test_update_exercise_marks_dirty() {
        let mut store = store_with_workout();
        store
            .update_exercise(1, 0, ExercisePatch::reps(vec![5, 5, 6]))
            .unwrap();

        assert_eq!(store.workout(1).unwrap().exercises[0].reps, vec![5, 5, 6]);
        assert!(store.dirty().workouts.is_dirty(&1));
    }

    #[test]
    fn test_bad_index_is_rejected_without_mutation() {
        let mut store = store_with_workout();
        let err = store
            .update_exercise(1, 3, ExercisePatch::name("x"))
            .unwrap_err();
        assert!(matches!(err, Error::ExerciseNotFound { index: 3, .. }));
        assert!(store.dirty().is_clean());

        let err = store.remove_exercise(99, 0).unwrap_err();
        assert!(matches!(err, Error::WorkoutNotFound { id: 99 }));
    }

    #[test]
    fn test_add_default_exercise_numbering() {
        let mut store = store_with_workout();
        store.add_default_exercise(1, ExerciseType::Resistance).unwrap();
        let index = store
            .add_default_exercise(1, ExerciseType::Cardio)
            .unwrap();
        let w = store.workout(1).unwrap();
        assert_eq!(index, 2);
        assert_eq!(w.exercises[1].name, "New exercise 1");
        assert_eq!(w.exercises[2].name, "New exercise 2");
        assert_eq!(w.exercises[2].exercise_type, ExerciseType::Cardio);
    }

    #[test]
    fn test_create_workout_uses_local_ids() {
        let mut store = Store::new();
        let a = store.create_workout("2024-05-01");
        let b = store.create_template("Push", vec![]);
        assert!(is_local_id(a));
        assert!(is_local_id(b));
        assert_ne!(a, b);
        assert_eq!(store.templates().count(), 1);
        assert_eq!(store.records().count(), 1);
    }

    #[test]
    fn test_remove_keeps_change_mark_and_records_removal() {
        let mut store = store_with_workout();
        store.upsert_workout(1, WorkoutPatch::tag("2024-05-02"), Origin::Local);
        store.remove_workout(1, Origin::Local);

        assert!(store.workout(1).is_none());
        assert!(store.dirty().workouts.is_dirty(&1));
        assert!(store.dirty().workouts.is_removed(&1));
    }

    #[test]
    fn test_tag_ids_for_absent_date_is_empty() {
        let store = Store::new();
        assert!(store.tag_ids_for("2024-05-01").is_empty());
    }

    #[test]
    fn test_toggle_tagged_date_keeps_empty_entry() {
        let mut store = Store::new();
        assert!(store.toggle_tagged_date("2024-05-01", 3));
        assert!(!store.toggle_tagged_date("2024-05-01", 3));

        let entry = store.tagged_date("2024-05-01").unwrap();
        assert!(entry.tag_ids.is_empty());
        assert!(store.dirty().tagged_dates.is_dirty(&"2024-05-01".to_string()));
    }

    #[test]
    fn test_toggle_twice_restores_existing_tags() {
        let mut store = Store::new();
        store.toggle_tagged_date("2024-05-01", 3);
        store.toggle_tagged_date("2024-05-01", 7);

        assert!(store.toggle_tagged_date("2024-05-01", 9));
        assert!(!store.toggle_tagged_date("2024-05-01", 9));
        assert_eq!(store.tag_ids_for("2024-05-01"), &[3, 7]);

        // Toggling a tag already present takes it out and puts it back.
        assert!(!store.toggle_tagged_date("2024-05-01", 3));
        assert_eq!(store.tag_ids_for("2024-05-01"), &[7]);
        assert!(store.toggle_tagged_date("2024-05-01", 3));
        let mut ids = store.tag_ids_for("2024-05-01").to_vec();
        ids.sort_unstable();
        assert_eq!(ids, vec![3, 7]);
    }

    #[test]
    fn test_remove_tag_strips_dates() {
        let mut store = Store::new();
        let id = store.create_tag("Heavy", None);
        store.toggle_tagged_date("2024-05-01", id);
        store.toggle_tagged_date("2024-05-01", 9);

        store.remove_tag(id, Origin::Local);
        assert_eq!(store.tag_ids_for("2024-05-01"), &[9]);
        assert!(store.dirty().tags.is_removed(&id));
    }

    #[test]
    fn test_toggle_period_day_records_removal() {
        let mut store = Store::new();
        assert!(store.toggle_period_day("2024-05-01"));
        assert!(!store.toggle_period_day("2024-05-01"));

        let date = "2024-05-01".to_string();
        assert!(!store.is_period_day(&date));
        assert!(store.dirty().period_days.is_dirty(&date));
        assert!(store.dirty().period_days.is_removed(&date));
    }

    #[test]
    fn test_reconcile_workout_replaces_unchanged() {
        let mut store = store_with_workout();
        store
            .update_exercise(1, 0, ExercisePatch::reps(vec![5, 5, 6]))
            .unwrap();
        let version = store.dirty().workouts.version(&1).unwrap();

        let mut created = store.workout(1).unwrap().clone();
        created.id = 42;
        let outcome = store.reconcile_created_workout(1, version, created);

        assert_eq!(outcome, Reconciled::Replaced);
        assert!(store.workout(1).is_none());
        assert_eq!(store.workout(42).unwrap().exercises[0].reps, vec![5, 5, 6]);
        assert!(store.dirty().workouts.is_empty());
    }

    #[test]
    fn test_reconcile_workout_edited_mid_flight_stays_dirty() {
        let mut store = store_with_workout();
        store.upsert_workout(1, WorkoutPatch::tag("2024-05-02"), Origin::Local);
        let version = store.dirty().workouts.version(&1).unwrap();
        let mut created = store.workout(1).unwrap().clone();
        created.id = 42;

        store.upsert_workout(1, WorkoutPatch::tag("2024-05-03"), Origin::Local);
        let outcome = store.reconcile_created_workout(1, version, created);

        assert_eq!(outcome, Reconciled::Rekeyed);
        assert_eq!(store.workout(42).unwrap().tag, "2024-05-03");
        assert!(store.dirty().workouts.is_dirty(&42));
        assert!(!store.dirty().workouts.is_dirty(&1));
    }

    #[test]
    fn test_reconcile_workout_deleted_mid_flight() {
        let mut store = store_with_workout();
        store.upsert_workout(1, WorkoutPatch::tag("2024-05-02"), Origin::Local);
        let version = store.dirty().workouts.version(&1).unwrap();
        let mut created = store.workout(1).unwrap().clone();
        created.id = 42;

        store.remove_workout(1, Origin::Local);
        let outcome = store.reconcile_created_workout(1, version, created);

        assert_eq!(outcome, Reconciled::Orphaned);
        assert!(store.workout(42).is_none());
        assert!(store.dirty().workouts.is_removed(&42));
        assert!(!store.dirty().workouts.is_removed(&1));
    }

    #[test]
    fn test_reconcile_tag_remaps_dates() {
        let mut store = Store::new();
        let local = store.create_tag("Heavy", Some("#ff0000".into()));
        store.toggle_tagged_date("2024-05-01", local);
        let version = store.dirty().tags.version(&local).unwrap();

        let saved = Tag {
            id: 17,
            name: "Heavy".into(),
            color: "#ff0000".into(),
        };
        store.reconcile_saved_tag(local, version, saved);

        assert!(store.tag(local).is_none());
        assert_eq!(store.tag(17).unwrap().name, "Heavy");
        assert_eq!(store.tag_ids_for("2024-05-01"), &[17]);
        assert!(store.dirty().tags.is_empty());
        assert!(store.dirty().tagged_dates.is_dirty(&"2024-05-01".to_string()));
    }

    #[test]
    fn test_reconcile_tag_removed_mid_flight_is_not_restored() {
        let mut store = Store::new();
        let server = Tag {
            id: 5,
            name: "Heavy".into(),
            color: "#ff0000".into(),
        };
        store.upsert_tag(5, server.into(), Origin::Server);
        store.upsert_tag(
            5,
            TagPatch {
                name: Some("Light".into()),
                color: None,
            },
            Origin::Local,
        );
        let version = store.dirty().tags.version(&5).unwrap();
        let saved = store.tag(5).unwrap().clone();
        store.remove_tag(5, Origin::Local);

        assert_eq!(store.reconcile_saved_tag(5, version, saved), Reconciled::Orphaned);
        assert!(store.tag(5).is_none());
        assert!(!store.dirty().tags.is_dirty(&5));
        assert!(store.dirty().tags.is_removed(&5));
    }

    #[test]
    fn test_rehydrate_marks_local_entities() {
        let mut store = Store::new();
        let id = store.create_workout("2024-05-01");
        store.upsert_workout(5, Workout::record(5, "2024-05-02").into(), Origin::Server);

        let json = serde_json::to_string(&store).unwrap();
        let mut loaded: Store = serde_json::from_str(&json).unwrap();
        assert!(loaded.dirty().is_clean());

        loaded.rehydrate();
        assert!(loaded.dirty().workouts.is_dirty(&id));
        assert!(!loaded.dirty().workouts.is_dirty(&5));
    }

    #[test]
    fn test_local_id_counter_survives_persistence() {
        let mut store = Store::new();
        store.create_workout("2024-05-01");

        let json = serde_json::to_string(&store).unwrap();
        let mut loaded: Store = serde_json::from_str(&json).unwrap();
        let next = loaded.create_workout("2024-05-02");
        assert_eq!(next, -2);
    }

    #[test]
    fn test_handle_shares_state() {
        let handle = StoreHandle::default();
        let other = handle.clone();
        handle.write(|s| {
            s.set_weight("2024-05-01", 180, Origin::Local);
        });

        let value = other.read(|s| s.weight_entry("2024-05-01").map(|e| e.value));
        assert_eq!(value, Some(180));
    }
}
