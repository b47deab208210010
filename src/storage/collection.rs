//! Keyed, merge-on-write entity collections.
//!
//! A write never replaces an entity wholesale: the supplied patch is
//! overlaid onto whatever is stored under the same identity, or a new
//! entity is created from the patch when the identity is absent.

use std::collections::BTreeMap;
use std::fmt::Debug;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An entity that can be stored in a [`Collection`].
pub trait Mergeable: Clone {
    /// Identity: a server id or a natural key such as an ISO date.
    type Key: Ord + Clone + Debug;
    /// Partial payload accepted by a write.
    type Patch;

    fn key(&self) -> Self::Key;

    /// Build a fresh entity for an absent identity.
    fn from_patch(key: Self::Key, patch: Self::Patch) -> Self;

    /// Overlay the supplied fields onto this entity.
    fn merge(&mut self, patch: Self::Patch);

    /// Convert a full entity into a patch that sets every field.
    fn into_patch(self) -> Self::Patch;
}

/// Identity → entity mapping with merge semantics.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<V: Mergeable> {
    entries: BTreeMap<V::Key, V>,
}

impl<V: Mergeable> Default for Collection<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V: Mergeable> Collection<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `patch` onto the entity at `key`, creating it if absent.
    pub fn upsert(&mut self, key: V::Key, patch: V::Patch) -> &V {
        use std::collections::btree_map::Entry;

        match self.entries.entry(key) {
            Entry::Occupied(mut slot) => {
                slot.get_mut().merge(patch);
                slot.into_mut()
            }
            Entry::Vacant(slot) => {
                let entity = V::from_patch(slot.key().clone(), patch);
                slot.insert(entity)
            }
        }
    }

    /// Merge every field of `entity` onto its identity.
    pub fn upsert_entity(&mut self, entity: V) -> &V {
        let key = entity.key();
        self.upsert(key, entity.into_patch())
    }

    pub fn remove(&mut self, key: &V::Key) -> Option<V> {
        self.entries.remove(key)
    }

    #[must_use]
    pub fn get(&self, key: &V::Key) -> Option<&V> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &V::Key) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&V::Key, &V)> {
        self.entries.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &V::Key> {
        self.entries.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Edit entities in place. Only used for bulk rewrites that are not
    /// identity-scoped writes (e.g. stripping a deleted tag id everywhere).
    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.values_mut()
    }
}

impl<V: Mergeable> FromIterator<V> for Collection<V> {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        let mut collection = Self::new();
        for entity in iter {
            collection.upsert_entity(entity);
        }
        collection
    }
}

// Persisted as a plain sequence so integer and string keys serialize alike.
impl<V: Mergeable + Serialize> Serialize for Collection<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.values())
    }
}

impl<'de, V: Mergeable + Deserialize<'de>> Deserialize<'de> for Collection<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<V>::deserialize(deserializer)?;
        Ok(items.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Exercise, ExerciseType, Tag, TagPatch, Workout, WorkoutPatch};

    #[test]
    fn test_upsert_creates_when_absent() {
        let mut tags: Collection<Tag> = Collection::new();
        tags.upsert(
            1,
            TagPatch {
                name: Some("Heavy".into()),
                color: None,
            },
        );
        assert_eq!(tags.get(&1).unwrap().name, "Heavy");
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn test_upsert_overlays_only_supplied_fields() {
        let mut tags: Collection<Tag> = Collection::new();
        tags.upsert_entity(Tag {
            id: 1,
            name: "Heavy".into(),
            color: "#ff0000".into(),
        });
        tags.upsert(
            1,
            TagPatch {
                name: Some("Light".into()),
                color: None,
            },
        );

        let tag = tags.get(&1).unwrap();
        assert_eq!(tag.name, "Light");
        assert_eq!(tag.color, "#ff0000");
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut once: Collection<Workout> = Collection::new();
        let mut twice: Collection<Workout> = Collection::new();
        let mut w = Workout::record(7, "2024-05-01");
        w.exercises.push(Exercise::new("Bench", ExerciseType::Resistance));

        once.upsert_entity(w.clone());
        twice.upsert_entity(w.clone());
        twice.upsert_entity(w);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_exercises_replaced_not_merged() {
        let mut workouts: Collection<Workout> = Collection::new();
        let mut w = Workout::record(1, "2024-05-01");
        w.exercises = vec![
            Exercise::new("Squat", ExerciseType::Resistance),
            Exercise::new("Row", ExerciseType::Resistance),
        ];
        workouts.upsert_entity(w);

        workouts.upsert(
            1,
            WorkoutPatch::exercises(vec![Exercise::new("Run", ExerciseType::Cardio)]),
        );
        let names: Vec<_> = workouts
            .get(&1)
            .unwrap()
            .exercises
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["Run"]);
    }

    #[test]
    fn test_serializes_as_sequence() {
        let tags: Collection<Tag> = vec![
            Tag {
                id: 2,
                name: "b".into(),
                color: "#000000".into(),
            },
            Tag {
                id: 1,
                name: "a".into(),
                color: "#000000".into(),
            },
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_value(&tags).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["id"], 1);

        let back: Collection<Tag> = serde_json::from_value(json).unwrap();
        assert_eq!(back, tags);
    }
}
