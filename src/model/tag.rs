//! Tag and tagged-date models.

use serde::{Deserialize, Serialize};

use crate::storage::Mergeable;

/// Tag identity. Positive ids come from the server, negative ids are local.
pub type TagId = i64;

/// Default color for newly created tags.
pub const DEFAULT_TAG_COLOR: &str = "#000000";

/// A named, colored calendar tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    /// Hex color, e.g. `#ff8800`.
    pub color: String,
}

/// Partial tag write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPatch {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl From<Tag> for TagPatch {
    fn from(tag: Tag) -> Self {
        Self {
            name: Some(tag.name),
            color: Some(tag.color),
        }
    }
}

impl Mergeable for Tag {
    type Key = TagId;
    type Patch = TagPatch;

    fn key(&self) -> TagId {
        self.id
    }

    fn from_patch(key: TagId, patch: TagPatch) -> Self {
        Self {
            id: key,
            name: patch.name.unwrap_or_default(),
            color: patch.color.unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string()),
        }
    }

    fn merge(&mut self, patch: TagPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
    }

    fn into_patch(self) -> TagPatch {
        self.into()
    }
}

/// The set of tags applied to one calendar date.
///
/// `tag_ids` is a set stored as a vector: order is irrelevant, values are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaggedDate {
    pub date: String,
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
}

impl TaggedDate {
    /// Add the tag if absent, remove it if present.
    pub fn toggle(&mut self, tag_id: TagId) {
        if let Some(pos) = self.tag_ids.iter().position(|&id| id == tag_id) {
            self.tag_ids.remove(pos);
        } else {
            self.tag_ids.push(tag_id);
        }
    }

    #[must_use]
    pub fn contains(&self, tag_id: TagId) -> bool {
        self.tag_ids.contains(&tag_id)
    }
}

impl Mergeable for TaggedDate {
    type Key = String;
    /// The full replacement tag-id set.
    type Patch = Vec<TagId>;

    fn key(&self) -> String {
        self.date.clone()
    }

    fn from_patch(key: String, patch: Vec<TagId>) -> Self {
        let mut date = Self {
            date: key,
            tag_ids: Vec::new(),
        };
        date.merge(patch);
        date
    }

    fn merge(&mut self, patch: Vec<TagId>) {
        let mut ids = Vec::with_capacity(patch.len());
        for id in patch {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        self.tag_ids = ids;
    }

    fn into_patch(self) -> Vec<TagId> {
        self.tag_ids
    }
}
