//! Dirty-set tracking for unsynchronized local changes.
//!
//! Every mark carries a version drawn from a per-set counter. A flush
//! snapshots `(key, version)` pairs before awaiting the remote and, on
//! success, clears only the pairs whose version is unchanged. A key that
//! was marked again while the request was in flight therefore stays
//! dirty and is picked up by the next flush.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Keys of one collection that hold unsynchronized changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirtySet<K: Ord> {
    changed: BTreeMap<K, u64>,
    removed: BTreeMap<K, u64>,
    clock: u64,
}

impl<K: Ord> Default for DirtySet<K> {
    fn default() -> Self {
        Self {
            changed: BTreeMap::new(),
            removed: BTreeMap::new(),
            clock: 0,
        }
    }
}

/// Point-in-time copy of a [`DirtySet`] taken at the start of a flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtySnapshot<K> {
    pub changed: Vec<(K, u64)>,
    pub removed: Vec<(K, u64)>,
}

impl<K> DirtySnapshot<K> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }
}

impl<K: Ord + Clone> DirtySet<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Record that the entity at `key` was created or changed locally.
    pub fn mark(&mut self, key: K) {
        let version = self.tick();
        self.changed.insert(key, version);
    }

    /// Record that the entity at `key` was removed locally.
    ///
    /// Any pending change mark is left in place; flushes only send
    /// changes for entities still present in the cache.
    pub fn mark_removed(&mut self, key: K) {
        let version = self.tick();
        self.removed.insert(key, version);
    }

    #[must_use]
    pub fn is_dirty(&self, key: &K) -> bool {
        self.changed.contains_key(key)
    }

    #[must_use]
    pub fn is_removed(&self, key: &K) -> bool {
        self.removed.contains_key(key)
    }

    /// Version of the pending change mark for `key`, if any.
    #[must_use]
    pub fn version(&self, key: &K) -> Option<u64> {
        self.changed.get(key).copied()
    }

    pub fn changed(&self) -> impl Iterator<Item = &K> {
        self.changed.keys()
    }

    pub fn removed(&self) -> impl Iterator<Item = &K> {
        self.removed.keys()
    }

    /// Number of changed plus removed keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changed.len() + self.removed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }

    #[must_use]
    pub fn snapshot(&self) -> DirtySnapshot<K> {
        DirtySnapshot {
            changed: self
                .changed
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            removed: self
                .removed
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
        }
    }

    /// Clear a change mark if it still carries `version`.
    ///
    /// Returns true when the mark was cleared.
    pub fn clear_changed(&mut self, key: &K, version: u64) -> bool {
        if self.changed.get(key) == Some(&version) {
            self.changed.remove(key);
            true
        } else {
            false
        }
    }

    /// Clear a removal mark if it still carries `version`.
    pub fn clear_removed(&mut self, key: &K, version: u64) -> bool {
        if self.removed.get(key) == Some(&version) {
            self.removed.remove(key);
            true
        } else {
            false
        }
    }

    /// Clear every mark in `snapshot` that was not re-marked since.
    ///
    /// Returns the number of marks cleared.
    pub fn clear_flushed(&mut self, snapshot: &DirtySnapshot<K>) -> usize {
        let mut cleared = 0;
        for (key, version) in &snapshot.changed {
            cleared += usize::from(self.clear_changed(key, *version));
        }
        for (key, version) in &snapshot.removed {
            cleared += usize::from(self.clear_removed(key, *version));
        }
        cleared
    }

    /// Move a pending change mark from `old` to `new`, keeping it dirty.
    pub fn rekey(&mut self, old: &K, new: K) {
        if self.changed.remove(old).is_some() {
            self.mark(new);
        }
    }

    /// Drop the change mark for `key`, keeping any removal mark.
    pub fn unmark(&mut self, key: &K) {
        self.changed.remove(key);
    }

    /// Drop both marks for `key` regardless of version.
    pub fn forget(&mut self, key: &K) {
        self.changed.remove(key);
        self.removed.remove(key);
    }

    /// Drop every mark unconditionally.
    pub fn clear_all(&mut self) {
        self.changed.clear();
        self.removed.clear();
    }
}

/// Single versioned flag for collections synced as one unit (settings).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirtyFlag {
    version: Option<u64>,
    clock: u64,
}

impl DirtyFlag {
    pub fn mark(&mut self) {
        self.clock += 1;
        self.version = Some(self.clock);
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.version.is_some()
    }

    /// Version to pass back to [`DirtyFlag::clear`] after a flush.
    #[must_use]
    pub const fn snapshot(&self) -> Option<u64> {
        self.version
    }

    pub fn clear(&mut self, version: u64) -> bool {
        if self.version == Some(version) {
            self.version = None;
            true
        } else {
            false
        }
    }

    pub fn clear_all(&mut self) {
        self.version = None;
    }
}
