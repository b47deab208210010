//! Per-collection pagination cursors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::CollectionKind;

/// Position in one server-paginated collection.
///
/// `page` is the next page to request and is never below 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationCursor {
    pub page: u32,
    pub has_more: bool,
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self {
            page: 1,
            has_more: false,
        }
    }
}

impl PaginationCursor {
    /// Move past a successfully fetched page.
    pub fn advance(&mut self, has_more: bool) {
        self.page = self.page.saturating_add(1);
        self.has_more = has_more;
    }
}

/// Cursors for every paginated collection, keyed by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursors(BTreeMap<CollectionKind, PaginationCursor>);

impl Cursors {
    /// Cursor for `kind`, or the initial cursor if none was stored.
    #[must_use]
    pub fn get(&self, kind: CollectionKind) -> PaginationCursor {
        self.0.get(&kind).copied().unwrap_or_default()
    }

    pub fn get_mut(&mut self, kind: CollectionKind) -> &mut PaginationCursor {
        self.0.entry(kind).or_default()
    }

    pub fn set(&mut self, kind: CollectionKind, cursor: PaginationCursor) {
        self.0.insert(kind, cursor);
    }

    pub fn iter(&self) -> impl Iterator<Item = (CollectionKind, PaginationCursor)> + '_ {
        CollectionKind::PAGINATED
            .into_iter()
            .map(|kind| (kind, self.get(kind)))
    }
}
