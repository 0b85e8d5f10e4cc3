
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::vector::EntryId;
use crate::CanvasId;

/// Which index entries belong to which canvas
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentRegistry {
    canvases: BTreeMap<CanvasId, BTreeSet<EntryId>>,
}

impl DocumentRegistry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, canvas_id: CanvasId) -> Option<&BTreeSet<EntryId>> {
        self.canvases.get(&canvas_id)
    }

    /// Swap the canvas's entries for `entries`, returning the previous set
    #[inline]
    pub fn replace<I>(&mut self, canvas_id: CanvasId, entries: I) -> Option<BTreeSet<EntryId>>
    where
        I: IntoIterator<Item = EntryId>,
    {
        let entries: BTreeSet<EntryId> = entries.into_iter().collect();
        if entries.is_empty() {
            return self.canvases.remove(&canvas_id);
        }
        self.canvases.insert(canvas_id, entries)
    }

    #[inline]
    pub fn remove(&mut self, canvas_id: CanvasId) -> Option<BTreeSet<EntryId>> {
        self.canvases.remove(&canvas_id)
    }

    /// Drop a single entry from a canvas, forgetting the canvas once it has none left
    #[inline]
    pub fn remove_entry(&mut self, canvas_id: CanvasId, entry_id: EntryId) -> bool {
        let Some(entries) = self.canvases.get_mut(&canvas_id) else {
            return false;
        };
        let removed = entries.remove(&entry_id);
        if entries.is_empty() {
            self.canvases.remove(&canvas_id);
        }
        removed
    }

    #[inline]
    pub fn contains(&self, canvas_id: CanvasId) -> bool {
        self.canvases.contains_key(&canvas_id)
    }

    /// Number of registered canvases
    #[inline]
    pub fn len(&self) -> usize {
        self.canvases.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.canvases.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (CanvasId, &BTreeSet<EntryId>)> + '_ {
        self.canvases.iter().map(|(id, entries)| (*id, entries))
    }

    #[inline]
    pub fn canvas_ids(&self) -> impl Iterator<Item = CanvasId> + '_ {
        self.canvases.keys().copied()
    }

    #[inline]
    pub fn all_entry_ids(&self) -> BTreeSet<EntryId> {
        self.canvases.values().flatten().copied().collect()
    }
}
