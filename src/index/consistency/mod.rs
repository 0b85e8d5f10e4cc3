// Index consistency validation module
// Ensures every registered entry exists in the vector index and nothing in the index is unregistered


use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use super::registry::DocumentRegistry;
use super::vector::{EntryId, VectorIndex};
use crate::CanvasId;

/// Consistency check results between the registry and the vector index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// Number of canvases in the registry
    pub registered_documents: usize,
    /// Number of vectors in the index
    pub index_entries: usize,
    /// Registered entry ids with no vector behind them
    pub dangling_in_registry: Vec<(CanvasId, EntryId)>,
    /// Index entries no canvas claims
    pub orphaned_in_index: Vec<EntryId>,
    /// Registered entries whose metadata names another canvas
    pub mismatched_metadata: Vec<EntryId>,
    /// Overall consistency status
    pub is_consistent: bool,
}

impl ConsistencyReport {
    #[inline]
    pub fn total_issues(&self) -> usize {
        self.dangling_in_registry.len() + self.orphaned_in_index.len() + self.mismatched_metadata.len()
    }

    #[inline]
    pub fn summary(&self) -> String {
        if self.is_consistent {
            format!(
                "consistent: {} canvases, {} index entries",
                self.registered_documents, self.index_entries
            )
        } else {
            format!(
                "{} issue(s): {} dangling registry ids, {} orphaned index entries, {} metadata mismatches",
                self.total_issues(),
                self.dangling_in_registry.len(),
                self.orphaned_in_index.len(),
                self.mismatched_metadata.len()
            )
        }
    }
}

/// What a repair pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairStats {
    pub dangling_removed: usize,
    pub orphans_removed: usize,
    pub mismatched_removed: usize,
}

impl RepairStats {
    #[inline]
    pub fn total(&self) -> usize {
        self.dangling_removed + self.orphans_removed + self.mismatched_removed
    }
}

/// Performs consistency validation between the registry and the index
pub struct ConsistencyValidator<'a> {
    index: &'a VectorIndex,
    registry: &'a DocumentRegistry,
}

impl<'a> ConsistencyValidator<'a> {
    #[inline]
    pub fn new(index: &'a VectorIndex, registry: &'a DocumentRegistry) -> Self {
        Self { index, registry }
    }

    /// Perform a full consistency check
    #[inline]
    pub fn validate(&self) -> ConsistencyReport {
        debug!(
            "Validating {} canvases against {} index entries",
            self.registry.len(),
            self.index.len()
        );

        let mut dangling_in_registry = Vec::new();
        let mut mismatched_metadata = Vec::new();

        for (canvas_id, entries) in self.registry.iter() {
            for entry_id in entries {
                match self.index.get(*entry_id) {
                    None => dangling_in_registry.push((canvas_id, *entry_id)),
                    Some(entry) if entry.metadata.canvas_id != canvas_id => {
                        mismatched_metadata.push(*entry_id);
                    }
                    Some(_) => {}
                }
            }
        }

        let registered: BTreeSet<EntryId> = self.registry.all_entry_ids();
        let orphaned_in_index: Vec<EntryId> = self
            .index
            .entry_ids()
            .filter(|id| !registered.contains(id))
            .collect();

        let is_consistent = dangling_in_registry.is_empty()
            && orphaned_in_index.is_empty()
            && mismatched_metadata.is_empty();

        let report = ConsistencyReport {
            registered_documents: self.registry.len(),
            index_entries: self.index.len(),
            dangling_in_registry,
            orphaned_in_index,
            mismatched_metadata,
            is_consistent,
        };

        if report.is_consistent {
            debug!("Index consistency validation passed");
        } else {
            warn!("Index consistency validation found issues");
            log_consistency_issues(&report);
        }

        report
    }
}

/// Bring the registry and index back in line with each other.
///
/// Dangling registry ids are forgotten, orphaned vectors deleted, and
/// mismatched entries removed from both sides so the canvas can be indexed
/// again cleanly.
#[inline]
pub fn repair(
    index: &mut VectorIndex,
    registry: &mut DocumentRegistry,
    report: &ConsistencyReport,
) -> RepairStats {
    let mut stats = RepairStats::default();

    for (canvas_id, entry_id) in &report.dangling_in_registry {
        if registry.remove_entry(*canvas_id, *entry_id) {
            stats.dangling_removed += 1;
        }
    }

    for entry_id in &report.mismatched_metadata {
        let owners: Vec<CanvasId> = registry
            .iter()
            .filter(|(_, entries)| entries.contains(entry_id))
            .map(|(canvas_id, _)| canvas_id)
            .collect();
        for canvas_id in owners {
            registry.remove_entry(canvas_id, *entry_id);
        }
        stats.mismatched_removed += index.delete(&[*entry_id]);
    }

    stats.orphans_removed = index.delete(&report.orphaned_in_index);

    info!(
        "Repaired index: {} dangling ids, {} orphans, {} mismatched entries removed",
        stats.dangling_removed, stats.orphans_removed, stats.mismatched_removed
    );

    stats
}

fn log_consistency_issues(report: &ConsistencyReport) {
    if !report.dangling_in_registry.is_empty() {
        warn!(
            "Found {} registry ids missing from the index",
            report.dangling_in_registry.len()
        );
        for (canvas_id, entry_id) in report.dangling_in_registry.iter().take(5) {
            warn!("  canvas {} -> missing entry {}", canvas_id, entry_id);
        }
    }

    if !report.orphaned_in_index.is_empty() {
        warn!(
            "Found {} orphaned entries in the index",
            report.orphaned_in_index.len()
        );
    }

    if !report.mismatched_metadata.is_empty() {
        warn!(
            "Found {} entries registered under the wrong canvas",
            report.mismatched_metadata.len()
        );
    }
}
