// Index module
// In-memory vector index, the canvas-to-entry registry, snapshots and the manager keeping them aligned

pub mod consistency;
pub mod manager;
pub mod registry;
pub mod snapshot;
pub mod vector;

pub use consistency::{ConsistencyReport, ConsistencyValidator, RepairStats};
pub use manager::{
    DeleteOutcome, IndexManager, IndexOutcome, IndexStats, ManagerSettings, UpsertOutcome,
};
pub use registry::DocumentRegistry;
pub use snapshot::{EncodedSnapshot, LoadedSnapshot, SnapshotStore};
pub use vector::{EntryId, EntryMetadata, IndexEntry, ScoredEntry, VectorIndex};
