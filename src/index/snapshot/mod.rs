// Snapshot persistence for the vector index and the document registry
// Two JSON files stamped with the same generation, replaced through temp file + rename


use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::registry::DocumentRegistry;
use super::vector::VectorIndex;
use crate::{CanvasSearchError, Result};

pub const INDEX_SNAPSHOT_FILE: &str = "index.json";
pub const REGISTRY_SNAPSHOT_FILE: &str = "registry.json";
const TEMP_EXTENSION: &str = "tmp";

#[derive(Serialize)]
struct IndexSnapshotRef<'a> {
    generation: u64,
    saved_at: DateTime<Utc>,
    index: &'a VectorIndex,
}

#[derive(Deserialize)]
struct IndexSnapshot {
    generation: u64,
    saved_at: DateTime<Utc>,
    index: VectorIndex,
}

#[derive(Serialize)]
struct RegistrySnapshotRef<'a> {
    generation: u64,
    saved_at: DateTime<Utc>,
    registry: &'a DocumentRegistry,
}

#[derive(Deserialize)]
struct RegistrySnapshot {
    generation: u64,
    saved_at: DateTime<Utc>,
    registry: DocumentRegistry,
}

/// State read back from disk
#[derive(Debug, Clone)]
pub struct LoadedSnapshot {
    pub index: VectorIndex,
    pub registry: DocumentRegistry,
    pub index_generation: u64,
    pub registry_generation: u64,
    pub saved_at: DateTime<Utc>,
}

impl LoadedSnapshot {
    /// Both files were written by the same save
    #[inline]
    pub fn generations_match(&self) -> bool {
        self.index_generation == self.registry_generation
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.index_generation.max(self.registry_generation)
    }
}

/// Both snapshot files serialized and ready to be written
#[derive(Debug, Clone)]
pub struct EncodedSnapshot {
    generation: u64,
    index: Vec<u8>,
    registry: Vec<u8>,
    entries: usize,
    canvases: usize,
}

impl EncodedSnapshot {
    #[inline]
    pub fn encode(
        generation: u64,
        index: &VectorIndex,
        registry: &DocumentRegistry,
    ) -> Result<Self> {
        let saved_at = Utc::now();
        let index_bytes = serde_json::to_vec(&IndexSnapshotRef {
            generation,
            saved_at,
            index,
        })
        .map_err(|e| CanvasSearchError::Persistence(format!("Failed to encode index: {}", e)))?;
        let registry_bytes = serde_json::to_vec(&RegistrySnapshotRef {
            generation,
            saved_at,
            registry,
        })
        .map_err(|e| {
            CanvasSearchError::Persistence(format!("Failed to encode registry: {}", e))
        })?;

        Ok(Self {
            generation,
            index: index_bytes,
            registry: registry_bytes,
            entries: index.len(),
            canvases: registry.len(),
        })
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Reads and writes the snapshot pair under one directory
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    #[inline]
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[inline]
    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_SNAPSHOT_FILE)
    }

    #[inline]
    pub fn registry_path(&self) -> PathBuf {
        self.dir.join(REGISTRY_SNAPSHOT_FILE)
    }

    /// Encode and write both snapshots stamped with `generation`
    #[inline]
    pub async fn save(
        &self,
        generation: u64,
        index: &VectorIndex,
        registry: &DocumentRegistry,
    ) -> Result<()> {
        let snapshot = EncodedSnapshot::encode(generation, index, registry)?;
        self.write(&snapshot).await
    }

    /// Write an encoded snapshot pair.
    ///
    /// The index file is renamed into place first and the registry second,
    /// so an interrupted write leaves a generation mismatch that `load` can
    /// detect. Temp file names are fixed: callers must not run two writes
    /// to the same directory at once.
    #[inline]
    pub async fn write(&self, snapshot: &EncodedSnapshot) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            CanvasSearchError::Persistence(format!(
                "Failed to create snapshot directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let index_path = self.index_path();
        let registry_path = self.registry_path();
        let index_tmp = write_temp(&index_path, &snapshot.index).await?;
        let registry_tmp = write_temp(&registry_path, &snapshot.registry).await?;

        rename(&index_tmp, &index_path).await?;
        rename(&registry_tmp, &registry_path).await?;

        debug!(
            "Saved snapshot generation {} ({} index entries, {} canvases)",
            snapshot.generation, snapshot.entries, snapshot.canvases
        );
        Ok(())
    }

    /// Read both snapshots back.
    ///
    /// Returns `None` for a cold start: no snapshot yet, or files that are
    /// missing or cannot be decoded. Never fails.
    #[inline]
    pub async fn load(&self) -> Option<LoadedSnapshot> {
        let index_path = self.index_path();
        let registry_path = self.registry_path();

        let index_exists = tokio::fs::try_exists(&index_path).await.unwrap_or(false);
        let registry_exists = tokio::fs::try_exists(&registry_path).await.unwrap_or(false);

        match (index_exists, registry_exists) {
            (false, false) => {
                info!("No snapshot found in {}, starting empty", self.dir.display());
                return None;
            }
            (true, true) => {}
            _ => {
                warn!(
                    "Incomplete snapshot in {} (index: {}, registry: {}), starting empty",
                    self.dir.display(),
                    index_exists,
                    registry_exists
                );
                return None;
            }
        }

        let index: IndexSnapshot = read_json(&index_path).await?;
        let registry: RegistrySnapshot = read_json(&registry_path).await?;

        info!(
            "Loaded snapshot with {} index entries and {} canvases",
            index.index.len(),
            registry.registry.len()
        );

        Some(LoadedSnapshot {
            index: index.index,
            registry: registry.registry,
            index_generation: index.generation,
            registry_generation: registry.generation,
            saved_at: index.saved_at.max(registry.saved_at),
        })
    }
}

async fn write_temp(target: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let tmp = target.with_extension(TEMP_EXTENSION);
    let persistence_error = |e: std::io::Error| {
        CanvasSearchError::Persistence(format!("Failed to write {}: {}", tmp.display(), e))
    };

    let mut file = tokio::fs::File::create(&tmp)
        .await
        .map_err(persistence_error)?;
    file.write_all(bytes).await.map_err(persistence_error)?;
    file.sync_all().await.map_err(persistence_error)?;

    Ok(tmp)
}

async fn rename(from: &Path, to: &Path) -> Result<()> {
    tokio::fs::rename(from, to).await.map_err(|e| {
        CanvasSearchError::Persistence(format!(
            "Failed to move {} into place: {}",
            to.display(),
            e
        ))
    })
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(
                "Failed to read snapshot {}: {}, starting empty",
                path.display(),
                e
            );
            return None;
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(
                "Failed to decode snapshot {}: {}, starting empty",
                path.display(),
                e
            );
            None
        }
    }
}
