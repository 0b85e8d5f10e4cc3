//! Index manager.
//!
//! Owns the vector index and the document registry behind one lock and
//! keeps them aligned: every mutation updates both, bumps the generation
//! and writes a snapshot before the lock is released. Embedding happens
//! before the lock is taken, and mutations run on a spawned task so a
//! caller giving up halfway cannot leave them partially applied.
//! Snapshot writes run on their own task, one at a time, so a write whose
//! wait timed out still finishes before the next one starts.


use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

use super::consistency::{self, ConsistencyReport, ConsistencyValidator, RepairStats};
use super::registry::DocumentRegistry;
use super::snapshot::{EncodedSnapshot, SnapshotStore};
use super::vector::{EntryId, EntryMetadata, VectorIndex};
use crate::config::Config;
use crate::content::{CanvasDocument, ContentSource};
use crate::embeddings::{EmbeddingProvider, validate_embedding};
use crate::{CanvasId, CanvasSearchError, Result};

/// Timeouts and indexing policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerSettings {
    pub embed_timeout: Duration,
    pub persist_timeout: Duration,
    pub index_empty_canvases: bool,
}

impl Default for ManagerSettings {
    #[inline]
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ManagerSettings {
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self {
            embed_timeout: config.embedding.timeout(),
            persist_timeout: config.index.persist_timeout(),
            index_empty_canvases: config.index.index_empty_canvases,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub canvas_id: CanvasId,
    pub entry_id: EntryId,
    /// The canvas had entries before this upsert
    pub replaced: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted { removed_entries: usize },
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    Indexed(UpsertOutcome),
    /// The content source has no such canvas
    NotFound,
    /// The canvas has no text to embed
    NoContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub documents: usize,
    pub entries: usize,
    pub dimension: Option<usize>,
    pub generation: u64,
}

#[derive(Debug, Default)]
pub(crate) struct IndexState {
    pub(crate) index: VectorIndex,
    pub(crate) registry: DocumentRegistry,
    pub(crate) generation: u64,
}

struct ManagerInner {
    state: RwLock<IndexState>,
    provider: Arc<dyn EmbeddingProvider>,
    store: SnapshotStore,
    /// Held for the whole of each snapshot write
    write_lock: Arc<Mutex<()>>,
    settings: ManagerSettings,
}

#[derive(Clone)]
pub struct IndexManager {
    inner: Arc<ManagerInner>,
}

impl std::fmt::Debug for IndexManager {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexManager")
            .field("provider", &self.inner.provider.name())
            .field("store", &self.inner.store.dir())
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}

impl IndexManager {
    /// Load the snapshot under `store_dir`, or start empty when there is none.
    ///
    /// A snapshot whose two halves disagree is repaired and written back
    /// before the manager is returned.
    #[inline]
    pub async fn open<P: Into<PathBuf>>(
        store_dir: P,
        provider: Arc<dyn EmbeddingProvider>,
        settings: ManagerSettings,
    ) -> Result<Self> {
        let store = SnapshotStore::new(store_dir);
        let mut needs_persist = false;

        let mut state = match store.load().await {
            Some(loaded) => {
                let mismatch = !loaded.generations_match();
                if mismatch {
                    warn!(
                        "Snapshot generations differ (index {}, registry {}), running repair",
                        loaded.index_generation, loaded.registry_generation
                    );
                }

                let generation = loaded.generation();
                let mut index = loaded.index;
                let mut registry = loaded.registry;
                let report = ConsistencyValidator::new(&index, &registry).validate();
                if !report.is_consistent {
                    consistency::repair(&mut index, &mut registry, &report);
                }

                needs_persist = mismatch || !report.is_consistent;
                IndexState {
                    index,
                    registry,
                    generation: if needs_persist {
                        generation + 1
                    } else {
                        generation
                    },
                }
            }
            None => IndexState::default(),
        };

        if let (Some(expected), Some(actual)) = (provider.dimension(), state.index.dimension()) {
            if expected != actual {
                let dropped = state.index.clear();
                state.registry = DocumentRegistry::new();
                warn!(
                    "Index holds {}-dimensional vectors but provider {} produces {}, dropped {} entries; reindex to restore them",
                    actual,
                    provider.name(),
                    expected,
                    dropped
                );
                if !needs_persist {
                    state.generation += 1;
                    needs_persist = true;
                }
            }
        }

        let manager = Self {
            inner: Arc::new(ManagerInner {
                state: RwLock::new(state),
                provider,
                store,
                write_lock: Arc::new(Mutex::new(())),
                settings,
            }),
        };

        if needs_persist {
            let state = manager.inner.state.read().await;
            manager.persist_state(&state).await?;
        }

        info!("Opened index manager: {:?}", manager.stats().await);
        Ok(manager)
    }

    /// Open using the paths and timeouts from `config`
    #[inline]
    pub async fn from_config(config: &Config, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        Self::open(
            config.index_dir_path(),
            provider,
            ManagerSettings::from_config(config),
        )
        .await
    }

    #[inline]
    pub fn settings(&self) -> &ManagerSettings {
        &self.inner.settings
    }

    #[inline]
    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.inner.provider
    }

    /// Index `document`, replacing whatever its canvas had before
    #[inline]
    pub async fn upsert(&self, document: CanvasDocument) -> Result<UpsertOutcome> {
        debug!(
            "Upserting canvas {} ({} chars)",
            document.canvas_id,
            document.text.len()
        );
        let vector = self.embed(&document.text, "document embedding").await?;

        let manager = self.clone();
        tokio::spawn(async move { manager.apply_upsert(document, vector).await })
            .await
            .map_err(join_error)?
    }

    /// Remove every entry of a canvas
    #[inline]
    pub async fn delete(&self, canvas_id: CanvasId) -> Result<DeleteOutcome> {
        let manager = self.clone();
        tokio::spawn(async move { manager.apply_delete(canvas_id).await })
            .await
            .map_err(join_error)?
    }

    /// Fetch a canvas from `source` and upsert it
    #[inline]
    pub async fn index_canvas(
        &self,
        source: &dyn ContentSource,
        canvas_id: CanvasId,
    ) -> Result<IndexOutcome> {
        let Some(document) = source.fetch_canvas(canvas_id).await? else {
            debug!("Canvas {} not found in content source", canvas_id);
            return Ok(IndexOutcome::NotFound);
        };

        if !document.has_text() && !self.inner.settings.index_empty_canvases {
            debug!("Canvas {} has no text, skipping", canvas_id);
            return Ok(IndexOutcome::NoContent);
        }

        self.upsert(document).await.map(IndexOutcome::Indexed)
    }

    /// Write the current state to disk
    #[inline]
    pub async fn persist(&self) -> Result<()> {
        let state = self.inner.state.write().await;
        self.persist_state(&state).await
    }

    #[inline]
    pub async fn check_consistency(&self) -> ConsistencyReport {
        let state = self.inner.state.read().await;
        ConsistencyValidator::new(&state.index, &state.registry).validate()
    }

    /// Validate and fix the index, persisting only when something changed
    #[inline]
    pub async fn repair(&self) -> Result<RepairStats> {
        let manager = self.clone();
        tokio::spawn(async move { manager.apply_repair().await })
            .await
            .map_err(join_error)?
    }

    #[inline]
    pub async fn stats(&self) -> IndexStats {
        let state = self.inner.state.read().await;
        IndexStats {
            documents: state.registry.len(),
            entries: state.index.len(),
            dimension: state.index.dimension(),
            generation: state.generation,
        }
    }

    #[inline]
    pub async fn is_empty(&self) -> bool {
        self.inner.state.read().await.index.is_empty()
    }

    #[inline]
    pub async fn contains_canvas(&self, canvas_id: CanvasId) -> bool {
        self.inner.state.read().await.registry.contains(canvas_id)
    }

    #[inline]
    pub async fn canvas_ids(&self) -> Vec<CanvasId> {
        self.inner.state.read().await.registry.canvas_ids().collect()
    }

    /// Embed `text` within the configured timeout and check the result
    pub(crate) async fn embed(&self, text: &str, operation: &str) -> Result<Vec<f32>> {
        let provider = &self.inner.provider;
        let vector = tokio::time::timeout(self.inner.settings.embed_timeout, provider.embed(text))
            .await
            .map_err(|_| CanvasSearchError::Timeout {
                operation: operation.to_string(),
            })??;

        validate_embedding(&vector, provider.dimension())?;
        Ok(vector)
    }

    pub(crate) async fn read_state(&self) -> RwLockReadGuard<'_, IndexState> {
        self.inner.state.read().await
    }

    async fn apply_upsert(&self, document: CanvasDocument, vector: Vec<f32>) -> Result<UpsertOutcome> {
        let mut guard = self.inner.state.write().await;
        let state = &mut *guard;
        let canvas_id = document.canvas_id;

        if let Some(dimension) = state.index.dimension() {
            if dimension != vector.len() {
                return Err(CanvasSearchError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
        }

        let previous: Vec<EntryId> = state
            .registry
            .get(canvas_id)
            .map(|entries| entries.iter().copied().collect())
            .unwrap_or_default();

        let (live, dangling): (Vec<EntryId>, Vec<EntryId>) =
            previous.iter().copied().partition(|id| state.index.contains(*id));
        if !dangling.is_empty() {
            let condition = CanvasSearchError::InconsistentState(format!(
                "canvas {} references missing entries {:?}",
                canvas_id, dangling
            ));
            warn!("{}, dropping them", condition);
        }

        let removed = state.index.delete(&live);
        let entry_id = state
            .index
            .add(vector, EntryMetadata::from(&document))?;
        state.registry.replace(canvas_id, [entry_id]);
        state.generation += 1;

        debug!(
            "Canvas {} now at entry {} (removed {} old entries)",
            canvas_id, entry_id, removed
        );

        self.persist_state(state).await?;

        Ok(UpsertOutcome {
            canvas_id,
            entry_id,
            replaced: !previous.is_empty(),
        })
    }

    async fn apply_delete(&self, canvas_id: CanvasId) -> Result<DeleteOutcome> {
        let mut guard = self.inner.state.write().await;
        let state = &mut *guard;

        let Some(entries) = state.registry.remove(canvas_id) else {
            debug!("Canvas {} not indexed, nothing to delete", canvas_id);
            return Ok(DeleteOutcome::NotFound);
        };

        let ids: Vec<EntryId> = entries.into_iter().collect();
        let removed_entries = state.index.delete(&ids);
        if removed_entries < ids.len() {
            warn!(
                "Canvas {} had {} dangling registry ids",
                canvas_id,
                ids.len() - removed_entries
            );
        }
        state.generation += 1;

        self.persist_state(state).await?;

        info!(
            "Deleted canvas {} ({} entries)",
            canvas_id, removed_entries
        );
        Ok(DeleteOutcome::Deleted { removed_entries })
    }

    async fn apply_repair(&self) -> Result<RepairStats> {
        let mut guard = self.inner.state.write().await;
        let state = &mut *guard;

        let report = ConsistencyValidator::new(&state.index, &state.registry).validate();
        if report.is_consistent {
            return Ok(RepairStats::default());
        }

        let stats = consistency::repair(&mut state.index, &mut state.registry, &report);
        state.generation += 1;
        self.persist_state(state).await?;

        Ok(stats)
    }

    async fn persist_state(&self, state: &IndexState) -> Result<()> {
        let snapshot = EncodedSnapshot::encode(state.generation, &state.index, &state.registry)?;
        let store = self.inner.store.clone();
        let write_lock = Arc::clone(&self.inner.write_lock);

        // Once the lock is taken the write runs to completion on its own task,
        // even when the wait below gives up.
        let save = async move {
            let guard = write_lock.lock_owned().await;
            tokio::spawn(async move {
                let result = store.write(&snapshot).await;
                drop(guard);
                result
            })
            .await
            .map_err(join_error)?
        };

        tokio::time::timeout(self.inner.settings.persist_timeout, save)
            .await
            .map_err(|_| {
                warn!(
                    "Snapshot generation {} not confirmed within {:?}, memory may be ahead of disk",
                    state.generation, self.inner.settings.persist_timeout
                );
                CanvasSearchError::Timeout {
                    operation: "snapshot persistence".to_string(),
                }
            })?
            .inspect_err(|e| {
                warn!(
                    "Snapshot generation {} not written, memory is ahead of disk: {}",
                    state.generation, e
                );
            })
    }
}

fn join_error(error: tokio::task::JoinError) -> CanvasSearchError {
    CanvasSearchError::Other(anyhow::anyhow!("Index mutation task failed: {}", error))
}
