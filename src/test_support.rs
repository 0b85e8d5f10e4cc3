// Shared fixtures for unit tests

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crate::content::{CanvasDocument, ContentSource};
use crate::embeddings::EmbeddingProvider;
use crate::index::{IndexManager, ManagerSettings};
use crate::{CanvasId, CanvasSearchError, Result, UserId};

/// One dimension per vocabulary word, counting occurrences.
///
/// Unlike feature hashing there are no collisions, so similarity between
/// two texts depends only on the words they share. Words outside the
/// vocabulary are ignored. Can be switched to fail or stall on demand.
pub(crate) struct VocabularyEmbedder {
    vocabulary: Vec<String>,
    failing: AtomicBool,
    delay_ms: AtomicU64,
    calls: AtomicUsize,
}

impl VocabularyEmbedder {
    pub(crate) fn new(words: &[&str]) -> Self {
        Self {
            vocabulary: words.iter().map(|word| word.to_lowercase()).collect(),
            failing: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn set_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.delay_ms.store(millis, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.vocabulary.len()];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let token = token.to_lowercase();
            if let Some(position) = self.vocabulary.iter().position(|word| *word == token) {
                vector[position] += 1.0;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for VocabularyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(CanvasSearchError::Embedding(
                "embedding backend unavailable".to_string(),
            ));
        }

        Ok(self.vector_for(text))
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.vocabulary.len())
    }

    fn name(&self) -> &str {
        "vocabulary"
    }
}

/// Words used across the index and search tests
pub(crate) const VOCABULARY: &[&str] = &[
    "quick", "brown", "fox", "jumps", "lazy", "dog", "hare", "tortoise", "race", "slow", "garden",
    "roses", "recipe", "bread", "grandmother", "watch", "letters", "war",
];

pub(crate) fn embedder() -> Arc<VocabularyEmbedder> {
    Arc::new(VocabularyEmbedder::new(VOCABULARY))
}

pub(crate) fn document(
    canvas_id: CanvasId,
    owner_id: UserId,
    is_public: bool,
    text: &str,
) -> CanvasDocument {
    CanvasDocument {
        canvas_id,
        owner_id,
        title: format!("Canvas {}", canvas_id),
        is_public,
        text: text.to_string(),
    }
}

pub(crate) fn settings() -> ManagerSettings {
    ManagerSettings {
        embed_timeout: Duration::from_secs(5),
        persist_timeout: Duration::from_secs(5),
        index_empty_canvases: false,
    }
}

pub(crate) async fn open_manager(dir: &Path, provider: Arc<VocabularyEmbedder>) -> IndexManager {
    IndexManager::open(dir.join("index"), provider, settings())
        .await
        .expect("manager should open")
}

/// Content source backed by a map
#[derive(Default)]
pub(crate) struct MemorySource {
    documents: BTreeMap<CanvasId, CanvasDocument>,
}

impl MemorySource {
    pub(crate) fn with(documents: impl IntoIterator<Item = CanvasDocument>) -> Self {
        Self {
            documents: documents
                .into_iter()
                .map(|document| (document.canvas_id, document))
                .collect(),
        }
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn fetch_canvas(&self, canvas_id: CanvasId) -> Result<Option<CanvasDocument>> {
        Ok(self.documents.get(&canvas_id).cloned())
    }

    async fn list_canvas_ids(&self) -> Result<Vec<CanvasId>> {
        Ok(self.documents.keys().copied().collect())
    }
}
