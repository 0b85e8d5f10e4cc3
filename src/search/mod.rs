// Search module
// Permission-aware similarity queries over the canvas index


use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SearchConfig;
use crate::index::{EntryMetadata, IndexManager};
use crate::{CanvasId, CanvasSearchError, Result, UserId};

/// A similarity query issued on behalf of a user, or anonymously
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub requester: Option<UserId>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub score_threshold: Option<f32>,
}

impl SearchRequest {
    #[inline]
    pub fn new<S: Into<String>>(query: S) -> Self {
        Self {
            query: query.into(),
            requester: None,
            limit: None,
            score_threshold: None,
        }
    }

    #[inline]
    pub fn requester(mut self, user_id: UserId) -> Self {
        self.requester = Some(user_id);
        self
    }

    #[inline]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[inline]
    pub fn score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = Some(threshold);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub canvas_id: CanvasId,
    pub owner_id: UserId,
    pub title: String,
    pub score: f32,
    pub text_preview: String,
}

/// A document is visible when it is public or owned by the requester
#[inline]
pub fn is_visible_to(metadata: &EntryMetadata, requester: Option<UserId>) -> bool {
    metadata.is_public || requester == Some(metadata.owner_id)
}

/// First `max_chars` characters of `text`, with `...` appended only when cut
#[inline]
pub fn text_preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let mut preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        preview.push_str("...");
    }
    preview
}

#[derive(Debug, Clone)]
pub struct SearchService {
    manager: IndexManager,
    config: SearchConfig,
}

impl SearchService {
    #[inline]
    pub fn new(manager: IndexManager, config: SearchConfig) -> Self {
        Self { manager, config }
    }

    #[inline]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Rank visible canvases by similarity to the query.
    ///
    /// Fails with `NoIndex` while nothing has been indexed, which callers
    /// should treat differently from a successful search with no hits.
    #[inline]
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(CanvasSearchError::InvalidRequest(
                "query cannot be empty".to_string(),
            ));
        }

        let threshold = request
            .score_threshold
            .unwrap_or(self.config.score_threshold);
        if !threshold.is_finite() {
            return Err(CanvasSearchError::InvalidRequest(format!(
                "score threshold must be finite, got {}",
                threshold
            )));
        }

        if self.manager.is_empty().await {
            return Err(CanvasSearchError::NoIndex);
        }

        let limit = request
            .limit
            .unwrap_or(self.config.default_limit)
            .min(self.config.max_limit);

        let vector = self.manager.embed(query, "query embedding").await?;

        let state = self.manager.read_state().await;
        if state.index.is_empty() {
            return Err(CanvasSearchError::NoIndex);
        }

        let requester = request.requester;
        let scored = state
            .index
            .search_filtered(&vector, limit, |metadata| {
                is_visible_to(metadata, requester)
            })?;
        drop(state);

        let hits: Vec<SearchHit> = scored
            .into_iter()
            .filter(|entry| entry.score >= threshold)
            .map(|entry| SearchHit {
                canvas_id: entry.metadata.canvas_id,
                owner_id: entry.metadata.owner_id,
                score: entry.score,
                text_preview: text_preview(&entry.metadata.text, self.config.preview_chars),
                title: entry.metadata.title,
            })
            .collect();

        debug!(
            "Search for {:?} by {:?} returned {} hits (limit {}, threshold {})",
            query,
            requester,
            hits.len(),
            limit,
            threshold
        );

        Ok(hits)
    }
}
