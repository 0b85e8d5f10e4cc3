// Embeddings module
// Text-to-vector providers: Ollama over HTTP and an offline feature-hashing embedder

pub mod hashing;
pub mod ollama;


use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{Config, EmbeddingProviderKind};
use crate::{CanvasSearchError, Result};

pub use hashing::HashingEmbedder;
pub use ollama::OllamaClient;

/// Converts text into a fixed-dimension vector
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Dimension every returned vector must have, when known up front
    fn dimension(&self) -> Option<usize>;

    fn name(&self) -> &str;
}

/// Reject provider output the index cannot store or compare
#[inline]
pub fn validate_embedding(vector: &[f32], expected_dimension: Option<usize>) -> Result<()> {
    if vector.is_empty() {
        return Err(CanvasSearchError::Embedding(
            "provider returned an empty vector".to_string(),
        ));
    }

    if let Some(expected) = expected_dimension {
        if vector.len() != expected {
            return Err(CanvasSearchError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
    }

    if vector.iter().any(|value| !value.is_finite()) {
        return Err(CanvasSearchError::Embedding(
            "provider returned non-finite values".to_string(),
        ));
    }

    Ok(())
}

/// Build the provider selected in the configuration
#[inline]
pub fn provider_from_config(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.embedding.provider {
        EmbeddingProviderKind::Ollama => {
            let client = OllamaClient::new(config).map_err(|e| {
                CanvasSearchError::Config(format!("Failed to initialize Ollama client: {:#}", e))
            })?;
            Ok(Arc::new(client))
        }
        EmbeddingProviderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(
            config.embedding.hashing_dimension,
        ))),
    }
}
