//! Structured responses
//!
//! Every failure surfaced to a caller is reduced to a [`FailureResponse`]
//! carrying a machine-readable kind and the error's display message.

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::CanvasSearchError;
use crate::search::SearchHit;

/// Classification of failures visible to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Embedding,
    Persistence,
    InconsistentState,
    Timeout,
    InvalidRequest,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match *self {
            Self::NotFound => "not_found",
            Self::Embedding => "embedding",
            Self::Persistence => "persistence",
            Self::InconsistentState => "inconsistent_state",
            Self::Timeout => "timeout",
            Self::InvalidRequest => "invalid_request",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureResponse {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

/// Successful search payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub sources: Vec<SearchHit>,
}

impl CanvasSearchError {
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoIndex | Self::NotFound(_) => ErrorKind::NotFound,
            Self::Embedding(_) | Self::DimensionMismatch { .. } => ErrorKind::Embedding,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::InconsistentState(_) => ErrorKind::InconsistentState,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::InvalidRequest(_) | Self::Config(_) => ErrorKind::InvalidRequest,
            Self::Database(_) | Self::Io(_) | Self::Other(_) => ErrorKind::Internal,
        }
    }

    /// Whether the same request may succeed when sent again unchanged
    #[inline]
    pub fn is_retryable(&self) -> bool {
        match self {
            // the same provider keeps producing the same dimension
            Self::DimensionMismatch { .. } => false,
            _ => matches!(
                self.kind(),
                ErrorKind::Timeout | ErrorKind::Embedding | ErrorKind::Persistence
            ),
        }
    }

    #[inline]
    pub fn to_failure_response(&self) -> FailureResponse {
        let kind = self.kind();
        if kind == ErrorKind::Internal {
            error!("Internal failure: {:#}", self);
        }

        FailureResponse {
            kind,
            message: self.to_string(),
            retryable: self.is_retryable(),
        }
    }
}

impl From<&CanvasSearchError> for FailureResponse {
    #[inline]
    fn from(error: &CanvasSearchError) -> Self {
        error.to_failure_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_variants_share_kind() {
        assert_eq!(CanvasSearchError::NoIndex.kind(), ErrorKind::NotFound);
        assert_eq!(
            CanvasSearchError::NotFound("canvas 7".to_string()).kind(),
            ErrorKind::NotFound
        );
        assert!(!CanvasSearchError::NoIndex.is_retryable());
    }

    #[test]
    fn timeout_is_retryable() {
        let error = CanvasSearchError::Timeout {
            operation: "embedding".to_string(),
        };
        let response = error.to_failure_response();

        assert_eq!(response.kind, ErrorKind::Timeout);
        assert!(response.retryable);
        assert_eq!(response.message, "Timed out during embedding");
    }

    #[test]
    fn dimension_mismatch_is_not_retryable() {
        let error = CanvasSearchError::DimensionMismatch {
            expected: 768,
            actual: 1024,
        };
        let response = error.to_failure_response();

        assert_eq!(response.kind, ErrorKind::Embedding);
        assert!(!response.retryable);
        assert_eq!(
            response.message,
            "Embedding dimension mismatch: expected 768, got 1024"
        );
        assert!(CanvasSearchError::Embedding("backend down".to_string()).is_retryable());
    }

    #[test]
    fn failure_response_serializes_snake_case_kind() {
        let response =
            CanvasSearchError::InconsistentState("canvas 3".to_string()).to_failure_response();
        let json = serde_json::to_value(&response).expect("should serialize");

        assert_eq!(json["kind"], "inconsistent_state");
        assert_eq!(json["retryable"], false);
        assert_eq!(json["message"], "Inconsistent index state: canvas 3");
    }

    #[test]
    fn internal_errors_only_expose_display_text() {
        let error = CanvasSearchError::Other(anyhow::anyhow!("disk on fire"));
        let response = FailureResponse::from(&error);

        assert_eq!(response.kind, ErrorKind::Internal);
        assert_eq!(response.message, "Other error: disk on fire");
    }
}
