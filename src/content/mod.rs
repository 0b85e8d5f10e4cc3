// Canvas content module
// Flattens canvases into single searchable documents and defines where they come from


pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{CanvasId, Result, UserId};

pub use sqlite::CanvasRepository;

/// One canvas flattened into the unit the index stores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasDocument {
    pub canvas_id: CanvasId,
    #[serde(alias = "user_id", alias = "userId")]
    pub owner_id: UserId,
    pub title: String,
    #[serde(alias = "isPublic")]
    pub is_public: bool,
    /// Tagged text of every non-empty sub-component, newline separated
    pub text: String,
}

/// Text-bearing sub-components of a canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    TextBox,
    MarkdownBox,
    HeritageItem,
}

impl ComponentKind {
    #[inline]
    pub fn tag(self) -> &'static str {
        match self {
            Self::TextBox => "text_box",
            Self::MarkdownBox => "markdown_box",
            Self::HeritageItem => "heritage_item",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Join sub-component contents into document text.
///
/// Each part is prefixed with its kind tag (`text_box:hello`). Empty and
/// whitespace-only parts are skipped.
#[inline]
pub fn compose_text<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = (ComponentKind, &'a str)>,
{
    parts
        .into_iter()
        .filter(|(_, content)| !content.trim().is_empty())
        .map(|(kind, content)| format!("{}:{}", kind.tag(), content))
        .collect::<Vec<_>>()
        .join("\n")
}

impl CanvasDocument {
    #[inline]
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Supplies canvas documents to the index manager
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch the flattened document for a canvas, `None` when the canvas does not exist
    async fn fetch_canvas(&self, canvas_id: CanvasId) -> Result<Option<CanvasDocument>>;

    /// Ids of every canvas the source knows about, ascending
    async fn list_canvas_ids(&self) -> Result<Vec<CanvasId>>;
}
