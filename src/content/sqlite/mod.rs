use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use super::{CanvasDocument, ComponentKind, ContentSource, compose_text};
use crate::{CanvasId, CanvasSearchError};


pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CanvasRow {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub is_public: bool,
}

/// Reads canvases and their boxes from the canvas SQLite database
#[derive(Debug, Clone)]
pub struct CanvasRepository {
    pool: DbPool,
}

impl CanvasRepository {
    /// Open an existing canvas database without touching its schema
    #[inline]
    pub async fn connect<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path.as_ref())
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .with_context(|| {
                format!(
                    "Failed to open canvas database: {}",
                    database_path.as_ref().display()
                )
            })?;

        Ok(Self { pool })
    }

    /// Create the canvas database if needed and bring its schema up to date
    #[inline]
    pub async fn initialize<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path.as_ref())
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create canvas database connection pool")?;

        let repository = Self { pool };
        repository.run_migrations().await?;

        Ok(repository)
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    #[inline]
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running canvas database migrations");

        sqlx::migrate!("src/content/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Canvas database migrations completed successfully");
        Ok(())
    }

    #[inline]
    pub async fn get_canvas(&self, canvas_id: CanvasId) -> Result<Option<CanvasRow>> {
        let row = sqlx::query_as::<_, CanvasRow>(
            "SELECT id, user_id, title, is_public FROM canvas WHERE id = ?",
        )
        .bind(canvas_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get canvas by id")?;

        Ok(row)
    }

    async fn text_box_contents(&self, canvas_id: CanvasId) -> Result<Vec<Option<String>>> {
        sqlx::query_scalar::<_, Option<String>>(
            "SELECT content FROM text_box WHERE pid = ? ORDER BY id",
        )
        .bind(canvas_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to get text boxes for canvas")
    }

    async fn markdown_box_contents(&self, canvas_id: CanvasId) -> Result<Vec<Option<String>>> {
        sqlx::query_scalar::<_, Option<String>>(
            "SELECT content FROM markdown_box WHERE pid = ? ORDER BY id",
        )
        .bind(canvas_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to get markdown boxes for canvas")
    }

    async fn heritage_item_contents(&self, canvas_id: CanvasId) -> Result<Vec<Option<String>>> {
        sqlx::query_scalar::<_, Option<String>>(
            r#"
            SELECT hi.content
            FROM heritage_item hi
            JOIN heritage h ON hi.heritage_id = h.id
            WHERE h.pid = ?
            ORDER BY h.id, hi.id
            "#,
        )
        .bind(canvas_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to get heritage items for canvas")
    }

    /// Load a canvas and flatten every text-bearing box into one document
    #[inline]
    pub async fn load_document(&self, canvas_id: CanvasId) -> Result<Option<CanvasDocument>> {
        let Some(canvas) = self.get_canvas(canvas_id).await? else {
            debug!("Canvas {} not found", canvas_id);
            return Ok(None);
        };

        let texts = self.text_box_contents(canvas_id).await?;
        let markdowns = self.markdown_box_contents(canvas_id).await?;
        let heritage_items = self.heritage_item_contents(canvas_id).await?;

        let parts = texts
            .iter()
            .map(|content| (ComponentKind::TextBox, content))
            .chain(
                markdowns
                    .iter()
                    .map(|content| (ComponentKind::MarkdownBox, content)),
            )
            .chain(
                heritage_items
                    .iter()
                    .map(|content| (ComponentKind::HeritageItem, content)),
            )
            .filter_map(|(kind, content)| content.as_deref().map(|text| (kind, text)));

        let text = compose_text(parts);
        debug!(
            "Loaded canvas {} with {} characters of text",
            canvas_id,
            text.chars().count()
        );

        Ok(Some(CanvasDocument {
            canvas_id: canvas.id,
            owner_id: canvas.user_id,
            title: canvas.title,
            is_public: canvas.is_public,
            text,
        }))
    }

    #[inline]
    pub async fn canvas_ids(&self) -> Result<Vec<CanvasId>> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM canvas ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list canvas ids")
    }
}

#[async_trait]
impl ContentSource for CanvasRepository {
    async fn fetch_canvas(&self, canvas_id: CanvasId) -> crate::Result<Option<CanvasDocument>> {
        self.load_document(canvas_id)
            .await
            .map_err(|e| CanvasSearchError::Database(format!("{:#}", e)))
    }

    async fn list_canvas_ids(&self) -> crate::Result<Vec<CanvasId>> {
        self.canvas_ids()
            .await
            .map_err(|e| CanvasSearchError::Database(format!("{:#}", e)))
    }
}
