use anyhow::{Context, Result};
use console::{Term, style};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};

use crate::{CanvasId, UserId};
use crate::config::Config;
use crate::content::{CanvasRepository, ContentSource};
use crate::embeddings::provider_from_config;
use crate::index::{DeleteOutcome, IndexManager, IndexOutcome};
use crate::response::SearchResponse;
use crate::search::{SearchHit, SearchRequest, SearchService};

/// Options of the `search` subcommand
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub query: String,
    pub user: Option<UserId>,
    pub limit: Option<usize>,
    pub threshold: Option<f32>,
    pub json: bool,
}

/// Counters reported at the end of a reindex
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReindexSummary {
    pub indexed: usize,
    pub skipped_empty: usize,
    pub missing: usize,
    pub failed: usize,
    pub pruned: usize,
}

/// Load the configuration from `config_dir`, or the platform default directory
#[inline]
pub fn load_config(config_dir: Option<&Path>) -> Result<Config> {
    let dir = match config_dir {
        Some(dir) => dir.to_path_buf(),
        None => Config::default_dir().context("Failed to locate config directory")?,
    };
    Config::load(&dir).with_context(|| format!("Failed to load config from {}", dir.display()))
}

/// Open the index manager and search service described by `config`
#[inline]
pub async fn build_services(config: &Config) -> Result<(IndexManager, SearchService)> {
    let provider = provider_from_config(config)?;
    info!("Using embedding provider {}", provider.name());

    let manager = IndexManager::from_config(config, provider)
        .await
        .context("Failed to open index")?;
    let search = SearchService::new(manager.clone(), config.search.clone());
    Ok((manager, search))
}

#[inline]
pub async fn open_content_source(config: &Config) -> Result<CanvasRepository> {
    let path = config.database_path();
    CanvasRepository::connect(&path)
        .await
        .with_context(|| format!("Failed to open canvas database {}", path.display()))
}

/// Index a single canvas from the canvas database
#[inline]
pub async fn index_canvas(config: &Config, canvas_id: CanvasId) -> Result<()> {
    let source = open_content_source(config).await?;
    let (manager, _) = build_services(config).await?;

    match manager.index_canvas(&source, canvas_id).await? {
        IndexOutcome::Indexed(outcome) => {
            let verb = if outcome.replaced { "Re-indexed" } else { "Indexed" };
            println!(
                "✅ {} canvas {} (entry {})",
                verb, outcome.canvas_id, outcome.entry_id
            );
        }
        IndexOutcome::NoContent => {
            println!(
                "⏭️  Canvas {} has no text content, nothing indexed",
                canvas_id
            );
        }
        IndexOutcome::NotFound => {
            println!("❌ Canvas {} not found in the canvas database", canvas_id);
        }
    }

    Ok(())
}

/// Index every canvas in the source, optionally dropping canvases it no longer has
#[inline]
pub async fn reindex_all(
    manager: &IndexManager,
    source: &dyn ContentSource,
    prune: bool,
) -> Result<ReindexSummary> {
    let canvas_ids = source
        .list_canvas_ids()
        .await
        .context("Failed to list canvases")?;
    info!("Reindexing {} canvases", canvas_ids.len());

    let bar = if Term::stderr().is_term() {
        let template = ProgressStyle::with_template("{spinner} [{pos}/{len}] Indexing canvas {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        ProgressBar::new(canvas_ids.len() as u64).with_style(template)
    } else {
        ProgressBar::hidden()
    };

    let mut summary = ReindexSummary::default();
    for canvas_id in &canvas_ids {
        bar.set_message(canvas_id.to_string());
        match manager.index_canvas(source, *canvas_id).await {
            Ok(IndexOutcome::Indexed(_)) => summary.indexed += 1,
            Ok(IndexOutcome::NoContent) => summary.skipped_empty += 1,
            Ok(IndexOutcome::NotFound) => summary.missing += 1,
            Err(e) => {
                warn!("Failed to index canvas {}: {}", canvas_id, e);
                summary.failed += 1;
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    if prune {
        let known: BTreeSet<CanvasId> = canvas_ids.into_iter().collect();
        for canvas_id in manager.canvas_ids().await {
            if known.contains(&canvas_id) {
                continue;
            }
            match manager.delete(canvas_id).await {
                Ok(DeleteOutcome::Deleted { .. }) => summary.pruned += 1,
                Ok(DeleteOutcome::NotFound) => {}
                Err(e) => {
                    warn!("Failed to prune canvas {}: {}", canvas_id, e);
                    summary.failed += 1;
                }
            }
        }
    }

    Ok(summary)
}

#[inline]
pub async fn reindex(config: &Config, prune: bool) -> Result<()> {
    let source = open_content_source(config).await?;
    let (manager, _) = build_services(config).await?;

    let summary = reindex_all(&manager, &source, prune).await?;

    println!("{}", style("Reindex complete").bold().green());
    println!("  Indexed: {}", summary.indexed);
    println!("  Skipped (no text): {}", summary.skipped_empty);
    if summary.missing > 0 {
        println!("  Vanished during run: {}", summary.missing);
    }
    if prune {
        println!("  Pruned: {}", summary.pruned);
    }
    if summary.failed > 0 {
        println!("  {}", style(format!("Failed: {}", summary.failed)).red());
    }

    Ok(())
}

#[inline]
pub async fn delete_canvas(config: &Config, canvas_id: CanvasId) -> Result<()> {
    let (manager, _) = build_services(config).await?;

    match manager.delete(canvas_id).await? {
        DeleteOutcome::Deleted { removed_entries } => {
            println!(
                "🗑️  Removed canvas {} from the index ({} entries)",
                canvas_id, removed_entries
            );
        }
        DeleteOutcome::NotFound => {
            println!("Canvas {} is not indexed", canvas_id);
        }
    }

    Ok(())
}

#[inline]
pub async fn search_canvases(config: &Config, options: SearchOptions) -> Result<()> {
    let (_, search) = build_services(config).await?;

    let mut request = SearchRequest::new(options.query);
    request.requester = options.user;
    request.limit = options.limit;
    request.score_threshold = options.threshold;

    match search.search(&request).await {
        Ok(hits) => {
            if options.json {
                let response = SearchResponse { sources: hits };
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_hits(&request.query, &hits);
            }
            Ok(())
        }
        Err(e) => {
            if options.json {
                println!("{}", serde_json::to_string_pretty(&e.to_failure_response())?);
            }
            Err(e.into())
        }
    }
}

fn print_hits(query: &str, hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("No matching canvases for {:?}", query);
        return;
    }

    println!("{} result(s) for {:?}:", hits.len(), query);
    println!();
    for hit in hits {
        println!("{}", format_hit(hit));
        println!();
    }
}

/// Human readable rendering of a single hit
#[inline]
pub fn format_hit(hit: &SearchHit) -> String {
    let title = if hit.title.trim().is_empty() {
        "(untitled)"
    } else {
        hit.title.as_str()
    };
    format!(
        "📄 {} (canvas {}, owner {}) score {:.3}\n   {}",
        style(title).bold(),
        hit.canvas_id,
        hit.owner_id,
        hit.score,
        hit.text_preview.replace('\n', "\n   ")
    )
}

#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    println!("{}", style("📊 Canvas Search Status").bold().cyan());
    println!();

    let (manager, _) = build_services(config).await?;
    let stats = manager.stats().await;

    println!("🧮 Embedding Provider: {}", manager.provider().name());
    println!("📁 Index Directory: {}", config.index_dir_path().display());
    println!("   📊 Canvases: {}", stats.documents);
    println!("   📊 Entries: {}", stats.entries);
    match stats.dimension {
        Some(dimension) => println!("   📐 Dimension: {}", dimension),
        None => println!("   📐 Dimension: (empty index)"),
    }
    println!("   🔢 Generation: {}", stats.generation);

    println!();
    println!("🔍 Index Consistency:");
    let report = manager.check_consistency().await;
    if report.is_consistent {
        println!("   ✅ Registry and index agree");
    } else {
        println!("   ⚠️  {}", report.summary());
        println!("   Run 'canvas-search repair' to fix");
    }

    println!();
    println!("🗄️  Canvas Database: {}", config.database_path().display());
    let indexed: BTreeSet<CanvasId> = manager.canvas_ids().await.into_iter().collect();
    match open_content_source(config).await {
        Ok(source) => match source.list_canvas_ids().await {
            Ok(ids) => {
                let pending = ids.iter().filter(|id| !indexed.contains(id)).count();
                println!("   ✅ Connected, {} canvases", ids.len());
                if pending > 0 {
                    println!("   ⏳ Not indexed: {}", pending);
                }
            }
            Err(e) => println!("   ❌ Failed to list canvases: {}", e),
        },
        Err(e) => println!("   ❌ {:#}", e),
    }

    Ok(())
}

#[inline]
pub async fn repair_index(config: &Config) -> Result<()> {
    let (manager, _) = build_services(config).await?;

    let stats = manager.repair().await.context("Repair failed")?;
    if stats.total() == 0 {
        println!("✅ Index is consistent, nothing to repair");
    } else {
        println!("🔧 Repaired index:");
        println!("   Dangling registry ids removed: {}", stats.dangling_removed);
        println!("   Orphaned entries removed: {}", stats.orphans_removed);
        println!("   Mismatched entries removed: {}", stats.mismatched_removed);
        println!("   Run 'canvas-search reindex' to restore affected canvases");
    }

    Ok(())
}
