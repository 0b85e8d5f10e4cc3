use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use canvas_search::commands::{
    SearchOptions, delete_canvas, index_canvas, load_config, reindex, repair_index,
    search_canvases, show_status,
};
use canvas_search::config::{get_config_dir, run_interactive_config, show_config};
use canvas_search::{CanvasId, UserId};

#[derive(Parser)]
#[command(name = "canvas-search")]
#[command(about = "Permission-aware semantic search over user canvases")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml, the index snapshots and the default canvas database
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding provider and search defaults
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Index or re-index a single canvas
    Index {
        /// Canvas ID to index
        canvas_id: CanvasId,
    },
    /// Re-index every canvas in the canvas database
    Reindex {
        /// Also remove index entries for canvases that no longer exist
        #[arg(long)]
        prune: bool,
    },
    /// Remove a canvas from the index
    Delete {
        /// Canvas ID to remove
        canvas_id: CanvasId,
    },
    /// Search indexed canvases
    Search {
        /// Free-text query
        query: String,
        /// Search on behalf of this user, anonymous searches only see public canvases
        #[arg(long)]
        user: Option<UserId>,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
        /// Minimum similarity score, overrides the configured threshold
        #[arg(long, allow_negative_numbers = true)]
        threshold: Option<f32>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show index statistics and consistency
    Status,
    /// Fix disagreements between the registry and the vector index
    Repair,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", error_report(&error));
            ExitCode::FAILURE
        }
    }
}

/// Display text of the error and its causes, never the Debug form
fn error_report(error: &anyhow::Error) -> String {
    format!("Error: {:#}", error)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Config { show } => {
            if show {
                let config = load_config(cli.config_dir.as_deref())?;
                show_config(&config)?;
            } else {
                let dir = match cli.config_dir {
                    Some(dir) => dir,
                    None => get_config_dir()?,
                };
                run_interactive_config(&dir)?;
            }
        }
        Commands::Index { canvas_id } => {
            let config = load_config(cli.config_dir.as_deref())?;
            index_canvas(&config, canvas_id).await?;
        }
        Commands::Reindex { prune } => {
            let config = load_config(cli.config_dir.as_deref())?;
            reindex(&config, prune).await?;
        }
        Commands::Delete { canvas_id } => {
            let config = load_config(cli.config_dir.as_deref())?;
            delete_canvas(&config, canvas_id).await?;
        }
        Commands::Search {
            query,
            user,
            limit,
            threshold,
            json,
        } => {
            let config = load_config(cli.config_dir.as_deref())?;
            search_canvases(
                &config,
                SearchOptions {
                    query,
                    user,
                    limit,
                    threshold,
                    json,
                },
            )
            .await?;
        }
        Commands::Status => {
            let config = load_config(cli.config_dir.as_deref())?;
            show_status(&config).await?;
        }
        Commands::Repair => {
            let config = load_config(cli.config_dir.as_deref())?;
            repair_index(&config).await?;
        }
    }

    Ok(())
}
