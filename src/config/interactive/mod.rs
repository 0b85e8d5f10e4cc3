
use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, ConfigError, EmbeddingProviderKind, OllamaConfig, SearchConfig};

const PROVIDERS: [EmbeddingProviderKind; 2] =
    [EmbeddingProviderKind::Ollama, EmbeddingProviderKind::Hashing];

#[inline]
pub fn run_interactive_config(base_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Canvas Search Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(base_dir)?;

    eprintln!("{}", style("Embedding Provider").bold().yellow());
    eprintln!("Choose how canvas text and queries are turned into vectors.");
    eprintln!();

    config.embedding.provider = select_provider(config.embedding.provider)?;

    if config.embedding.provider == EmbeddingProviderKind::Ollama {
        eprintln!();
        eprintln!("{}", style("Ollama Configuration").bold().yellow());
        eprintln!("Configure your local Ollama instance for embedding generation.");
        eprintln!();

        configure_ollama(&mut config.ollama)?;

        eprintln!();
        eprintln!("{}", style("Testing configuration...").yellow());

        if test_ollama_connection(&config.ollama) {
            eprintln!("{}", style("✓ Ollama connection successful!").green());
        } else {
            eprintln!(
                "{}",
                style("⚠ Warning: Could not connect to Ollama").yellow()
            );
            eprintln!("You can continue, but make sure Ollama is running before indexing.");
        }
    }

    eprintln!();
    eprintln!("{}", style("Search Defaults").bold().yellow());
    configure_search(&mut config.search)?;

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding Settings:").bold().yellow());
    eprintln!(
        "  Provider: {}",
        style(provider_label(config.embedding.provider)).cyan()
    );
    eprintln!(
        "  Timeout: {}s",
        style(config.embedding.timeout_secs).cyan()
    );
    if config.embedding.provider == EmbeddingProviderKind::Hashing {
        eprintln!(
            "  Dimension: {}",
            style(config.embedding.hashing_dimension).cyan()
        );
    }

    if config.embedding.provider == EmbeddingProviderKind::Ollama {
        eprintln!();
        eprintln!("{}", style("Ollama Settings:").bold().yellow());
        eprintln!("  Host: {}", style(&config.ollama.host).cyan());
        eprintln!("  Port: {}", style(config.ollama.port).cyan());
        eprintln!("  Model: {}", style(&config.ollama.model).cyan());
        eprintln!(
            "  Dimension: {}",
            style(config.ollama.embedding_dimension).cyan()
        );
        match config.ollama.ollama_url() {
            Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
            Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
        }
    }

    eprintln!();
    eprintln!("{}", style("Search Settings:").bold().yellow());
    eprintln!(
        "  Default limit: {} (max {})",
        style(config.search.default_limit).cyan(),
        config.search.max_limit
    );
    eprintln!(
        "  Score threshold: {}",
        style(config.search.score_threshold).cyan()
    );

    eprintln!();
    eprintln!(
        "Canvas database: {}",
        style(config.database_path().display()).dim()
    );
    eprintln!(
        "Index directory: {}",
        style(config.index_dir_path().display()).dim()
    );
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(base_dir: &Path) -> Result<Config> {
    if !base_dir.join("config.toml").exists() {
        eprintln!(
            "{}",
            style("No existing configuration found. Using defaults.").yellow()
        );
        return Ok(Config {
            base_dir: base_dir.to_path_buf(),
            ..Config::default()
        });
    }

    let config = Config::load(base_dir).context("Failed to load existing configuration")?;
    eprintln!("{}", style("Found existing configuration.").green());
    Ok(config)
}

fn provider_label(kind: EmbeddingProviderKind) -> &'static str {
    match kind {
        EmbeddingProviderKind::Ollama => "ollama (local embedding server)",
        EmbeddingProviderKind::Hashing => "hashing (offline, lexical)",
    }
}

fn select_provider(current: EmbeddingProviderKind) -> Result<EmbeddingProviderKind> {
    let labels: Vec<&str> = PROVIDERS.iter().map(|kind| provider_label(*kind)).collect();
    let default_index = PROVIDERS
        .iter()
        .position(|kind| *kind == current)
        .unwrap_or(0);

    let index = Select::new()
        .with_prompt("Embedding provider")
        .default(default_index)
        .items(&labels)
        .interact()?;

    Ok(PROVIDERS.get(index).copied().unwrap_or(current))
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols
        .get(protocol_index)
        .copied()
        .unwrap_or("http")
        .to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OllamaConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..OllamaConfig::default()
            };
            temp_config.validate()
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let dimension: u32 = Input::new()
        .with_prompt("Embedding dimension produced by the model")
        .default(ollama.embedding_dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;

    ollama.set_protocol(protocol)?;
    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_model(model)?;
    ollama.set_embedding_dimension(dimension)?;

    Ok(())
}

fn configure_search(search: &mut SearchConfig) -> Result<()> {
    let threshold: f32 = Input::new()
        .with_prompt("Minimum similarity score for search hits")
        .default(search.score_threshold)
        .validate_with(|input: &f32| -> Result<(), &str> {
            if (-1.0..=1.0).contains(input) {
                Ok(())
            } else {
                Err("Score threshold must be between -1.0 and 1.0")
            }
        })
        .interact_text()?;

    search.set_score_threshold(threshold)?;
    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> bool {
    let url = format!(
        "{}://{}:{}/api/version",
        ollama.protocol, ollama.host, ollama.port
    );

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}
