// Configuration management module
// TOML settings for the embedding provider, search defaults and snapshot storage

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, DatabaseConfig, EmbeddingConfig, EmbeddingProviderKind, IndexConfig,
    OllamaConfig, SearchConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::default_dir()
}
