use super::*;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.embedding.provider, EmbeddingProviderKind::Ollama);
    assert_eq!(config.embedding.timeout_secs, 30);
    assert_eq!(config.ollama.protocol, "http");
    assert_eq!(config.ollama.host, "localhost");
    assert_eq!(config.ollama.port, 11434);
    assert_eq!(config.ollama.model, "nomic-embed-text:latest");
    assert_eq!(config.search.default_limit, 10);
    assert_eq!(config.search.preview_chars, 200);
    assert!(!config.index.index_empty_canvases);
    assert!(config.validate().is_ok());
}

#[test]
fn config_validation() {
    let config = Config::default();

    let mut invalid_config = config.clone();
    invalid_config.ollama.protocol = "ftp".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.port = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.model = String::new();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.retry_attempts = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.timeout_secs = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.index.persist_timeout_secs = 601;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.embedding.hashing_dimension = 8;
    assert!(invalid_config.validate().is_err());
}

#[test]
fn search_config_validation() {
    let mut search = SearchConfig::default();
    assert!(search.validate().is_ok());

    search.default_limit = 200;
    assert!(matches!(
        search.validate(),
        Err(ConfigError::InvalidDefaultLimit(200, 100))
    ));

    let mut search = SearchConfig::default();
    search.score_threshold = 1.5;
    assert!(search.validate().is_err());

    let mut search = SearchConfig::default();
    search.score_threshold = f32::NAN;
    assert!(search.validate().is_err());

    let mut search = SearchConfig::default();
    search.preview_chars = 0;
    assert!(search.validate().is_err());
}

#[test]
fn ollama_url_generation() {
    let config = Config::default();
    let url = config
        .ollama
        .ollama_url()
        .expect("should generate ollama_url successfully");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn partial_toml_uses_defaults() {
    let toml_str = r#"
        [embedding]
        provider = "hashing"

        [search]
        score_threshold = 0.25
    "#;

    let config: Config = toml::from_str(toml_str).expect("should parse partial toml");
    assert_eq!(config.embedding.provider, EmbeddingProviderKind::Hashing);
    assert_eq!(config.embedding.timeout_secs, 30);
    assert!((config.search.score_threshold - 0.25).abs() < f32::EPSILON);
    assert_eq!(config.search.default_limit, 10);
    assert_eq!(config.ollama, OllamaConfig::default());
}

#[test]
fn setter_validation() {
    let mut config = OllamaConfig::default();

    assert!(config.set_protocol("https".to_string()).is_ok());
    assert!(config.set_host("example.com".to_string()).is_ok());
    assert!(config.set_port(8080).is_ok());
    assert!(config.set_model("new-model".to_string()).is_ok());
    assert!(config.set_embedding_dimension(1024).is_ok());

    assert!(config.set_protocol("ftp".to_string()).is_err());
    assert!(config.set_port(0).is_err());
    assert!(config.set_model(String::new()).is_err());
    assert!(config.set_embedding_dimension(32).is_err());

    let mut search = SearchConfig::default();
    assert!(search.set_score_threshold(0.0).is_ok());
    assert!(search.set_score_threshold(-2.0).is_err());
}

#[test]
fn load_missing_file_uses_defaults_with_base_dir() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config::load(temp_dir.path()).expect("should load defaults");

    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert_eq!(config.index_dir_path(), temp_dir.path().join("index"));
    assert_eq!(config.database_path(), temp_dir.path().join("canvas.db"));
}

#[test]
fn save_then_load_round_trips() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config::load(temp_dir.path()).expect("should load defaults");
    config.embedding.provider = EmbeddingProviderKind::Hashing;
    config.search.score_threshold = 0.1;
    config.database.path = Some(PathBuf::from("/srv/canvas.db"));

    config.save().expect("should save config");
    let loaded = Config::load(temp_dir.path()).expect("should load saved config");

    assert_eq!(loaded, config);
    assert_eq!(loaded.database_path(), PathBuf::from("/srv/canvas.db"));
}

#[test]
fn load_rejects_invalid_values() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[search]\nmax_limit = 0\n",
    )
    .expect("should write config");

    assert!(Config::load(temp_dir.path()).is_err());
}
