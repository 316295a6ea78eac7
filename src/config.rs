use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentsConfig {
    pub folder: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_cursor_path")]
    pub cursor_path: PathBuf,
    /// Used when the cursor file is missing or unreadable.
    #[serde(default = "default_last_run")]
    pub default_last_run: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cursor_path: default_cursor_path(),
            default_last_run: default_last_run(),
        }
    }
}

fn default_cursor_path() -> PathBuf {
    PathBuf::from("./data/last_sync.txt")
}
fn default_last_run() -> String {
    "2000-01-01 00:00:00".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct KnowledgeBaseConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_index")]
    pub index: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_min_relevance")]
    pub min_relevance: f64,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            index: default_index(),
            limit: default_limit(),
            min_relevance: default_min_relevance(),
            endpoint: None,
            api_key: None,
            db_path: default_db_path(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_backend() -> String {
    "sqlite".to_string()
}
fn default_index() -> String {
    "default".to_string()
}
fn default_limit() -> usize {
    5
}
fn default_min_relevance() -> f64 {
    0.3
}
fn default_db_path() -> PathBuf {
    PathBuf::from("./data/brain.sqlite")
}
fn default_max_tokens() -> usize {
    400
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub local: LocalProviderConfig,
    #[serde(default)]
    pub hosted: HostedProviderConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            timeout_secs: default_timeout_secs(),
            local: LocalProviderConfig::default(),
            hosted: HostedProviderConfig::default(),
        }
    }
}

impl GenerationConfig {
    pub fn is_hosted(&self) -> bool {
        self.mode == "hosted"
    }
}

fn default_mode() -> String {
    "local".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocalProviderConfig {
    #[serde(default = "default_local_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_local_model")]
    pub model: String,
    /// Default model for the direct `llm` chat.
    #[serde(default = "default_local_model")]
    pub chat_model: String,
}

impl Default for LocalProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_local_endpoint(),
            model: default_local_model(),
            chat_model: default_local_model(),
        }
    }
}

fn default_local_endpoint() -> String {
    "http://localhost:11434".to_string()
}
fn default_local_model() -> String {
    "gemma3:4b".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct HostedProviderConfig {
    #[serde(default = "default_hosted_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_hosted_model")]
    pub model: String,
}

impl Default for HostedProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_hosted_endpoint(),
            account_id: String::new(),
            api_token: String::new(),
            model: default_hosted_model(),
        }
    }
}

fn default_hosted_endpoint() -> String {
    "https://api.cloudflare.com/client/v4".to_string()
}
fn default_hosted_model() -> String {
    "@cf/meta/llama-3-8b-instruct".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StateConfig {
    #[serde(default = "default_results_path")]
    pub results_path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            results_path: default_results_path(),
        }
    }
}

fn default_results_path() -> PathBuf {
    PathBuf::from("./data/last_results.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// Number of prior turns included when history is enabled.
    #[serde(default = "default_context")]
    pub context: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            context: default_context(),
        }
    }
}

fn default_context() -> usize {
    5
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| Error::config(format!("failed to parse config file: {}", e)))?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let kb = &config.knowledge_base;
    match kb.backend.as_str() {
        "sqlite" => {}
        "http" => {
            if kb.endpoint.as_deref().map_or(true, |e| e.trim().is_empty()) {
                return Err(Error::config(
                    "knowledge_base.endpoint is required when backend is 'http'",
                ));
            }
        }
        other => {
            return Err(Error::config(format!(
                "unknown knowledge_base.backend: '{}'. Must be sqlite or http.",
                other
            )))
        }
    }

    if kb.limit == 0 {
        return Err(Error::config("knowledge_base.limit must be >= 1"));
    }
    if !(0.0..=1.0).contains(&kb.min_relevance) {
        return Err(Error::config(
            "knowledge_base.min_relevance must be in [0.0, 1.0]",
        ));
    }
    if kb.max_tokens == 0 {
        return Err(Error::config("knowledge_base.max_tokens must be > 0"));
    }

    match config.generation.mode.as_str() {
        "local" | "hosted" => {}
        other => {
            return Err(Error::config(format!(
                "unknown generation.mode: '{}'. Must be local or hosted.",
                other
            )))
        }
    }
    if config.generation.timeout_secs == 0 {
        return Err(Error::config("generation.timeout_secs must be > 0"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn load(contents: &str) -> Result<Config> {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("brain.toml");
        std::fs::write(&path, contents).unwrap();
        load_config(&path)
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = load("[documents]\nfolder = \"./docs\"\n").unwrap();
        assert_eq!(config.knowledge_base.backend, "sqlite");
        assert_eq!(config.knowledge_base.limit, 5);
        assert_eq!(config.knowledge_base.min_relevance, 0.3);
        assert_eq!(config.generation.mode, "local");
        assert_eq!(config.generation.local.model, "gemma3:4b");
        assert_eq!(
            config.generation.hosted.model,
            "@cf/meta/llama-3-8b-instruct"
        );
        assert_eq!(config.chat.context, 5);
        assert_eq!(config.sync.default_last_run, "2000-01-01 00:00:00");
    }

    #[test]
    fn missing_file_is_configuration_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn rejects_unknown_mode() {
        let err = load("[documents]\nfolder = \"d\"\n[generation]\nmode = \"cloud\"\n").unwrap_err();
        assert!(err.to_string().contains("generation.mode"));
    }

    #[test]
    fn rejects_out_of_range_relevance() {
        let err =
            load("[documents]\nfolder = \"d\"\n[knowledge_base]\nmin_relevance = 1.5\n").unwrap_err();
        assert!(err.to_string().contains("min_relevance"));
    }

    #[test]
    fn http_backend_requires_endpoint() {
        let err = load("[documents]\nfolder = \"d\"\n[knowledge_base]\nbackend = \"http\"\n").unwrap_err();
        assert!(err.to_string().contains("endpoint"));
    }

    #[test]
    fn example_config_is_valid() {
        let config = load(include_str!("../config/brain.example.toml")).unwrap();
        assert_eq!(config.documents.folder, PathBuf::from("./documents"));
        assert!(!config.generation.is_hosted());
    }
}
