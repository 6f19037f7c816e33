use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// API key sent as the `X-API-KEY` header. May be left empty in the
    /// file and supplied via `RAGIFY_API_KEY`, resolved once at load time.
    #[serde(default)]
    pub key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    /// Whether the service is reached over a secure transport; drives the
    /// session store's secure flag.
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./.ragify")
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_model")]
    pub model: String,
    /// Confidence assigned to normalized results; the backend carries no
    /// per-result score of its own.
    #[serde(default = "default_confidence")]
    pub default_confidence: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            threshold: default_threshold(),
            model: default_model(),
            default_confidence: default_confidence(),
        }
    }
}

fn default_top_k() -> u32 {
    5
}
fn default_threshold() -> f64 {
    0.5
}
fn default_model() -> String {
    "voyage-3-large".to_string()
}
fn default_confidence() -> f64 {
    100.0
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.api.key.is_empty() {
        if let Ok(key) = std::env::var("RAGIFY_API_KEY") {
            config.api.key = key;
        }
    }

    // Validate api
    if !config.api.base_url.starts_with("http://") && !config.api.base_url.starts_with("https://")
    {
        anyhow::bail!("api.base_url must be an http(s) URL");
    }
    if config.api.key.is_empty() {
        anyhow::bail!("api.key must be set (or RAGIFY_API_KEY exported)");
    }

    // Validate retrieval
    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if !(0.0..=1.0).contains(&config.retrieval.threshold) {
        anyhow::bail!("retrieval.threshold must be in [0.0, 1.0]");
    }
    if !(0.0..=100.0).contains(&config.retrieval.default_confidence) {
        anyhow::bail!("retrieval.default_confidence must be in [0.0, 100.0]");
    }

    Ok(config)
}
