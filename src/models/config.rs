use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6333";
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Process-wide configuration, loaded once at startup and treated as immutable.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ragstore").join("config.toml"))
    }

    /// Load the config file (if any), then overlay `.env` and process environment.
    pub fn load() -> Result<Self, crate::error::ConfigError> {
        let mut config = Self::load_file()?;
        let _ = dotenvy::dotenv();
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self, crate::error::ConfigError> {
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            return Ok(config);
        }
        Ok(Self::default())
    }

    pub fn save(&self) -> Result<(), crate::error::ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            crate::error::ConfigError::PathError("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Overlay environment variables resolved through `lookup`.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("QDRANT_URL") {
            self.vector_store.url = url;
        }
        if let Some(key) = get("QDRANT_API_KEY") {
            self.vector_store.api_key = Some(key);
        }
        if let Some(dir) = get("UPLOAD_DIR") {
            self.upload.base_dir = PathBuf::from(dir);
        }
        if let Some(provider) = get("EMBEDDING_PROVIDER") {
            self.embedding.provider = Some(provider);
        }
        if let Some(model) = get("EMBEDDING_MODEL") {
            self.embedding.model = Some(model);
        }
        if let Some(path) = get("EMBEDDING_MODEL_PATH") {
            self.embedding.model_path = Some(PathBuf::from(path));
        }
        if let Some(url) = get("OLLAMA_URL") {
            self.embedding.ollama_url = Some(url);
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.embedding.openai_api_key = Some(key);
        }
        if let Some(key) = get("COHERE_API_KEY") {
            self.embedding.cohere_api_key = Some(key);
        }
    }

    /// Copy of the config with every credential masked, for display.
    pub fn redacted(&self) -> Self {
        let mask = |key: &Option<String>| key.as_ref().map(|_| "********".to_string());
        let mut config = self.clone();
        config.vector_store.api_key = mask(&self.vector_store.api_key);
        config.embedding.openai_api_key = mask(&self.embedding.openai_api_key);
        config.embedding.cohere_api_key = mask(&self.embedding.cohere_api_key);
        config
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default = "default_qdrant_url")]
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_qdrant_url() -> String {
    DEFAULT_QDRANT_URL.to_string()
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            api_key: None,
        }
    }
}

/// Process-level embedding settings. Any field set here wins over the
/// provider configuration a caller passes with a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ollama_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cohere_api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,

    /// Let hosted providers run without an API key (e.g. behind an authenticating proxy).
    #[serde(default)]
    pub no_auth: bool,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_timeout() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            dimension: None,
            ollama_url: None,
            openai_api_key: None,
            cohere_api_key: None,
            model_path: None,
            no_auth: false,
            concurrency: default_concurrency(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_file_size: default_max_file_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Only files inside this directory may be ingested by path.
    #[serde(default = "default_upload_dir")]
    pub base_dir: PathBuf,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from(DEFAULT_UPLOAD_DIR)
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            base_dir: default_upload_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}
