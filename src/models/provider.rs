//! Embedding provider selection and configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::EmbeddingError;

use super::config::{DEFAULT_CONCURRENCY, EmbeddingConfig};

/// The closed set of supported embedding backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local Ollama-compatible HTTP model server.
    Ollama,
    /// OpenAI embeddings API.
    #[serde(rename = "openai")]
    OpenAi,
    /// Cohere embed API.
    Cohere,
    /// In-process ONNX model.
    Onnx,
}

impl std::str::FromStr for ProviderKind {
    type Err = EmbeddingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "openai" => Ok(ProviderKind::OpenAi),
            "cohere" => Ok(ProviderKind::Cohere),
            "onnx" | "local" => Ok(ProviderKind::Onnx),
            _ => Err(EmbeddingError::UnknownProvider(s.to_string())),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Ollama => write!(f, "ollama"),
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Cohere => write!(f, "cohere"),
            ProviderKind::Onnx => write!(f, "onnx"),
        }
    }
}

/// Provider settings a caller may attach to a single ingest or search call.
///
/// The provider name stays a plain string until resolution so an unknown
/// name is reported as a validation error rather than a decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderRequest {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dimension: Option<usize>,
}

/// Fully resolved configuration used to construct one provider.
#[derive(Clone)]
pub struct EmbeddingProviderConfig {
    pub provider: ProviderKind,
    pub api_key: Option<String>,
    /// Base URL of the provider. Required for Ollama, optional override otherwise.
    pub endpoint: Option<String>,
    pub model: Option<String>,
    /// Overrides the known-model dimension table.
    pub dimension: Option<usize>,
    /// Directory holding `model.onnx` and `tokenizer.json` for the ONNX provider.
    pub model_path: Option<PathBuf>,
    /// Hosted providers accept a missing API key only when this is set.
    pub no_auth: bool,
    /// Maximum in-flight requests per batch window.
    pub concurrency: usize,
    pub timeout_secs: u64,
}

impl EmbeddingProviderConfig {
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            api_key: None,
            endpoint: None,
            model: None,
            dimension: None,
            model_path: None,
            no_auth: false,
            concurrency: DEFAULT_CONCURRENCY,
            timeout_secs: 30,
        }
    }

    /// Merge process-level settings with a caller's request.
    ///
    /// Process-level values win field by field and the request only fills gaps,
    /// except that the API key and endpoint are taken from the same side.
    pub fn resolve(
        provider: ProviderKind,
        process: &EmbeddingConfig,
        request: Option<&ProviderRequest>,
    ) -> Self {
        let requested = |f: fn(&ProviderRequest) -> Option<String>| request.and_then(f);

        let process_key = match provider {
            ProviderKind::OpenAi => process.openai_api_key.clone(),
            ProviderKind::Cohere => process.cohere_api_key.clone(),
            ProviderKind::Ollama | ProviderKind::Onnx => None,
        };
        let process_endpoint = match provider {
            ProviderKind::Ollama => process.ollama_url.clone(),
            _ => None,
        };

        // Key and endpoint travel together: a process key only ever goes to the
        // process endpoint (or the provider default), never to one the caller chose.
        let (api_key, endpoint) = match process_key {
            Some(key) => (Some(key), process_endpoint),
            None => (
                requested(|r| r.api_key.clone()),
                process_endpoint.or_else(|| requested(|r| r.endpoint.clone())),
            ),
        };

        Self {
            provider,
            api_key,
            endpoint,
            model: process.model.clone().or_else(|| requested(|r| r.model.clone())),
            dimension: process
                .dimension
                .or_else(|| request.and_then(|r| r.dimension)),
            model_path: process.model_path.clone(),
            no_auth: process.no_auth,
            concurrency: process.concurrency.max(1),
            timeout_secs: process.timeout_secs,
        }
    }
}

impl std::fmt::Debug for EmbeddingProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .field("model_path", &self.model_path)
            .field("no_auth", &self.no_auth)
            .field("concurrency", &self.concurrency)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
