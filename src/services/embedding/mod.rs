//! Embedding providers for generating text embeddings.
//!
//! Every backend is one variant of [`EmbeddingProvider`]. The network-backed
//! variants send one request per text through [`embed_windowed`], which caps
//! the number of in-flight requests and keeps results in input order.

mod cohere;
mod ollama;
mod onnx;
mod openai;
mod window;

pub use cohere::CohereProvider;
pub use ollama::OllamaProvider;
pub use onnx::OnnxProvider;
pub use openai::OpenAiProvider;
pub use window::embed_windowed;

use std::time::Duration;

use reqwest::{Client, Response, Url};
use serde::Serialize;
use serde_json::Value;

use crate::error::EmbeddingError;
use crate::models::{EmbeddingProviderConfig, ProviderKind};

/// Whether a text is being indexed or used to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    /// For indexing documents
    Document,
    /// For search queries
    Query,
}

/// Output dimension of well-known embedding models.
pub fn known_dimension(model: &str) -> Option<usize> {
    let model = model.trim().to_lowercase();
    // Ollama tags such as `nomic-embed-text:latest` share the base model's size.
    let base = model.split(':').next().unwrap_or(&model);
    match base {
        "nomic-embed-text" => Some(768),
        "mxbai-embed-large" => Some(1024),
        "all-minilm" | "all-minilm-l6-v2" => Some(384),
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        "embed-english-v3.0" | "embed-multilingual-v3.0" => Some(1024),
        "embed-english-light-v3.0" | "embed-multilingual-light-v3.0" => Some(384),
        _ => None,
    }
}

/// A constructed embedding backend.
#[derive(Debug)]
pub enum EmbeddingProvider {
    Ollama(OllamaProvider),
    OpenAi(OpenAiProvider),
    Cohere(CohereProvider),
    Onnx(OnnxProvider),
}

impl EmbeddingProvider {
    /// Validate `config` and build the matching provider. Never touches the network.
    pub fn from_config(config: &EmbeddingProviderConfig) -> Result<Self, EmbeddingError> {
        let provider = match config.provider {
            ProviderKind::Ollama => EmbeddingProvider::Ollama(OllamaProvider::new(config)?),
            ProviderKind::OpenAi => EmbeddingProvider::OpenAi(OpenAiProvider::new(config)?),
            ProviderKind::Cohere => EmbeddingProvider::Cohere(CohereProvider::new(config)?),
            ProviderKind::Onnx => EmbeddingProvider::Onnx(OnnxProvider::new(config)?),
        };

        tracing::debug!(
            provider = %provider.kind(),
            model = provider.model(),
            dimension = provider.vector_size(),
            "embedding provider ready"
        );
        Ok(provider)
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            EmbeddingProvider::Ollama(_) => ProviderKind::Ollama,
            EmbeddingProvider::OpenAi(_) => ProviderKind::OpenAi,
            EmbeddingProvider::Cohere(_) => ProviderKind::Cohere,
            EmbeddingProvider::Onnx(_) => ProviderKind::Onnx,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            EmbeddingProvider::Ollama(p) => p.model(),
            EmbeddingProvider::OpenAi(p) => p.model(),
            EmbeddingProvider::Cohere(p) => p.model(),
            EmbeddingProvider::Onnx(p) => p.model(),
        }
    }

    /// Length of every vector this provider returns.
    pub fn vector_size(&self) -> usize {
        match self {
            EmbeddingProvider::Ollama(p) => p.dimension(),
            EmbeddingProvider::OpenAi(p) => p.dimension(),
            EmbeddingProvider::Cohere(p) => p.dimension(),
            EmbeddingProvider::Onnx(p) => p.dimension(),
        }
    }

    /// Generate embeddings for documents (for indexing).
    ///
    /// `result[i]` is the embedding of `texts[i]`.
    pub async fn generate_embeddings(
        &self,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.embed_with_type(texts, InputType::Document).await
    }

    /// Generate the embedding for a single search query.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_with_type(&[text.to_string()], InputType::Query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding response".to_string()))
    }

    async fn embed_with_type(
        &self,
        texts: &[String],
        input_type: InputType,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = match self {
            EmbeddingProvider::Ollama(p) => p.embed(texts).await?,
            EmbeddingProvider::OpenAi(p) => p.embed(texts).await?,
            EmbeddingProvider::Cohere(p) => p.embed(texts, input_type).await?,
            EmbeddingProvider::Onnx(p) => p.embed(texts).await?,
        };

        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }
}

/// Resolve the vector size from an explicit override or the model table.
fn resolve_dimension(
    config: &EmbeddingProviderConfig,
    model: &str,
) -> Result<usize, EmbeddingError> {
    match config.dimension.or_else(|| known_dimension(model)) {
        Some(0) => Err(EmbeddingError::Config(
            "embedding dimension must be greater than zero".to_string(),
        )),
        Some(dimension) => Ok(dimension),
        None => Err(EmbeddingError::Config(format!(
            "unknown vector size for model '{model}'; set an explicit dimension"
        ))),
    }
}

/// Hosted providers need a key unless auth is explicitly disabled.
fn require_api_key(
    config: &EmbeddingProviderConfig,
    provider: &str,
) -> Result<Option<String>, EmbeddingError> {
    match config.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => Ok(Some(key.to_string())),
        _ if config.no_auth => Ok(None),
        _ => Err(EmbeddingError::Config(format!(
            "{provider} provider requires an API key"
        ))),
    }
}

/// Validate an http(s) base URL and strip any trailing slash.
fn normalize_endpoint(url: &str) -> Result<String, EmbeddingError> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| EmbeddingError::Config(format!("invalid endpoint URL '{url}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(EmbeddingError::Config(format!(
            "endpoint URL must use http or https: {url}"
        )));
    }
    Ok(url.trim().trim_end_matches('/').to_string())
}

fn build_client(timeout_secs: u64) -> Result<Client, EmbeddingError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| EmbeddingError::Config(format!("failed to build HTTP client: {e}")))
}

/// Check the status and decode the body as JSON.
async fn read_json(response: Response) -> Result<Value, EmbeddingError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(EmbeddingError::Transport {
            status: Some(status.as_u16()),
            message: body,
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| EmbeddingError::InvalidResponse(format!("response is not JSON: {e}")))
}

/// Extract a numeric vector of the expected length.
fn parse_vector(
    value: Option<&Value>,
    field: &str,
    dimension: usize,
) -> Result<Vec<f32>, EmbeddingError> {
    let items = value.and_then(Value::as_array).ok_or_else(|| {
        EmbeddingError::InvalidResponse(format!("missing or non-array '{field}' field"))
    })?;

    let vector = items
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect::<Option<Vec<f32>>>()
        .ok_or_else(|| {
            EmbeddingError::InvalidResponse(format!("'{field}' contains non-numeric values"))
        })?;

    if vector.len() != dimension {
        return Err(EmbeddingError::InvalidResponse(format!(
            "expected {dimension}-dimensional '{field}', got {}",
            vector.len()
        )));
    }
    Ok(vector)
}
