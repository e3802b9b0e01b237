//! OpenAI embedding provider.
//!
//! Works against any OpenAI-compatible `/embeddings` endpoint when an
//! endpoint override is configured.

use reqwest::Client;
use serde::Serialize;

use crate::error::EmbeddingError;
use crate::models::EmbeddingProviderConfig;

use super::{
    build_client, embed_windowed, normalize_endpoint, parse_vector, read_json, require_api_key,
    resolve_dimension,
};

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
    concurrency: usize,
}

impl OpenAiProvider {
    pub fn new(config: &EmbeddingProviderConfig) -> Result<Self, EmbeddingError> {
        let api_key = require_api_key(config, "openai")?;
        let base_url = normalize_endpoint(config.endpoint.as_deref().unwrap_or(DEFAULT_OPENAI_URL))?;
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
        let dimension = resolve_dimension(config, &model)?;

        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url,
            api_key,
            model,
            dimension,
            concurrency: config.concurrency.max(1),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub(super) async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        embed_windowed(texts, self.concurrency, |text| self.embed_one(text)).await
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url);
        let mut request = self.client.post(&url).json(&EmbeddingsRequest {
            model: &self.model,
            input: text,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let body = read_json(request.send().await?).await?;
        let first = body
            .get("data")
            .and_then(|d| d.get(0))
            .and_then(|d| d.get("embedding"));
        parse_vector(first, "data[0].embedding", self.dimension)
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .finish()
    }
}
