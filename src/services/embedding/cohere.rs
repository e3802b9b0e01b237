//! Cohere embed API provider.

use reqwest::Client;
use serde::Serialize;

use crate::error::EmbeddingError;
use crate::models::EmbeddingProviderConfig;

use super::{
    InputType, build_client, embed_windowed, normalize_endpoint, parse_vector, read_json,
    require_api_key, resolve_dimension,
};

pub const DEFAULT_COHERE_URL: &str = "https://api.cohere.com/v1";
pub const DEFAULT_COHERE_MODEL: &str = "embed-english-v3.0";

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: [&'a str; 1],
    input_type: &'static str,
}

fn cohere_input_type(input_type: InputType) -> &'static str {
    match input_type {
        InputType::Document => "search_document",
        InputType::Query => "search_query",
    }
}

#[derive(Clone)]
pub struct CohereProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
    concurrency: usize,
}

impl CohereProvider {
    pub fn new(config: &EmbeddingProviderConfig) -> Result<Self, EmbeddingError> {
        let api_key = require_api_key(config, "cohere")?;
        let base_url = normalize_endpoint(config.endpoint.as_deref().unwrap_or(DEFAULT_COHERE_URL))?;
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_COHERE_MODEL.to_string());
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

    pub(super) async fn embed(
        &self,
        texts: &[String],
        input_type: InputType,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        embed_windowed(texts, self.concurrency, |text| self.embed_one(text, input_type)).await
    }

    async fn embed_one(&self, text: &str, input_type: InputType) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/embed", self.base_url);
        let mut request = self.client.post(&url).json(&EmbedRequest {
            model: &self.model,
            texts: [text],
            input_type: cohere_input_type(input_type),
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let body = read_json(request.send().await?).await?;
        let first = body.get("embeddings").and_then(|e| e.get(0));
        parse_vector(first, "embeddings[0]", self.dimension)
    }
}

impl std::fmt::Debug for CohereProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CohereProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .finish()
    }
}
