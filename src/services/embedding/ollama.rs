//! Ollama-compatible local model server.

use reqwest::Client;
use serde::Serialize;

use crate::error::EmbeddingError;
use crate::models::EmbeddingProviderConfig;

use super::{
    build_client, embed_windowed, normalize_endpoint, parse_vector, read_json, resolve_dimension,
};

pub const DEFAULT_OLLAMA_MODEL: &str = "nomic-embed-text";

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    endpoint: String,
    model: String,
    dimension: usize,
    concurrency: usize,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingProviderConfig) -> Result<Self, EmbeddingError> {
        let endpoint = config
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                EmbeddingError::Config("ollama provider requires an endpoint URL".to_string())
            })?;
        let endpoint = normalize_endpoint(endpoint)?;

        let model = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string());
        let dimension = resolve_dimension(config, &model)?;

        Ok(Self {
            client: build_client(config.timeout_secs)?,
            endpoint,
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
        let url = format!("{}/api/embeddings", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&EmbeddingsRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await?;

        let body = read_json(response).await?;
        parse_vector(body.get("embedding"), "embedding", self.dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProviderKind;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn config(endpoint: &str) -> EmbeddingProviderConfig {
        let mut config = EmbeddingProviderConfig::new(ProviderKind::Ollama);
        config.endpoint = Some(endpoint.to_string());
        config.dimension = Some(3);
        config
    }

    #[test]
    fn test_endpoint_required() {
        let config = EmbeddingProviderConfig::new(ProviderKind::Ollama);
        assert!(matches!(
            OllamaProvider::new(&config),
            Err(EmbeddingError::Config(_))
        ));
    }

    #[test]
    fn test_default_model_dimension() {
        let mut config = EmbeddingProviderConfig::new(ProviderKind::Ollama);
        config.endpoint = Some("http://localhost:11434/".to_string());
        let provider = OllamaProvider::new(&config).unwrap();
        assert_eq!(provider.model(), DEFAULT_OLLAMA_MODEL);
        assert_eq!(provider.dimension(), 768);
        assert_eq!(provider.endpoint, "http://localhost:11434");
    }

    #[tokio::test]
    async fn test_embed_sends_one_request_per_text() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/embeddings")
            .match_body(Matcher::PartialJson(json!({ "model": "nomic-embed-text" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embedding": [0.1, 0.2, 0.3]}"#)
            .expect(3)
            .create_async()
            .await;

        let provider = OllamaProvider::new(&config(&server.url())).unwrap();
        let texts: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let vectors = provider.embed(&texts).await.unwrap();

        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[2], vec![0.1, 0.2, 0.3]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_embedding_field() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/embeddings")
            .with_status(200)
            .with_body(r#"{"error": "model not loaded"}"#)
            .create_async()
            .await;

        let provider = OllamaProvider::new(&config(&server.url())).unwrap();
        let err = provider.embed(&["text".to_string()]).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_server_error_carries_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/embeddings")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let provider = OllamaProvider::new(&config(&server.url())).unwrap();
        let err = provider.embed(&["text".to_string()]).await.unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::Transport {
                status: Some(500),
                ..
            }
        ));
    }
}
