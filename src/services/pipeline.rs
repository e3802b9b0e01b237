//! Ingest and retrieve orchestration.
//!
//! A [`Pipeline`] owns the process configuration and a vector store. Each
//! call resolves and constructs its own embedding provider, so per-call
//! provider settings never leak between requests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::models::{
    Config, DocumentMeta, EmbeddingProviderConfig, Point, ProviderKind, ProviderRequest,
    SearchResult,
};
use crate::services::chunker::TextChunker;
use crate::services::embedding::EmbeddingProvider;
use crate::services::vector_store::{VectorStore, create_backend};
use crate::utils::{read_text_file, resolve_upload_path};

/// Returned by [`Pipeline::search`] instead of an empty body.
pub const NO_RESULTS: &str = "No results found.";

/// What to ingest.
#[derive(Debug, Clone)]
pub enum IngestInput {
    /// A path relative to the upload directory.
    File(PathBuf),
    /// Inline text with an optional source label.
    Text {
        text: String,
        source: Option<String>,
    },
}

/// Outcome of a successful ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub collection: String,
    pub chunks: usize,
    pub created_collection: bool,
    pub vector_size: usize,
}

pub struct Pipeline {
    config: Arc<Config>,
    store: Arc<dyn VectorStore>,
    chunker: TextChunker,
}

impl Pipeline {
    /// Build a pipeline backed by the configured Qdrant instance.
    pub fn new(config: Arc<Config>) -> Result<Self, PipelineError> {
        let store = create_backend(&config.vector_store)?;
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: Arc<Config>, store: Arc<dyn VectorStore>) -> Self {
        let chunker = TextChunker::new(&config.indexing).unwrap_or_else(|e| {
            warn!(error = %e, "invalid chunking config, using defaults");
            TextChunker::with_defaults()
        });

        Self {
            config,
            store,
            chunker,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn list_collections(&self) -> Result<Vec<String>, PipelineError> {
        Ok(self.store.list_collections().await?)
    }

    /// Pick the active provider and merge its settings.
    ///
    /// A process-level provider wins over the caller's choice. When the
    /// caller asked for a different provider its settings are dropped
    /// entirely, since credentials for one provider mean nothing to another.
    pub fn resolve_provider(
        &self,
        request: Option<&ProviderRequest>,
    ) -> Result<EmbeddingProviderConfig, PipelineError> {
        let process_choice = self.config.embedding.provider.as_deref().map(str::trim);
        let requested_choice = request
            .and_then(|r| r.provider.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty());

        let (name, request) = match (process_choice, requested_choice) {
            (Some(process), Some(requested)) if !process.eq_ignore_ascii_case(requested) => {
                warn!(
                    configured = process,
                    requested, "ignoring per-call embedding provider; process configuration wins"
                );
                (process, None)
            }
            (Some(process), _) => (process, request),
            (None, Some(requested)) => (requested, request),
            (None, None) => {
                return Err(PipelineError::Validation(
                    "no embedding provider configured or requested".to_string(),
                ));
            }
        };

        let kind: ProviderKind = name.parse()?;
        Ok(EmbeddingProviderConfig::resolve(
            kind,
            &self.config.embedding,
            request,
        ))
    }

    /// Chunk, embed and store a document.
    ///
    /// Creates the collection with the provider's vector size when it does
    /// not exist yet. Any failure aborts the ingest.
    pub async fn ingest(
        &self,
        input: IngestInput,
        collection: &str,
        request: Option<&ProviderRequest>,
    ) -> Result<IngestReport, PipelineError> {
        validate_collection_name(collection)?;

        let (text, source) = match input {
            IngestInput::File(path) => self.read_upload(&path)?,
            IngestInput::Text { text, source } => (text, source),
        };
        if text.trim().is_empty() {
            return Err(PipelineError::Validation("text must not be empty".to_string()));
        }

        let chunks = self.chunker.process(&text, source.as_deref());
        debug!(collection, chunks = chunks.len(), "chunked document");

        let provider_config = self.resolve_provider(request)?;
        let provider = EmbeddingProvider::from_config(&provider_config)?;

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = provider.generate_embeddings(&texts).await?;

        let vector_size = provider.vector_size();
        let existing = self.store.list_collections().await?;
        let created_collection = !existing.iter().any(|name| name == collection);
        if created_collection {
            self.store.create_collection(collection, vector_size).await?;
        }

        let meta = DocumentMeta::for_content(&text);
        let points: Vec<Point> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| Point::from_chunk(chunk, vector, &meta))
            .collect();
        let count = points.len();
        self.store.add_documents(collection, points).await?;

        info!(
            collection,
            chunks = count,
            provider = %provider.kind(),
            created_collection,
            "ingested document"
        );

        Ok(IngestReport {
            collection: collection.to_string(),
            chunks: count,
            created_collection,
            vector_size,
        })
    }

    /// Embed `query` and return the nearest chunks, best first.
    pub async fn retrieve(
        &self,
        query: &str,
        collection: &str,
        request: Option<&ProviderRequest>,
        limit: Option<usize>,
    ) -> Result<Vec<SearchResult>, PipelineError> {
        validate_collection_name(collection)?;
        if query.trim().is_empty() {
            return Err(PipelineError::Validation("query must not be empty".to_string()));
        }
        let limit = limit.unwrap_or(self.config.search.default_limit);
        if limit == 0 {
            return Err(PipelineError::Validation(
                "limit must be at least 1".to_string(),
            ));
        }

        let provider_config = self.resolve_provider(request)?;
        let provider = EmbeddingProvider::from_config(&provider_config)?;
        let vector = provider.embed_query(query).await?;

        let mut results = self.store.search(collection, vector, limit).await?;
        results.sort_by(|a, b| b.score.total_cmp(&a.score));

        info!(collection, limit, hits = results.len(), "search completed");
        Ok(results)
    }

    /// Like [`retrieve`](Self::retrieve), formatted as readable text.
    pub async fn search(
        &self,
        query: &str,
        collection: &str,
        request: Option<&ProviderRequest>,
        limit: Option<usize>,
    ) -> Result<String, PipelineError> {
        let results = self.retrieve(query, collection, request, limit).await?;
        Ok(format_results(&results))
    }

    pub async fn delete_collection(&self, collection: &str) -> Result<(), PipelineError> {
        validate_collection_name(collection)?;
        self.store.delete_collection(collection).await?;
        Ok(())
    }

    fn read_upload(&self, requested: &Path) -> Result<(String, Option<String>), PipelineError> {
        let path = resolve_upload_path(&self.config.upload.base_dir, requested)?;
        let text = read_text_file(&path, self.config.indexing.max_file_size).map_err(|source| {
            PipelineError::FileRead {
                path: requested.to_path_buf(),
                source,
            }
        })?;
        let source = requested
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Ok((text, source))
    }
}

/// Collection names end up in URL paths, so keep them to a safe alphabet.
pub fn validate_collection_name(name: &str) -> Result<(), PipelineError> {
    if name.is_empty() {
        return Err(PipelineError::Validation(
            "collection name must not be empty".to_string(),
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(PipelineError::Validation(format!(
            "invalid collection name '{name}': use letters, digits, '_' or '-'"
        )));
    }
    Ok(())
}

/// One block per result, or [`NO_RESULTS`] when there are none.
pub fn format_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return NO_RESULTS.to_string();
    }

    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let payload = &result.payload;
            let text = payload
                .get("text")
                .and_then(|v| v.as_str())
                .or_else(|| payload.get("content").and_then(|v| v.as_str()))
                .map(str::to_string)
                .unwrap_or_else(|| serde_json::to_string(payload).unwrap_or_default());

            let source = payload
                .get("source")
                .and_then(|v| v.as_str())
                .map(|s| format!(" | source: {s}"))
                .unwrap_or_default();

            format!("[{}] score: {:.3}{source}\n{text}", i + 1, result.score)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
