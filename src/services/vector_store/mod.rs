//! Vector store abstraction layer.
//!
//! The pipeline only talks to [`VectorStore`], so tests and alternative
//! backends can stand in for the Qdrant REST client.

mod qdrant;
mod transport;

pub use qdrant::QdrantStore;
pub use transport::{TransportSecurity, check_transport, is_local_host};

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::VectorStoreError;
use crate::models::{Point, SearchResult, VectorStoreConfig};

/// Operations the pipeline needs from a vector database.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Names of all collections.
    async fn list_collections(&self) -> Result<Vec<String>, VectorStoreError>;

    /// Create a cosine-distance collection for vectors of `vector_size`.
    async fn create_collection(&self, name: &str, vector_size: usize)
    -> Result<(), VectorStoreError>;

    /// Insert or update points in `collection`.
    async fn add_documents(
        &self,
        collection: &str,
        points: Vec<Point>,
    ) -> Result<(), VectorStoreError>;

    /// Nearest neighbours of `vector`, best match first.
    async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<SearchResult>, VectorStoreError>;

    async fn delete_collection(&self, name: &str) -> Result<(), VectorStoreError>;
}

/// Create the configured vector store backend.
pub fn create_backend(config: &VectorStoreConfig) -> Result<Arc<dyn VectorStore>, VectorStoreError> {
    Ok(Arc::new(QdrantStore::new(config)?))
}
