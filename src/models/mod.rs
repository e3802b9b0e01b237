mod chunk;
mod config;
mod point;
mod provider;

pub use chunk::Chunk;
pub use config::{
    Config, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_CONCURRENCY, DEFAULT_QDRANT_URL,
    DEFAULT_SEARCH_LIMIT, EmbeddingConfig, IndexingConfig, SearchConfig, UploadConfig,
    VectorStoreConfig,
};
pub use point::{DocumentMeta, Payload, Point, SearchResult};
pub use provider::{EmbeddingProviderConfig, ProviderKind, ProviderRequest};
