mod chunker;
mod embedding;
mod pipeline;
mod vector_store;

pub use chunker::TextChunker;
pub use embedding::{
    CohereProvider, EmbeddingProvider, InputType, OllamaProvider, OnnxProvider, OpenAiProvider,
    embed_windowed, known_dimension,
};
pub use pipeline::{
    IngestInput, IngestReport, NO_RESULTS, Pipeline, format_results, validate_collection_name,
};
pub use vector_store::{
    QdrantStore, TransportSecurity, VectorStore, check_transport, create_backend, is_local_host,
};
