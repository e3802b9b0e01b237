//! Error types for the ingestion and retrieval pipeline.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Coarse classification shared by every error in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or invalid provider/store configuration.
    Configuration,
    /// Malformed caller input.
    Validation,
    /// Network failure or non-2xx status from the store or a provider.
    Transport,
    /// A well-formed response that is missing expected fields.
    Protocol,
    /// Credential would travel over an unencrypted channel to a remote host.
    SecurityPolicy,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "configuration"),
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::Transport => write!(f, "transport"),
            ErrorKind::Protocol => write!(f, "protocol"),
            ErrorKind::SecurityPolicy => write!(f, "security_policy"),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" with status {s}")).unwrap_or_default()
}

/// Errors related to chunker configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge { overlap: usize, chunk_size: usize },
}

impl ChunkError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider configuration error: {0}")]
    Config(String),

    #[error("unknown embedding provider: {0}")]
    UnknownProvider(String),

    #[error("embedding request failed{}: {message}", status_suffix(.status))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("embedding timeout")]
    Timeout,

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("failed to load embedding model: {0}")]
    Model(String),

    #[error("embedding inference failed: {0}")]
    Inference(String),
}

impl EmbeddingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EmbeddingError::Config(_) | EmbeddingError::Model(_) => ErrorKind::Configuration,
            EmbeddingError::UnknownProvider(_) => ErrorKind::Validation,
            EmbeddingError::Transport { .. } | EmbeddingError::Timeout => ErrorKind::Transport,
            EmbeddingError::InvalidResponse(_) | EmbeddingError::Inference(_) => {
                ErrorKind::Protocol
            }
        }
    }
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            EmbeddingError::Timeout
        } else {
            EmbeddingError::Transport {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            }
        }
    }
}

/// Errors related to vector store operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("vector store configuration error: {0}")]
    Config(String),

    #[error(
        "refusing to send the Qdrant API key over plaintext HTTP to non-local host '{host}'; use https"
    )]
    InsecureTransport { host: String },

    #[error("Qdrant request failed{}: {message}", status_suffix(.status))]
    Request {
        status: Option<u16>,
        message: String,
    },

    #[error("invalid Qdrant response: {0}")]
    InvalidResponse(String),
}

impl VectorStoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VectorStoreError::Config(_) => ErrorKind::Configuration,
            VectorStoreError::InsecureTransport { .. } => ErrorKind::SecurityPolicy,
            VectorStoreError::Request { .. } => ErrorKind::Transport,
            VectorStoreError::InvalidResponse(_) => ErrorKind::Protocol,
        }
    }

    /// HTTP status returned by the store, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            VectorStoreError::Request { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for VectorStoreError {
    fn from(e: reqwest::Error) -> Self {
        VectorStoreError::Request {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

/// Errors related to configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),
}

/// Errors surfaced by the ingest/retrieve pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("path escapes the upload directory: {}", .0.display())]
    PathTraversal(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("chunking error: {0}")]
    Chunk(#[from] ChunkError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation(_)
            | PipelineError::PathTraversal(_)
            | PipelineError::FileRead { .. } => ErrorKind::Validation,
            PipelineError::Chunk(e) => e.kind(),
            PipelineError::Embedding(e) => e.kind(),
            PipelineError::VectorStore(e) => e.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_message_includes_status() {
        let err = VectorStoreError::Request {
            status: Some(404),
            message: "Not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Qdrant request failed with status 404: Not found"
        );
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_pipeline_kind_delegates() {
        let err = PipelineError::from(VectorStoreError::InsecureTransport {
            host: "qdrant.example.com".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::SecurityPolicy);

        let err = PipelineError::from(EmbeddingError::UnknownProvider("bogus".to_string()));
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = PipelineError::from(EmbeddingError::InvalidResponse("no field".to_string()));
        assert_eq!(err.kind(), ErrorKind::Protocol);

        let err = PipelineError::PathTraversal(PathBuf::from("/etc/passwd"));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::SecurityPolicy.to_string(), "security_policy");
        assert_eq!(ErrorKind::Protocol.to_string(), "protocol");
    }
}
