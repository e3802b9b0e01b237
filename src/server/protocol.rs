//! Newline-delimited JSON tool protocol.
//!
//! Each request is one JSON object on one line, tagged by `tool`. Each
//! response is one line tagged by `type`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::models::ProviderRequest;
use crate::services::IngestReport;

/// Longest accepted request line.
pub const MAX_LINE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum Request {
    ListCollections,
    Ingest(IngestRequest),
    Search(SearchRequest),
    DeleteCollection(DeleteRequest),
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::ListCollections => "list_collections",
            Request::Ingest(_) => "ingest",
            Request::Search(_) => "search",
            Request::DeleteCollection(_) => "delete_collection",
        }
    }
}

/// Exactly one of `path` or `text` must be set.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub text: Option<String>,
    pub collection: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub provider: Option<ProviderRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub collection: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub provider: Option<ProviderRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteRequest {
    pub collection: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Collections { collections: Vec<String> },
    Ingested(IngestReport),
    Results { text: String },
    Deleted { collection: String },
    Error(ErrorResponse),
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub kind: ErrorKind,
}

impl Response {
    pub fn error(message: impl Into<String>, kind: ErrorKind) -> Self {
        Response::Error(ErrorResponse {
            message: message.into(),
            kind,
        })
    }

    /// Generic failure for `operation`; details stay in the server log.
    pub fn failure(operation: &str, kind: ErrorKind) -> Self {
        Self::error(
            format!("{operation} failed; see server logs for details"),
            kind,
        )
    }
}

/// Serialize `msg` as a single line terminated by `\n`.
pub fn encode_line(msg: &impl Serialize) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = serde_json::to_vec(msg)?;
    buf.push(b'\n');
    Ok(buf)
}
