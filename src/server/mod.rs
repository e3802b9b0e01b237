pub mod protocol;

use std::sync::Arc;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::{debug, error, info};

use crate::error::{ErrorKind, PipelineError};
use crate::server::protocol::{MAX_LINE_BYTES, Request, Response, encode_line};
use crate::services::{IngestInput, Pipeline};

/// Serves the tool protocol over a line-oriented byte stream.
pub struct ToolServer {
    pipeline: Arc<Pipeline>,
}

impl ToolServer {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    /// Serve stdin/stdout until EOF or ctrl-c.
    pub async fn run_stdio(&self) -> std::io::Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();

        info!("tool server listening on stdio");
        tokio::select! {
            result = self.serve(stdin, stdout) => result?,
            _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down"),
        }
        info!("tool server stopped");
        Ok(())
    }

    /// Answer each request line with exactly one response line.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = (&mut reader)
                .take(MAX_LINE_BYTES as u64 + 1)
                .read_until(b'\n', &mut line)
                .await?;
            if read == 0 {
                break;
            }

            let response = if read > MAX_LINE_BYTES {
                // Skip the rest of an oversized line before answering.
                if line.last() != Some(&b'\n') {
                    let mut discard = Vec::new();
                    reader.read_until(b'\n', &mut discard).await?;
                }
                Response::error("request too large", ErrorKind::Validation)
            } else {
                match std::str::from_utf8(&line) {
                    Ok(text) if text.trim().is_empty() => continue,
                    Ok(text) => match serde_json::from_str::<Request>(text.trim()) {
                        Ok(request) => self.handle_request(request).await,
                        Err(e) => {
                            Response::error(format!("invalid request: {e}"), ErrorKind::Validation)
                        }
                    },
                    Err(_) => Response::error("request is not valid UTF-8", ErrorKind::Validation),
                }
            };

            let encoded = encode_line(&response).map_err(std::io::Error::other)?;
            writer.write_all(&encoded).await?;
            writer.flush().await?;
        }
        Ok(())
    }

    async fn handle_request(&self, request: Request) -> Response {
        let operation = request.name();
        debug!(operation, "handling request");

        match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(operation, kind = %e.kind(), error = %e, "request failed");
                Response::failure(operation, e.kind())
            }
        }
    }

    async fn dispatch(&self, request: Request) -> Result<Response, PipelineError> {
        match request {
            Request::ListCollections => {
                let collections = self.pipeline.list_collections().await?;
                Ok(Response::Collections { collections })
            }

            Request::Ingest(req) => {
                let input = match (req.path, req.text) {
                    (Some(path), None) => IngestInput::File(path),
                    (None, Some(text)) => IngestInput::Text {
                        text,
                        source: req.source,
                    },
                    _ => {
                        return Err(PipelineError::Validation(
                            "exactly one of 'path' or 'text' is required".to_string(),
                        ));
                    }
                };
                let report = self
                    .pipeline
                    .ingest(input, &req.collection, req.provider.as_ref())
                    .await?;
                Ok(Response::Ingested(report))
            }

            Request::Search(req) => {
                let text = self
                    .pipeline
                    .search(&req.query, &req.collection, req.provider.as_ref(), req.limit)
                    .await?;
                Ok(Response::Results { text })
            }

            Request::DeleteCollection(req) => {
                self.pipeline.delete_collection(&req.collection).await?;
                Ok(Response::Deleted {
                    collection: req.collection,
                })
            }
        }
    }
}
