//! Qdrant vector store backend over the REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde_json::{Value, json};

use super::VectorStore;
use super::transport::{TransportSecurity, check_transport};
use crate::error::VectorStoreError;
use crate::models::{Payload, Point, SearchResult, VectorStoreConfig};

/// Timeout for collection management and search requests.
const METADATA_TIMEOUT: Duration = Duration::from_secs(10);
/// Upserts carry whole documents and get more time.
const UPSERT_TIMEOUT: Duration = Duration::from_secs(60);

/// Qdrant vector store backend.
#[derive(Clone)]
pub struct QdrantStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    transport: TransportSecurity,
}

impl QdrantStore {
    /// Create a backend from configuration.
    ///
    /// Fails if an API key would be sent in plaintext to a non-local host.
    pub fn new(config: &VectorStoreConfig) -> Result<Self, VectorStoreError> {
        let url = Url::parse(config.url.trim()).map_err(|e| {
            VectorStoreError::Config(format!("invalid Qdrant URL '{}': {e}", config.url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(VectorStoreError::Config(format!(
                "Qdrant URL must use http or https: {}",
                config.url
            )));
        }

        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);
        let transport = check_transport(&url, api_key.is_some())?;

        let client = Client::builder()
            .build()
            .map_err(|e| VectorStoreError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.url.trim().trim_end_matches('/').to_string(),
            api_key,
            transport,
        })
    }

    /// Create a backend with default configuration.
    pub fn with_defaults() -> Result<Self, VectorStoreError> {
        Self::new(&VectorStoreConfig::default())
    }

    pub fn transport(&self) -> TransportSecurity {
        self.transport
    }

    fn request(&self, method: Method, path: &str, timeout: Duration) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{path}", self.base_url))
            .header("Content-Type", "application/json")
            .timeout(timeout);
        if let Some(key) = &self.api_key {
            builder = builder.header("api-key", key);
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Value, VectorStoreError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(VectorStoreError::Request {
                status: Some(status.as_u16()),
                message: error_message(&body).unwrap_or(body),
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| VectorStoreError::InvalidResponse(format!("response is not JSON: {e}")))
    }
}

impl std::fmt::Debug for QdrantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantStore")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("transport", &self.transport)
            .finish()
    }
}

/// Qdrant reports failures as `{"status": {"error": "..."}}`.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("status")?
        .get("error")?
        .as_str()
        .map(str::to_string)
}

fn parse_hit(hit: &Value) -> Result<SearchResult, VectorStoreError> {
    let id = match hit.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => {
            return Err(VectorStoreError::InvalidResponse(
                "search hit without an id".to_string(),
            ));
        }
    };

    let score = hit
        .get("score")
        .and_then(Value::as_f64)
        .ok_or_else(|| VectorStoreError::InvalidResponse(format!("search hit {id} has no score")))?
        as f32;

    let payload = match hit.get("payload") {
        Some(Value::Object(map)) => map.clone(),
        _ => Payload::new(),
    };

    // Named-vector collections return an object here; only plain arrays are kept.
    let vector = hit
        .get("vector")
        .and_then(Value::as_array)
        .and_then(|items| {
            items
                .iter()
                .map(|v| v.as_f64().map(|f| f as f32))
                .collect::<Option<Vec<f32>>>()
        });

    Ok(SearchResult {
        id,
        score,
        payload,
        vector,
    })
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn list_collections(&self) -> Result<Vec<String>, VectorStoreError> {
        let body = self
            .send(self.request(Method::GET, "/collections", METADATA_TIMEOUT))
            .await?;

        let collections = body
            .get("result")
            .and_then(|r| r.get("collections"))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                VectorStoreError::InvalidResponse("missing result.collections".to_string())
            })?;

        Ok(collections
            .iter()
            .filter_map(|c| c.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    async fn create_collection(
        &self,
        name: &str,
        vector_size: usize,
    ) -> Result<(), VectorStoreError> {
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            }
        });
        self.send(
            self.request(Method::PUT, &format!("/collections/{name}"), METADATA_TIMEOUT)
                .json(&body),
        )
        .await?;

        tracing::info!(collection = name, vector_size, "created collection");
        Ok(())
    }

    async fn add_documents(
        &self,
        collection: &str,
        points: Vec<Point>,
    ) -> Result<(), VectorStoreError> {
        let count = points.len();
        let body = json!({ "points": points });
        self.send(
            self.request(
                Method::PUT,
                &format!("/collections/{collection}/points"),
                UPSERT_TIMEOUT,
            )
            .json(&body),
        )
        .await?;

        tracing::debug!(collection, count, "upserted points");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<SearchResult>, VectorStoreError> {
        let body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
            "with_vector": true
        });
        let response = self
            .send(
                self.request(
                    Method::POST,
                    &format!("/collections/{collection}/points/search"),
                    METADATA_TIMEOUT,
                )
                .json(&body),
            )
            .await?;

        let hits = response
            .get("result")
            .and_then(Value::as_array)
            .ok_or_else(|| VectorStoreError::InvalidResponse("missing result array".to_string()))?;

        hits.iter().map(parse_hit).collect()
    }

    async fn delete_collection(&self, name: &str) -> Result<(), VectorStoreError> {
        self.send(self.request(
            Method::DELETE,
            &format!("/collections/{name}"),
            METADATA_TIMEOUT,
        ))
        .await?;

        tracing::info!(collection = name, "deleted collection");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use mockito::{Matcher, Server};

    fn store(url: &str, api_key: Option<&str>) -> QdrantStore {
        QdrantStore::new(&VectorStoreConfig {
            url: url.to_string(),
            api_key: api_key.map(str::to_string),
        })
        .unwrap()
    }

    #[test]
    fn test_remote_plaintext_key_rejected() {
        let err = QdrantStore::new(&VectorStoreConfig {
            url: "http://qdrant.example.com:6333".to_string(),
            api_key: Some("secret".to_string()),
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SecurityPolicy);
    }

    #[test]
    fn test_transport_classification() {
        assert_eq!(
            store("http://localhost:6333", Some("secret")).transport(),
            TransportSecurity::LocalPlaintext
        );
        assert_eq!(
            store("https://qdrant.example.com", Some("secret")).transport(),
            TransportSecurity::Encrypted
        );
        assert_eq!(
            store("http://qdrant.example.com:6333", None).transport(),
            TransportSecurity::NoCredential
        );
    }

    #[test]
    fn test_blank_key_is_no_key() {
        let store = store("http://qdrant.example.com:6333", Some("  "));
        assert_eq!(store.transport(), TransportSecurity::NoCredential);
    }

    #[test]
    fn test_invalid_url() {
        let err = QdrantStore::new(&VectorStoreConfig {
            url: "qdrant".to_string(),
            api_key: None,
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_debug_redacts_key() {
        let store = store("http://127.0.0.1:6333", Some("secret"));
        assert!(!format!("{store:?}").contains("secret"));
    }

    #[tokio::test]
    async fn test_list_collections() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/collections")
            .match_header("content-type", "application/json")
            .match_header("api-key", "secret")
            .with_status(200)
            .with_body(
                r#"{"result": {"collections": [{"name": "docs"}, {"name": "notes"}]}, "status": "ok", "time": 0.001}"#,
            )
            .create_async()
            .await;

        let names = store(&server.url(), Some("secret"))
            .list_collections()
            .await
            .unwrap();
        assert_eq!(names, vec!["docs", "notes"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_api_key_header_without_key() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/collections")
            .match_header("api-key", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"result": {"collections": []}}"#)
            .create_async()
            .await;

        let names = store(&server.url(), None).list_collections().await.unwrap();
        assert!(names.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_collection_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/collections/docs")
            .match_body(Matcher::Json(json!({
                "vectors": { "size": 768, "distance": "Cosine" }
            })))
            .with_status(200)
            .with_body(r#"{"result": true, "status": "ok"}"#)
            .create_async()
            .await;

        store(&server.url(), None)
            .create_collection("docs", 768)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_add_documents() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/collections/docs/points")
            .match_body(Matcher::PartialJson(json!({
                "points": [{ "id": "p1", "vector": [0.5, 0.5], "payload": { "text": "hi" } }]
            })))
            .with_status(200)
            .with_body(r#"{"result": {"operation_id": 1, "status": "acknowledged"}}"#)
            .create_async()
            .await;

        let mut payload = Payload::new();
        payload.insert("text".to_string(), json!("hi"));
        let point = Point {
            id: "p1".to_string(),
            vector: vec![0.5, 0.5],
            payload,
        };

        store(&server.url(), None)
            .add_documents("docs", vec![point])
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_add_no_documents_still_upserts_once() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/collections/docs/points")
            .match_body(Matcher::Json(json!({ "points": [] })))
            .with_status(200)
            .with_body(r#"{"result": {"operation_id": 2, "status": "acknowledged"}}"#)
            .expect(1)
            .create_async()
            .await;

        store(&server.url(), None)
            .add_documents("docs", Vec::new())
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_parses_hits() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/collections/docs/points/search")
            .match_body(Matcher::PartialJson(json!({
                "limit": 2,
                "with_payload": true,
                "with_vector": true
            })))
            .with_status(200)
            .with_body(
                r#"{"result": [
                    {"id": "a1", "version": 0, "score": 0.9, "payload": {"text": "first"}, "vector": [1.0, 0.0]},
                    {"id": 42, "version": 0, "score": 0.5, "payload": null, "vector": {"named": [1.0]}}
                ]}"#,
            )
            .create_async()
            .await;

        let hits = store(&server.url(), None)
            .search("docs", vec![1.0, 0.0], 2)
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a1");
        assert_eq!(hits[0].payload.get("text"), Some(&json!("first")));
        assert_eq!(hits[0].vector, Some(vec![1.0, 0.0]));
        assert_eq!(hits[1].id, "42");
        assert!(hits[1].payload.is_empty());
        assert_eq!(hits[1].vector, None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_collection_reports_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/collections/missing/points/search")
            .with_status(404)
            .with_body(r#"{"status": {"error": "Not found: Collection `missing` doesn't exist!"}, "time": 0.0}"#)
            .create_async()
            .await;

        let err = store(&server.url(), None)
            .search("missing", vec![1.0], 5)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("doesn't exist"));
    }

    #[tokio::test]
    async fn test_delete_collection() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/collections/docs")
            .with_status(200)
            .with_body(r#"{"result": true, "status": "ok"}"#)
            .create_async()
            .await;

        store(&server.url(), None)
            .delete_collection("docs")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_malformed_list_response() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/collections")
            .with_status(200)
            .with_body(r#"{"result": {}}"#)
            .create_async()
            .await;

        let err = store(&server.url(), None)
            .list_collections()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }
}
