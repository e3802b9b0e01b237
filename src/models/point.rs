//! Storage units exchanged with the vector store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::chunk::Chunk;

/// Arbitrary JSON metadata stored alongside a vector.
pub type Payload = Map<String, Value>;

/// Document-level metadata copied into every chunk's payload.
#[derive(Debug, Clone, Default)]
pub struct DocumentMeta {
    pub checksum: String,
    pub created_at: String,
}

impl DocumentMeta {
    pub fn for_content(content: &str) -> Self {
        Self {
            checksum: crate::utils::calculate_checksum(content),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// The unit of storage: id + vector + payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

impl Point {
    /// Build a point for a chunk under a fresh random id.
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>, meta: &DocumentMeta) -> Self {
        let mut payload = Payload::new();
        payload.insert("text".to_string(), Value::from(chunk.text.clone()));
        payload.insert("chunk_index".to_string(), Value::from(chunk.index));
        if let Some(ref source) = chunk.source {
            payload.insert("source".to_string(), Value::from(source.clone()));
        }
        if let Some(start) = chunk.char_start {
            payload.insert("char_start".to_string(), Value::from(start));
        }
        if let Some(end) = chunk.char_end {
            payload.insert("char_end".to_string(), Value::from(end));
        }
        payload.insert("checksum".to_string(), Value::from(meta.checksum.clone()));
        payload.insert(
            "created_at".to_string(),
            Value::from(meta.created_at.clone()),
        );

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            vector,
            payload,
        }
    }
}

/// A single ranked hit returned by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub score: f32,
    pub payload: Payload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_payload_carries_chunk_metadata() {
        let chunk = Chunk::new("hello".to_string(), 3, Some("notes.txt"), 10, 15);
        let meta = DocumentMeta {
            checksum: "abc".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
        };
        let point = Point::from_chunk(&chunk, vec![0.1, 0.2], &meta);

        assert_eq!(point.payload["text"], "hello");
        assert_eq!(point.payload["chunk_index"], 3);
        assert_eq!(point.payload["source"], "notes.txt");
        assert_eq!(point.payload["char_start"], 10);
        assert_eq!(point.payload["char_end"], 15);
        assert_eq!(point.payload["checksum"], "abc");
        assert_eq!(point.vector, vec![0.1, 0.2]);
        assert!(uuid::Uuid::parse_str(&point.id).is_ok());
    }

    #[test]
    fn test_point_ids_are_unique() {
        let chunk = Chunk::new("same".to_string(), 0, None, 0, 4);
        let meta = DocumentMeta::for_content("same");
        let a = Point::from_chunk(&chunk, vec![1.0], &meta);
        let b = Point::from_chunk(&chunk, vec![1.0], &meta);
        assert_ne!(a.id, b.id);
        assert!(!a.payload.contains_key("source"));
    }

    #[test]
    fn test_search_result_omits_missing_vector() {
        let result = SearchResult {
            id: "1".to_string(),
            score: 0.5,
            payload: Payload::new(),
            vector: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("vector").is_none());
    }
}
