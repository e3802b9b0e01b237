use serde::{Deserialize, Serialize};

/// A bounded slice of a document's text, in original document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// Zero-based position of this chunk within its document.
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Character (not byte) offset of the first character.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub char_start: Option<usize>,
    /// Character offset one past the last character.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub char_end: Option<usize>,
}

impl Chunk {
    pub fn new(text: String, index: usize, source: Option<&str>, start: usize, end: usize) -> Self {
        Self {
            text,
            index,
            source: source.map(str::to_string),
            char_start: Some(start),
            char_end: Some(end),
        }
    }
}
