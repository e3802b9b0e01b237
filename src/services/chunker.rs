//! Text chunking with overlap for embedding.

use crate::error::ChunkError;
use crate::models::{Chunk, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, IndexingConfig};

/// Splits text into fixed-size overlapping character windows.
///
/// Each window starts `chunk_size - chunk_overlap` characters after the
/// previous one, so consecutive chunks share exactly `chunk_overlap`
/// characters and the last chunk may be shorter than `chunk_size`.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    /// Create a chunker from indexing configuration.
    pub fn new(config: &IndexingConfig) -> Result<Self, ChunkError> {
        let mut chunker = Self::with_defaults();
        // Reset overlap so the configured size is not checked against the default one.
        chunker.chunk_overlap = 0;
        chunker.set_chunk_size(config.chunk_size)?;
        chunker.set_chunk_overlap(config.chunk_overlap)?;
        Ok(chunker)
    }

    /// Create a chunker with default settings.
    pub fn with_defaults() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Set the window size in characters.
    ///
    /// Rejects zero, and any size that would no longer exceed the current overlap.
    pub fn set_chunk_size(&mut self, chunk_size: usize) -> Result<(), ChunkError> {
        if chunk_size == 0 {
            return Err(ChunkError::InvalidChunkSize);
        }
        if self.chunk_overlap >= chunk_size {
            return Err(ChunkError::OverlapTooLarge {
                overlap: self.chunk_overlap,
                chunk_size,
            });
        }
        self.chunk_size = chunk_size;
        Ok(())
    }

    /// Set the number of characters shared by consecutive chunks.
    pub fn set_chunk_overlap(&mut self, chunk_overlap: usize) -> Result<(), ChunkError> {
        if chunk_overlap >= self.chunk_size {
            return Err(ChunkError::OverlapTooLarge {
                overlap: chunk_overlap,
                chunk_size: self.chunk_size,
            });
        }
        self.chunk_overlap = chunk_overlap;
        Ok(())
    }

    /// Split `text` into ordered chunks tagged with `source`.
    pub fn process(&self, text: &str, source: Option<&str>) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char boundary, including the end of the text.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total_chars = boundaries.len() - 1;
        let step = self.chunk_size - self.chunk_overlap;

        let mut chunks = Vec::with_capacity(total_chars.div_ceil(step));
        let mut start = 0;

        loop {
            let end = (start + self.chunk_size).min(total_chars);
            let content = &text[boundaries[start]..boundaries[end]];
            chunks.push(Chunk::new(
                content.to_string(),
                chunks.len(),
                source,
                start,
                end,
            ));

            if end >= total_chars {
                break;
            }
            start += step;
        }

        chunks
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::with_defaults()
    }
}
