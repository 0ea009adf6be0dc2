//! Fixed-size character windows with overlap.

use crate::error::ConfigError;
use crate::models::{Document, DocumentChunk, IndexingConfig};

/// Text chunker that splits documents into overlapping chunks.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Window size in characters
    chunk_size: usize,
    /// Characters shared by consecutive windows
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker. The overlap must be smaller than the window.
    pub fn new(config: &IndexingConfig) -> Result<Self, ConfigError> {
        let chunk_size = config.chunk_size as usize;
        let overlap = config.chunk_overlap as usize;

        if chunk_size == 0 || overlap >= chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Chunk a document into overlapping segments.
    pub fn chunk(&self, document: &Document) -> Vec<DocumentChunk> {
        let windows = self.split_with_overlap(&document.content);
        let total_chunks = windows.len() as u32;

        windows
            .into_iter()
            .enumerate()
            .map(|(idx, (content, start, end))| {
                DocumentChunk::from_document(
                    document,
                    content,
                    idx as u32,
                    total_chunks,
                    start as u64,
                    end as u64,
                )
            })
            .collect()
    }

    /// Split content into `(text, start, end)` windows, offsets in characters.
    fn split_with_overlap(&self, content: &str) -> Vec<(String, usize, usize)> {
        let chars: Vec<char> = content.chars().collect();
        let total_chars = chars.len();
        let step = self.chunk_size - self.overlap;

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total_chars {
            let end = (start + self.chunk_size).min(total_chars);
            chunks.push((chars[start..end].iter().collect(), start, end));

            if end == total_chars {
                break;
            }
            start += step;
        }

        chunks
    }
}

/// Number of chunks a text of `len` characters produces.
pub fn expected_chunk_count(len: usize, chunk_size: usize, overlap: usize) -> usize {
    if len == 0 {
        0
    } else if len <= chunk_size {
        1
    } else {
        let step = chunk_size - overlap;
        1 + (len - chunk_size).div_ceil(step)
    }
}
