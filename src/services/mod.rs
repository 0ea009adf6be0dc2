mod chunker;
mod embedding;
mod generation;
mod pipeline;
mod vector_store;

pub use chunker::{TextChunker, expected_chunk_count};
pub use embedding::{Embedder, OllamaEmbedder, OnnxEmbedder, SharedEmbeddingModel, create_embedder};
pub use generation::{Generator, OllamaClient};
pub use pipeline::{IndexReport, NO_CONTEXT_ANSWER, RagEngine, build_prompt};
pub use vector_store::{
    INDEX_FILE, IndexEntry, IndexMeta, IndexStats, VectorIndex, cosine_similarity,
};
