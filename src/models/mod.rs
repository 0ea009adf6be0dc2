mod config;
mod document;
mod search;

pub use config::{
    Config, DEFAULT_DOCUMENTS_PATH, DEFAULT_EMBEDDING_MODEL, DEFAULT_GENERATION_MODEL,
    DEFAULT_GENERATION_URL, DEFAULT_INDEX_PATH, DEFAULT_WEB_BIND, EmbeddingBackend,
    EmbeddingConfig, GenerationConfig, IndexingConfig, RetrievalConfig, WebConfig, model_dir_name,
};
pub use document::{Document, DocumentChunk, DocumentFormat};
pub use search::{OutputFormat, QueryResult, SearchHit, unique_sources};
