//! Text embedding backends.
//!
//! Everything that turns text into vectors goes through the [`Embedder`]
//! trait, so indexing and querying are guaranteed to share one model.

mod ollama;
mod onnx;

pub use ollama::OllamaEmbedder;
pub use onnx::{OnnxEmbedder, SharedEmbeddingModel};

use async_trait::async_trait;

use crate::error::{EmbeddingError, ModelError};
use crate::models::{Config, EmbeddingBackend};

/// Sentence embedding model.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed chunk texts for indexing. Output order matches input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single question.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Identifier recorded in the index next to the vectors.
    fn model_id(&self) -> &str;
}

/// Create the embedder selected by `embedding.backend`.
pub fn create_embedder(config: &Config) -> Result<Box<dyn Embedder>, EmbeddingError> {
    match config.embedding.backend {
        EmbeddingBackend::Onnx => {
            let model_dir = config.embedding_model_dir().ok_or_else(|| {
                ModelError::NotFound("no data directory for ONNX models".to_string())
            })?;
            let embedder = OnnxEmbedder::load(&config.embedding, &model_dir)?;
            Ok(Box::new(embedder))
        }
        EmbeddingBackend::Ollama => {
            let embedder = OllamaEmbedder::new(&config.embedding, config.embedding_url())?;
            Ok(Box::new(embedder))
        }
    }
}

pub(crate) fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
