//! Indexing and question-answering orchestration.

use std::path::{Path, PathBuf};
use std::time::Instant;

use indicatif::ProgressBar;
use serde::Serialize;

use super::chunker::TextChunker;
use super::embedding::{Embedder, create_embedder};
use super::generation::{Generator, OllamaClient};
use super::vector_store::{IndexEntry, IndexMeta, IndexStats, VectorIndex};
use crate::error::{AppError, IndexError, QueryError};
use crate::models::{Config, DocumentChunk, QueryResult};
use crate::sources::{DocumentLoader, SkippedFile};

/// Answer returned when retrieval finds nothing to ground the model on.
pub const NO_CONTEXT_ANSWER: &str =
    "I don't know. No relevant passages were found in the indexed documents.";

const PROMPT_TEMPLATE: &str = "Use the following pieces of context to answer the question at the end. \nIf you don't know the answer, just say that you don't know, don't try to make up an answer.\n\nContext: {context}\n\nQuestion: {question}\n\nAnswer: ";

/// Fill the prompt template.
pub fn build_prompt(context: &str, question: &str) -> String {
    PROMPT_TEMPLATE
        .replacen("{context}", context, 1)
        .replacen("{question}", question, 1)
}

/// Result of one indexing run.
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub documents_path: PathBuf,
    pub documents: usize,
    pub chunks: usize,
    pub skipped: Vec<SkippedFile>,
    pub unsupported_files: usize,
    pub embedding_model: String,
    pub index_path: PathBuf,
    pub duration_ms: u64,
}

/// Load → chunk → embed → store at build time; embed → retrieve → generate
/// at query time.
pub struct RagEngine {
    config: Config,
    embedder: Box<dyn Embedder>,
    index: VectorIndex,
    generator: Box<dyn Generator>,
}

impl RagEngine {
    pub fn new(config: Config, embedder: Box<dyn Embedder>, generator: Box<dyn Generator>) -> Self {
        let index = VectorIndex::new(config.indexing.index_path.clone());
        Self {
            config,
            embedder,
            index,
            generator,
        }
    }

    /// Build the configured embedder and generation client.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let embedder = create_embedder(config)?;
        let generator = OllamaClient::new(&config.generation)?;
        Ok(Self::new(config.clone(), embedder, Box::new(generator)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn generator(&self) -> &dyn Generator {
        self.generator.as_ref()
    }

    pub fn embedding_model(&self) -> &str {
        self.embedder.model_id()
    }

    /// Rebuild the index from every document under `documents_path`.
    pub async fn build_index(
        &self,
        documents_path: &Path,
        progress: &ProgressBar,
    ) -> Result<IndexReport, AppError> {
        let start = Instant::now();

        let chunker = TextChunker::new(&self.config.indexing)?;
        let loader = DocumentLoader::from_config(&self.config.indexing);

        progress.set_message("Loading documents...");
        let outcome = loader.load_directory(documents_path)?;
        tracing::info!(
            "Loaded {} documents ({} skipped, {} unsupported)",
            outcome.documents.len(),
            outcome.skipped.len(),
            outcome.unsupported_files
        );

        let chunks: Vec<DocumentChunk> = outcome
            .documents
            .iter()
            .flat_map(|doc| chunker.chunk(doc))
            .collect();

        self.index_chunks(&chunks, outcome.documents.len(), progress)
            .await?;

        Ok(IndexReport {
            documents_path: documents_path.to_path_buf(),
            documents: outcome.documents.len(),
            chunks: chunks.len(),
            skipped: outcome.skipped,
            unsupported_files: outcome.unsupported_files,
            embedding_model: self.embedder.model_id().to_string(),
            index_path: self.index.path(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Embed `chunks` in batches and replace the stored index with them.
    pub async fn index_chunks(
        &self,
        chunks: &[DocumentChunk],
        documents: usize,
        progress: &ProgressBar,
    ) -> Result<IndexStats, AppError> {
        let batch_size = self.config.embedding.batch_size.max(1) as usize;

        progress.set_length(chunks.len() as u64);
        progress.set_position(0);
        progress.set_message("Embedding chunks...");

        let mut entries = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = self.embedder.embed_documents(&texts).await?;

            if embeddings.len() != batch.len() {
                return Err(AppError::Embedding(
                    crate::error::EmbeddingError::InvalidResponse(format!(
                        "expected {} embeddings, got {}",
                        batch.len(),
                        embeddings.len()
                    )),
                ));
            }

            entries.extend(
                batch
                    .iter()
                    .cloned()
                    .zip(embeddings)
                    .map(|(chunk, embedding)| IndexEntry { chunk, embedding }),
            );
            progress.inc(batch.len() as u64);
        }

        progress.set_message("Writing index...");
        let meta = IndexMeta {
            embedding_model: self.embedder.model_id().to_string(),
            documents,
        };
        Ok(self.index.rebuild(&entries, &meta)?)
    }

    /// Answer `question` from the indexed documents.
    pub async fn query(&self, question: &str) -> Result<QueryResult, QueryError> {
        let start = Instant::now();
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::EmptyQuestion);
        }

        match self.index.stats()? {
            None => return Err(IndexError::NotFound(self.index.dir().to_path_buf()).into()),
            Some(stats) if stats.is_empty() => {
                return Err(IndexError::Empty(self.index.dir().to_path_buf()).into());
            }
            Some(stats) if stats.embedding_model != self.embedder.model_id() => {
                tracing::warn!(
                    "Index was built with embedding model '{}' but queries use '{}'; rebuild the index for reliable results",
                    stats.embedding_model,
                    self.embedder.model_id()
                );
            }
            Some(_) => {}
        }

        let query_vector = self.embedder.embed_query(question).await?;
        let mut hits = self
            .index
            .search(&query_vector, self.config.retrieval.top_k as usize)?;

        if let Some(min_score) = self.config.retrieval.min_score {
            hits.retain(|hit| hit.score >= min_score);
        }

        if hits.is_empty() {
            tracing::info!("No chunks retrieved for question; skipping generation");
            return Ok(QueryResult::new(
                question.to_string(),
                NO_CONTEXT_ANSWER.to_string(),
                hits,
                start.elapsed().as_millis() as u64,
            ));
        }

        let context = hits
            .iter()
            .map(|hit| hit.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = build_prompt(&context, question);

        tracing::debug!("Retrieved {} chunks, prompt is {} chars", hits.len(), prompt.len());
        let answer = self.generator.generate(&prompt).await?;

        Ok(QueryResult::new(
            question.to_string(),
            answer,
            hits,
            start.elapsed().as_millis() as u64,
        ))
    }
}
