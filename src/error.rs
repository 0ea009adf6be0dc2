//! Error types for the document question-answering pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Errors related to loading and extracting documents.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("documents directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("no documents found in {path} ({skipped} supported file(s) skipped)")]
    NoDocuments { path: PathBuf, skipped: usize },

    #[error("failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to extract text from {path}: {message}")]
    ExtractError { path: PathBuf, message: String },

    #[error("file exceeds maximum size: {size} > {max} bytes")]
    TooLarge { size: u64, max: u64 },
}

/// Errors raised while loading or running the local embedding model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model not found: {0}")]
    NotFound(String),

    #[error("model load error: {0}")]
    LoadError(String),

    #[error("tokenizer error: {0}")]
    TokenizerError(String),

    #[error("inference error: {0}")]
    InferenceError(String),
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding server: {0}")]
    ConnectionError(String),

    #[error("embedding server error: {0}")]
    ServerError(String),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,

    #[error("embedding model error: {0}")]
    Model(#[from] ModelError),
}

/// Errors related to the on-disk vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("vector index not found at {0}")]
    NotFound(PathBuf),

    #[error("vector index at {0} is empty")]
    Empty(PathBuf),

    #[error("vector index is corrupt: {0}")]
    Corrupt(String),

    #[error("vector dimension mismatch: index has {expected}, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to the text-generation service.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("cannot reach generation service at {url}: {message}")]
    Connection { url: String, message: String },

    #[error("generation service at {url} did not answer within {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("generation service returned status {status}: {body}")]
    Server { status: u16, body: String },

    #[error("invalid generation response: {0}")]
    InvalidResponse(String),
}

/// Errors surfaced while answering a question.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("question cannot be empty")]
    EmptyQuestion,

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("query error: {0}")]
    Query(#[from] QueryError),
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        AppError::Embedding(EmbeddingError::Model(err))
    }
}

impl IndexError {
    fn hint(&self) -> Option<&'static str> {
        match self {
            IndexError::NotFound(_) | IndexError::Empty(_) => {
                Some("run `rag-one index` first to build the vector index")
            }
            IndexError::Corrupt(_) | IndexError::DimensionMismatch { .. } => Some(
                "rebuild the index with `rag-one index` using the current embedding model",
            ),
            IndexError::Storage(_) | IndexError::Io(_) => {
                Some("check that VECTOR_STORE_PATH is readable and writable")
            }
        }
    }
}

impl GenerationError {
    fn hint(&self) -> Option<&'static str> {
        match self {
            GenerationError::Connection { .. } | GenerationError::Timeout { .. } => Some(
                "check the service URL (OLLAMA_BASE_URL) and that the model server is running",
            ),
            GenerationError::Server { .. } => {
                Some("check that the model (OLLAMA_MODEL) is pulled on the model server")
            }
            GenerationError::InvalidResponse(_) => None,
        }
    }
}

impl EmbeddingError {
    fn hint(&self) -> Option<&'static str> {
        match self {
            EmbeddingError::Model(ModelError::NotFound(_)) => Some(
                "download the ONNX embedding model or set EMBEDDING_MODEL_PATH (or EMBEDDING_BACKEND=ollama)",
            ),
            EmbeddingError::ConnectionError(_) | EmbeddingError::Timeout => {
                Some("check EMBEDDING_URL / OLLAMA_BASE_URL and that the embedding server is running")
            }
            _ => None,
        }
    }
}

impl DocumentError {
    fn hint(&self) -> Option<&'static str> {
        match self {
            DocumentError::DirectoryNotFound(_) | DocumentError::NoDocuments { .. } => {
                Some("place PDF, TXT, DOCX or XLSX files in the documents directory (DOCUMENTS_PATH)")
            }
            _ => None,
        }
    }
}

impl QueryError {
    fn hint(&self) -> Option<&'static str> {
        match self {
            QueryError::EmptyQuestion => Some("provide a question with --question or use --interactive"),
            QueryError::Embedding(e) => e.hint(),
            QueryError::Index(e) => e.hint(),
            QueryError::Generation(e) => e.hint(),
        }
    }
}

impl AppError {
    /// Human-readable remediation hint for this error, if one applies.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            AppError::Config(_) => Some("check the environment variables and the config file"),
            AppError::Document(e) => e.hint(),
            AppError::Embedding(e) => e.hint(),
            AppError::Index(e) => e.hint(),
            AppError::Generation(e) => e.hint(),
            AppError::Query(e) => e.hint(),
        }
    }
}

/// Find a remediation hint anywhere in an error chain.
pub fn remediation_hint(err: &anyhow::Error) -> Option<&'static str> {
    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<AppError>() {
            e.hint()
        } else if let Some(e) = cause.downcast_ref::<QueryError>() {
            e.hint()
        } else if let Some(e) = cause.downcast_ref::<IndexError>() {
            e.hint()
        } else if let Some(e) = cause.downcast_ref::<GenerationError>() {
            e.hint()
        } else if let Some(e) = cause.downcast_ref::<EmbeddingError>() {
            e.hint()
        } else if let Some(e) = cause.downcast_ref::<DocumentError>() {
            e.hint()
        } else if cause.downcast_ref::<ConfigError>().is_some() {
            Some("check the environment variables and the config file")
        } else {
            None
        }
    })
}
