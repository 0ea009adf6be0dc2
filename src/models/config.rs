use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_GENERATION_URL: &str = "http://localhost:11434";
pub const DEFAULT_GENERATION_MODEL: &str = "llama2";
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_DOCUMENTS_PATH: &str = "data/documents";
pub const DEFAULT_INDEX_PATH: &str = "data/vector_store";
pub const DEFAULT_WEB_BIND: &str = "127.0.0.1:8501";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub web: WebConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("rag-one").join("config.toml"))
    }

    pub fn models_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("rag-one").join("models"))
    }

    /// Load configuration: defaults, config file, `.env`, then process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::from_toml(&std::fs::read_to_string(&path)?)?,
            _ => Self::default(),
        };

        let _ = dotenvy::dotenv();
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay environment-style settings. `lookup` returns the raw value for a key.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OLLAMA_BASE_URL") {
            self.generation.url = v;
        }
        if let Some(v) = get("OLLAMA_MODEL") {
            self.generation.model = v;
        }
        if let Some(v) = get("GENERATION_TIMEOUT_SECS") {
            self.generation.timeout_secs = parse_value("GENERATION_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("EMBEDDING_BACKEND") {
            self.embedding.backend = parse_value("EMBEDDING_BACKEND", &v)?;
        }
        if let Some(v) = get("EMBEDDING_MODEL") {
            self.embedding.model_id = v;
        }
        if let Some(v) = get("EMBEDDING_MODEL_PATH") {
            self.embedding.model_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("EMBEDDING_URL") {
            self.embedding.url = Some(v);
        }
        if let Some(v) = get("DOCUMENTS_PATH") {
            self.indexing.documents_path = PathBuf::from(v);
        }
        if let Some(v) = get("VECTOR_STORE_PATH") {
            self.indexing.index_path = PathBuf::from(v);
        }
        if let Some(v) = get("CHUNK_SIZE") {
            self.indexing.chunk_size = parse_value("CHUNK_SIZE", &v)?;
        }
        if let Some(v) = get("CHUNK_OVERLAP") {
            self.indexing.chunk_overlap = parse_value("CHUNK_OVERLAP", &v)?;
        }
        if let Some(v) = get("TOP_K") {
            self.retrieval.top_k = parse_value("TOP_K", &v)?;
        }
        if let Some(v) = get("MIN_SCORE") {
            self.retrieval.min_score = Some(parse_value("MIN_SCORE", &v)?);
        }
        if let Some(v) = get("WEB_BIND") {
            self.web.bind = v;
        }

        Ok(())
    }

    /// Override the generation endpoint and model, as the CLI flags do.
    pub fn with_generation_overrides(mut self, model: Option<String>, url: Option<String>) -> Self {
        if let Some(model) = model {
            self.generation.model = model;
        }
        if let Some(url) = url {
            self.generation.url = url;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.generation.url.starts_with("http://") && !self.generation.url.starts_with("https://")
        {
            return Err(ConfigError::ValidationError(format!(
                "generation URL must start with http:// or https://: {}",
                self.generation.url
            )));
        }
        if self.generation.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "generation model must not be empty".to_string(),
            ));
        }
        if self.generation.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "generation timeout must be at least 1 second".to_string(),
            ));
        }
        if self.indexing.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "chunk size must be at least 1".to_string(),
            ));
        }
        if self.indexing.chunk_overlap >= self.indexing.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.indexing.chunk_overlap, self.indexing.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "top-k must be at least 1".to_string(),
            ));
        }
        if let Some(score) = self.retrieval.min_score
            && !(0.0..=1.0).contains(&score)
        {
            return Err(ConfigError::ValidationError(
                "min score must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "embedding batch size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL for the Ollama embedding backend.
    pub fn embedding_url(&self) -> &str {
        self.embedding.url.as_deref().unwrap_or(&self.generation.url)
    }

    /// Directory holding the ONNX model files.
    pub fn embedding_model_dir(&self) -> Option<PathBuf> {
        self.embedding.model_path.clone().or_else(|| {
            Self::models_dir().map(|dir| dir.join(model_dir_name(&self.embedding.model_id)))
        })
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

pub fn model_dir_name(model_id: &str) -> String {
    model_id.replace('/', "--")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_url")]
    pub url: String,

    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_generation_url() -> String {
    DEFAULT_GENERATION_URL.to_string()
}

fn default_generation_model() -> String {
    DEFAULT_GENERATION_MODEL.to_string()
}

fn default_timeout() -> u64 {
    120
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            url: default_generation_url(),
            model: default_generation_model(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Which embedding implementation turns text into vectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local sentence-transformer through ONNX Runtime
    #[default]
    Onnx,
    /// Ollama `/api/embed` endpoint
    Ollama,
}

impl std::str::FromStr for EmbeddingBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "onnx" => Ok(EmbeddingBackend::Onnx),
            "ollama" => Ok(EmbeddingBackend::Ollama),
            _ => Err(format!("unknown embedding backend: {}", s)),
        }
    }
}

impl std::fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingBackend::Onnx => write!(f, "onnx"),
            EmbeddingBackend::Ollama => write!(f, "ollama"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,

    #[serde(default = "default_embedding_model")]
    pub model_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_batch_size() -> u32 {
    16
}

fn default_max_tokens() -> u32 {
    256
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            model_id: default_embedding_model(),
            model_path: None,
            url: None,
            batch_size: default_batch_size(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    #[serde(default = "default_documents_path")]
    pub documents_path: PathBuf,

    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

fn default_documents_path() -> PathBuf {
    PathBuf::from(DEFAULT_DOCUMENTS_PATH)
}

fn default_index_path() -> PathBuf {
    PathBuf::from(DEFAULT_INDEX_PATH)
}

fn default_chunk_size() -> u32 {
    1000
}

fn default_chunk_overlap() -> u32 {
    200
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024
}

fn default_exclude_patterns() -> Vec<String> {
    vec!["**/.git/**".to_string(), "**/~$*".to_string()]
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            documents_path: default_documents_path(),
            index_path: default_index_path(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_file_size: default_max_file_size(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default)]
    pub min_score: Option<f32>,
}

fn default_top_k() -> u32 {
    3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_web_bind")]
    pub bind: String,
}

fn default_web_bind() -> String {
    DEFAULT_WEB_BIND.to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_web_bind(),
        }
    }
}
