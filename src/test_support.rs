//! Shared fixtures for unit tests: a deterministic embedder and an
//! in-process stand-in for the generation service.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::error::EmbeddingError;
use crate::models::Config;
use crate::services::Embedder;

const FAKE_DIM: usize = 64;

/// Bag-of-words embedder: each lowercase token is hashed into a bucket.
pub struct FakeEmbedder;

impl FakeEmbedder {
    pub fn new() -> Self {
        Self
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; FAKE_DIM];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = Sha256::digest(token.to_lowercase().as_bytes());
            let idx = u16::from_le_bytes([hash[0], hash[1]]) as usize % FAKE_DIM;
            v[idx] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        v.iter_mut().for_each(|x| *x /= norm);
        v
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.vector(text))
    }

    fn model_id(&self) -> &str {
        "fake-bag-of-words"
    }
}

/// Small windows so a few paragraphs produce several chunks.
pub fn test_config(generation_url: &str, index_path: &Path) -> Config {
    let mut config = Config::default();
    config.generation.url = generation_url.to_string();
    config.generation.timeout_secs = 5;
    config.embedding.model_id = "fake-bag-of-words".to_string();
    config.embedding.batch_size = 4;
    config.indexing.index_path = index_path.to_path_buf();
    config.indexing.chunk_size = 200;
    config.indexing.chunk_overlap = 40;
    config
}

/// URL of a local port nobody listens on.
pub fn refused_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

#[derive(Debug, Clone)]
pub enum StubBehavior {
    /// Reply with `{"response": ...}`
    Answer(String),
    /// Sleep before answering
    Delay(Duration),
    /// Reply with this status code
    Status(u16),
    /// Reply 200 with a raw body
    Raw(String),
}

struct StubState {
    behavior: StubBehavior,
    prompts: Mutex<Vec<String>>,
}

pub struct GenerationStub {
    pub url: String,
    state: Arc<StubState>,
}

impl GenerationStub {
    pub fn prompts(&self) -> Vec<String> {
        self.state.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.state.prompts.lock().unwrap().len()
    }
}

async fn generate(State(state): State<Arc<StubState>>, Json(body): Json<Value>) -> Response {
    let prompt = body["prompt"].as_str().unwrap_or_default().to_string();
    state.prompts.lock().unwrap().push(prompt);

    match &state.behavior {
        StubBehavior::Answer(text) => {
            Json(json!({ "model": body["model"], "response": text, "done": true })).into_response()
        }
        StubBehavior::Delay(delay) => {
            tokio::time::sleep(*delay).await;
            Json(json!({ "response": "too late", "done": true })).into_response()
        }
        StubBehavior::Status(code) => (
            StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            "model not found",
        )
            .into_response(),
        StubBehavior::Raw(raw) => raw.clone().into_response(),
    }
}

async fn tags() -> Json<Value> {
    Json(json!({ "models": [{ "name": "llama2:latest" }] }))
}

/// Serve an Ollama-shaped stub on an ephemeral port.
pub async fn spawn_generation_stub(behavior: StubBehavior) -> GenerationStub {
    let state = Arc::new(StubState {
        behavior,
        prompts: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/api/generate", post(generate))
        .route("/api/tags", get(tags))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    GenerationStub {
        url: format!("http://{}", addr),
        state,
    }
}
