//! Client for the local text-generation service (Ollama API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::models::GenerationConfig;

/// Something that turns a prompt into an answer.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate the full completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Check whether the service answers at all.
    async fn health_check(&self) -> Result<(), GenerationError>;

    fn model(&self) -> &str;

    fn base_url(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Ollama `/api/generate` client.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let base_url = config.url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Connection {
                url: base_url.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url,
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn map_send_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout {
                url: self.base_url.clone(),
                secs: self.timeout_secs,
            }
        } else {
            GenerationError::Connection {
                url: self.base_url.clone(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl Generator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        tracing::debug!("POST {} (model {}, {} prompt chars)", url, self.model, prompt.len());

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Server { status, body });
        }

        let body = response.text().await.map_err(|e| self.map_send_error(e))?;
        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        Ok(parsed.response)
    }

    async fn health_check(&self) -> Result<(), GenerationError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(GenerationError::Server {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{refused_url, spawn_generation_stub, StubBehavior};

    fn config(url: &str, timeout_secs: u64) -> GenerationConfig {
        GenerationConfig {
            url: url.to_string(),
            model: "llama2".to_string(),
            timeout_secs,
        }
    }

    #[test]
    fn test_base_url_trimming() {
        let client = OllamaClient::new(&config("http://localhost:11434/", 5)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.model(), "llama2");
    }

    #[tokio::test]
    async fn test_generate() {
        let stub = spawn_generation_stub(StubBehavior::Answer("forty-two".to_string())).await;
        let client = OllamaClient::new(&config(&stub.url, 5)).unwrap();

        assert_eq!(client.generate("what?").await.unwrap(), "forty-two");
        let prompts = stub.prompts();
        assert_eq!(prompts, vec!["what?".to_string()]);
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let client = OllamaClient::new(&config(&refused_url(), 5)).unwrap();
        let err = client.generate("hello").await.unwrap_err();
        assert!(matches!(err, GenerationError::Connection { .. }));
        assert!(client.health_check().await.is_err());
    }

    #[tokio::test]
    async fn test_timeout() {
        let stub = spawn_generation_stub(StubBehavior::Delay(Duration::from_secs(5))).await;
        let client = OllamaClient::new(&config(&stub.url, 1)).unwrap();

        let started = std::time::Instant::now();
        let err = client.generate("slow").await.unwrap_err();
        assert!(matches!(err, GenerationError::Timeout { secs: 1, .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_server_error() {
        let stub = spawn_generation_stub(StubBehavior::Status(404)).await;
        let client = OllamaClient::new(&config(&stub.url, 5)).unwrap();

        let err = client.generate("x").await.unwrap_err();
        assert!(matches!(err, GenerationError::Server { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_invalid_body() {
        let stub = spawn_generation_stub(StubBehavior::Raw("not json".to_string())).await;
        let client = OllamaClient::new(&config(&stub.url, 5)).unwrap();

        let err = client.generate("x").await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_health_check() {
        let stub = spawn_generation_stub(StubBehavior::Answer("ok".to_string())).await;
        let client = OllamaClient::new(&config(&stub.url, 5)).unwrap();
        client.health_check().await.unwrap();
    }
}
