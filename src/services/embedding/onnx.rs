use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tokenizers::{PaddingParams, PaddingStrategy, TruncationParams, TruncationStrategy};

use super::{Embedder, normalize};
use crate::error::{EmbeddingError, ModelError};
use crate::models::EmbeddingConfig;

/// Sentence-transformer exported to ONNX, run in-process.
pub struct EmbeddingModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    uses_token_type_ids: bool,
}

pub type SharedEmbeddingModel = Arc<EmbeddingModel>;

/// Locate the ONNX graph inside a model directory.
fn find_model_file(model_dir: &Path) -> Option<PathBuf> {
    [
        model_dir.join("model.onnx"),
        model_dir.join("onnx").join("model.onnx"),
    ]
    .into_iter()
    .find(|p| p.exists())
}

impl EmbeddingModel {
    pub fn load(config: &EmbeddingConfig, model_dir: &Path) -> Result<Self, ModelError> {
        let model_path = find_model_file(model_dir).ok_or_else(|| {
            ModelError::NotFound(format!("no model.onnx under {}", model_dir.display()))
        })?;
        let tokenizer_path = model_dir.join("tokenizer.json");
        let max_tokens = config.max_tokens as usize;

        if !tokenizer_path.exists() {
            return Err(ModelError::NotFound(format!(
                "tokenizer not found: {}",
                tokenizer_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?
            .with_intra_threads(num_cpus())
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?
            .commit_from_file(&model_path)
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?;

        let uses_token_type_ids = session
            .inputs
            .iter()
            .any(|input| input.name == "token_type_ids");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;

        // Chunks can exceed the model's context; truncate instead of failing
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_tokens,
                strategy: TruncationStrategy::LongestFirst,
                ..Default::default()
            }))
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;

        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        tracing::info!("Loaded ONNX embedding model from {}", model_path.display());

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            uses_token_type_ids,
        })
    }

    /// Mean-pooled, L2-normalized sentence embeddings.
    pub fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ModelError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);
        let batch_size = encodings.len();

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];
        let mut token_type_ids = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();
            for (j, (&id, &m)) in ids.iter().zip(mask.iter()).enumerate() {
                input_ids[i * max_len + j] = id as i64;
                attention_mask[i * max_len + j] = m as i64;
                token_type_ids[i * max_len + j] = types.get(j).copied().unwrap_or(0) as i64;
            }
        }

        let input_ids_tensor = Tensor::from_array(([batch_size, max_len], input_ids))
            .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;
        let attention_mask_tensor =
            Tensor::from_array(([batch_size, max_len], attention_mask.clone()))
                .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ModelError::InferenceError("session lock poisoned".to_string()))?;

        let outputs = if self.uses_token_type_ids {
            let token_type_ids_tensor = Tensor::from_array(([batch_size, max_len], token_type_ids))
                .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;
            session.run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            ])
        } else {
            session.run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            ])
        }
        .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;

        let output_array = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;

        let shape = output_array.shape().to_vec();

        let embeddings: Vec<Vec<f32>> = match shape.as_slice() {
            // last_hidden_state: [batch, seq, dim]
            [_, seq_len, dim] => (0..batch_size)
                .map(|i| {
                    let mut pooled = vec![0f32; *dim];
                    let mut count = 0f32;
                    for j in 0..*seq_len {
                        if attention_mask[i * max_len + j] == 0 {
                            continue;
                        }
                        count += 1.0;
                        for (d, value) in pooled.iter_mut().enumerate() {
                            *value += output_array[[i, j, d]];
                        }
                    }
                    if count > 0.0 {
                        pooled.iter_mut().for_each(|v| *v /= count);
                    }
                    normalize(&pooled)
                })
                .collect(),
            // sentence_embedding: [batch, dim]
            [_, dim] => (0..batch_size)
                .map(|i| {
                    let embedding: Vec<f32> = (0..*dim).map(|d| output_array[[i, d]]).collect();
                    normalize(&embedding)
                })
                .collect(),
            _ => {
                return Err(ModelError::InferenceError(format!(
                    "unexpected output shape: {:?}",
                    shape
                )));
            }
        };

        Ok(embeddings)
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// [`Embedder`] backed by a local ONNX model.
pub struct OnnxEmbedder {
    model: SharedEmbeddingModel,
    model_id: String,
    batch_size: usize,
}

impl OnnxEmbedder {
    pub fn load(config: &EmbeddingConfig, model_dir: &Path) -> Result<Self, ModelError> {
        let model = EmbeddingModel::load(config, model_dir)?;
        Ok(Self {
            model: Arc::new(model),
            model_id: config.model_id.clone(),
            batch_size: config.batch_size.max(1) as usize,
        })
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || model.embed(&texts))
            .await
            .map_err(|e| ModelError::InferenceError(e.to_string()))?
            .map_err(EmbeddingError::from)
    }
}

#[async_trait]
impl Embedder for OnnxEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            all_embeddings.extend(self.embed_batch(batch.to_vec()).await?);
        }

        Ok(all_embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_batch(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding output".to_string()))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_model_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_model_file(dir.path()).is_none());

        std::fs::create_dir(dir.path().join("onnx")).unwrap();
        std::fs::write(dir.path().join("onnx").join("model.onnx"), b"").unwrap();
        assert_eq!(
            find_model_file(dir.path()).unwrap(),
            dir.path().join("onnx").join("model.onnx")
        );

        std::fs::write(dir.path().join("model.onnx"), b"").unwrap();
        assert_eq!(
            find_model_file(dir.path()).unwrap(),
            dir.path().join("model.onnx")
        );
    }

    #[test]
    fn test_missing_tokenizer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("model.onnx"), b"").unwrap();
        let err = OnnxEmbedder::load(&EmbeddingConfig::default(), dir.path())
            .err()
            .unwrap();
        assert!(matches!(err, ModelError::NotFound(msg) if msg.contains("tokenizer")));
    }
}
