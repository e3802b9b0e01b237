//! In-process ONNX embedding model.
//!
//! The model directory must contain `model.onnx` and `tokenizer.json`.
//! Files are checked at construction; the session itself is loaded on first
//! use so building a provider stays cheap.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ndarray::{Array2, ArrayView2, ArrayView3, Ix3};
use ort::session::{Session, SessionInputValue, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams, TruncationStrategy};
use tokio::sync::OnceCell;

use crate::error::EmbeddingError;
use crate::models::EmbeddingProviderConfig;

use super::resolve_dimension;

pub const DEFAULT_ONNX_MODEL: &str = "all-MiniLM-L6-v2";
const MAX_TOKENS: usize = 512;
const BATCH_SIZE: usize = 32;

struct OnnxModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    input_names: Vec<String>,
}

impl OnnxModel {
    fn load(model_dir: &Path) -> Result<Self, EmbeddingError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        let session = Session::builder()
            .map_err(|e: ort::Error| EmbeddingError::Model(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e: ort::Error| EmbeddingError::Model(e.to_string()))?
            .with_intra_threads(num_cpus())
            .map_err(|e: ort::Error| EmbeddingError::Model(e.to_string()))?
            .commit_from_file(&model_path)
            .map_err(|e: ort::Error| EmbeddingError::Model(e.to_string()))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbeddingError::Model(format!("tokenizer: {e}")))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TOKENS,
                strategy: TruncationStrategy::LongestFirst,
                ..Default::default()
            }))
            .map_err(|e| EmbeddingError::Model(format!("tokenizer: {e}")))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        let input_names = session.inputs.iter().map(|i| i.name.clone()).collect();

        tracing::info!(model = %model_path.display(), "loaded ONNX embedding model");
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            input_names,
        })
    }

    fn embed_batch(&self, texts: &[String], dimension: usize) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::Inference(format!("tokenization failed: {e}")))?;

        let batch_size = encodings.len();
        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut input_ids = Array2::<i64>::zeros((batch_size, max_len));
        let mut attention_mask = Array2::<i64>::zeros((batch_size, max_len));
        for (i, encoding) in encodings.iter().enumerate() {
            let pairs = encoding.get_ids().iter().zip(encoding.get_attention_mask());
            for (j, (&id, &m)) in pairs.enumerate() {
                input_ids[[i, j]] = id as i64;
                attention_mask[[i, j]] = m as i64;
            }
        }

        let mut inputs: Vec<(String, SessionInputValue<'static>)> = Vec::new();
        for name in &self.input_names {
            let data: Vec<i64> = match name.as_str() {
                "input_ids" => input_ids.iter().copied().collect(),
                "attention_mask" => attention_mask.iter().copied().collect(),
                "token_type_ids" => vec![0; batch_size * max_len],
                "position_ids" => (0..batch_size)
                    .flat_map(|_| 0..max_len as i64)
                    .collect(),
                other => {
                    return Err(EmbeddingError::Model(format!(
                        "unsupported model input '{other}'"
                    )));
                }
            };
            let tensor = Tensor::from_array(([batch_size, max_len], data))
                .map_err(|e: ort::Error| EmbeddingError::Inference(e.to_string()))?;
            inputs.push((name.clone(), tensor.into()));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| EmbeddingError::Inference("session lock poisoned".to_string()))?;
        let outputs = session
            .run(inputs)
            .map_err(|e: ort::Error| EmbeddingError::Inference(e.to_string()))?;
        let output = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e: ort::Error| EmbeddingError::Inference(e.to_string()))?;

        let embeddings = match output.ndim() {
            3 => {
                let hidden = output
                    .into_dimensionality::<Ix3>()
                    .map_err(|e| EmbeddingError::Inference(e.to_string()))?;
                mean_pool(hidden, attention_mask.view())
            }
            // Already pooled: [batch, hidden]
            2 => output
                .outer_iter()
                .map(|row| normalize(&row.iter().copied().collect::<Vec<f32>>()))
                .collect(),
            _ => {
                return Err(EmbeddingError::Inference(format!(
                    "unexpected output shape: {:?}",
                    output.shape()
                )));
            }
        };

        if let Some(first) = embeddings.first()
            && first.len() != dimension
        {
            return Err(EmbeddingError::Inference(format!(
                "model produced {}-dimensional vectors, expected {dimension}",
                first.len()
            )));
        }
        Ok(embeddings)
    }
}

/// Attention-masked mean over token embeddings, L2-normalized.
fn mean_pool(hidden: ArrayView3<f32>, mask: ArrayView2<i64>) -> Vec<Vec<f32>> {
    hidden
        .outer_iter()
        .zip(mask.outer_iter())
        .map(|(tokens, flags)| {
            let mut sum = vec![0.0f32; tokens.ncols()];
            let mut count = 0.0f32;
            for (token, &flag) in tokens.outer_iter().zip(flags.iter()) {
                if flag == 0 {
                    continue;
                }
                count += 1.0;
                for (s, &v) in sum.iter_mut().zip(token.iter()) {
                    *s += v;
                }
            }
            let count = count.max(1e-9);
            let mean: Vec<f32> = sum.iter().map(|s| s / count).collect();
            normalize(&mean)
        })
        .collect()
}

fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[derive(Clone)]
pub struct OnnxProvider {
    model_dir: PathBuf,
    model: String,
    dimension: usize,
    loaded: Arc<OnceCell<Arc<OnnxModel>>>,
}

impl OnnxProvider {
    pub fn new(config: &EmbeddingProviderConfig) -> Result<Self, EmbeddingError> {
        let model_dir = config.model_path.clone().ok_or_else(|| {
            EmbeddingError::Config("onnx provider requires a model path".to_string())
        })?;

        for file in ["model.onnx", "tokenizer.json"] {
            let path = model_dir.join(file);
            if !path.is_file() {
                return Err(EmbeddingError::Config(format!(
                    "model file not found: {}",
                    path.display()
                )));
            }
        }

        let model = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_ONNX_MODEL.to_string());
        let dimension = resolve_dimension(config, &model)?;

        Ok(Self {
            model_dir,
            model,
            dimension,
            loaded: Arc::new(OnceCell::new()),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    async fn session(&self) -> Result<Arc<OnnxModel>, EmbeddingError> {
        self.loaded
            .get_or_try_init(|| async {
                let dir = self.model_dir.clone();
                let model = tokio::task::spawn_blocking(move || OnnxModel::load(&dir))
                    .await
                    .map_err(|e| EmbeddingError::Model(format!("model loader panicked: {e}")))??;
                Ok::<_, EmbeddingError>(Arc::new(model))
            })
            .await
            .cloned()
    }

    pub(super) async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.session().await?;
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(BATCH_SIZE) {
            let model = Arc::clone(&model);
            let batch = batch.to_vec();
            let dimension = self.dimension;
            let vectors = tokio::task::spawn_blocking(move || model.embed_batch(&batch, dimension))
                .await
                .map_err(|e| EmbeddingError::Inference(format!("inference task panicked: {e}")))??;
            embeddings.extend(vectors);
        }

        Ok(embeddings)
    }
}

impl std::fmt::Debug for OnnxProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxProvider")
            .field("model_dir", &self.model_dir)
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .field("loaded", &self.loaded.initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProviderKind;
    use ndarray::{Array2, Array3};

    fn model_dir(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            std::fs::write(dir.path().join(file), b"").unwrap();
        }
        dir
    }

    #[test]
    fn test_model_path_required() {
        let config = EmbeddingProviderConfig::new(ProviderKind::Onnx);
        assert!(matches!(
            OnnxProvider::new(&config),
            Err(EmbeddingError::Config(_))
        ));
    }

    #[test]
    fn test_missing_tokenizer_rejected() {
        let dir = model_dir(&["model.onnx"]);
        let mut config = EmbeddingProviderConfig::new(ProviderKind::Onnx);
        config.model_path = Some(dir.path().to_path_buf());

        let err = OnnxProvider::new(&config).unwrap_err();
        assert!(err.to_string().contains("tokenizer.json"));
    }

    #[test]
    fn test_construction_does_not_load_model() {
        let dir = model_dir(&["model.onnx", "tokenizer.json"]);
        let mut config = EmbeddingProviderConfig::new(ProviderKind::Onnx);
        config.model_path = Some(dir.path().to_path_buf());

        let provider = OnnxProvider::new(&config).unwrap();
        assert_eq!(provider.dimension(), 384);
        assert!(!provider.loaded.initialized());
    }

    #[test]
    fn test_mean_pool_ignores_padding() {
        // 1 sequence, 3 tokens, 2 dims; last token is padding
        let hidden =
            Array3::from_shape_vec((1, 3, 2), vec![1.0, 0.0, 3.0, 0.0, 100.0, 100.0]).unwrap();
        let mask = Array2::from_shape_vec((1, 3), vec![1i64, 1, 0]).unwrap();

        let pooled = mean_pool(hidden.view(), mask.view());
        assert_eq!(pooled, vec![vec![1.0, 0.0]]);
    }

    #[test]
    fn test_mean_pool_all_padding_is_finite() {
        let hidden = Array3::from_shape_vec((1, 2, 2), vec![5.0, 6.0, 7.0, 8.0]).unwrap();
        let mask = Array2::from_shape_vec((1, 2), vec![0i64, 0]).unwrap();

        let pooled = mean_pool(hidden.view(), mask.view());
        assert!(pooled[0].iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_normalize() {
        let v = normalize(&[3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        assert_eq!(normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }
}
