use std::path::{Path, PathBuf};

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::api::sync::Api;
use tokenizers::{
    PaddingParams,
    PaddingStrategy,
    Tokenizer,
    TruncationParams,
};

use crate::{
    embedding::Embedder,
    error::{Error, Result},
};

pub const DEFAULT_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const MODEL_ENV_VAR: &str = "ASKDOCS_MODEL";

/// Inputs longer than this many tokens are truncated before encoding.
const MAX_SEQUENCE_TOKENS: usize = 256;

/// Select the best available compute device.
///
/// Uses CUDA when compiled with the `cuda` feature, Metal when compiled with
/// the `metal` feature, and falls back to CPU otherwise.
fn default_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            return device;
        }
    }

    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            return device;
        }
    }

    Device::Cpu
}

fn map_candle_err(e: candle_core::Error) -> Error {
    Error::Embedding(format!("tensor computation error: {e}"))
}

struct LoadedModel {
    bert: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

/// Manages a sentence-transformer model, loading it lazily on first use.
///
/// Embeddings are mean-pooled over non-padding tokens and L2-normalized,
/// matching how sentence-transformers models are meant to be used.
pub struct ModelManager {
    model: Option<LoadedModel>,
    model_id: String,
}

impl Default for ModelManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelManager {
    /// Creates a new `ModelManager`. The model ID is resolved from:
    /// 1. The `ASKDOCS_MODEL` environment variable, if set
    /// 2. Otherwise, the default model
    ///    (`sentence-transformers/all-MiniLM-L6-v2`)
    ///
    /// The model is not loaded until the first call to `embed`.
    pub fn new() -> Self {
        let model_id = std::env::var(MODEL_ENV_VAR)
            .unwrap_or_else(|_| DEFAULT_MODEL_ID.to_string());

        Self {
            model: None,
            model_id,
        }
    }

    /// Creates a `ModelManager` with an explicit model ID or local model
    /// directory, bypassing environment variable resolution.
    pub fn with_model_id(model_id: String) -> Self {
        Self {
            model: None,
            model_id,
        }
    }

    /// Returns the model ID that will be (or has been) loaded.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Returns `true` if the model has already been loaded into memory.
    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Ensures the model is loaded, downloading from HuggingFace Hub if needed.
    fn ensure_loaded(&mut self) -> Result<&LoadedModel> {
        if self.model.is_none() {
            tracing::info!(model = %self.model_id, "loading embedding model");
            self.model = Some(load_model(&self.model_id)?);
        }

        self.model
            .as_ref()
            .ok_or_else(|| Error::Embedding("model not loaded".to_string()))
    }
}

impl Embedder for ModelManager {
    fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = self.ensure_loaded()?;
        encode(model, texts).map_err(map_candle_err)
    }
}

impl std::fmt::Debug for ModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelManager")
            .field("model_id", &self.model_id)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Locate `config.json`, `tokenizer.json` and `model.safetensors`, either
/// in a local directory or through the HuggingFace Hub cache.
fn model_files(model_id: &str) -> Result<(PathBuf, PathBuf, PathBuf)> {
    let local = Path::new(model_id);
    if local.is_dir() {
        return Ok((
            local.join("config.json"),
            local.join("tokenizer.json"),
            local.join("model.safetensors"),
        ));
    }

    let hub_error = |e: hf_hub::api::sync::ApiError| {
        Error::Embedding(format!("{model_id}: {e}"))
    };
    let api = Api::new().map_err(hub_error)?;
    let repo = api.model(model_id.to_string());

    Ok((
        repo.get("config.json").map_err(hub_error)?,
        repo.get("tokenizer.json").map_err(hub_error)?,
        repo.get("model.safetensors").map_err(hub_error)?,
    ))
}

fn load_model(model_id: &str) -> Result<LoadedModel> {
    let (config_path, tokenizer_path, weights_path) = model_files(model_id)?;

    let config: Config =
        serde_json::from_str(&std::fs::read_to_string(config_path)?)?;

    let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| {
            Error::Embedding(format!("failed to load tokenizer: {e}"))
        })?;
    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        ..Default::default()
    }));
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: MAX_SEQUENCE_TOKENS,
            ..Default::default()
        }))
        .map_err(|e| Error::Embedding(format!("invalid truncation: {e}")))?;

    let device = default_device();
    // SAFETY: the weights file is memory-mapped read-only and is not
    // modified while the model is alive.
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)
            .map_err(map_candle_err)?
    };
    let bert = BertModel::load(vb, &config).map_err(map_candle_err)?;

    Ok(LoadedModel {
        bert,
        tokenizer,
        device,
    })
}

fn encode(
    model: &LoadedModel,
    texts: &[String],
) -> candle_core::Result<Vec<Vec<f32>>> {
    let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let encodings = model
        .tokenizer
        .encode_batch(inputs, true)
        .map_err(|e| candle_core::Error::Msg(e.to_string()))?;

    let ids = encodings
        .iter()
        .map(|e| Tensor::new(e.get_ids(), &model.device))
        .collect::<candle_core::Result<Vec<_>>>()?;
    let masks = encodings
        .iter()
        .map(|e| Tensor::new(e.get_attention_mask(), &model.device))
        .collect::<candle_core::Result<Vec<_>>>()?;

    let input_ids = Tensor::stack(&ids, 0)?;
    let attention_mask = Tensor::stack(&masks, 0)?;
    let token_type_ids = input_ids.zeros_like()?;

    // [batch, tokens, hidden]
    let hidden =
        model
            .bert
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

    // Mean over real tokens only.
    let mask = attention_mask.to_dtype(DTYPE)?.unsqueeze(2)?;
    let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
    let counts = mask.sum(1)?;
    let pooled = summed.broadcast_div(&counts)?;

    let norms = pooled.sqr()?.sum_keepdim(1)?.sqrt()?;
    pooled.broadcast_div(&norms)?.to_vec2::<f32>()
}
