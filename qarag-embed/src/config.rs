//! Configuration for embedding models

use crate::error::{EmbedError, Result};
use derive_builder::Builder;
use fastembed::EmbeddingModel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Model used when nothing else is configured.
pub const DEFAULT_EMBED_MODEL: &str = "all-MiniLM-L6-v2";

/// Configuration for embedding models
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
#[serde(default)]
pub struct EmbedConfig {
    /// Directory where fastembed caches downloaded ONNX files
    #[builder(default = r#"PathBuf::from("models")"#)]
    pub cache_dir: PathBuf,
    /// Name of the embedding model to use
    #[builder(default = "DEFAULT_EMBED_MODEL.to_string()")]
    pub model_name: String,
    /// Maximum batch size for embedding generation
    #[builder(default = "32")]
    pub batch_size: usize,
    /// Whether to normalize embeddings to unit length
    #[builder(default = "true")]
    pub normalize: bool,
    /// Print download progress while fetching model files
    #[builder(default = "false")]
    pub show_download_progress: bool,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        EmbedConfigBuilder::default()
            .build()
            .expect("every EmbedConfig field has a default")
    }
}

impl EmbedConfig {
    /// Create a new embedding configuration using the builder
    pub fn builder() -> EmbedConfigBuilder {
        EmbedConfigBuilder::default()
    }

    /// Create a configuration for `model_name` with default settings
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    /// Default model, caching files under `cache_dir`
    pub fn default_with_path<P: AsRef<Path>>(cache_dir: P) -> Self {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Set the batch size for embedding generation (builder style)
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    /// Set whether to normalize embeddings (builder style)
    pub fn with_normalize(self, normalize: bool) -> Self {
        Self { normalize, ..self }
    }

    /// Get the model name
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Resolve the configured name to one of fastembed's bundled models.
    pub fn fastembed_model(&self) -> Result<EmbeddingModel> {
        let normalized = self
            .model_name
            .trim()
            .trim_start_matches("sentence-transformers/")
            .to_lowercase();
        match normalized.as_str() {
            "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
            "all-minilm-l12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
            "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
            "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
            "snowflake-arctic-embed-xs" => Ok(EmbeddingModel::SnowflakeArcticEmbedXS),
            _ => Err(EmbedError::invalid_config(format!(
                "Unsupported embedding model: {}",
                self.model_name
            ))),
        }
    }

    /// Validate settings that cannot be checked by the type system
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EmbedError::invalid_config("batch_size must be at least 1"));
        }
        self.fastembed_model()?;
        tracing::debug!("Embedding config valid for: {}", self.model_name);
        Ok(())
    }
}
