//! Embedding provider implementations

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use crate::similarity::{normalize, to_f16};
use async_trait::async_trait;
use fastembed::{InitOptions, TextEmbedding};
use fnv::FnvHasher;
use half::f16;
use std::collections::HashMap;
use std::hash::Hasher;
use std::sync::{Arc, Mutex, OnceLock};

/// Result of embedding generation
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    /// The generated embeddings, one per input text
    pub embeddings: Vec<Vec<f16>>,
    /// The dimension of each embedding vector
    pub dimension: usize,
}

impl EmbeddingResult {
    /// Create a new embedding result. The dimension is taken from the first
    /// vector, or 0 when there are none.
    pub fn new(embeddings: Vec<Vec<f16>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// Type alias for cached model entries (model, dimension)
type ModelCacheEntry = (Arc<Mutex<TextEmbedding>>, usize);

/// Global cache for initialized embedding models to avoid reloading
static MODEL_CACHE: OnceLock<Mutex<HashMap<String, ModelCacheEntry>>> = OnceLock::new();

fn get_model_cache() -> &'static Mutex<HashMap<String, ModelCacheEntry>> {
    MODEL_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

fn lock_cache() -> std::sync::MutexGuard<'static, HashMap<String, ModelCacheEntry>> {
    get_model_cache()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Trait for embedding providers that can generate embeddings from text
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a single text
    async fn embed_text(&self, text: &str) -> Result<Vec<f16>> {
        let result = self.embed_texts(&[text.to_string()]).await?;
        result
            .embeddings
            .into_iter()
            .next()
            .ok_or(EmbedError::CountMismatch {
                expected: 1,
                actual: 0,
            })
    }

    /// Generate embeddings for multiple texts (batch processing)
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult>;

    /// Get the dimension of embeddings produced by this provider
    fn embedding_dimension(&self) -> usize;

    /// Get the name/identifier of this provider
    fn provider_name(&self) -> &str;
}

/// FastEmbed-based embedding provider using local ONNX models
#[derive(Clone)]
pub struct FastEmbedProvider {
    config: EmbedConfig,
    model: Option<Arc<Mutex<TextEmbedding>>>,
    dimension: usize,
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("config", &self.config)
            .field("model", &self.model.is_some())
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl FastEmbedProvider {
    /// Creates a new uninitialized provider. Call [`initialize`](Self::initialize)
    /// or use [`create`](Self::create) before embedding.
    pub fn new(config: EmbedConfig) -> Self {
        Self {
            config,
            model: None,
            dimension: 384, // all-MiniLM-L6-v2
        }
    }

    /// Loads the embedding model, reusing a cached instance when one exists.
    pub async fn initialize(&mut self) -> Result<()> {
        self.config.validate()?;
        tracing::info!(
            "Initializing FastEmbed provider for model: {}",
            self.config.model_name()
        );

        let cache_key = self.create_cache_key()?;

        let cached_data = {
            let cache = lock_cache();
            cache
                .get(&cache_key)
                .map(|(model, dim)| (Arc::clone(model), *dim))
        };

        if let Some((cached_model, cached_dimension)) = cached_data {
            tracing::info!("Using cached model for: {}", self.config.model_name());
            self.model = Some(cached_model);
            self.dimension = cached_dimension;
            return self.validate_model().await;
        }

        // Load model in a blocking task
        let config = self.config.clone();
        let (model, dimension) =
            tokio::task::spawn_blocking(move || -> Result<(TextEmbedding, usize)> {
                tracing::info!("Loading embedding model: {}", config.model_name());

                let init_options = InitOptions::new(config.fastembed_model()?)
                    .with_cache_dir(config.cache_dir.clone())
                    .with_show_download_progress(config.show_download_progress);

                let mut model =
                    TextEmbedding::try_new(init_options).map_err(EmbedError::model_init)?;

                // Dimension comes from one sample embedding
                let sample = model
                    .embed(vec!["dimension".to_string()], None)
                    .map_err(EmbedError::model_init)?;
                let dimension = sample.first().map(|emb| emb.len()).unwrap_or(384);

                tracing::info!("Model loaded successfully. Dimension: {}", dimension);
                Ok((model, dimension))
            })
            .await??;

        let model_arc = Arc::new(Mutex::new(model));
        lock_cache().insert(cache_key, (Arc::clone(&model_arc), dimension));

        self.model = Some(model_arc);
        self.dimension = dimension;

        self.validate_model().await
    }

    /// Creates and initializes a provider in one step.
    pub async fn create(config: EmbedConfig) -> Result<Self> {
        let mut provider = Self::new(config);
        provider.initialize().await?;
        Ok(provider)
    }

    pub fn config(&self) -> &EmbedConfig {
        &self.config
    }

    /// Cache key derived from the model-affecting parts of the configuration
    fn create_cache_key(&self) -> Result<String> {
        let key_material = serde_json::to_string(&(
            &self.config.model_name,
            &self.config.cache_dir,
        ))
        .map_err(|e| EmbedError::External { source: e.into() })?;

        let mut hasher = FnvHasher::default();
        hasher.write(b"v1:");
        hasher.write(key_material.as_bytes());

        Ok(format!("v1:{:x}", hasher.finish()))
    }

    /// Validate that the model produces finite vectors of the expected size
    async fn validate_model(&self) -> Result<()> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| EmbedError::invalid_config("Model not initialized"))?;

        let model_clone = Arc::clone(model);
        let validation_result = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
            let mut model_guard = model_clone
                .lock()
                .map_err(|_| EmbedError::invalid_config("Embedding model lock poisoned"))?;
            model_guard
                .embed(vec!["validation test".to_string()], None)
                .map_err(EmbedError::model_init)
        })
        .await??;

        let embedding = validation_result.first().ok_or_else(|| {
            EmbedError::invalid_config("Model validation failed: no embeddings generated")
        })?;

        if embedding.len() != self.dimension {
            return Err(EmbedError::invalid_config(format!(
                "Model validation failed: expected dimension {}, got {}",
                self.dimension,
                embedding.len()
            )));
        }

        if embedding.iter().any(|value| !value.is_finite()) {
            return Err(EmbedError::invalid_config(
                "Model validation failed: non-finite values in embedding",
            ));
        }

        tracing::debug!("Model validation passed for: {}", self.config.model_name());
        Ok(())
    }

    /// Clears the global model cache.
    pub fn clear_cache() {
        lock_cache().clear();
        tracing::info!("Model cache cleared");
    }

    /// Returns the number of cached models.
    pub fn cache_size() -> usize {
        lock_cache().len()
    }

    fn convert_to_f16(&self, embeddings: Vec<Vec<f32>>) -> Vec<Vec<f16>> {
        embeddings
            .into_iter()
            .map(|embedding| {
                let mut converted = to_f16(&embedding);
                if self.config.normalize {
                    normalize(&mut converted);
                }
                converted
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        let model = self.model.as_ref().ok_or_else(|| {
            EmbedError::invalid_config("Model not initialized. Call initialize() first.")
        })?;

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size.max(1)) {
            let batch = batch.to_vec();
            let model_clone = Arc::clone(model);

            let batch_embeddings = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
                tracing::debug!("Processing batch of {} texts", batch.len());

                let mut model_guard = model_clone
                    .lock()
                    .map_err(|_| EmbedError::invalid_config("Embedding model lock poisoned"))?;
                model_guard
                    .embed(batch, None)
                    .map_err(EmbedError::embedding_gen)
            })
            .await??;

            all_embeddings.extend(self.convert_to_f16(batch_embeddings));
        }

        if all_embeddings.len() != texts.len() {
            return Err(EmbedError::CountMismatch {
                expected: texts.len(),
                actual: all_embeddings.len(),
            });
        }

        tracing::debug!("Generated {} embeddings", all_embeddings.len());
        Ok(EmbeddingResult::new(all_embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "fastembed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;

    #[test]
    fn test_embedding_result() {
        let embeddings = vec![
            vec![f16::from_f32(0.1), f16::from_f32(0.2), f16::from_f32(0.3)],
            vec![f16::from_f32(0.4), f16::from_f32(0.5), f16::from_f32(0.6)],
        ];
        let result = EmbeddingResult::new(embeddings);

        assert_eq!(result.len(), 2);
        assert_eq!(result.dimension, 3);
        assert!(!result.is_empty());
        assert_eq!(EmbeddingResult::new(vec![]).dimension, 0);
    }

    #[test]
    fn test_fastembed_provider_creation() {
        let provider = FastEmbedProvider::new(EmbedConfig::default());

        assert_eq!(provider.provider_name(), "fastembed");
        assert_eq!(provider.embedding_dimension(), 384);
    }

    #[tokio::test]
    async fn test_uninitialized_provider_errors() {
        let provider = FastEmbedProvider::new(EmbedConfig::default());

        let empty = provider.embed_texts(&[]).await.unwrap();
        assert!(empty.is_empty());

        let err = provider.embed_text("hello").await.unwrap_err();
        assert!(matches!(err, EmbedError::InvalidConfig { .. }));
    }

    #[tokio::test]
    async fn test_unknown_model_fails_initialization() {
        let result = FastEmbedProvider::create(EmbedConfig::new("not-a-model")).await;
        assert!(matches!(result, Err(EmbedError::InvalidConfig { .. })));
    }

    #[test]
    fn test_cache_key_generation() {
        let key1 = FastEmbedProvider::new(EmbedConfig::default())
            .create_cache_key()
            .unwrap();
        let key2 = FastEmbedProvider::new(EmbedConfig::default().with_batch_size(4))
            .create_cache_key()
            .unwrap();
        let key3 = FastEmbedProvider::new(EmbedConfig::new("bge-small-en-v1.5"))
            .create_cache_key()
            .unwrap();

        assert!(key1.starts_with("v1:"));
        assert_eq!(key1, key2, "batch size does not change the loaded model");
        assert_ne!(key1, key3, "different models need different cache slots");
    }

    #[tokio::test]
    #[ignore] // Downloads all-MiniLM-L6-v2 - run with: cargo test -p qarag-embed -- --ignored
    async fn test_minilm_download_and_embedding() -> Result<()> {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .try_init()
            .ok();

        let temp_dir = tempfile::tempdir()?;
        let provider = FastEmbedProvider::create(EmbedConfig::default_with_path(temp_dir.path()))
            .await?;
        assert_eq!(provider.embedding_dimension(), 384);

        let texts = vec![
            "Apply a discount code at checkout.".to_string(),
            "Coupons reduce the order total during payment.".to_string(),
            "The weather in the mountains was cold.".to_string(),
        ];
        let result = provider.embed_texts(&texts).await?;
        assert_eq!(result.len(), 3);

        let related = cosine_similarity(&result.embeddings[0], &result.embeddings[1]);
        let unrelated = cosine_similarity(&result.embeddings[0], &result.embeddings[2]);
        assert!(related > unrelated, "{related} <= {unrelated}");

        FastEmbedProvider::clear_cache();
        assert_eq!(FastEmbedProvider::cache_size(), 0);
        Ok(())
    }
}
