//! # qarag-embed
//!
//! Text embeddings for the QA retrieval pipeline. Vectors are produced
//! locally from ONNX models through FastEmbed, stored as normalized
//! half-precision floats, and compared with cosine similarity.
//!
//! ## Quick Start
//!
//! ```no_run
//! use qarag_embed::{EmbedConfig, EmbeddingProvider, FastEmbedProvider};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let provider = FastEmbedProvider::create(EmbedConfig::default()).await?;
//!
//! let texts = vec!["Apply the coupon".to_string(), "Pay with card".to_string()];
//! let result = provider.embed_texts(&texts).await?;
//!
//! println!("Generated {} embeddings of dimension {}", result.len(), result.dimension);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: model selection and batching
//! - [`provider`]: the [`EmbeddingProvider`] trait and the FastEmbed implementation
//! - [`similarity`]: cosine similarity and normalization
//! - [`error`]: error types
//!
//! Models are cached process-wide so that several providers built from the
//! same configuration share one loaded ONNX session.

pub mod config;
pub mod error;
pub mod provider;
pub mod similarity;

// Re-export main types for easy access
pub use config::{DEFAULT_EMBED_MODEL, EmbedConfig};
pub use error::{EmbedError, Result};
pub use provider::{EmbeddingProvider, EmbeddingResult, FastEmbedProvider};
pub use similarity::cosine_similarity;
