//! Query-time retrieval: embed a query and fetch its nearest chunks.

use crate::storage::{ChunkMetadata, ScoredChunk, VectorStore};
use qarag_embed::{EmbedError, EmbeddingProvider};
use serde::Serialize;
use std::fmt::Write;
use std::sync::Arc;

/// Number of chunks retrieved when the caller does not say.
pub const DEFAULT_TOP_K: usize = 3;
/// Largest `top_k` a caller may request.
pub const MAX_TOP_K: usize = 8;

/// Clamps a requested `top_k` into `1..=MAX_TOP_K`, using `default` when absent.
pub fn clamp_top_k(requested: Option<i64>, default: usize) -> usize {
    requested
        .unwrap_or(default as i64)
        .clamp(1, MAX_TOP_K as i64) as usize
}

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("Failed to embed query: {0}")]
    Embedding(#[from] EmbedError),

    #[error("Vector store query failed: {0}")]
    Store(#[source] anyhow::Error),
}

/// One retrieved chunk with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub metadata: ChunkMetadata,
    pub similarity: f32,
}

impl From<ScoredChunk> for RetrievedChunk {
    fn from(chunk: ScoredChunk) -> Self {
        Self {
            text: chunk.text,
            metadata: chunk.metadata,
            similarity: chunk.similarity,
        }
    }
}

/// Chunks for one query, most similar first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub chunks: Vec<RetrievedChunk>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Concatenates the chunks, each labelled with its source document.
    ///
    /// Every chunk renders as `### Source: {document}\n{text}\n\n`.
    pub fn to_context_block(&self) -> String {
        let mut block = String::new();
        for chunk in &self.chunks {
            let _ = write!(
                block,
                "### Source: {}\n{}\n\n",
                chunk.metadata.source_document, chunk.text
            );
        }
        block
    }
}

/// Embeds queries and asks the store for their nearest chunks.
#[derive(Clone)]
pub struct RetrievalGateway {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl RetrievalGateway {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Returns the `top_k` chunks nearest to `query`. The store's ranking is kept as is.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<RetrievalResult, RetrievalError> {
        let embedding = self.embedder.embed_text(query).await?;
        let hits = self
            .store
            .query(&embedding, top_k)
            .await
            .map_err(RetrievalError::Store)?;

        tracing::debug!("Retrieved {} of {} requested chunks", hits.len(), top_k);
        Ok(RetrievalResult {
            chunks: hits.into_iter().map(RetrievedChunk::from).collect(),
        })
    }
}
