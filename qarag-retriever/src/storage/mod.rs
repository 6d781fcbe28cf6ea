//! Storage abstraction for the document collection
//!
//! The pipeline treats the vector store as an opaque service with two
//! operations: add a batch of embedded chunks, and query the `k` chunks
//! nearest to a vector. [`VectorStore`] captures that contract so the
//! retrieval code does not depend on how vectors are indexed.
//!
//! ## Key Components
//!
//! - **VectorStore**: batch add and nearest-neighbour query
//! - **ChunkRecord**: one embedded chunk as handed to the store
//! - **ScoredChunk**: one query hit with its cosine similarity
//!
//! ```text
//! Ingestor ──add──▶ VectorStore ◀──query── RetrievalGateway
//!                        │
//!                  SqliteVectorStore
//! ```
//!
//! Implementations must make [`VectorStore::add`] atomic: either every
//! record of the batch becomes visible or none does.

use anyhow::Result;
use async_trait::async_trait;
use half::f16;
use serde::{Deserialize, Serialize};

pub mod sqlite_store;

/// Metadata stored alongside each chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// File name of the document the chunk came from
    pub source_document: String,
    /// 0-based position of the chunk within its document
    pub chunk_index: usize,
}

/// An embedded chunk ready to be written to the store.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f16>,
}

/// A chunk returned by a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Cosine similarity to the query vector, in `[-1, 1]`
    pub similarity: f32,
}

/// Per-document chunk counts for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub source_document: String,
    pub chunks: usize,
}

/// Nearest-neighbour storage for embedded chunks.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Stores a batch of chunks atomically and returns how many were written.
    ///
    /// Re-adding a document replaces all of its previously stored chunks.
    async fn add(&self, records: Vec<ChunkRecord>) -> Result<usize>;

    /// Returns up to `k` chunks ordered by cosine similarity, highest first.
    async fn query(&self, embedding: &[f16], k: usize) -> Result<Vec<ScoredChunk>>;

    /// Number of chunks in the collection.
    async fn count(&self) -> Result<usize>;

    /// Documents in the collection with their chunk counts, by name.
    async fn documents(&self) -> Result<Vec<DocumentSummary>>;
}
