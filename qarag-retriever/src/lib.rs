//! qarag-retriever: knowledge base storage and context preparation
//!
//! This crate turns uploaded product documentation into a persistent,
//! searchable collection of embedded chunks and prepares retrieved text for
//! prompting: ranked retrieval, extractive summarization and the shrinking
//! context budget ladder.
//!
//! ## Key Modules
//!
//! - **[`ingest`]**: format detection, text extraction and atomic batch ingestion
//! - **[`storage`]**: vector store abstraction with a SQLite implementation
//! - **[`retrieval`]**: embed a query and fetch its nearest chunks
//! - **[`summarizer`]**: sentence ranking by similarity to the whole text
//! - **[`budget`]**: the context budget ladder with summarizer fallback
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use qarag_context::WordWindowChunker;
//! use qarag_embed::{EmbedConfig, FastEmbedProvider};
//! use qarag_retriever::{
//!     ingest::{Ingestor, UploadedDocument},
//!     retrieval::RetrievalGateway,
//!     storage::sqlite_store::SqliteVectorStore,
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let embedder = Arc::new(FastEmbedProvider::create(EmbedConfig::default()).await?);
//! let store = Arc::new(SqliteVectorStore::open(Path::new("chroma_db"), "docs").await?);
//!
//! let ingestor = Ingestor::new(WordWindowChunker::default(), embedder.clone(), store.clone());
//! ingestor
//!     .ingest(vec![UploadedDocument::new("rules.txt", "Coupons apply before tax.")])
//!     .await?;
//!
//! let gateway = RetrievalGateway::new(embedder, store);
//! let result = gateway.retrieve("How are coupons applied?", 3).await?;
//! println!("{}", result.to_context_block());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Uploads → extract_text → Chunker → Embeddings → SQLite Storage
//!                                                     ↓
//! Prompt ← ContextBudgeter ← RetrievalResult ← RetrievalGateway
//!                ↑
//!       ExtractiveSummarizer
//! ```

pub mod budget;
pub mod ingest;
pub mod retrieval;
pub mod storage;
pub mod summarizer;
