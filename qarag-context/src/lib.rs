//! # qarag-context
//!
//! Text handling for the QA retrieval pipeline: splitting documents into
//! overlapping word windows, sentence splitting and safe truncation for
//! context budgets, and recovery of JSON or code payloads from model output.

pub mod output;
pub mod text;

// Re-export the pieces the other crates reach for
pub use output::{extract_json_span, strip_code_fence};
pub use text::{
    ChunkConfig, ChunkError, TextChunk, WordWindowChunker, chunk_text, non_whitespace_len,
    split_sentences, truncate_chars,
};
