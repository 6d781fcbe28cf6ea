//! Word-window chunking and small text helpers shared by the ingestion and
//! context-building stages of the pipeline.
//!
//! Documents are split into overlapping windows of whitespace-delimited words.
//! Each window becomes one unit of embedding and retrieval. Consecutive windows
//! share `overlap` words so that a sentence cut at a window boundary is still
//! fully present in at least one chunk.
//!
//! # Example
//!
//! ```
//! use qarag_context::text::{ChunkConfig, WordWindowChunker};
//!
//! let chunker = WordWindowChunker::new(ChunkConfig::new(4, 1)).unwrap();
//! let chunks = chunker.chunk("one two three four five six seven");
//!
//! assert_eq!(chunks, vec!["one two three four", "four five six seven"]);
//! ```
//!
//! A window that reaches the end of the text is always the last one, so a
//! document of `n > size` words yields `ceil((n - overlap) / (size - overlap))`
//! chunks and a document of `1..=size` words yields exactly one.
use serde::{Deserialize, Serialize};

/// Default window size in words.
pub const DEFAULT_CHUNK_SIZE: usize = 350;

/// Default number of words shared by consecutive windows.
pub const DEFAULT_CHUNK_OVERLAP: usize = 80;

/// Errors raised when a chunking configuration cannot make progress.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    /// A zero-word window would never consume input.
    #[error("chunk size must be greater than zero")]
    ZeroSize,

    /// The window would advance by zero or a negative number of words.
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

/// Window geometry for [`WordWindowChunker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    /// Words per window.
    pub size: usize,
    /// Words shared by consecutive windows.
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkConfig {
    pub fn new(size: usize, overlap: usize) -> Self {
        Self { size, overlap }
    }

    /// Checks that the window advances on every step.
    pub fn validate(&self) -> Result<(), ChunkError> {
        if self.size == 0 {
            return Err(ChunkError::ZeroSize);
        }
        if self.overlap >= self.size {
            return Err(ChunkError::OverlapTooLarge {
                size: self.size,
                overlap: self.overlap,
            });
        }
        Ok(())
    }

    /// Number of words the window advances per step.
    pub fn step(&self) -> usize {
        self.size - self.overlap
    }
}

/// A window of words taken from one source document.
///
/// `chunk_index` is the 0-based position of the window among the chunks of
/// `source_document`; indices are gap-free and increasing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// File name of the document the window was taken from.
    pub source_document: String,
    /// Position of this window within the document.
    pub chunk_index: usize,
    /// The words of the window joined by single spaces.
    pub text: String,
}

impl TextChunk {
    /// Stable identifier used as the vector-store key.
    pub fn id(&self) -> String {
        format!("{}_chunk_{}", self.source_document, self.chunk_index)
    }
}

/// Splits text into overlapping word windows.
#[derive(Debug, Clone)]
pub struct WordWindowChunker {
    config: ChunkConfig,
}

impl Default for WordWindowChunker {
    fn default() -> Self {
        Self {
            config: ChunkConfig::default(),
        }
    }
}

impl WordWindowChunker {
    /// Creates a chunker, rejecting configurations that could not advance.
    pub fn new(config: ChunkConfig) -> Result<Self, ChunkError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Returns the windows of `text` in order. Text without words yields no windows.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let size = self.config.size;
        let step = self.config.step();

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + size).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end == words.len() {
                break;
            }
            start += step;
        }
        chunks
    }

    /// Chunks `text` and tags each window with its document and position.
    pub fn chunk_document(&self, source_document: &str, text: &str) -> Vec<TextChunk> {
        self.chunk(text)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, text)| TextChunk {
                source_document: source_document.to_string(),
                chunk_index,
                text,
            })
            .collect()
    }
}

/// One-shot helper around [`WordWindowChunker`].
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>, ChunkError> {
    Ok(WordWindowChunker::new(ChunkConfig::new(size, overlap))?.chunk(text))
}

/// Naive sentence splitter: newlines become spaces, sentences end at `". "`.
///
/// Empty fragments are dropped and the remaining ones are trimmed.
pub fn split_sentences(text: &str) -> Vec<String> {
    text.replace('\n', " ")
        .split(". ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Returns at most `max_chars` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Counts the characters of `text` that are not whitespace.
pub fn non_whitespace_len(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}
