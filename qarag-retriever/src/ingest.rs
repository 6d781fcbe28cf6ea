//! Document ingestion: format detection, text extraction, chunking and
//! embedding of uploaded files into the vector store.

use crate::storage::{ChunkMetadata, ChunkRecord, VectorStore};
use qarag_context::{TextChunk, WordWindowChunker};
use qarag_embed::{EmbedError, EmbeddingProvider};
use serde::Serialize;
use std::sync::Arc;

/// Errors raised while turning uploaded files into stored chunks.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Failed to extract text from '{filename}': {message}")]
    Extraction { filename: String, message: String },

    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("Storage failed: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Formats with dedicated extraction. Anything unrecognised is treated as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Html,
    Json,
    Text,
}

impl DocumentFormat {
    /// Detects the format from the file extension, case-insensitively.
    pub fn from_filename(filename: &str) -> Self {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => Self::Pdf,
            "html" | "htm" => Self::Html,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Extracts plain text from raw file bytes.
///
/// PDFs go through the `pdftotext` binary from poppler. HTML is kept
/// verbatim. JSON is re-indented when it parses and kept raw otherwise.
pub async fn extract_text(
    filename: &str,
    bytes: &[u8],
    format: DocumentFormat,
) -> Result<String, IngestError> {
    match format {
        DocumentFormat::Pdf => extract_pdf_text(filename, bytes).await,
        DocumentFormat::Json => {
            let raw = String::from_utf8_lossy(bytes);
            Ok(match serde_json::from_str::<serde_json::Value>(&raw) {
                Ok(value) => {
                    serde_json::to_string_pretty(&value).unwrap_or_else(|_| raw.to_string())
                }
                Err(_) => raw.into_owned(),
            })
        }
        DocumentFormat::Html | DocumentFormat::Text => {
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

async fn extract_pdf_text(filename: &str, bytes: &[u8]) -> Result<String, IngestError> {
    let temp_file = tempfile::Builder::new()
        .prefix("qarag-upload-")
        .suffix(".pdf")
        .tempfile()?;
    tokio::fs::write(temp_file.path(), bytes).await?;

    let output = tokio::process::Command::new("pdftotext")
        .arg("-layout")
        .arg("-enc")
        .arg("UTF-8")
        .arg(temp_file.path())
        .arg("-")
        .output()
        .await
        .map_err(|e| IngestError::Extraction {
            filename: filename.to_string(),
            message: format!("pdftotext could not be started: {e} (is poppler installed?)"),
        })?;

    if !output.status.success() {
        return Err(IngestError::Extraction {
            filename: filename.to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let text = String::from_utf8_lossy(&output.stdout).into_owned();
    tracing::debug!(
        "pdftotext extracted {} characters from {}",
        text.chars().count(),
        filename
    );
    Ok(text)
}

/// One uploaded file.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// Outcome of one ingestion call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Chunks written to the store by this call
    pub stored_chunks: usize,
    /// Number of files that produced at least one chunk
    pub documents: usize,
}

/// Chunks, embeds and stores uploaded documents.
#[derive(Clone)]
pub struct Ingestor {
    chunker: WordWindowChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl Ingestor {
    pub fn new(
        chunker: WordWindowChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
        }
    }

    /// Ingests every document of one request.
    ///
    /// All chunks of the request are written in a single store batch, so a
    /// failure anywhere leaves the collection untouched.
    pub async fn ingest(
        &self,
        documents: Vec<UploadedDocument>,
    ) -> Result<IngestReport, IngestError> {
        let mut records = Vec::new();
        let mut report = IngestReport::default();

        for document in &documents {
            let format = DocumentFormat::from_filename(&document.filename);
            let text = extract_text(&document.filename, &document.bytes, format).await?;
            let chunks = self.chunker.chunk_document(&document.filename, &text);
            tracing::info!(
                "Chunked {} ({:?}) into {} chunks",
                document.filename,
                format,
                chunks.len()
            );
            if chunks.is_empty() {
                continue;
            }

            records.extend(self.embed_chunks(chunks).await?);
            report.documents += 1;
        }

        if records.is_empty() {
            tracing::warn!("No text found in {} uploaded files", documents.len());
            return Ok(report);
        }

        report.stored_chunks = self
            .store
            .add(records)
            .await
            .map_err(IngestError::Storage)?;
        tracing::info!(
            "Stored {} chunks from {} documents",
            report.stored_chunks,
            report.documents
        );
        Ok(report)
    }

    async fn embed_chunks(&self, chunks: Vec<TextChunk>) -> Result<Vec<ChunkRecord>, IngestError> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let result = self.embedder.embed_texts(&texts).await?;
        if result.len() != chunks.len() {
            return Err(EmbedError::CountMismatch {
                expected: chunks.len(),
                actual: result.len(),
            }
            .into());
        }

        Ok(chunks
            .into_iter()
            .zip(result.embeddings)
            .map(|(chunk, embedding)| ChunkRecord {
                id: chunk.id(),
                text: chunk.text,
                metadata: ChunkMetadata {
                    source_document: chunk.source_document,
                    chunk_index: chunk.chunk_index,
                },
                embedding,
            })
            .collect())
    }
}
