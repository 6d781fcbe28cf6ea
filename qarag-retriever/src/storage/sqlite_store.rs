//! SQLite implementation of [`VectorStore`]
//!
//! One database file holds any number of named collections. Each collection
//! records the cosine space it was created with and the embedding dimension
//! fixed by its first batch. Similarity search is an in-memory scan over the
//! collection's vectors.
//!
//! ## Database Schema
//!
//! ```sql
//! CREATE TABLE collections (
//!     name TEXT PRIMARY KEY,
//!     space TEXT NOT NULL,             -- always 'cosine'
//!     dimension INTEGER,               -- set by the first stored batch
//!     created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
//! );
//!
//! CREATE TABLE chunks (
//!     collection TEXT NOT NULL REFERENCES collections(name),
//!     id TEXT NOT NULL,                -- "{filename}_chunk_{index}"
//!     source_document TEXT NOT NULL,
//!     chunk_index INTEGER NOT NULL,
//!     content TEXT NOT NULL,
//!     embedding BLOB NOT NULL,         -- little-endian f16 values
//!     created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
//!     PRIMARY KEY (collection, id)
//! );
//! ```

use super::{ChunkMetadata, ChunkRecord, DocumentSummary, ScoredChunk, VectorStore};
use anyhow::{Result, bail};
use async_trait::async_trait;
use half::f16;
use qarag_embed::cosine_similarity;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeSet;
use std::path::Path;

/// File name of the database inside the store directory.
pub const DATABASE_FILE: &str = "qarag.db";

/// Collection used when none is configured.
pub const DEFAULT_COLLECTION: &str = "docs";

/// SQLite-backed vector collection.
#[derive(Clone, Debug)]
pub struct SqliteVectorStore {
    pool: SqlitePool,
    collection: String,
}

impl SqliteVectorStore {
    /// Opens (creating if needed) the store under `dir` and the named collection.
    pub async fn open(dir: &Path, collection: &str) -> Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let db_path = dir.join(DATABASE_FILE);

        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(&db_path)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .foreign_keys(true)
                .create_if_missing(true),
        )
        .await?;

        tracing::info!(
            "Opened vector store at {} (collection '{}')",
            db_path.display(),
            collection
        );
        Self::new_with_pool(pool, collection).await
    }

    /// Opens an in-memory store for testing.
    pub async fn open_memory(collection: &str) -> Result<Self> {
        // A single long-lived connection keeps the in-memory database alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(
                SqliteConnectOptions::new()
                    .in_memory(true)
                    .foreign_keys(true),
            )
            .await?;
        Self::new_with_pool(pool, collection).await
    }

    async fn new_with_pool(pool: SqlitePool, collection: &str) -> Result<Self> {
        Self::create_tables(&pool).await?;

        sqlx::query("INSERT OR IGNORE INTO collections (name, space) VALUES (?1, 'cosine')")
            .bind(collection)
            .execute(&pool)
            .await?;

        Ok(Self {
            pool,
            collection: collection.to_string(),
        })
    }

    async fn create_tables(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                space TEXT NOT NULL,
                dimension INTEGER,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                source_document TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (collection, id),
                FOREIGN KEY (collection) REFERENCES collections(name) ON DELETE CASCADE
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(collection, source_document)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Embedding dimension fixed by the first stored batch, if any.
    pub async fn dimension(&self) -> Result<Option<usize>> {
        let dimension: Option<i64> =
            sqlx::query_scalar("SELECT dimension FROM collections WHERE name = ?1")
                .bind(&self.collection)
                .fetch_optional(&self.pool)
                .await?
                .flatten();
        Ok(dimension.map(|d| d as usize))
    }
}

fn encode_embedding(embedding: &[f16]) -> Vec<u8> {
    embedding.iter().flat_map(|value| value.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Vec<f16> {
    bytes
        .chunks_exact(2)
        .map(|pair| f16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn add(&self, records: Vec<ChunkRecord>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let dimension = records[0].embedding.len();
        if dimension == 0 {
            bail!("Refusing to store chunk '{}' with an empty embedding", records[0].id);
        }
        if let Some(bad) = records.iter().find(|r| r.embedding.len() != dimension) {
            bail!(
                "Chunk '{}' has dimension {}, batch uses {}",
                bad.id,
                bad.embedding.len(),
                dimension
            );
        }
        if let Some(existing) = self.dimension().await? {
            if existing != dimension {
                bail!(
                    "Collection '{}' stores {}-dimensional vectors, batch has {}",
                    self.collection,
                    existing,
                    dimension
                );
            }
        }

        let documents: BTreeSet<&str> = records
            .iter()
            .map(|r| r.metadata.source_document.as_str())
            .collect();

        let mut tx = self.pool.begin().await?;

        for document in &documents {
            sqlx::query("DELETE FROM chunks WHERE collection = ?1 AND source_document = ?2")
                .bind(&self.collection)
                .bind(*document)
                .execute(&mut *tx)
                .await?;
        }

        for record in &records {
            sqlx::query(
                r#"
                INSERT INTO chunks (collection, id, source_document, chunk_index, content, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(collection, id) DO UPDATE SET
                    source_document = excluded.source_document,
                    chunk_index = excluded.chunk_index,
                    content = excluded.content,
                    embedding = excluded.embedding
                "#,
            )
            .bind(&self.collection)
            .bind(&record.id)
            .bind(&record.metadata.source_document)
            .bind(record.metadata.chunk_index as i64)
            .bind(&record.text)
            .bind(encode_embedding(&record.embedding))
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE collections SET dimension = ?1 WHERE name = ?2 AND dimension IS NULL")
            .bind(dimension as i64)
            .bind(&self.collection)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            "Stored {} chunks from {} documents in '{}'",
            records.len(),
            documents.len(),
            self.collection
        );
        Ok(records.len())
    }

    async fn query(&self, embedding: &[f16], k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT id, source_document, chunk_index, content, embedding
             FROM chunks WHERE collection = ?1",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in rows {
            let stored: Vec<u8> = row.get("embedding");
            let chunk_index: i64 = row.get("chunk_index");
            scored.push(ScoredChunk {
                id: row.get("id"),
                text: row.get("content"),
                metadata: ChunkMetadata {
                    source_document: row.get("source_document"),
                    chunk_index: chunk_index as usize,
                },
                similarity: cosine_similarity(embedding, &decode_embedding(&stored)),
            });
        }

        // Sort by similarity score (descending), id breaks ties deterministically
        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(k);

        Ok(scored)
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE collection = ?1")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn documents(&self) -> Result<Vec<DocumentSummary>> {
        let rows = sqlx::query(
            "SELECT source_document, COUNT(*) AS chunks FROM chunks
             WHERE collection = ?1 GROUP BY source_document ORDER BY source_document",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let chunks: i64 = row.get("chunks");
                DocumentSummary {
                    source_document: row.get("source_document"),
                    chunks: chunks as usize,
                }
            })
            .collect())
    }
}
