use clap::{Parser, Subcommand};
use qarag_context::{ChunkConfig, WordWindowChunker};
use qarag_embed::{DEFAULT_EMBED_MODEL, EmbedConfig, FastEmbedProvider};
use qarag_retriever::{
    ingest::{Ingestor, UploadedDocument},
    retrieval::{MAX_TOP_K, RetrievalGateway},
    storage::{VectorStore, sqlite_store::SqliteVectorStore},
};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

/// A CLI tool to interact with the qarag knowledge base.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory containing the qarag.db database file
    #[arg(short, long, default_value = "chroma_db", env = "QARAG_STORE_DIR")]
    store_dir: PathBuf,

    /// Collection name inside the database
    #[arg(short, long, default_value = "docs")]
    collection: String,

    /// Embedding model name
    #[arg(long, default_value = DEFAULT_EMBED_MODEL)]
    model: String,

    /// Directory for downloaded embedding models
    #[arg(long, default_value = "models")]
    model_cache: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chunk, embed and store documents
    Ingest {
        /// Files to ingest (PDF, HTML, JSON or text)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Words per chunk
        #[arg(long, default_value_t = qarag_context::text::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        /// Words shared by consecutive chunks
        #[arg(long, default_value_t = qarag_context::text::DEFAULT_CHUNK_OVERLAP)]
        chunk_overlap: usize,
    },
    /// Retrieve the chunks nearest to a query
    Search {
        /// Natural language query
        query: String,
        /// Number of chunks to return
        #[arg(short = 'k', long, default_value_t = 3)]
        top_k: usize,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Show collection statistics
    Stats {
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[derive(Serialize)]
struct CollectionStats {
    collection: String,
    total_chunks: usize,
    documents: Vec<qarag_retriever::storage::DocumentSummary>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn embedder(args: &Args) -> anyhow::Result<Arc<FastEmbedProvider>> {
    let config = EmbedConfig {
        cache_dir: args.model_cache.clone(),
        ..EmbedConfig::new(&args.model)
    };
    Ok(Arc::new(FastEmbedProvider::create(config).await?))
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let store = Arc::new(SqliteVectorStore::open(&args.store_dir, &args.collection).await?);

    match &args.command {
        Commands::Ingest {
            files,
            chunk_size,
            chunk_overlap,
        } => {
            let chunker = WordWindowChunker::new(ChunkConfig::new(*chunk_size, *chunk_overlap))?;
            let ingestor = Ingestor::new(chunker, embedder(&args).await?, store.clone());

            let mut documents = Vec::with_capacity(files.len());
            for path in files {
                let filename = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .ok_or_else(|| anyhow::anyhow!("Not a file: {}", path.display()))?;
                documents.push(UploadedDocument::new(filename, tokio::fs::read(path).await?));
            }

            let report = ingestor.ingest(documents).await?;
            println!(
                "Stored {} chunks from {} documents",
                report.stored_chunks, report.documents
            );
            println!("Collection now holds {} chunks", store.count().await?);
            Ok(())
        }
        Commands::Search {
            query,
            top_k,
            format,
        } => {
            let top_k = (*top_k).clamp(1, MAX_TOP_K);
            let gateway = RetrievalGateway::new(embedder(&args).await?, store);
            let result = gateway.retrieve(query, top_k).await?;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                }
                OutputFormat::Summary => {
                    println!("Found {} similar chunks:", result.len());
                    for chunk in &result.chunks {
                        println!(
                            "  Similarity: {:.3} | Document: {} | Chunk: {}",
                            chunk.similarity,
                            chunk.metadata.source_document,
                            chunk.metadata.chunk_index
                        );
                        println!(
                            "    {}",
                            chunk.text.chars().take(100).collect::<String>()
                        );
                    }
                }
            }
            Ok(())
        }
        Commands::Stats { format } => {
            let stats = CollectionStats {
                collection: args.collection.clone(),
                total_chunks: store.count().await?,
                documents: store.documents().await?,
            };

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                }
                OutputFormat::Summary => {
                    println!("Collection '{}':", stats.collection);
                    println!("  Total chunks: {}", stats.total_chunks);
                    println!("  Documents: {}", stats.documents.len());
                    for document in stats.documents.iter().take(10) {
                        println!("    {} ({} chunks)", document.source_document, document.chunks);
                    }
                    if stats.documents.len() > 10 {
                        println!("    ... and {} more", stats.documents.len() - 10);
                    }
                }
            }
            Ok(())
        }
    }
}
