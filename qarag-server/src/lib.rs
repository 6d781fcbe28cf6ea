//! # qarag-server
//!
//! An HTTP service that turns uploaded product documentation into QA test
//! cases and Selenium scripts. It builds on the other qarag crates:
//! - [`qarag_context`] for chunking and model output recovery
//! - [`qarag_embed`] for sentence embeddings
//! - [`qarag_retriever`] for the persisted collection, retrieval and context budgeting
//! - [`qarag_llm`] for resilient Gemini calls
//!
//! ## Endpoints
//!
//! | method | path | input | output |
//! |--------|------|-------|--------|
//! | POST | `/build_kb` | multipart `files` | `{status, stored_chunks}` |
//! | POST | `/generate_tests` | form `user_prompt`, `top_k` | `{llm, parsed, parsed_count}` or `{llm, error}` |
//! | POST | `/generate_selenium` | multipart `test_case_json`, `checkout_html` | `{selenium_script}` |
//! | GET | `/health` | | `{status, stored_chunks, ...}` |
//!
//! ## Quick Start
//!
//! ```bash
//! export GEMINI_API_KEY=...
//! qarag-server --bind 127.0.0.1:8000
//! curl -F files=@discount_policy.pdf http://127.0.0.1:8000/build_kb
//! curl -d user_prompt="discount codes" -d top_k=3 http://127.0.0.1:8000/generate_tests
//! ```
//!
//! ```no_run
//! use qarag_server::{PipelineConfig, ServerOptions, run_server};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let options = ServerOptions {
//!     bind: "127.0.0.1:8000".parse()?,
//!     api_key: std::env::var("GEMINI_API_KEY")?,
//!     config: PipelineConfig::default(),
//! };
//! run_server(options).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod generator;
pub mod http;
pub mod pipeline;
pub mod prompts;
pub mod script;
pub mod selectors;
pub mod test_case;

pub use config::PipelineConfig;
pub use pipeline::Pipeline;

use qarag_embed::FastEmbedProvider;
use qarag_llm::{GeminiClient, ResilientInvoker};
use qarag_retriever::storage::sqlite_store::SqliteVectorStore;
use std::net::SocketAddr;
use std::sync::Arc;

/// Everything needed to start the service.
#[derive(Clone)]
pub struct ServerOptions {
    pub bind: SocketAddr,
    pub api_key: String,
    pub config: PipelineConfig,
}

impl std::fmt::Debug for ServerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerOptions")
            .field("bind", &self.bind)
            .field("api_key", &"<redacted>")
            .field("config", &self.config)
            .finish()
    }
}

/// Loads the embedding model, opens the collection, resolves the model list
/// and serves the HTTP endpoints until the process is stopped.
pub async fn run_server(options: ServerOptions) -> anyhow::Result<()> {
    let ServerOptions {
        bind,
        api_key,
        config,
    } = options;
    config.validate()?;

    tracing::info!("Loading embedding model {}", config.embed.model_name);
    let embedder = Arc::new(FastEmbedProvider::create(config.embed.clone()).await?);

    let store =
        Arc::new(SqliteVectorStore::open(&config.store.dir, &config.store.collection).await?);
    tracing::info!(
        "Opened collection '{}' in {}",
        config.store.collection,
        config.store.dir.display()
    );

    let client = Arc::new(GeminiClient::new(api_key)?);
    let invoker = ResilientInvoker::discover(client, config.invoker.clone()).await;
    tracing::info!("Using models: {}", invoker.models().join(", "));

    let pipeline = Pipeline::new(config, embedder, store, invoker)?;
    http::serve(bind, http::router(pipeline)).await
}
