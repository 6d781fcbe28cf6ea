//! The assembled pipeline shared by every request

use crate::config::PipelineConfig;
use crate::generator::TestCaseGenerator;
use crate::script::ScriptGenerator;
use qarag_context::WordWindowChunker;
use qarag_embed::EmbeddingProvider;
use qarag_llm::ResilientInvoker;
use qarag_retriever::budget::ContextBudgeter;
use qarag_retriever::ingest::Ingestor;
use qarag_retriever::retrieval::RetrievalGateway;
use qarag_retriever::storage::VectorStore;
use qarag_retriever::summarizer::ExtractiveSummarizer;
use serde::Serialize;
use std::sync::Arc;

/// Collection and model state reported by the health check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineStatus {
    pub status: &'static str,
    pub stored_chunks: usize,
    pub documents: usize,
    pub embedding_model: String,
    pub llm_models: Vec<String>,
}

/// Ingestion, test generation and script generation over one store.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    ingestor: Ingestor,
    tests: TestCaseGenerator,
    scripts: ScriptGenerator,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    invoker: Arc<ResilientInvoker>,
}

impl Pipeline {
    /// Wires the components together. Fails only on invalid chunking settings.
    pub fn new(
        config: PipelineConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        invoker: ResilientInvoker,
    ) -> anyhow::Result<Self> {
        let chunker = WordWindowChunker::new(config.chunk)?;
        let invoker = Arc::new(invoker);
        let gateway = RetrievalGateway::new(embedder.clone(), store.clone());
        let budgeter = ContextBudgeter::new(
            config.budget.clone(),
            ExtractiveSummarizer::new(embedder.clone()),
        );

        Ok(Self {
            ingestor: Ingestor::new(chunker, embedder.clone(), store.clone()),
            tests: TestCaseGenerator::new(gateway.clone(), budgeter, invoker.clone()),
            scripts: ScriptGenerator::new(gateway, invoker.clone(), config.script.clone()),
            config: Arc::new(config),
            store,
            embedder,
            invoker,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    pub fn test_generator(&self) -> &TestCaseGenerator {
        &self.tests
    }

    pub fn script_generator(&self) -> &ScriptGenerator {
        &self.scripts
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub async fn status(&self) -> anyhow::Result<PipelineStatus> {
        Ok(PipelineStatus {
            status: "ok",
            stored_chunks: self.store.count().await?,
            documents: self.store.documents().await?.len(),
            embedding_model: self.embedder.provider_name().to_string(),
            llm_models: self.invoker.models().to_vec(),
        })
    }
}
