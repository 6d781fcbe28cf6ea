//! Pipeline configuration
//!
//! Every setting has a built-in default. An optional TOML file may override
//! any subset of them; the model credential never lives here.
//!
//! ```toml
//! top_k = 4
//!
//! [store]
//! dir = "/var/lib/qarag"
//!
//! [budget]
//! ladder = [3000, 1500, 500]
//!
//! [invoker]
//! preferred_models = ["gemini-1.5-pro"]
//! ```

use anyhow::Context;
use qarag_context::ChunkConfig;
use qarag_embed::EmbedConfig;
use qarag_llm::InvokerConfig;
use qarag_retriever::budget::BudgetConfig;
use qarag_retriever::retrieval::DEFAULT_TOP_K;
use qarag_retriever::storage::sqlite_store::DEFAULT_COLLECTION;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the vector collection lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub dir: PathBuf,
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("chroma_db"),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

/// Limits for automation script generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Characters of uploaded HTML kept before parsing
    pub max_html_chars: usize,
    /// Characters of HTML quoted in the prompt
    pub prompt_html_chars: usize,
    /// Selector candidates extracted from the page
    pub selector_cap: usize,
    /// Selector candidates quoted in the prompt
    pub prompt_selector_cap: usize,
    /// Chunks retrieved as supporting documentation
    pub supplementary_top_k: usize,
    /// Characters of supporting documentation quoted in the prompt
    pub supplementary_chars: usize,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            max_html_chars: 3000,
            prompt_html_chars: 2500,
            selector_cap: 150,
            prompt_selector_cap: 100,
            supplementary_top_k: 2,
            supplementary_chars: 2000,
        }
    }
}

/// Everything the pipeline needs apart from the model credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub chunk: ChunkConfig,
    pub embed: EmbedConfig,
    pub store: StoreConfig,
    pub budget: BudgetConfig,
    pub invoker: InvokerConfig,
    pub script: ScriptConfig,
    /// Chunks retrieved for test generation when the request does not say
    pub top_k: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk: ChunkConfig::default(),
            embed: EmbedConfig::default(),
            store: StoreConfig::default(),
            budget: BudgetConfig::default(),
            invoker: InvokerConfig::default(),
            script: ScriptConfig::default(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl PipelineConfig {
    /// Loads overrides from a TOML file, or the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                Self::from_toml(&raw)
                    .with_context(|| format!("invalid config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.chunk.validate()?;
        self.embed.validate()?;
        if self.budget.ladder.is_empty() {
            anyhow::bail!("budget ladder must contain at least one budget");
        }
        if self.invoker.max_retries == 0 {
            anyhow::bail!("invoker.max_retries must be at least 1");
        }
        Ok(())
    }
}
