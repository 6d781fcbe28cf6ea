//! Context budget ladder.
//!
//! Aggregated retrieval context is cut to each budget of a descending ladder
//! in turn. When a cut leaves almost no visible text, the extractive
//! summarizer produces the context for that budget instead.

use crate::summarizer::{DEFAULT_SENTENCE_LIMIT, ExtractiveSummarizer};
use qarag_context::{non_whitespace_len, truncate_chars};
use qarag_embed::Result;
use serde::{Deserialize, Serialize};

/// Character budgets tried in order.
pub const DEFAULT_BUDGET_LADDER: [usize; 3] = [2000, 1000, 500];

/// Cuts with fewer visible characters than this are summarized instead.
pub const DEFAULT_NEAR_EMPTY_THRESHOLD: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Descending character budgets
    pub ladder: Vec<usize>,
    /// Minimum non-whitespace characters a plain cut must keep
    pub near_empty_threshold: usize,
    /// Candidate sentences for the summarizer fallback
    pub sentence_limit: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            ladder: DEFAULT_BUDGET_LADDER.to_vec(),
            near_empty_threshold: DEFAULT_NEAR_EMPTY_THRESHOLD,
            sentence_limit: DEFAULT_SENTENCE_LIMIT,
        }
    }
}

/// Context produced for one budget of the ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetedContext {
    pub budget: usize,
    pub text: String,
    /// Whether the summarizer replaced the plain cut
    pub summarized: bool,
}

#[derive(Clone)]
pub struct ContextBudgeter {
    config: BudgetConfig,
    summarizer: ExtractiveSummarizer,
}

impl ContextBudgeter {
    pub fn new(config: BudgetConfig, summarizer: ExtractiveSummarizer) -> Self {
        let summarizer = summarizer.with_sentence_limit(config.sentence_limit);
        Self { config, summarizer }
    }

    pub fn ladder(&self) -> &[usize] {
        &self.config.ladder
    }

    /// Builds the context for a single budget.
    pub async fn build_context(&self, aggregated: &str, budget: usize) -> Result<BudgetedContext> {
        let cut = truncate_chars(aggregated, budget);
        if non_whitespace_len(cut) >= self.config.near_empty_threshold {
            return Ok(BudgetedContext {
                budget,
                text: cut.to_string(),
                summarized: false,
            });
        }

        tracing::debug!(
            "Context cut at {} chars is near-empty, summarizing instead",
            budget
        );
        Ok(BudgetedContext {
            budget,
            text: self.summarizer.summarize(aggregated, budget).await?,
            summarized: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use half::f16;
    use qarag_embed::{EmbeddingProvider, EmbeddingResult};
    use std::sync::Arc;

    struct ConstantEmbedder;

    #[async_trait]
    impl EmbeddingProvider for ConstantEmbedder {
        async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
            Ok(EmbeddingResult::new(
                texts.iter().map(|_| vec![f16::ONE, f16::ZERO]).collect(),
            ))
        }

        fn embedding_dimension(&self) -> usize {
            2
        }

        fn provider_name(&self) -> &str {
            "constant"
        }
    }

    fn budgeter() -> ContextBudgeter {
        ContextBudgeter::new(
            BudgetConfig::default(),
            ExtractiveSummarizer::new(Arc::new(ConstantEmbedder)),
        )
    }

    async fn every_budget(text: &str) -> Vec<BudgetedContext> {
        let budgeter = budgeter();
        let mut contexts = Vec::new();
        for &budget in budgeter.ladder() {
            contexts.push(budgeter.build_context(text, budget).await.unwrap());
        }
        contexts
    }

    #[tokio::test]
    async fn test_short_context_passes_unchanged() {
        let text = "### Source: a.txt\nCoupons apply before tax.\n\n";
        let contexts = every_budget(text).await;

        assert_eq!(contexts.len(), 3);
        for (context, budget) in contexts.iter().zip([2000, 1000, 500]) {
            assert_eq!(context.budget, budget);
            assert_eq!(context.text, text);
            assert!(!context.summarized);
        }
    }

    #[tokio::test]
    async fn test_long_context_is_cut_per_budget() {
        let text = "x".repeat(5000);
        let contexts = every_budget(&text).await;
        let lengths: Vec<usize> = contexts.iter().map(|c| c.text.len()).collect();
        assert_eq!(lengths, vec![2000, 1000, 500]);
    }

    #[tokio::test]
    async fn test_near_empty_context_is_summarized_at_every_step() {
        let text = "Pay. Ship";
        assert_eq!(text.len(), 9);

        let contexts = every_budget(text).await;
        for context in &contexts {
            assert!(context.summarized);
            assert_eq!(context.text, "Pay. Ship");
        }
    }

    #[tokio::test]
    async fn test_empty_context_summarizes_to_empty() {
        let context = budgeter().build_context("", 500).await.unwrap();
        assert!(context.summarized);
        assert_eq!(context.text, "");
    }
}
