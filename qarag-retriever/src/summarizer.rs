//! Extractive summarization by sentence similarity to the whole text.

use qarag_context::{split_sentences, truncate_chars};
use qarag_embed::{EmbeddingProvider, Result, cosine_similarity};
use std::sync::Arc;

/// Sentences considered when the caller does not say.
pub const DEFAULT_SENTENCE_LIMIT: usize = 30;

const SEPARATOR: &str = ". ";

/// Picks the sentences closest in meaning to the text they come from.
#[derive(Clone)]
pub struct ExtractiveSummarizer {
    embedder: Arc<dyn EmbeddingProvider>,
    sentence_limit: usize,
}

impl ExtractiveSummarizer {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            sentence_limit: DEFAULT_SENTENCE_LIMIT,
        }
    }

    pub fn with_sentence_limit(mut self, sentence_limit: usize) -> Self {
        self.sentence_limit = sentence_limit;
        self
    }

    pub fn sentence_limit(&self) -> usize {
        self.sentence_limit
    }

    /// Summarizes `text` into roughly `max_chars` characters.
    ///
    /// Only the first `sentence_limit` sentences are candidates. They are
    /// ranked by cosine similarity to the embedding of all candidates joined
    /// together and appended in rank order while the joined summary, with
    /// the next sentence and its separator, fits in `max_chars`. The output keeps
    /// rank order, not document order, and ends with `...` when it is shorter
    /// than `text`. Text without sentences is truncated instead.
    pub async fn summarize(&self, text: &str, max_chars: usize) -> Result<String> {
        let mut sentences = split_sentences(text);
        sentences.truncate(self.sentence_limit);
        if sentences.is_empty() {
            return Ok(truncate_chars(text, max_chars).to_string());
        }

        let sentence_vectors = self.embedder.embed_texts(&sentences).await?;
        let document_vector = self.embedder.embed_text(&sentences.join(" ")).await?;

        let mut ranked: Vec<(f32, &str)> = sentence_vectors
            .embeddings
            .iter()
            .zip(&sentences)
            .map(|(vector, sentence)| {
                (cosine_similarity(vector, &document_vector), sentence.as_str())
            })
            .collect();
        // Stable sort so equally similar sentences keep document order
        ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut picked: Vec<&str> = Vec::new();
        // Length of the picked sentences once joined
        let mut length = 0;
        for (_, sentence) in ranked {
            let separator = if picked.is_empty() { 0 } else { SEPARATOR.len() };
            let next_length = length + separator + sentence.chars().count();
            if next_length > max_chars {
                break;
            }
            picked.push(sentence);
            length = next_length;
        }

        let mut summary = picked.join(SEPARATOR);
        if summary.chars().count() < text.chars().count() {
            summary.push_str("...");
        }
        tracing::debug!(
            "Summarized {} sentences into {} characters (budget {})",
            sentences.len(),
            summary.chars().count(),
            max_chars
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use half::f16;
    use qarag_embed::EmbeddingResult;

    /// Embeds text as counts of a few marker words, so similarity is predictable.
    struct KeywordEmbedder;

    const KEYWORDS: [&str; 3] = ["cart", "coupon", "weather"];

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
            Ok(EmbeddingResult::new(
                texts
                    .iter()
                    .map(|text| {
                        let lower = text.to_lowercase();
                        KEYWORDS
                            .iter()
                            .map(|k| f16::from_f32(lower.matches(k).count() as f32))
                            .collect()
                    })
                    .collect(),
            ))
        }

        fn embedding_dimension(&self) -> usize {
            KEYWORDS.len()
        }

        fn provider_name(&self) -> &str {
            "keyword"
        }
    }

    fn summarizer() -> ExtractiveSummarizer {
        ExtractiveSummarizer::new(Arc::new(KeywordEmbedder))
    }

    const TEXT: &str = "The weather is mild. Add the coupon to the cart. The cart keeps the coupon";

    #[tokio::test]
    async fn test_ranks_by_similarity_to_document() {
        let summary = summarizer().summarize(TEXT, 1000).await.unwrap();
        // Every sentence fits, reordered by rank, so no ellipsis is added
        assert_eq!(
            summary,
            "Add the coupon to the cart. The cart keeps the coupon. The weather is mild"
        );
    }

    #[tokio::test]
    async fn test_respects_budget() {
        let summary = summarizer().summarize(TEXT, 30).await.unwrap();
        assert_eq!(summary, "Add the coupon to the cart...");
        assert!(summary.chars().count() <= 30 + "...".len());
    }

    #[tokio::test]
    async fn test_sentence_that_fits_exactly_is_kept() {
        let both = "Add the coupon to the cart. The cart keeps the coupon";
        let budget = both.chars().count();

        let summary = summarizer().summarize(TEXT, budget).await.unwrap();
        assert_eq!(summary, format!("{both}..."));

        let summary = summarizer().summarize(TEXT, budget - 1).await.unwrap();
        assert_eq!(summary, "Add the coupon to the cart...");
    }

    #[tokio::test]
    async fn test_budget_smaller_than_any_sentence() {
        let summary = summarizer().summarize(TEXT, 5).await.unwrap();
        assert_eq!(summary, "...");
    }

    #[tokio::test]
    async fn test_sentence_limit_bounds_candidates() {
        let summary = summarizer()
            .with_sentence_limit(1)
            .summarize(TEXT, 1000)
            .await
            .unwrap();
        assert_eq!(summary, "The weather is mild...");
    }

    #[tokio::test]
    async fn test_text_without_sentences_is_truncated() {
        let summary = summarizer().summarize("   \n  ", 3).await.unwrap();
        assert_eq!(summary, "   ");
        assert_eq!(summarizer().summarize("", 10).await.unwrap(), "");
    }
}
