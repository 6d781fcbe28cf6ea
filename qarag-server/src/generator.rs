//! Test case generation over the context budget ladder

use crate::prompts::test_case_prompt;
use crate::test_case::{TestCase, TestCaseParseError, parse_test_cases};
use qarag_embed::EmbedError;
use qarag_llm::ResilientInvoker;
use qarag_retriever::budget::ContextBudgeter;
use qarag_retriever::retrieval::{RetrievalError, RetrievalGateway};
use serde::Serialize;
use std::sync::Arc;

/// Error text returned when no budget produced a usable answer.
pub const ALL_ATTEMPTS_FAILED: &str =
    "All attempts failed. Try simplifying your request or reduce retrieval depth.";

/// Test cases together with the model output they were read from.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedTests {
    /// The parsed cases re-serialized as pretty JSON
    pub llm: String,
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("JSON array is empty or invalid.")]
    EmptyOrInvalid { raw: String },

    #[error("Could not parse JSON: {message}")]
    ParseFailure { message: String, raw: String },

    #[error("{}", ALL_ATTEMPTS_FAILED)]
    AllAttemptsFailed { last_error: String },

    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Context summarization failed: {0}")]
    Context(#[from] EmbedError),
}

impl GenerationError {
    /// The model output, or the last model error, kept for diagnosis.
    pub fn raw_output(&self) -> &str {
        match self {
            Self::EmptyOrInvalid { raw } | Self::ParseFailure { raw, .. } => raw,
            Self::AllAttemptsFailed { last_error } => last_error,
            Self::Retrieval(_) | Self::Context(_) => "",
        }
    }
}

/// Payload of the test generation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GenerateTestsResponse {
    Success {
        llm: String,
        parsed: Vec<TestCase>,
        parsed_count: usize,
    },
    Failure {
        llm: String,
        error: String,
    },
}

impl From<Result<GeneratedTests, GenerationError>> for GenerateTestsResponse {
    fn from(result: Result<GeneratedTests, GenerationError>) -> Self {
        match result {
            Ok(generated) => Self::Success {
                llm: generated.llm,
                parsed_count: generated.test_cases.len(),
                parsed: generated.test_cases,
            },
            Err(e) => Self::Failure {
                llm: e.raw_output().to_string(),
                error: e.to_string(),
            },
        }
    }
}

/// Drives retrieval, context budgeting, invocation and parsing.
#[derive(Clone)]
pub struct TestCaseGenerator {
    gateway: RetrievalGateway,
    budgeter: ContextBudgeter,
    invoker: Arc<ResilientInvoker>,
}

impl TestCaseGenerator {
    pub fn new(
        gateway: RetrievalGateway,
        budgeter: ContextBudgeter,
        invoker: Arc<ResilientInvoker>,
    ) -> Self {
        Self {
            gateway,
            budgeter,
            invoker,
        }
    }

    /// Generates test cases for `user_prompt` from the `top_k` nearest chunks.
    ///
    /// Each budget of the ladder gets one invocation. A non-empty array ends
    /// the run. Valid JSON that is not a non-empty array ends it with an
    /// error. Malformed output moves on to the next budget, and on the last
    /// budget it is reported with the raw output. Model errors move on too,
    /// except quota errors, which a smaller prompt cannot fix.
    pub async fn generate(
        &self,
        user_prompt: &str,
        top_k: usize,
    ) -> Result<GeneratedTests, GenerationError> {
        let retrieved = self.gateway.retrieve(user_prompt, top_k).await?;
        let aggregated = retrieved.to_context_block();
        tracing::info!(
            "Generating tests from {} chunks ({} chars of context)",
            retrieved.len(),
            aggregated.chars().count()
        );

        let ladder = self.budgeter.ladder();
        let mut last_error: Option<String> = None;

        for (step, &budget) in ladder.iter().enumerate() {
            let is_last = step + 1 == ladder.len();
            let context = self.budgeter.build_context(&aggregated, budget).await?;
            tracing::debug!(
                "Budget step {} ({} chars, summarized: {})",
                step + 1,
                budget,
                context.summarized
            );

            let raw = match self
                .invoker
                .invoke(&test_case_prompt(&context.text, user_prompt))
                .await
            {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!("Model call failed at budget {}: {}", budget, e);
                    let quota = e.is_quota();
                    last_error = Some(e.to_string());
                    if quota {
                        break;
                    }
                    continue;
                }
            };

            match parse_test_cases(&raw) {
                Ok(test_cases) => {
                    tracing::info!("Parsed {} test cases at budget {}", test_cases.len(), budget);
                    let llm = serde_json::to_string_pretty(&test_cases)
                        .unwrap_or_else(|_| raw.clone());
                    return Ok(GeneratedTests { llm, test_cases });
                }
                Err(TestCaseParseError::EmptyOrInvalid) => {
                    return Err(GenerationError::EmptyOrInvalid { raw });
                }
                Err(TestCaseParseError::Malformed(message)) => {
                    tracing::warn!("Unparseable output at budget {}: {}", budget, message);
                    if is_last {
                        return Err(GenerationError::ParseFailure { message, raw });
                    }
                }
            }
        }

        Err(GenerationError::AllAttemptsFailed {
            last_error: last_error.unwrap_or_else(|| "Unknown LLM failure".to_string()),
        })
    }
}
