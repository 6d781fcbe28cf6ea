//! Selenium script generation for one test case and checkout page

use crate::config::ScriptConfig;
use crate::prompts::{ScriptPromptInput, selenium_prompt};
use crate::selectors::extract_selectors;
use qarag_context::{strip_code_fence, truncate_chars};
use qarag_llm::{ERROR_SENTINEL, InvokeError, ResilientInvoker};
use qarag_retriever::retrieval::RetrievalGateway;
use serde_json::Value;
use std::sync::Arc;

/// Supporting documentation used when retrieval is unavailable.
pub const NO_DOCUMENTATION: &str = "No additional documentation available.";

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Already carries the error sentinel
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error("{sentinel}Failed to generate script: {0}", sentinel = ERROR_SENTINEL)]
    Prompt(#[from] serde_json::Error),

    #[error("{sentinel}Failed to generate script: {0}", sentinel = ERROR_SENTINEL)]
    Input(String),
}

/// Fields of the submitted test case used in the prompt.
#[derive(Debug, Clone, PartialEq)]
struct TestCaseFields {
    rendered: String,
    scenario: String,
    expected: String,
    steps: String,
}

impl TestCaseFields {
    /// Reads the submitted JSON. Text that does not parse is quoted as is,
    /// with no scenario, expectation or steps.
    fn from_submission(test_case_json: &str) -> Self {
        let parsed = serde_json::from_str::<Value>(test_case_json).ok();
        let rendered = parsed
            .as_ref()
            .and_then(|v| serde_json::to_string_pretty(v).ok())
            .unwrap_or_else(|| test_case_json.to_string());
        let object = parsed.as_ref().and_then(Value::as_object);

        let field = |name: &str| match object.and_then(|o| o.get(name)) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        let steps = object
            .and_then(|o| o.get("steps"))
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));

        Self {
            rendered,
            scenario: field("scenario"),
            expected: field("expected"),
            steps: serde_json::to_string_pretty(&steps).unwrap_or_else(|_| "[]".to_string()),
        }
    }
}

/// Builds and runs the script generation prompt.
#[derive(Clone)]
pub struct ScriptGenerator {
    gateway: RetrievalGateway,
    invoker: Arc<ResilientInvoker>,
    config: ScriptConfig,
}

impl ScriptGenerator {
    pub fn new(
        gateway: RetrievalGateway,
        invoker: Arc<ResilientInvoker>,
        config: ScriptConfig,
    ) -> Self {
        Self {
            gateway,
            invoker,
            config,
        }
    }

    /// Returns the script, or an error string starting with the error sentinel.
    pub async fn generate_script(&self, test_case_json: &str, checkout_html: &str) -> String {
        match self.try_generate(test_case_json, checkout_html).await {
            Ok(script) => script,
            Err(e) => {
                tracing::warn!("Script generation failed: {}", e);
                e.to_string()
            }
        }
    }

    pub async fn try_generate(
        &self,
        test_case_json: &str,
        checkout_html: &str,
    ) -> Result<String, ScriptError> {
        let html = truncate_chars(checkout_html, self.config.max_html_chars);
        let selectors = extract_selectors(html, self.config.selector_cap);
        tracing::info!("Extracted {} selector candidates", selectors.len());

        let documentation = self.supporting_documentation(test_case_json).await;
        let fields = TestCaseFields::from_submission(test_case_json);
        let prompt_selectors = &selectors[..selectors.len().min(self.config.prompt_selector_cap)];

        let prompt = selenium_prompt(&ScriptPromptInput {
            test_case: &fields.rendered,
            scenario: &fields.scenario,
            expected: &fields.expected,
            steps: &fields.steps,
            html_excerpt: truncate_chars(html, self.config.prompt_html_chars),
            selectors: prompt_selectors,
            documentation: &documentation,
        })?;

        let output = self.invoker.invoke(&prompt).await?;
        Ok(strip_code_fence(&output))
    }

    /// Chunks related to the test case, or a placeholder when retrieval fails.
    async fn supporting_documentation(&self, test_case_json: &str) -> String {
        match self
            .gateway
            .retrieve(test_case_json, self.config.supplementary_top_k)
            .await
        {
            Ok(result) => {
                truncate_chars(&result.to_context_block(), self.config.supplementary_chars)
                    .to_string()
            }
            Err(e) => {
                tracing::warn!("Supporting documentation unavailable: {}", e);
                NO_DOCUMENTATION.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_from_valid_submission() {
        let fields = TestCaseFields::from_submission(
            r#"{"id":"TC001","scenario":"Pay by card","expected":"Order placed","steps":["Open checkout","Pay"]}"#,
        );
        assert_eq!(fields.scenario, "Pay by card");
        assert_eq!(fields.expected, "Order placed");
        assert_eq!(fields.steps, "[\n  \"Open checkout\",\n  \"Pay\"\n]");
        assert!(fields.rendered.starts_with("{\n  \"id\": \"TC001\""));
    }

    #[test]
    fn test_fields_from_unparseable_submission() {
        let fields = TestCaseFields::from_submission("pay with an expired card");
        assert_eq!(fields.rendered, "pay with an expired card");
        assert_eq!(fields.scenario, "");
        assert_eq!(fields.expected, "");
        assert_eq!(fields.steps, "[]");
    }

    #[test]
    fn test_error_strings_carry_sentinel() {
        let error = ScriptError::Input("checkout_html is missing".to_string());
        assert_eq!(
            error.to_string(),
            "GEMINI ERROR: Failed to generate script: checkout_html is missing"
        );
        let error = ScriptError::from(InvokeError::EmptyResponse);
        assert_eq!(error.to_string(), "GEMINI ERROR: Empty response from LLM.");
    }
}
