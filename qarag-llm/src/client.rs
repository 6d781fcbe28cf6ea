use crate::config::GenerationConfig;
use crate::error::UpstreamError;
use crate::response::LlmResponse;
use async_trait::async_trait;

/// A hosted text generation service.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Generates a completion for `prompt` with the named model.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<LlmResponse, UpstreamError>;

    /// Bare names of the models that support content generation.
    async fn list_models(&self) -> Result<Vec<String>, UpstreamError>;
}
