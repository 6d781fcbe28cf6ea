//! Resilient model invocation
//!
//! The invoker walks an ordered model list. Each model gets up to
//! `max_retries` attempts:
//!
//! ```text
//! attempt ─▶ response ──▶ blocked ───────────▶ Err(Blocked)
//!    │                ├─▶ no usable text ────▶ Err(EmptyResponse)
//!    │                └─▶ text ──────────────▶ Ok(text)
//!    └─────▶ error ──▶ RateLimited ─▶ sleep, retry same model
//!                   │                 (retries exhausted: next model)
//!                   ├─▶ ModelUnavailable ───▶ next model
//!                   ├─▶ QuotaExhaustedAtZero ▶ next model
//!                   └─▶ Other ─────────────▶ Err(Other)
//! ```
//!
//! When every model is exhausted the last upstream error decides between
//! `QuotaExceeded` and `AllModelsFailed`.

use crate::client::ModelClient;
use crate::config::InvokerConfig;
use crate::error::{BlockReason, ErrorKind, InvokeError, UpstreamError};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a single call to one model.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success,
    Blocked(BlockReason),
    EmptyResponse,
    /// The call failed; `backoff` is the sleep before the next attempt on this model
    Failed {
        kind: ErrorKind,
        backoff: Option<Duration>,
    },
}

/// One entry of an invocation trace.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInvocationAttempt {
    pub model: String,
    pub retry_index: u32,
    pub outcome: AttemptOutcome,
}

/// Sleep before retry `retry_index` (0-based): `wait * 2^retry_index`, capped.
pub fn backoff_delay(wait: Duration, retry_index: u32, cap: Duration) -> Duration {
    let factor = 2u32.checked_pow(retry_index).unwrap_or(u32::MAX);
    wait.checked_mul(factor).unwrap_or(cap).min(cap)
}

/// Calls a [`ModelClient`] with model fallback and rate-limit backoff.
#[derive(Clone)]
pub struct ResilientInvoker {
    client: Arc<dyn ModelClient>,
    config: InvokerConfig,
    models: Vec<String>,
}

impl ResilientInvoker {
    /// Uses the preferred models from `config` without asking the service.
    pub fn new(client: Arc<dyn ModelClient>, config: InvokerConfig) -> Self {
        let models = config.preferred_models.clone();
        Self {
            client,
            config,
            models,
        }
    }

    /// Uses an explicit model list.
    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    /// Asks the service which models exist and resolves the list to try.
    ///
    /// A failed listing falls back to the preferred models.
    pub async fn discover(client: Arc<dyn ModelClient>, config: InvokerConfig) -> Self {
        let models = match client.list_models().await {
            Ok(available) => config.resolve_models(&available),
            Err(e) => {
                tracing::warn!("Model listing failed, using defaults: {}", e);
                config.preferred_models.clone()
            }
        };
        tracing::info!("Using models: {}", models.join(", "));
        Self::new(client, config).with_models(models)
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn config(&self) -> &InvokerConfig {
        &self.config
    }

    /// Generates text for `prompt`, returning the trimmed output.
    pub async fn invoke(&self, prompt: &str) -> Result<String, InvokeError> {
        self.invoke_traced(prompt).await.0
    }

    /// Like [`invoke`](Self::invoke), also returning every attempt made.
    pub async fn invoke_traced(
        &self,
        prompt: &str,
    ) -> (Result<String, InvokeError>, Vec<ModelInvocationAttempt>) {
        let mut attempts = Vec::new();
        let mut last_error: Option<(UpstreamError, ErrorKind)> = None;

        for model in &self.models {
            for retry_index in 0..self.config.max_retries {
                let mut record = |outcome| {
                    attempts.push(ModelInvocationAttempt {
                        model: model.clone(),
                        retry_index,
                        outcome,
                    })
                };

                match self
                    .client
                    .generate(model, prompt, &self.config.generation)
                    .await
                {
                    Ok(response) => {
                        if let Some(reason) = response.blocked {
                            tracing::warn!("Model {} blocked the request: {}", model, reason);
                            record(AttemptOutcome::Blocked(reason));
                            return (Err(InvokeError::Blocked { reason }), attempts);
                        }
                        return match response.usable_text() {
                            Some(text) => {
                                tracing::debug!(
                                    "Model {} answered with {} chars",
                                    model,
                                    text.len()
                                );
                                record(AttemptOutcome::Success);
                                (Ok(text.to_string()), attempts)
                            }
                            None => {
                                tracing::warn!("Model {} returned no usable text", model);
                                record(AttemptOutcome::EmptyResponse);
                                (Err(InvokeError::EmptyResponse), attempts)
                            }
                        };
                    }
                    Err(error) => {
                        let kind = error.classify();
                        match kind {
                            ErrorKind::RateLimited => {
                                let last_retry = retry_index + 1 >= self.config.max_retries;
                                let backoff = (!last_retry).then(|| {
                                    let wait = error
                                        .suggested_delay(self.config.retry_delay_buffer())
                                        .unwrap_or_else(|| self.config.default_retry_delay());
                                    backoff_delay(wait, retry_index, self.config.backoff_cap())
                                });
                                tracing::warn!(
                                    "Model {} rate limited (attempt {}): {}",
                                    model,
                                    retry_index + 1,
                                    error
                                );
                                record(AttemptOutcome::Failed { kind, backoff });
                                last_error = Some((error, kind));
                                match backoff {
                                    Some(delay) => {
                                        tracing::info!("Retrying {} in {:?}", model, delay);
                                        tokio::time::sleep(delay).await;
                                    }
                                    None => break,
                                }
                            }
                            ErrorKind::ModelUnavailable | ErrorKind::QuotaExhaustedAtZero => {
                                tracing::warn!("Skipping model {} ({:?}): {}", model, kind, error);
                                record(AttemptOutcome::Failed {
                                    kind,
                                    backoff: None,
                                });
                                last_error = Some((error, kind));
                                break;
                            }
                            ErrorKind::Other => {
                                tracing::error!("Model {} failed: {}", model, error);
                                record(AttemptOutcome::Failed {
                                    kind,
                                    backoff: None,
                                });
                                return (
                                    Err(InvokeError::Other {
                                        message: error.to_string(),
                                    }),
                                    attempts,
                                );
                            }
                        }
                    }
                }
            }
        }

        let error = match last_error {
            Some((error, kind)) if kind.is_quota() => InvokeError::QuotaExceeded {
                last_error: error.to_string(),
            },
            Some((error, _)) => InvokeError::AllModelsFailed {
                last_error: error.to_string(),
            },
            None => InvokeError::AllModelsFailed {
                last_error: "no models configured".to_string(),
            },
        };
        tracing::error!("{} after {} attempts", error, attempts.len());
        (Err(error), attempts)
    }
}
