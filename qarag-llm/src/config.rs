//! Invoker configuration and model list resolution

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Models tried in order when they are available.
pub const DEFAULT_MODELS: [&str; 4] = [
    "gemini-1.5-flash",
    "gemini-1.5-pro",
    "gemini-pro",
    "gemini-1.0-pro",
];

/// Substrings marking experimental or preview model tiers.
pub const DEFAULT_EXCLUDED_KEYWORDS: [&str; 4] = ["exp", "experimental", "2.5", "2.0"];

/// Models kept from the listing when none of the preferred ones is available.
const FALLBACK_MODEL_COUNT: usize = 3;

/// Sampling and length settings sent with every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: 2000,
            temperature: 0.1,
            top_p: 0.95,
        }
    }
}

/// Configuration for [`crate::ResilientInvoker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvokerConfig {
    /// Model preference order
    pub preferred_models: Vec<String>,
    /// Lowercase substrings that exclude a model name
    pub excluded_keywords: Vec<String>,
    /// Attempts per model before falling back to the next one
    pub max_retries: u32,
    /// Wait used when the server suggests none, in seconds
    pub default_retry_delay_secs: f64,
    /// Added to a delay parsed from an error message, in seconds
    pub retry_delay_buffer_secs: f64,
    /// Upper bound of a single backoff sleep, in seconds
    pub backoff_cap_secs: f64,
    pub generation: GenerationConfig,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            preferred_models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            excluded_keywords: DEFAULT_EXCLUDED_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            max_retries: 3,
            default_retry_delay_secs: 5.0,
            retry_delay_buffer_secs: 1.0,
            backoff_cap_secs: 60.0,
            generation: GenerationConfig::default(),
        }
    }
}

/// Seconds from configuration as a duration. Negative and NaN values are
/// zero, values too large for `Duration` saturate.
fn config_duration(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::MAX)
}

impl InvokerConfig {
    pub fn default_retry_delay(&self) -> Duration {
        config_duration(self.default_retry_delay_secs)
    }

    pub fn retry_delay_buffer(&self) -> Duration {
        config_duration(self.retry_delay_buffer_secs)
    }

    pub fn backoff_cap(&self) -> Duration {
        config_duration(self.backoff_cap_secs)
    }

    /// Whether `model` belongs to an excluded tier.
    pub fn is_excluded(&self, model: &str) -> bool {
        let lower = model.to_lowercase();
        self.excluded_keywords
            .iter()
            .any(|keyword| lower.contains(&keyword.to_lowercase()))
    }

    /// Picks the models to try from those the service reports.
    ///
    /// `available` holds bare model names that support content generation.
    /// Excluded tiers are dropped first. The preferred models that remain
    /// available win, in preference order. Otherwise the first three
    /// available models are used. With nothing available the preferred list
    /// is returned unchanged.
    pub fn resolve_models(&self, available: &[String]) -> Vec<String> {
        let usable: Vec<&String> = available.iter().filter(|m| !self.is_excluded(m)).collect();
        if usable.is_empty() {
            return self.preferred_models.clone();
        }

        let preferred: Vec<String> = self
            .preferred_models
            .iter()
            .filter(|m| usable.contains(m))
            .cloned()
            .collect();
        if !preferred.is_empty() {
            return preferred;
        }

        usable
            .into_iter()
            .take(FALLBACK_MODEL_COUNT)
            .cloned()
            .collect()
    }
}
