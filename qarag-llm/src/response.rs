//! Normalized model response

use crate::error::BlockReason;

/// Why generation stopped, as reported for the first candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Other,
    Unknown(String),
}

impl FinishReason {
    /// Parses the service's finish reason name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "STOP" => Self::Stop,
            "MAX_TOKENS" => Self::MaxTokens,
            "SAFETY" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => Self::Safety,
            "RECITATION" => Self::Recitation,
            "OTHER" => Self::Other,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The block this finish reason stands for, if any.
    pub fn block_reason(&self) -> Option<BlockReason> {
        match self {
            Self::Safety => Some(BlockReason::Safety),
            Self::Recitation => Some(BlockReason::Recitation),
            Self::Other => Some(BlockReason::Other),
            _ => None,
        }
    }
}

/// The single shape downstream code sees, whatever the service returned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LlmResponse {
    /// Concatenated text of the first candidate, empty when there was none
    pub text: String,
    pub finish_reason: Option<FinishReason>,
    /// Set when the candidate or the prompt itself was blocked
    pub blocked: Option<BlockReason>,
}

impl LlmResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason: Some(FinishReason::Stop),
            blocked: None,
        }
    }

    pub fn blocked(reason: BlockReason) -> Self {
        Self {
            text: String::new(),
            finish_reason: None,
            blocked: Some(reason),
        }
    }

    pub fn was_blocked(&self) -> bool {
        self.blocked.is_some()
    }

    /// Trimmed text, or `None` when nothing usable came back.
    pub fn usable_text(&self) -> Option<&str> {
        let trimmed = self.text.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}
