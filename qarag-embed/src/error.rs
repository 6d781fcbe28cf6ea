//! Error types for the embedding system

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type for all embedding operations.
///
/// Covers configuration problems, model loading failures and runtime
/// failures while generating vectors.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// Error when model configuration is invalid
    #[error("Invalid model configuration: {message}")]
    InvalidConfig { message: String },

    /// Error during model initialization
    #[error("Model initialization failed: {source}")]
    ModelInitialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error during embedding generation
    #[error("Embedding generation failed: {source}")]
    EmbeddingGeneration {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The model returned a different number of vectors than inputs
    #[error("Expected {expected} embeddings, model returned {actual}")]
    CountMismatch { expected: usize, actual: usize },

    /// IO errors when reading model files
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Async task join errors
    #[error("Async task failed: {source}")]
    AsyncTask {
        #[from]
        source: tokio::task::JoinError,
    },

    /// Generic errors from other libraries
    #[error("External error: {source}")]
    External {
        #[from]
        source: anyhow::Error,
    },
}

impl EmbedError {
    /// Wrap an error raised while loading a model.
    pub fn model_init(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::ModelInitialization {
            source: source.into(),
        }
    }

    /// Wrap an error raised while generating vectors.
    pub fn embedding_gen(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::EmbeddingGeneration {
            source: source.into(),
        }
    }

    /// Create an invalid configuration error with a custom message.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_errors_keep_their_source() {
        let error = EmbedError::model_init(anyhow::anyhow!("onnx file missing"));
        assert_eq!(error.to_string(), "Model initialization failed: onnx file missing");
        assert!(std::error::Error::source(&error).is_some());

        let error = EmbedError::embedding_gen(std::io::Error::other("session closed"));
        assert_eq!(error.to_string(), "Embedding generation failed: session closed");
    }
}
