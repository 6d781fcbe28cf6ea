//! # qarag-llm
//!
//! Resilient access to a hosted language model. A [`ModelClient`] performs
//! single calls. [`ResilientInvoker`] layers model fallback, rate-limit
//! backoff and a typed error taxonomy on top of it.
//!
//! ```rust,no_run
//! use qarag_llm::{GeminiClient, InvokerConfig, ResilientInvoker};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = Arc::new(GeminiClient::new(std::env::var("GEMINI_API_KEY")?)?);
//! let invoker = ResilientInvoker::discover(client, InvokerConfig::default()).await;
//!
//! match invoker.invoke("List three checkout edge cases.").await {
//!     Ok(text) => println!("{text}"),
//!     Err(e) => eprintln!("{e}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod gemini;
pub mod invoker;
pub mod response;

pub use client::ModelClient;
pub use config::{GenerationConfig, InvokerConfig};
pub use error::{BlockReason, ERROR_SENTINEL, ErrorKind, InvokeError, UpstreamError};
pub use gemini::GeminiClient;
pub use invoker::{AttemptOutcome, ModelInvocationAttempt, ResilientInvoker, backoff_delay};
pub use response::{FinishReason, LlmResponse};
