//! Fallback and backoff behaviour of the invoker against scripted clients.

use async_trait::async_trait;
use qarag_llm::{
    AttemptOutcome, BlockReason, ErrorKind, GenerationConfig, InvokeError, InvokerConfig,
    LlmResponse, ModelClient, ResilientInvoker, UpstreamError,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

type Reply = Result<LlmResponse, UpstreamError>;

/// Replays canned replies per model and records every call.
#[derive(Default)]
struct ScriptedClient {
    replies: Mutex<Vec<(String, VecDeque<Reply>)>>,
    fallback: Option<Reply>,
    calls: Mutex<Vec<String>>,
    listing: Option<Result<Vec<String>, UpstreamError>>,
}

impl ScriptedClient {
    fn always(reply: Reply) -> Self {
        Self {
            fallback: Some(reply),
            ..Self::default()
        }
    }

    fn script(mut self, model: &str, replies: Vec<Reply>) -> Self {
        self.replies
            .get_mut()
            .unwrap()
            .push((model.to_string(), replies.into()));
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn generate(
        &self,
        model: &str,
        _prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<LlmResponse, UpstreamError> {
        self.calls.lock().unwrap().push(model.to_string());
        let mut replies = self.replies.lock().unwrap();
        if let Some((_, queue)) = replies.iter_mut().find(|(m, _)| m == model) {
            if let Some(reply) = queue.pop_front() {
                return reply;
            }
        }
        self.fallback
            .clone()
            .unwrap_or_else(|| Err(UpstreamError::message("unexpected call")))
    }

    async fn list_models(&self) -> Result<Vec<String>, UpstreamError> {
        self.listing
            .clone()
            .unwrap_or_else(|| Err(UpstreamError::message("listing disabled")))
    }
}

fn two_models() -> Vec<String> {
    vec!["model-a".to_string(), "model-b".to_string()]
}

fn invoker(client: Arc<ScriptedClient>) -> ResilientInvoker {
    ResilientInvoker::new(client, InvokerConfig::default()).with_models(two_models())
}

fn rate_limited() -> Reply {
    Err(UpstreamError::message("429 Resource has been exhausted (e.g. check quota)."))
}

#[tokio::test(start_paused = true)]
async fn persistent_rate_limit_makes_six_attempts() {
    let client = Arc::new(ScriptedClient::always(rate_limited()));
    let start = Instant::now();

    let (result, attempts) = invoker(client.clone()).invoke_traced("prompt").await;

    assert_eq!(attempts.len(), 6);
    assert_eq!(client.calls().len(), 6);
    assert!(matches!(result, Err(InvokeError::QuotaExceeded { .. })));

    // 5s then 10s on each model; the third attempt moves on without sleeping
    let backoffs: Vec<Option<Duration>> = attempts
        .iter()
        .map(|a| match a.outcome {
            AttemptOutcome::Failed { backoff, .. } => backoff,
            _ => panic!("unexpected outcome {:?}", a.outcome),
        })
        .collect();
    let five = Some(Duration::from_secs(5));
    let ten = Some(Duration::from_secs(10));
    assert_eq!(backoffs, vec![five, ten, None, five, ten, None]);

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(30), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(31), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn server_suggested_delay_is_used() {
    let client = Arc::new(
        ScriptedClient::default().script(
            "model-a",
            vec![
                Err(UpstreamError::message("quota exceeded, retry in 2s").with_status(429)),
                Ok(LlmResponse::text("  done  ")),
            ],
        ),
    );
    let start = Instant::now();

    let (result, attempts) = invoker(client).invoke_traced("prompt").await;

    assert_eq!(result, Ok("done".to_string()));
    assert_eq!(attempts.len(), 2);
    assert_eq!(
        attempts[0].outcome,
        AttemptOutcome::Failed {
            kind: ErrorKind::RateLimited,
            backoff: Some(Duration::from_secs(3)),
        }
    );
    assert_eq!(attempts[1].outcome, AttemptOutcome::Success);
    assert!(start.elapsed() >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn unavailable_model_falls_back_without_retry() {
    let client = Arc::new(
        ScriptedClient::default()
            .script(
                "model-a",
                vec![Err(UpstreamError::message("models/model-a is not found").with_status(404))],
            )
            .script("model-b", vec![Ok(LlmResponse::text("from b"))]),
    );

    let (result, attempts) = invoker(client.clone()).invoke_traced("prompt").await;

    assert_eq!(result, Ok("from b".to_string()));
    assert_eq!(client.calls(), vec!["model-a", "model-b"]);
    assert_eq!(attempts[0].retry_index, 0);
    assert_eq!(attempts[1].model, "model-b");
}

#[tokio::test(start_paused = true)]
async fn free_tier_zero_skips_model() {
    let client = Arc::new(
        ScriptedClient::default()
            .script(
                "model-a",
                vec![Err(UpstreamError::message(
                    "429 Quota exceeded for metric: generate_content_free_tier_requests, limit: 0",
                ))],
            )
            .script("model-b", vec![Ok(LlmResponse::text("ok"))]),
    );

    let (result, attempts) = invoker(client).invoke_traced("prompt").await;

    assert_eq!(result, Ok("ok".to_string()));
    assert_eq!(
        attempts[0].outcome,
        AttemptOutcome::Failed {
            kind: ErrorKind::QuotaExhaustedAtZero,
            backoff: None,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn other_errors_stop_immediately() {
    let client = Arc::new(ScriptedClient::always(Err(UpstreamError::message(
        "API key not valid. Please pass a valid API key.",
    )
    .with_status(400))));

    let result = invoker(client.clone()).invoke("prompt").await;

    assert_eq!(client.calls().len(), 1);
    let error = result.unwrap_err();
    assert_eq!(
        error.to_string(),
        "GEMINI ERROR: 400 API key not valid. Please pass a valid API key."
    );
}

#[tokio::test(start_paused = true)]
async fn blocked_response_is_not_retried() {
    let client = Arc::new(ScriptedClient::always(Ok(LlmResponse::blocked(
        BlockReason::Safety,
    ))));

    let result = invoker(client.clone()).invoke("prompt").await;

    assert_eq!(client.calls().len(), 1);
    assert_eq!(
        result,
        Err(InvokeError::Blocked {
            reason: BlockReason::Safety
        })
    );
    assert_eq!(
        result.unwrap_err().to_string(),
        "GEMINI ERROR: Safety filter blocked."
    );
}

#[tokio::test(start_paused = true)]
async fn empty_response_is_reported() {
    let client = Arc::new(ScriptedClient::always(Ok(LlmResponse::text("   "))));

    let result = invoker(client.clone()).invoke("prompt").await;

    assert_eq!(client.calls().len(), 1);
    assert_eq!(result, Err(InvokeError::EmptyResponse));
}

#[tokio::test(start_paused = true)]
async fn all_unavailable_is_all_models_failed() {
    let client = Arc::new(ScriptedClient::always(Err(UpstreamError::message(
        "model not supported for generateContent",
    ))));

    let result = invoker(client.clone()).invoke("prompt").await;

    assert_eq!(client.calls().len(), 2);
    assert_eq!(
        result,
        Err(InvokeError::AllModelsFailed {
            last_error: "model not supported for generateContent".to_string()
        })
    );
}

#[tokio::test]
async fn discover_resolves_listed_models() {
    let client = Arc::new(ScriptedClient {
        listing: Some(Ok(vec![
            "gemini-2.0-flash".to_string(),
            "gemini-pro".to_string(),
            "gemini-1.5-pro".to_string(),
        ])),
        ..ScriptedClient::default()
    });

    let invoker = ResilientInvoker::discover(client, InvokerConfig::default()).await;
    assert_eq!(invoker.models(), ["gemini-1.5-pro", "gemini-pro"]);
}

#[tokio::test]
async fn discover_falls_back_to_defaults() {
    let client = Arc::new(ScriptedClient::default());
    let invoker = ResilientInvoker::discover(client, InvokerConfig::default()).await;
    assert_eq!(invoker.models(), InvokerConfig::default().preferred_models);
}
