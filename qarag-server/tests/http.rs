//! End-to-end tests of the HTTP endpoints over in-memory doubles.

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use half::f16;
use qarag_embed::{EmbeddingProvider, EmbeddingResult};
use qarag_llm::{
    GenerationConfig, InvokerConfig, LlmResponse, ModelClient, ResilientInvoker, UpstreamError,
};
use qarag_retriever::storage::sqlite_store::SqliteVectorStore;
use qarag_server::http::router;
use qarag_server::{Pipeline, PipelineConfig};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const BOUNDARY: &str = "qarag-test-boundary";

/// Embeds text as keyword counts plus a constant component.
struct TopicEmbedder;

#[async_trait]
impl EmbeddingProvider for TopicEmbedder {
    async fn embed_texts(&self, texts: &[String]) -> qarag_embed::Result<EmbeddingResult> {
        let embeddings = texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                let mut vector: Vec<f16> = ["coupon", "shipping", "payment"]
                    .iter()
                    .map(|word| f16::from_f32(lower.matches(word).count() as f32))
                    .collect();
                vector.push(f16::from_f32(0.5));
                vector
            })
            .collect();
        Ok(EmbeddingResult::new(embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        4
    }

    fn provider_name(&self) -> &str {
        "topic"
    }
}

type Reply = Result<LlmResponse, UpstreamError>;

/// Answers every call with the same reply, recording every prompt.
struct ScriptedClient {
    reply: Reply,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn generate(
        &self,
        _model: &str,
        prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<LlmResponse, UpstreamError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone()
    }

    async fn list_models(&self) -> Result<Vec<String>, UpstreamError> {
        Ok(vec!["gemini-1.5-flash".to_string()])
    }
}

async fn app(client: Arc<ScriptedClient>) -> Router {
    let store = Arc::new(SqliteVectorStore::open_memory("docs").await.unwrap());
    let invoker = ResilientInvoker::new(client, InvokerConfig::default())
        .with_models(vec!["model-a".to_string(), "model-b".to_string()]);
    let pipeline =
        Pipeline::new(PipelineConfig::default(), Arc::new(TopicEmbedder), store, invoker).unwrap();
    router(pipeline)
}

fn multipart(parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
    multipart_to("/build_kb", parts)
}

fn multipart_to(uri: &str, parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, filename, content) in parts {
        body.push_str(&format!("--{BOUNDARY}\r\n"));
        match filename {
            Some(filename) => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )),
            None => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
            )),
        }
        body.push_str(content);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn text_reply(text: &str) -> Reply {
    Ok(LlmResponse::text(text))
}

#[tokio::test]
async fn build_kb_stores_chunks_and_health_reports_them() {
    let app = app(Arc::new(ScriptedClient::new(text_reply("unused")))).await;

    let coupons = "Each coupon applies once per order. ".repeat(10);
    let (status, body) = send(
        &app,
        multipart(&[
            ("files", Some("coupons.txt"), coupons.as_str()),
            ("files", Some("shipping.json"), r#"{"shipping": "free over 50"}"#),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["stored_chunks"], 2);

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["stored_chunks"], 2);
    assert_eq!(body["documents"], 2);
}

#[tokio::test]
async fn build_kb_without_files_is_rejected() {
    let app = app(Arc::new(ScriptedClient::new(text_reply("unused")))).await;
    let (status, body) = send(&app, multipart(&[("other", None, "x")])).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn generate_tests_returns_parsed_cases() {
    let reply = r#"```json
[
  {"id": "TC001", "title": "Single coupon", "scenario": "Apply one coupon",
   "steps": ["Open cart", "Apply coupon"], "expected": "Discount shown", "based_on": "coupons.txt"},
  {"id": "TC002", "title": "Second coupon", "scenario": "Apply two coupons",
   "steps": ["Apply coupon twice"], "expected": "Second coupon rejected", "based_on": "coupons.txt"}
]
```"#;
    let client = Arc::new(ScriptedClient::new(text_reply(reply)));
    let app = app(client.clone()).await;
    send(
        &app,
        multipart(&[("files", Some("coupons.txt"), "Each coupon applies once per order.")]),
    )
    .await;

    let (status, body) = send(
        &app,
        form("/generate_tests", "user_prompt=coupon+rules&top_k=2"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["parsed_count"], 2);
    assert_eq!(body["parsed"][1]["id"], "TC002");
    assert!(body.get("error").is_none());

    let llm: Value = serde_json::from_str(body["llm"].as_str().unwrap()).unwrap();
    assert_eq!(llm, body["parsed"]);

    let prompts = client.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("### Source: coupons.txt\nEach coupon applies once per order."));
    assert!(prompts[0].contains("User Request: coupon rules"));
}

#[tokio::test]
async fn generate_tests_reports_unparseable_output_after_every_budget() {
    let client = Arc::new(ScriptedClient::new(text_reply("Sorry, no JSON today.")));
    let app = app(client.clone()).await;

    let (status, body) = send(&app, form("/generate_tests", "user_prompt=checkout")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["llm"], "Sorry, no JSON today.");
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .starts_with("Could not parse JSON: ")
    );
    assert_eq!(client.prompts().len(), 3);
    assert!(client.prompts()[0].contains("Reference Documentation:\n\n\nUser Request: checkout"));
}

#[tokio::test]
async fn generate_tests_stops_on_exhausted_quota() {
    let quota = Err(UpstreamError::message(
        "Quota exceeded for metric: generativelanguage.googleapis.com/generate_content_free_tier_requests, limit: 0",
    ));
    let client = Arc::new(ScriptedClient::new(quota));
    let app = app(client.clone()).await;

    let request = form("/generate_tests", "user_prompt=checkout&top_k=50");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["error"],
        "All attempts failed. Try simplifying your request or reduce retrieval depth."
    );
    assert!(body["llm"].as_str().unwrap().starts_with("GEMINI ERROR: "));
    // One call per model at the first budget, then the ladder is abandoned.
    assert_eq!(client.prompts().len(), 2);
}

#[tokio::test]
async fn generate_selenium_strips_code_fence() {
    let client = Arc::new(ScriptedClient::new(text_reply(
        "```python\nfrom selenium import webdriver\n```",
    )));
    let app = app(client.clone()).await;

    let test_case =
        r#"{"id":"TC001","scenario":"Pay by card","expected":"Order placed","steps":["Click pay"]}"#;
    let html = r#"<form id="checkout"><button id="pay" class="btn">Pay</button></form>"#;
    let (status, body) = send(
        &app,
        multipart_to(
            "/generate_selenium",
            &[
                ("test_case_json", None, test_case),
                ("checkout_html", Some("checkout.html"), html),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["selenium_script"], "from selenium import webdriver");

    let prompts = client.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("\"selector\": \"#pay\""));
    assert!(prompts[0].contains("Test Scenario: Pay by card"));
    assert!(prompts[0].contains("RELEVANT DOCUMENTATION:\n\n"));
}

#[tokio::test]
async fn generate_selenium_returns_error_sentinel() {
    let client = Arc::new(ScriptedClient::new(Err(UpstreamError::message(
        "API key not valid. Please pass a valid API key.",
    ))));
    let app = app(client).await;

    let (status, body) = send(
        &app,
        multipart_to(
            "/generate_selenium",
            &[
                ("test_case_json", None, "not json"),
                ("checkout_html", Some("checkout.html"), "<p>checkout</p>"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["selenium_script"],
        "GEMINI ERROR: API key not valid. Please pass a valid API key."
    );
}

#[tokio::test]
async fn generate_selenium_requires_html() {
    let app = app(Arc::new(ScriptedClient::new(text_reply("unused")))).await;
    let (status, body) = send(
        &app,
        multipart_to("/generate_selenium", &[("test_case_json", None, "{}")]),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(
        body["selenium_script"]
            .as_str()
            .unwrap()
            .starts_with("GEMINI ERROR: Failed to generate script: ")
    );
}
