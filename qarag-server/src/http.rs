//! HTTP surface of the pipeline

use crate::generator::{GenerateTestsResponse, GenerationError};
use crate::pipeline::Pipeline;
use crate::script::ScriptError;
use axum::{
    Form, Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use qarag_retriever::ingest::UploadedDocument;
use qarag_retriever::retrieval::clamp_top_k;
use serde::Deserialize;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Largest accepted request body.
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Builds the router with every endpoint and middleware layer.
pub fn router(pipeline: Pipeline) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/build_kb", post(build_kb_handler))
        .route("/generate_tests", post(generate_tests_handler))
        .route("/generate_selenium", post(generate_selenium_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}

/// Binds `addr` and serves until the process is stopped.
pub async fn serve(addr: SocketAddr, router: Router) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}

fn error_response(status: StatusCode, error: impl std::fmt::Display) -> Response {
    (
        status,
        Json(serde_json::json!({
            "status": "error",
            "error": error.to_string(),
        })),
    )
        .into_response()
}

async fn health_handler(State(pipeline): State<Pipeline>) -> Response {
    match pipeline.status().await {
        Ok(status) => Json(status).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

async fn build_kb_handler(
    State(pipeline): State<Pipeline>,
    mut multipart: Multipart,
) -> Response {
    let mut documents = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
        };
        if field.name() != Some("files") {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload.txt").to_string();
        match field.bytes().await {
            Ok(bytes) => documents.push(UploadedDocument::new(filename, bytes.to_vec())),
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
        }
    }

    if documents.is_empty() {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "at least one file is required in field 'files'",
        );
    }

    tracing::info!("Building knowledge base from {} files", documents.len());
    match pipeline.ingestor().ingest(documents).await {
        Ok(report) => Json(serde_json::json!({
            "status": "success",
            "stored_chunks": report.stored_chunks,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Knowledge base build failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateTestsForm {
    user_prompt: String,
    top_k: Option<i64>,
}

async fn generate_tests_handler(
    State(pipeline): State<Pipeline>,
    Form(form): Form<GenerateTestsForm>,
) -> Response {
    let top_k = clamp_top_k(form.top_k, pipeline.config().top_k);

    let result = pipeline
        .test_generator()
        .generate(&form.user_prompt, top_k)
        .await;
    let status = match &result {
        Err(GenerationError::Retrieval(_) | GenerationError::Context(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::OK,
    };
    (status, Json(GenerateTestsResponse::from(result))).into_response()
}

async fn generate_selenium_handler(
    State(pipeline): State<Pipeline>,
    mut multipart: Multipart,
) -> Response {
    let mut test_case_json = None;
    let mut checkout_html = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
        };
        let name = field.name().map(str::to_string);
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
        };
        match name.as_deref() {
            Some("test_case_json") => {
                test_case_json = Some(String::from_utf8_lossy(&bytes).into_owned())
            }
            Some("checkout_html") => {
                checkout_html = Some(String::from_utf8_lossy(&bytes).into_owned())
            }
            _ => {}
        }
    }

    let (test_case_json, checkout_html) = match (test_case_json, checkout_html) {
        (Some(test_case), Some(html)) => (test_case, html),
        (None, _) => return missing_field("test_case_json"),
        (_, None) => return missing_field("checkout_html"),
    };

    let selenium_script = pipeline
        .script_generator()
        .generate_script(&test_case_json, &checkout_html)
        .await;
    Json(serde_json::json!({ "selenium_script": selenium_script })).into_response()
}

fn missing_field(name: &str) -> Response {
    let error = ScriptError::Input(format!("{name} is required"));
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(serde_json::json!({ "selenium_script": error.to_string() })),
    )
        .into_response()
}
