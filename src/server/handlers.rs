use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

use crate::error::AuditError;
use crate::pipeline::{AnalysisKind, AuditPipeline};

/// Shared handler state: the pipeline plus nothing else. All of it is
/// read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AuditPipeline>,
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// `POST /analyze` - full-site conversion analysis
pub async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    run_request(state, body, AnalysisKind::Analyze, "analysis").await
}

/// `POST /audit` - landing-page audit with the outreach email
pub async fn audit(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    run_request(state, body, AnalysisKind::Audit, "audit").await
}

async fn run_request(
    state: AppState,
    body: Result<Json<Value>, JsonRejection>,
    kind: AnalysisKind,
    result_key: &'static str,
) -> Response {
    let Ok(Json(body)) = body else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Invalid request format. Please provide a valid JSON body."
            })),
        )
            .into_response();
    };

    let Some(url) = body.get("url").and_then(Value::as_str) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Invalid or missing URL. Please provide a valid website URL."
            })),
        )
            .into_response();
    };

    info!("Handling {} request for: {}", result_key, url);

    match state.pipeline.run(url, kind).await {
        Ok(text) => (StatusCode::OK, Json(json!({ result_key: text }))).into_response(),
        Err(e) => error_response(e),
    }
}

/// Map a classified failure to its status code and explanation body. The
/// classification was decided at the point of detection; nothing here
/// inspects message text.
fn error_response(err: AuditError) -> Response {
    error!("Request failed: {}", err);

    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut body = json!({ "error": err.to_string() });
    if let Some(details) = err.details() {
        body["details"] = json!(details);
    }
    if let Some(solutions) = err.solutions() {
        body["solutions"] = json!(solutions);
    }

    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_blocked_error_body_shape() {
        let response =
            error_response(AuditError::Blocked { status: 403, message: "denied".to_string() });
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("blocked"));
        assert!(body["solutions"].as_array().unwrap().len() >= 1);
        assert!(body["details"].as_str().unwrap().contains("anti-bot"));
    }

    #[tokio::test]
    async fn test_insufficient_content_error_body_shape() {
        let response = error_response(AuditError::InsufficientContent { length: 40 });
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("sufficient content"));
        assert!(body.get("solutions").is_none());
    }

    #[tokio::test]
    async fn test_unknown_error_falls_back_to_raw_message() {
        let response = error_response(AuditError::Unknown("something odd".to_string()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "something odd");
    }
}
