//! HTTP request handlers for the web adapter.

use askama::Template;
use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{Method, header},
    response::{Html, IntoResponse, Response},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::chat::{ChatRequest, ChatResponse, ChatService};
use crate::domain::prompt::PROMPT_VERSION;
use crate::domain::snapshot::StockSnapshot;

use super::{AppState, WebError};

pub const FARCASTER_MANIFEST: &str = include_str!("../../../static/farcaster.json");

pub async fn home() -> Result<Html<String>, WebError> {
    let template = super::templates::HomeTemplate {
        prompt_version: PROMPT_VERSION,
    };
    template
        .render()
        .map(Html)
        .map_err(|e| WebError::internal(format!("template error: {e}")))
}

pub async fn api_chat(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ChatResponse>, WebError> {
    let request = ChatRequest::from_json(&lenient_json(&body));
    if request.validate().is_err() {
        return Err(WebError::bad_request("Missing message").with_ok_flag());
    }

    let response = run_blocking(move || {
        ChatService::new(&*state.market, &*state.llm)
            .with_history_window(state.history_period.as_str(), state.history_interval.as_str())
            .with_generation(state.temperature, state.max_tokens)
            .respond(&request)
    })
    .await??;

    Ok(Json(response))
}

pub async fn api_snapshot(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, WebError> {
    let ticker = params
        .get("ticker")
        .map(|t| t.trim().to_string())
        .unwrap_or_default();
    if ticker.is_empty() {
        return Err(WebError::bad_request("Missing ?ticker="));
    }

    let snapshot = run_blocking(move || StockSnapshot::fetch(&*state.market, &ticker)).await?;
    Ok(Json(json!({"ok": true, "snapshot": snapshot})))
}

pub async fn farcaster_manifest() -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        FARCASTER_MANIFEST,
    )
        .into_response()
}

pub async fn webhook(method: Method, body: Bytes) -> Result<Json<Value>, WebError> {
    if method != Method::POST {
        return Err(WebError::method_not_allowed());
    }
    Ok(Json(json!({"ok": true, "received": lenient_json(&body)})))
}

pub async fn not_found() -> WebError {
    WebError::not_found("Not found")
}

/// Any JSON document, or `{}` when the body is empty or malformed.
fn lenient_json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap_or_else(|_| json!({}))
}

async fn run_blocking<T, F>(work: F) -> Result<T, WebError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| WebError::internal(format!("worker failed: {e}")))
}
