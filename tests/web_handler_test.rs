#![cfg(feature = "web")]
//! Web handler integration tests.
//!
//! Tests cover:
//! - Chat endpoint validation and the data-only reply path
//! - Snapshot endpoint happy path and missing ticker
//! - Webhook, manifest, home page and fallback routes

mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use stockchat::adapters::openrouter_adapter::NOT_CONFIGURED_MESSAGE;
use stockchat::adapters::web::{AppState, build_router};
use stockchat::domain::prompt::PROMPT_VERSION;
use tower::ServiceExt;

use common::*;

fn app(market: Arc<MockMarketDataPort>, llm: Arc<MockLanguageModel>) -> Router {
    build_router(AppState::new(market, llm))
}

fn default_market() -> MockMarketDataPort {
    MockMarketDataPort::new()
        .with_info(
            "AAPL",
            json!({"shortName": "Apple Inc.", "currency": "USD", "previousClose": 100.0}),
        )
        .with_fast_quote("AAPL", 150.0, "USD")
        .with_history("AAPL", generate_history(80, 100.0, 0.5))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    (status, serde_json::from_str(&body).unwrap())
}

fn post_chat(body: &str) -> Request<Body> {
    Request::post("/api/chat/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

mod chat {
    use super::*;

    #[tokio::test]
    async fn empty_message_is_rejected_before_any_provider_call() {
        let market = Arc::new(default_market());
        let llm = Arc::new(MockLanguageModel::replying("unused"));
        let (status, body) = send_json(
            app(market.clone(), llm.clone()),
            post_chat(r#"{"message": "   ", "ticker": "AAPL"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"ok": false, "error": "Missing message"}));
        assert_eq!(market.total_calls(), 0);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_json_is_treated_as_empty() {
        let market = Arc::new(default_market());
        let llm = Arc::new(MockLanguageModel::replying("unused"));
        let (status, body) = send_json(app(market, llm), post_chat("{not json")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing message");
    }

    #[tokio::test]
    async fn get_is_not_routed() {
        let market = Arc::new(default_market());
        let llm = Arc::new(MockLanguageModel::replying("unused"));
        let request = Request::get("/api/chat/").body(Body::empty()).unwrap();
        let response = app(market, llm).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn unconfigured_model_still_returns_context() {
        let market = Arc::new(default_market());
        let llm = Arc::new(MockLanguageModel::failing(NOT_CONFIGURED_MESSAGE));
        let (status, body) = send_json(
            app(market, llm.clone()),
            post_chat(r#"{"message": "Is AAPL a buy?", "ticker": " aapl "}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], false);
        assert_eq!(body["reply"], NOT_CONFIGURED_MESSAGE);
        assert_eq!(body["context"]["ticker"], "AAPL");
        assert_eq!(body["snapshot"]["name"], "Apple Inc.");
        assert!(body["technicals"]["sma_20"].is_number());
        assert!(body["backtest"].is_null());
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn settings_select_context_sections() {
        let market = Arc::new(default_market());
        let llm = Arc::new(MockLanguageModel::replying("Quick take: ..."));
        let (status, body) = send_json(
            app(market, llm.clone()),
            post_chat(
                r#"{"message": "How did the crossover do?", "ticker": "AAPL",
                    "settings": {"fundamentals": false, "technicals": false, "backtest": true}}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["reply"], "Quick take: ...");
        assert!(body["snapshot"].is_null());
        assert!(body["technicals"].is_null());
        assert!(body["backtest"]["buyhold_total_return_pct"].is_number());

        let request = llm.last_request().unwrap();
        assert!(request.messages[0].content.contains("toy_backtest"));
    }

    #[tokio::test]
    async fn generation_settings_reach_the_model() {
        let market = Arc::new(default_market());
        let llm = Arc::new(MockLanguageModel::replying("ok"));
        let router = build_router(
            AppState::new(market, llm.clone()).with_generation(0.1, 99),
        );
        let (status, _) = send_json(router, post_chat(r#"{"message": "hi"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        let request = llm.last_request().unwrap();
        assert_eq!(request.temperature, 0.1);
        assert_eq!(request.max_tokens, 99);
    }

    #[tokio::test]
    async fn history_failure_is_reported_in_context() {
        let market = Arc::new(default_market().with_history_error("MSFT", "timed out"));
        let llm = Arc::new(MockLanguageModel::replying("ok"));
        let (status, body) = send_json(
            app(market, llm),
            post_chat(r#"{"message": "Thoughts?", "ticker": "MSFT"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(
            body["context"]["data_error"]
                .as_str()
                .unwrap()
                .contains("timed out")
        );
        assert!(body["technicals"].is_null());
    }

    #[tokio::test]
    async fn empty_history_reports_no_price_history() {
        let market = Arc::new(MockMarketDataPort::new());
        let llm = Arc::new(MockLanguageModel::replying("ok"));
        let (_, body) = send_json(
            app(market, llm),
            post_chat(r#"{"message": "Thoughts?", "ticker": "ZZZZ"}"#),
        )
        .await;

        assert_eq!(
            body["technicals"],
            json!({"error": "No price history available."})
        );
    }
}

mod snapshot {
    use super::*;

    #[tokio::test]
    async fn returns_normalized_snapshot() {
        let market = Arc::new(default_market());
        let llm = Arc::new(MockLanguageModel::replying("unused"));
        let request = Request::get("/api/snapshot/?ticker=AAPL")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send_json(app(market, llm), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["snapshot"]["ticker"], "AAPL");
        assert_eq!(body["snapshot"]["price"], 150.0);
        assert_eq!(body["snapshot"]["change_pct"], 50.0);
        assert_eq!(body["snapshot"]["currency"], "USD");
    }

    #[tokio::test]
    async fn provider_failure_still_answers_ok() {
        let market = Arc::new(
            MockMarketDataPort::new()
                .with_info_error("AAPL", "connection reset")
                .with_fast_quote_error("AAPL", "connection reset"),
        );
        let llm = Arc::new(MockLanguageModel::replying("unused"));
        let request = Request::get("/api/snapshot/?ticker=AAPL")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send_json(app(market, llm), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["snapshot"]["ticker"], "AAPL");
        assert!(body["snapshot"]["price"].is_null());
        assert!(body["snapshot"]["name"].is_null());
    }

    #[tokio::test]
    async fn missing_ticker_is_bad_request() {
        let market = Arc::new(default_market());
        let llm = Arc::new(MockLanguageModel::replying("unused"));
        for uri in ["/api/snapshot/", "/api/snapshot/?ticker=%20%20"] {
            let request = Request::get(uri).body(Body::empty()).unwrap();
            let (status, body) = send_json(app(market.clone(), llm.clone()), request).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body, json!({"error": "Missing ?ticker="}));
        }
        assert_eq!(market.total_calls(), 0);
    }
}

mod misc_routes {
    use super::*;

    fn router() -> Router {
        app(
            Arc::new(MockMarketDataPort::new()),
            Arc::new(MockLanguageModel::replying("unused")),
        )
    }

    #[tokio::test]
    async fn webhook_rejects_get() {
        let request = Request::get("/api/webhook").body(Body::empty()).unwrap();
        let (status, body) = send_json(router(), request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, json!({"error": "Method not allowed"}));
    }

    #[tokio::test]
    async fn webhook_echoes_post_body() {
        let request = Request::post("/api/webhook")
            .body(Body::from(r#"{"event": "frame_added"}"#))
            .unwrap();
        let (status, body) = send_json(router(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"ok": true, "received": {"event": "frame_added"}})
        );
    }

    #[tokio::test]
    async fn webhook_tolerates_garbage() {
        let request = Request::post("/api/webhook")
            .body(Body::from("not json"))
            .unwrap();
        let (_, body) = send_json(router(), request).await;
        assert_eq!(body["received"], json!({}));
    }

    #[tokio::test]
    async fn farcaster_manifest_is_served_as_json() {
        let request = Request::get("/.well-known/farcaster.json")
            .body(Body::empty())
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let manifest: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(manifest.get("miniapp").is_some());
    }

    #[tokio::test]
    async fn home_page_renders() {
        let request = Request::get("/").body(Body::empty()).unwrap();
        let (status, body) = send(router(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/api/chat/"));
        assert!(body.contains(PROMPT_VERSION));
    }

    #[tokio::test]
    async fn unknown_path_is_json_404() {
        let request = Request::get("/nope").body(Body::empty()).unwrap();
        let (status, body) = send_json(router(), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Not found"}));
    }
}
