//! Web server adapter.
//!
//! Axum router serving the chat page and the JSON API. Ports are blocking,
//! so handlers hop onto the blocking pool for every provider call.

mod error;
mod handlers;
mod templates;

pub use error::WebError;
pub use handlers::*;
pub use templates::*;

use axum::{
    Router,
    routing::{any, get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::domain::chat::{DEFAULT_HISTORY_INTERVAL, DEFAULT_HISTORY_PERIOD};
use crate::ports::language_model_port::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, LanguageModelPort};
use crate::ports::market_data_port::MarketDataPort;

pub struct AppState {
    pub market: Arc<dyn MarketDataPort + Send + Sync>,
    pub llm: Arc<dyn LanguageModelPort + Send + Sync>,
    pub history_period: String,
    pub history_interval: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl AppState {
    pub fn new(
        market: Arc<dyn MarketDataPort + Send + Sync>,
        llm: Arc<dyn LanguageModelPort + Send + Sync>,
    ) -> Self {
        Self {
            market,
            llm,
            history_period: DEFAULT_HISTORY_PERIOD.to_string(),
            history_interval: DEFAULT_HISTORY_INTERVAL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_generation(mut self, temperature: f64, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_history_window(
        mut self,
        period: impl Into<String>,
        interval: impl Into<String>,
    ) -> Self {
        self.history_period = period.into();
        self.history_interval = interval.into();
        self
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/api/chat/", post(handlers::api_chat))
        .route("/api/snapshot/", get(handlers::api_snapshot))
        .route("/.well-known/farcaster.json", get(handlers::farcaster_manifest))
        .route("/api/webhook", any(handlers::webhook))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
