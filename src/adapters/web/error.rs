//! JSON error responses for the web adapter.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::domain::error::StockchatError;

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
    /// Whether the body carries `"ok": false` next to the error.
    pub ok_flag: bool,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            ok_flag: false,
        }
    }

    pub fn with_ok_flag(mut self) -> Self {
        self.ok_flag = true;
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message).with_ok_flag()
    }
}

impl From<StockchatError> for WebError {
    fn from(err: StockchatError) -> Self {
        let status = status_from_error(&err);
        Self::new(status, err.to_string()).with_ok_flag()
    }
}

pub fn status_from_error(err: &StockchatError) -> StatusCode {
    match err {
        StockchatError::MissingInput { .. } => StatusCode::BAD_REQUEST,
        StockchatError::MarketData { .. } | StockchatError::LanguageModel { .. } => {
            StatusCode::BAD_GATEWAY
        }
        StockchatError::ConfigParse { .. }
        | StockchatError::ConfigMissing { .. }
        | StockchatError::ConfigInvalid { .. }
        | StockchatError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "request failed");
        }
        let body = if self.ok_flag {
            json!({"ok": false, "error": self.message})
        } else {
            json!({"error": self.message})
        };
        (self.status, Json(body)).into_response()
    }
}
