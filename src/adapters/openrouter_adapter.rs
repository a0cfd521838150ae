//! OpenRouter chat-completions adapter (blocking HTTP).
//!
//! Every failure becomes an `ok = false` reply with a readable message; the
//! raw provider body is kept alongside for diagnostics.

use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;

use crate::domain::error::StockchatError;
use crate::domain::settings::LlmSettings;
use crate::ports::language_model_port::{ChatMessage, LanguageModelPort, LlmReply, LlmRequest};

pub const NOT_CONFIGURED_MESSAGE: &str = "LLM is not configured (missing OPENROUTER_API_KEY). \
I can still show you data and calculations, but I can't generate narrative advice yet.";

pub const UNEXPECTED_FORMAT_MESSAGE: &str = "LLM returned an unexpected response format.";

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

pub struct OpenRouterAdapter {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl OpenRouterAdapter {
    /// Build the blocking client. Must run outside any async runtime.
    pub fn new(settings: &LlmSettings) -> Result<Self, StockchatError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| StockchatError::LanguageModel {
                reason: format!("failed to build http client: {e}"),
            })?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            model: settings.model.clone(),
            api_key: settings.api_key.clone().filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn body<'a>(&'a self, request: &LlmRequest) -> CompletionRequest<'a> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(ChatMessage::system(request.system.clone()));
        messages.extend(request.messages.iter().cloned());
        CompletionRequest {
            model: &self.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

impl LanguageModelPort for OpenRouterAdapter {
    fn chat(&self, request: &LlmRequest) -> LlmReply {
        let Some(api_key) = &self.api_key else {
            return LlmReply::failed(NOT_CONFIGURED_MESSAGE, Value::Null);
        };

        let response = match self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&self.body(request))
            .send()
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(model = %self.model, error = %e, "llm request failed");
                return LlmReply::failed(format!("LLM error: {e}"), Value::Null);
            }
        };

        let status = response.status().as_u16();
        let body = match response.text() {
            Ok(body) => body,
            Err(e) => return LlmReply::failed(format!("LLM error: {e}"), Value::Null),
        };

        let reply = interpret_response(status, &body);
        if reply.ok {
            tracing::debug!(model = %self.model, status, "llm replied");
        } else {
            tracing::warn!(model = %self.model, status, reply = %reply.content, "llm returned an error");
        }
        reply
    }
}

/// Map an HTTP status and body to a reply.
pub fn interpret_response(status: u16, body: &str) -> LlmReply {
    let Ok(data) = serde_json::from_str::<Value>(body) else {
        return LlmReply::failed(
            format!("LLM error: HTTP {status}"),
            Value::String(body.to_string()),
        );
    };

    if status >= 400 {
        let message = data
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        let content = format!("LLM error: HTTP {status} {message}").trim().to_string();
        return LlmReply::failed(content, data);
    }

    let content = data
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map_or_else(|| UNEXPECTED_FORMAT_MESSAGE.to_string(), str::to_string);

    LlmReply {
        ok: true,
        content,
        raw: data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn settings(api_key: Option<&str>) -> LlmSettings {
        LlmSettings {
            base_url: "http://127.0.0.1:9/api/v1/".into(),
            model: "test/model".into(),
            api_key: api_key.map(str::to_string),
            temperature: 0.4,
            max_tokens: 650,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn missing_key_short_circuits() {
        let adapter = OpenRouterAdapter::new(&settings(None)).unwrap();
        assert!(!adapter.is_configured());
        let reply = adapter.chat(&LlmRequest::new("sys", vec![ChatMessage::user("hi")]));
        assert!(!reply.ok);
        assert_eq!(reply.content, NOT_CONFIGURED_MESSAGE);
        assert!(reply.content.contains("OPENROUTER_API_KEY"));
        assert_eq!(reply.raw, Value::Null);
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let adapter = OpenRouterAdapter::new(&settings(Some("  "))).unwrap();
        assert!(!adapter.is_configured());
    }

    #[test]
    fn endpoint_joins_base_url() {
        let adapter = OpenRouterAdapter::new(&settings(Some("k"))).unwrap();
        assert_eq!(adapter.endpoint(), "http://127.0.0.1:9/api/v1/chat/completions");
    }

    #[test]
    fn body_puts_system_first() {
        let adapter = OpenRouterAdapter::new(&settings(Some("k"))).unwrap();
        let request = LlmRequest::new("be careful", vec![ChatMessage::user("question")]);
        let body = serde_json::to_value(adapter.body(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "test/model",
                "messages": [
                    {"role": "system", "content": "be careful"},
                    {"role": "user", "content": "question"}
                ],
                "temperature": 0.4,
                "max_tokens": 650
            })
        );
    }

    #[test]
    fn transport_error_is_reply() {
        let adapter = OpenRouterAdapter::new(&settings(Some("k"))).unwrap();
        let reply = adapter.chat(&LlmRequest::new("sys", vec![ChatMessage::user("hi")]));
        assert!(!reply.ok);
        assert!(reply.content.starts_with("LLM error: "));
    }

    #[test]
    fn success_extracts_first_choice() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "Quick take..."}}]}"#;
        let reply = interpret_response(200, body);
        assert!(reply.ok);
        assert_eq!(reply.content, "Quick take...");
        assert_eq!(reply.raw["choices"][0]["message"]["role"], "assistant");
    }

    #[test]
    fn success_with_unexpected_shape() {
        let reply = interpret_response(200, r#"{"choices": []}"#);
        assert!(reply.ok);
        assert_eq!(reply.content, UNEXPECTED_FORMAT_MESSAGE);
    }

    #[test]
    fn http_error_with_provider_message() {
        let body = r#"{"error": {"message": "Rate limit exceeded", "code": 429}}"#;
        let reply = interpret_response(429, body);
        assert!(!reply.ok);
        assert_eq!(reply.content, "LLM error: HTTP 429 Rate limit exceeded");
        assert_eq!(reply.raw["error"]["code"], 429);
    }

    #[test]
    fn http_error_without_message_is_trimmed() {
        let reply = interpret_response(500, r#"{"detail": "boom"}"#);
        assert_eq!(reply.content, "LLM error: HTTP 500");
    }

    #[test]
    fn unparseable_body_keeps_raw_text() {
        let reply = interpret_response(502, "<html>Bad Gateway</html>");
        assert!(!reply.ok);
        assert_eq!(reply.content, "LLM error: HTTP 502");
        assert_eq!(reply.raw, Value::String("<html>Bad Gateway</html>".into()));
    }
}
