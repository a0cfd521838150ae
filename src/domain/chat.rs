//! Chat assembly: gather market context for a question and ask the model.
//!
//! Data gathering is best-effort. A snapshot never fails; a history fetch
//! failure is recorded as `data_error` in the context and stops further
//! gathering, but the question still goes to the model.

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Map, Value};
use std::io;

use crate::domain::backtest::{run_backtest, BacktestConfig, BacktestReport};
use crate::domain::coerce::is_truthy;
use crate::domain::error::StockchatError;
use crate::domain::prompt::system_prompt;
use crate::domain::snapshot::StockSnapshot;
use crate::domain::technicals::{technical_summary, TechnicalSummary};
use crate::ports::language_model_port::{
    ChatMessage, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, LanguageModelPort, LlmRequest,
};
use crate::ports::market_data_port::MarketDataPort;

pub const DEFAULT_HISTORY_PERIOD: &str = "1y";
pub const DEFAULT_HISTORY_INTERVAL: &str = "1d";

/// Which context sections to gather, and whether to append the tone addendum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChatSettings {
    pub fundamentals: bool,
    pub technicals: bool,
    pub backtest: bool,
    pub guardrails: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            fundamentals: true,
            technicals: true,
            backtest: false,
            guardrails: true,
        }
    }
}

impl ChatSettings {
    /// Read settings from a loose JSON object. Absent keys keep their
    /// defaults; present keys are judged by truthiness.
    pub fn from_json(value: Option<&Value>) -> Self {
        let defaults = Self::default();
        let Some(Value::Object(map)) = value else {
            return defaults;
        };
        let flag = |key: &str, default: bool| map.get(key).map_or(default, is_truthy);
        Self {
            fundamentals: flag("fundamentals", defaults.fundamentals),
            technicals: flag("technicals", defaults.technicals),
            backtest: flag("backtest", defaults.backtest),
            guardrails: flag("guardrails", defaults.guardrails),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatRequest {
    pub message: String,
    pub ticker: Option<String>,
    pub settings: ChatSettings,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    pub fn with_settings(mut self, settings: ChatSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Lenient decode of a request body. Non-string fields count as absent.
    pub fn from_json(body: &Value) -> Self {
        let text = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            message: text("message").unwrap_or_default(),
            ticker: text("ticker"),
            settings: ChatSettings::from_json(body.get("settings")),
        }
    }

    /// The trimmed question; an empty one is rejected before any port call.
    pub fn validate(&self) -> Result<&str, StockchatError> {
        let message = self.message.trim();
        if message.is_empty() {
            return Err(StockchatError::missing("message"));
        }
        Ok(message)
    }

    /// Upper-cased ticker, or `None` when blank.
    pub fn normalized_ticker(&self) -> Option<String> {
        self.ticker
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_uppercase)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub ok: bool,
    pub reply: String,
    pub context: Value,
    pub snapshot: Option<StockSnapshot>,
    pub technicals: Option<TechnicalSummary>,
    pub backtest: Option<BacktestReport>,
}

/// Everything gathered for one ticker before the model call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarketContext {
    pub ticker: Option<String>,
    pub snapshot: Option<StockSnapshot>,
    pub technicals: Option<TechnicalSummary>,
    pub backtest: Option<BacktestReport>,
    pub data_error: Option<String>,
}

impl MarketContext {
    /// JSON object in a fixed key order: ticker, snapshot, technicals,
    /// toy_backtest, data_error. Only gathered sections appear.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            "ticker".into(),
            self.ticker.clone().map_or(Value::Null, Value::String),
        );
        if let Some(snapshot) = &self.snapshot {
            map.insert("snapshot".into(), to_value(snapshot));
        }
        if let Some(technicals) = &self.technicals {
            map.insert("technicals".into(), to_value(technicals));
        }
        if let Some(backtest) = &self.backtest {
            map.insert("toy_backtest".into(), to_value(backtest));
        }
        if let Some(err) = &self.data_error {
            map.insert("data_error".into(), Value::String(err.clone()));
        }
        Value::Object(map)
    }
}

// Domain types serialize infallibly; a failure would only mean a non-string key.
fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

pub fn user_message(message: &str, context: &Value) -> String {
    let context = spaced_json(context);
    format!("User question:\n{message}\n\nContext (JSON, may be empty):\n{context}")
}

/// Single-line JSON with `", "` between items and `": "` after keys.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

fn spaced_json(value: &Value) -> String {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, SpacedFormatter);
    if value.serialize(&mut serializer).is_err() {
        return value.to_string();
    }
    String::from_utf8(out).unwrap_or_else(|_| value.to_string())
}

pub struct ChatService<'a> {
    market: &'a dyn MarketDataPort,
    llm: &'a dyn LanguageModelPort,
    history_period: String,
    history_interval: String,
    backtest: BacktestConfig,
    temperature: f64,
    max_tokens: u32,
}

impl<'a> ChatService<'a> {
    pub fn new(market: &'a dyn MarketDataPort, llm: &'a dyn LanguageModelPort) -> Self {
        Self {
            market,
            llm,
            history_period: DEFAULT_HISTORY_PERIOD.into(),
            history_interval: DEFAULT_HISTORY_INTERVAL.into(),
            backtest: BacktestConfig::default(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Sampling parameters for every model call made by this service.
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

    pub fn gather(&self, ticker: Option<&str>, settings: &ChatSettings) -> MarketContext {
        let mut context = MarketContext {
            ticker: ticker.map(str::to_string),
            ..MarketContext::default()
        };
        let Some(ticker) = ticker else {
            return context;
        };

        if settings.fundamentals {
            context.snapshot = Some(StockSnapshot::fetch(self.market, ticker));
        }

        if settings.technicals || settings.backtest {
            let history = match self.market.fetch_history(
                ticker,
                &self.history_period,
                &self.history_interval,
            ) {
                Ok(history) => history,
                Err(e) => {
                    tracing::warn!(ticker, error = %e, "history unavailable for chat context");
                    context.data_error = Some(e.to_string());
                    return context;
                }
            };
            if settings.technicals {
                context.technicals = Some(technical_summary(&history));
            }
            if settings.backtest {
                context.backtest = Some(run_backtest(&history, &self.backtest));
            }
        }

        context
    }

    pub fn respond(&self, request: &ChatRequest) -> Result<ChatResponse, StockchatError> {
        let message = request.validate()?;
        let ticker = request.normalized_ticker();
        let settings = request.settings;

        let context = self.gather(ticker.as_deref(), &settings);
        let context_json = context.to_json();

        let llm_request = LlmRequest {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            ..LlmRequest::new(
                system_prompt(settings.guardrails),
                vec![ChatMessage::user(user_message(message, &context_json))],
            )
        };
        let reply = self.llm.chat(&llm_request);
        tracing::info!(ticker = ticker.as_deref(), ok = reply.ok, "chat answered");

        Ok(ChatResponse {
            ok: reply.ok,
            reply: reply.content,
            context: context_json,
            snapshot: context.snapshot,
            technicals: context.technicals,
            backtest: context.backtest,
        })
    }
}
