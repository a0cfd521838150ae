#![allow(dead_code)]

use chrono::{Duration, TimeZone, Utc};
use serde_json::Value;
pub use stockchat::domain::ohlcv::{OhlcvBar, PriceHistory};
use stockchat::domain::error::StockchatError;
use stockchat::domain::snapshot::{FastQuote, QuotePayload};
use stockchat::ports::language_model_port::{LanguageModelPort, LlmReply, LlmRequest};
use stockchat::ports::market_data_port::MarketDataPort;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct MockMarketDataPort {
    pub info: HashMap<String, QuotePayload>,
    pub fast: HashMap<String, FastQuote>,
    pub history: HashMap<String, PriceHistory>,
    pub history_errors: HashMap<String, String>,
    pub info_errors: HashMap<String, String>,
    pub fast_quote_errors: HashMap<String, String>,
    pub info_calls: AtomicUsize,
    pub history_calls: AtomicUsize,
}

impl MockMarketDataPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_info(mut self, ticker: &str, info: Value) -> Self {
        let payload = match info {
            Value::Object(map) => map,
            _ => QuotePayload::new(),
        };
        self.info.insert(ticker.to_string(), payload);
        self
    }

    pub fn with_fast_quote(mut self, ticker: &str, price: f64, currency: &str) -> Self {
        self.fast.insert(
            ticker.to_string(),
            FastQuote {
                last_price: Some(price),
                currency: Some(currency.to_string()),
            },
        );
        self
    }

    pub fn with_history(mut self, ticker: &str, history: PriceHistory) -> Self {
        self.history.insert(ticker.to_string(), history);
        self
    }

    pub fn with_history_error(mut self, ticker: &str, reason: &str) -> Self {
        self.history_errors
            .insert(ticker.to_string(), reason.to_string());
        self
    }

    pub fn with_info_error(mut self, ticker: &str, reason: &str) -> Self {
        self.info_errors.insert(ticker.to_string(), reason.to_string());
        self
    }

    pub fn with_fast_quote_error(mut self, ticker: &str, reason: &str) -> Self {
        self.fast_quote_errors
            .insert(ticker.to_string(), reason.to_string());
        self
    }

    pub fn total_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst) + self.history_calls.load(Ordering::SeqCst)
    }
}

impl MarketDataPort for MockMarketDataPort {
    fn fetch_info(&self, ticker: &str) -> Result<QuotePayload, StockchatError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.info_errors.get(ticker) {
            return Err(StockchatError::market_data(reason.clone()));
        }
        Ok(self.info.get(ticker).cloned().unwrap_or_default())
    }

    fn fetch_fast_quote(&self, ticker: &str) -> Result<Option<FastQuote>, StockchatError> {
        if let Some(reason) = self.fast_quote_errors.get(ticker) {
            return Err(StockchatError::market_data(reason.clone()));
        }
        Ok(self.fast.get(ticker).cloned())
    }

    fn fetch_history(
        &self,
        ticker: &str,
        _period: &str,
        _interval: &str,
    ) -> Result<PriceHistory, StockchatError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.history_errors.get(ticker) {
            return Err(StockchatError::market_data(reason.clone()));
        }
        Ok(self.history.get(ticker).cloned().unwrap_or_default())
    }
}

/// Language model that answers with a fixed reply and records every request.
pub struct MockLanguageModel {
    reply: LlmReply,
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLanguageModel {
    pub fn replying(content: &str) -> Self {
        Self {
            reply: LlmReply {
                ok: true,
                content: content.to_string(),
                raw: Value::Null,
            },
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(content: &str) -> Self {
        Self {
            reply: LlmReply::failed(content, Value::Null),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<LlmRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl LanguageModelPort for MockLanguageModel {
    fn chat(&self, request: &LlmRequest) -> LlmReply {
        self.requests.lock().unwrap().push(request.clone());
        self.reply.clone()
    }
}

/// Daily bars from 2024-01-01 with the given closes.
pub fn history_from_closes(closes: &[f64]) -> PriceHistory {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    PriceHistory::new(
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| OhlcvBar::flat(start + Duration::days(i as i64), *close))
            .collect(),
    )
}

/// `count` bars rising linearly from `start_price` by `step` per day.
pub fn generate_history(count: usize, start_price: f64, step: f64) -> PriceHistory {
    let closes: Vec<f64> = (0..count).map(|i| start_price + step * i as f64).collect();
    history_from_closes(&closes)
}

/// Falls for `down` bars and then rises for `up` bars, forcing a golden cross.
pub fn v_shaped_history(down: usize, up: usize) -> PriceHistory {
    let mut closes = Vec::with_capacity(down + up);
    let mut price = 100.0;
    for _ in 0..down {
        price -= 0.5;
        closes.push(price);
    }
    for _ in 0..up {
        price += 1.0;
        closes.push(price);
    }
    history_from_closes(&closes)
}

pub fn history_csv(history: &PriceHistory) -> String {
    let mut out = String::from("Date,Open,High,Low,Close,Volume\n");
    for bar in &history.bars {
        let close = bar.close.unwrap_or_default();
        out.push_str(&format!(
            "{},{close},{close},{close},{close},1000\n",
            bar.timestamp.format("%Y-%m-%d")
        ));
    }
    out
}
