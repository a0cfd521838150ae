//! Normalized quote and fundamentals snapshot.
//!
//! The provider payload is a loose bag of named fields. Each snapshot field is
//! resolved once through a fixed chain of field names, and a name only "wins"
//! when its value is truthy (not null, `false`, `0`, or `""`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::coerce::{coerce_float, coerce_int, is_truthy};
use crate::ports::market_data_port::MarketDataPort;

/// Raw provider fields for one ticker.
pub type QuotePayload = Map<String, Value>;

/// Low-latency price/currency side channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FastQuote {
    pub last_price: Option<f64>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub ticker: String,
    pub name: Option<String>,
    pub currency: Option<String>,
    pub price: Option<f64>,
    pub change_pct: Option<f64>,
    pub market_cap: Option<i64>,
    pub pe: Option<f64>,
    pub forward_pe: Option<f64>,
    pub eps: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub beta: Option<f64>,
    pub sector: Option<String>,
    pub industry: Option<String>,
}

const PRICE_FIELDS: [&str; 2] = ["currentPrice", "regularMarketPrice"];
const PREVIOUS_CLOSE_FIELDS: [&str; 2] = ["previousClose", "regularMarketPreviousClose"];
const NAME_FIELDS: [&str; 2] = ["shortName", "longName"];

impl StockSnapshot {
    pub fn build(ticker: &str, payload: &QuotePayload, fast: Option<&FastQuote>) -> Self {
        let currency = text_field(payload, &["currency"]).or_else(|| {
            fast.and_then(|f| f.currency.clone())
                .filter(|c| !c.is_empty())
        });

        let fast_price = fast
            .and_then(|f| f.last_price)
            .filter(|p| p.is_finite() && *p != 0.0);
        let price = fast_price.or_else(|| coerce_float(first_truthy(payload, &PRICE_FIELDS)));

        let previous_close = coerce_float(first_truthy(payload, &PREVIOUS_CLOSE_FIELDS));
        let change_pct = match (price, previous_close) {
            (Some(price), Some(prev)) if prev != 0.0 => Some((price - prev) / prev * 100.0),
            _ => None,
        };

        let dividend_yield = coerce_float(payload.get("dividendYield")).map(|dy| dy * 100.0);

        Self {
            ticker: ticker.trim().to_uppercase(),
            name: text_field(payload, &NAME_FIELDS),
            currency,
            price,
            change_pct,
            market_cap: coerce_int(payload.get("marketCap")),
            pe: coerce_float(payload.get("trailingPE")),
            forward_pe: coerce_float(payload.get("forwardPE")),
            eps: coerce_float(payload.get("trailingEps")),
            dividend_yield,
            beta: coerce_float(payload.get("beta")),
            sector: text_field(payload, &["sector"]),
            industry: text_field(payload, &["industry"]),
        }
    }

    /// Fetch and build a snapshot. Provider failures degrade to absent fields.
    pub fn fetch(port: &dyn MarketDataPort, ticker: &str) -> Self {
        let payload = port.fetch_info(ticker).unwrap_or_else(|e| {
            tracing::warn!(ticker, error = %e, "quote fundamentals unavailable");
            QuotePayload::new()
        });
        let fast = port.fetch_fast_quote(ticker).unwrap_or_else(|e| {
            tracing::warn!(ticker, error = %e, "fast quote unavailable");
            None
        });
        Self::build(ticker, &payload, fast.as_ref())
    }
}

fn first_truthy<'a>(payload: &'a QuotePayload, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .filter_map(|f| payload.get(*f))
        .find(|v| is_truthy(v))
}

fn text_field(payload: &QuotePayload, fields: &[&str]) -> Option<String> {
    first_truthy(payload, fields)
        .and_then(Value::as_str)
        .map(str::to_string)
}
