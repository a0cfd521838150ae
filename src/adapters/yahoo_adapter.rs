//! Yahoo Finance market data adapter (blocking HTTP).
//!
//! History and the fast quote come from the v8 chart endpoint, fundamentals
//! from the v10 quoteSummary endpoint. quoteSummary needs a session cookie
//! and a crumb token; both are fetched lazily and refreshed once on 401/403.
//! A 404 means the provider has nothing for the symbol and maps to an empty
//! result rather than an error.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::DateTime;
use reqwest::blocking::Client;
use reqwest::header::REFERER;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;

use crate::adapters::ticker_cache::TickerCache;
use crate::domain::coerce::finite;
use crate::domain::error::StockchatError;
use crate::domain::ohlcv::{OhlcvBar, PriceHistory};
use crate::domain::settings::MarketDataSettings;
use crate::domain::snapshot::{FastQuote, QuotePayload};
use crate::ports::market_data_port::MarketDataPort;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)";
const REFERER_URL: &str = "https://finance.yahoo.com/";
const COOKIE_URL: &str = "https://fc.yahoo.com";

/// quoteSummary modules in precedence order: the first module to carry a
/// field wins.
const SUMMARY_MODULES: [&str; 5] = [
    "price",
    "summaryDetail",
    "financialData",
    "defaultKeyStatistics",
    "assetProfile",
];

/// Resolved endpoints for one symbol. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerHandle {
    symbol: String,
    chart_url: Url,
    summary_url: Url,
}

impl TickerHandle {
    pub fn new(base_url: &str, symbol: &str) -> Result<Self, StockchatError> {
        Ok(Self {
            symbol: symbol.to_string(),
            chart_url: endpoint(base_url, &["v8", "finance", "chart"], symbol)?,
            summary_url: endpoint(base_url, &["v10", "finance", "quoteSummary"], symbol)?,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn chart_url(&self, range: &str, interval: &str) -> Url {
        let mut url = self.chart_url.clone();
        url.query_pairs_mut()
            .append_pair("range", range)
            .append_pair("interval", interval);
        url
    }

    pub fn summary_url(&self, crumb: Option<&str>) -> Url {
        let mut url = self.summary_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("modules", &SUMMARY_MODULES.join(","));
            if let Some(crumb) = crumb {
                query.append_pair("crumb", crumb);
            }
        }
        url
    }
}

fn endpoint(base_url: &str, path: &[&str], symbol: &str) -> Result<Url, StockchatError> {
    let mut url = Url::parse(base_url).map_err(|e| {
        StockchatError::market_data(format!("invalid market data base url {base_url}: {e}"))
    })?;
    {
        let mut segments = url.path_segments_mut().map_err(|_| {
            StockchatError::market_data(format!("market data base url cannot hold a path: {base_url}"))
        })?;
        segments.pop_if_empty().extend(path).push(symbol);
    }
    Ok(url)
}

pub struct YahooAdapter {
    client: Client,
    base_url: String,
    cache: TickerCache<TickerHandle>,
    crumb: Mutex<Option<String>>,
}

impl YahooAdapter {
    /// Build the blocking client. Must run outside any async runtime.
    pub fn new(
        settings: &MarketDataSettings,
        cache: TickerCache<TickerHandle>,
    ) -> Result<Self, StockchatError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| StockchatError::market_data(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            cache,
            crumb: Mutex::new(None),
        })
    }

    pub fn cache(&self) -> &TickerCache<TickerHandle> {
        &self.cache
    }

    fn handle(&self, ticker: &str) -> Result<Arc<TickerHandle>, StockchatError> {
        let symbol = ticker.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(StockchatError::missing("ticker"));
        }
        self.cache
            .get_or_try_insert_with(&symbol, |s| TickerHandle::new(&self.base_url, s))
    }

    fn send(&self, url: Url) -> Result<(StatusCode, String), StockchatError> {
        let response = self
            .client
            .get(url)
            .header(REFERER, REFERER_URL)
            .send()
            .map_err(|e| StockchatError::market_data(format!("yahoo transport error: {e}")))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| StockchatError::market_data(format!("yahoo body read error: {e}")))?;
        Ok((status, body))
    }

    /// `None` when the provider has no data for the symbol.
    fn fetch_body(&self, url: Url) -> Result<Option<String>, StockchatError> {
        let (status, body) = self.send(url)?;
        check_status(status).map(|found| found.then_some(body))
    }

    fn crumb_slot(&self) -> MutexGuard<'_, Option<String>> {
        self.crumb.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn crumb(&self) -> Option<String> {
        if let Some(crumb) = self.crumb_slot().clone() {
            return Some(crumb);
        }
        self.refresh_crumb()
    }

    fn refresh_crumb(&self) -> Option<String> {
        // The crumb endpoint only answers once the session cookie is set.
        if let Err(e) = self.client.get(COOKIE_URL).header(REFERER, REFERER_URL).send() {
            tracing::debug!(error = %e, "yahoo cookie request failed");
        }
        let url = format!("{}/v1/test/getcrumb", self.base_url);
        let crumb = self
            .client
            .get(url)
            .header(REFERER, REFERER_URL)
            .send()
            .ok()
            .filter(|r| r.status().is_success())
            .and_then(|r| r.text().ok())
            .and_then(|body| valid_crumb(&body));
        if crumb.is_none() {
            tracing::warn!("yahoo crumb unavailable; fundamentals may be rejected");
        }
        *self.crumb_slot() = crumb.clone();
        crumb
    }

    fn fetch_chart(
        &self,
        ticker: &str,
        range: &str,
        interval: &str,
    ) -> Result<Option<ChartResult>, StockchatError> {
        let handle = self.handle(ticker)?;
        match self.fetch_body(handle.chart_url(range, interval))? {
            Some(body) => parse_chart(&body),
            None => {
                tracing::debug!(ticker = handle.symbol(), "yahoo has no chart for symbol");
                Ok(None)
            }
        }
    }
}

impl MarketDataPort for YahooAdapter {
    fn fetch_info(&self, ticker: &str) -> Result<QuotePayload, StockchatError> {
        let handle = self.handle(ticker)?;
        let crumb = self.crumb();
        let (mut status, mut body) = self.send(handle.summary_url(crumb.as_deref()))?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::debug!(ticker = handle.symbol(), %status, "refreshing yahoo crumb");
            let crumb = self.refresh_crumb();
            (status, body) = self.send(handle.summary_url(crumb.as_deref()))?;
        }

        if !check_status(status)? {
            tracing::debug!(ticker = handle.symbol(), "yahoo has no summary for symbol");
            return Ok(QuotePayload::new());
        }
        let payload = flatten_quote_summary(&body)?;
        tracing::debug!(ticker = handle.symbol(), fields = payload.len(), "fundamentals fetched");
        Ok(payload)
    }

    fn fetch_fast_quote(&self, ticker: &str) -> Result<Option<FastQuote>, StockchatError> {
        Ok(self
            .fetch_chart(ticker, "1d", "1d")?
            .and_then(|chart| fast_quote_from_chart(&chart)))
    }

    fn fetch_history(
        &self,
        ticker: &str,
        period: &str,
        interval: &str,
    ) -> Result<PriceHistory, StockchatError> {
        let history = self
            .fetch_chart(ticker, period, interval)?
            .map(|chart| history_from_chart(&chart))
            .unwrap_or_else(PriceHistory::empty);
        tracing::debug!(ticker, period, interval, bars = history.len(), "history fetched");
        Ok(history)
    }
}

/// `Ok(true)` on success, `Ok(false)` on 404, error otherwise.
fn check_status(status: StatusCode) -> Result<bool, StockchatError> {
    if status == StatusCode::NOT_FOUND {
        return Ok(false);
    }
    if !status.is_success() {
        return Err(StockchatError::market_data(format!(
            "yahoo returned status {status}"
        )));
    }
    Ok(true)
}

fn valid_crumb(body: &str) -> Option<String> {
    let crumb = body.trim();
    let plausible = !crumb.is_empty() && crumb.len() <= 64 && !crumb.contains(['<', '{', ' ']);
    plausible.then(|| crumb.to_string())
}

#[derive(Debug, Clone, Deserialize)]
struct YahooApiError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl std::fmt::Display for YahooApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = self.code.as_deref().unwrap_or("error");
        match &self.description {
            Some(description) => write!(f, "{code}: {description}"),
            None => f.write_str(code),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ChartResponse {
    chart: ChartData,
}

#[derive(Debug, Clone, Deserialize)]
struct ChartData {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    #[serde(default)]
    indicators: Option<ChartIndicators>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    currency: Option<String>,
    #[serde(rename = "regularMarketPrice", default)]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

fn parse_chart(body: &str) -> Result<Option<ChartResult>, StockchatError> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| StockchatError::market_data(format!("failed to parse yahoo chart: {e}")))?;
    if let Some(error) = response.chart.error {
        return Err(StockchatError::market_data(format!(
            "yahoo chart error: {error}"
        )));
    }
    Ok(response.chart.result.and_then(|r| r.into_iter().next()))
}

fn fast_quote_from_chart(chart: &ChartResult) -> Option<FastQuote> {
    let meta = chart.meta.as_ref()?;
    let quote = FastQuote {
        last_price: meta.regular_market_price.and_then(finite),
        currency: meta.currency.clone().filter(|c| !c.is_empty()),
    };
    (quote.last_price.is_some() || quote.currency.is_some()).then_some(quote)
}

fn history_from_chart(chart: &ChartResult) -> PriceHistory {
    let (Some(timestamps), Some(quote)) = (
        chart.timestamp.as_ref(),
        chart.indicators.as_ref().and_then(|i| i.quote.first()),
    ) else {
        return PriceHistory::empty();
    };

    let at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten().and_then(finite);

    let bars = timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let timestamp = DateTime::from_timestamp(ts, 0)?;
            let bar = OhlcvBar {
                timestamp,
                open: at(&quote.open, i),
                high: at(&quote.high, i),
                low: at(&quote.low, i),
                close: at(&quote.close, i),
                volume: at(&quote.volume, i).map(|v| v.trunc() as i64),
            };
            let any_price =
                bar.open.is_some() || bar.high.is_some() || bar.low.is_some() || bar.close.is_some();
            any_price.then_some(bar)
        })
        .collect();

    PriceHistory::new(bars)
}

#[derive(Debug, Clone, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryData,
}

#[derive(Debug, Clone, Deserialize)]
struct QuoteSummaryData {
    #[serde(default)]
    result: Option<Vec<serde_json::Map<String, Value>>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

/// Merge the summary modules into one flat field map, unwrapping Yahoo's
/// `{"raw": .., "fmt": ..}` number wrappers. Wrappers without `raw` are
/// dropped.
fn flatten_quote_summary(body: &str) -> Result<QuotePayload, StockchatError> {
    let response: QuoteSummaryResponse = serde_json::from_str(body).map_err(|e| {
        StockchatError::market_data(format!("failed to parse yahoo quote summary: {e}"))
    })?;
    if let Some(error) = response.quote_summary.error {
        return Err(StockchatError::market_data(format!(
            "yahoo quote summary error: {error}"
        )));
    }
    let Some(result) = response.quote_summary.result.and_then(|r| r.into_iter().next()) else {
        return Ok(QuotePayload::new());
    };

    let mut payload = QuotePayload::new();
    for module in SUMMARY_MODULES {
        let Some(Value::Object(fields)) = result.get(module) else {
            continue;
        };
        for (key, value) in fields {
            if payload.contains_key(key) {
                continue;
            }
            if let Some(value) = unwrap_raw(value) {
                payload.insert(key.clone(), value);
            }
        }
    }
    Ok(payload)
}

fn unwrap_raw(value: &Value) -> Option<Value> {
    match value {
        Value::Object(wrapper) => wrapper.get("raw").cloned(),
        Value::Array(_) => None,
        other => Some(other.clone()),
    }
}
