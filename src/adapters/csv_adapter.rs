//! CSV price history adapter for offline use.
//!
//! Reads `Date,Open,High,Low,Close,Volume` files as exported by Yahoo
//! Finance. Header names are matched case-insensitively; `Datetime` and
//! `timestamp` are accepted for the date column. Blank, `nan` and `null`
//! cells are gaps. Fundamentals are not available from CSV.

use crate::domain::error::StockchatError;
use crate::domain::ohlcv::{OhlcvBar, PriceHistory};
use crate::domain::snapshot::{FastQuote, QuotePayload};
use crate::ports::market_data_port::MarketDataPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

enum Source {
    /// One file serves every ticker.
    File(PathBuf),
    /// `{TICKER}.csv` inside a directory.
    Dir(PathBuf),
}

pub struct CsvAdapter {
    source: Source,
}

impl CsvAdapter {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::File(path.into()),
        }
    }

    pub fn from_dir(base_path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::Dir(base_path.into()),
        }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        match &self.source {
            Source::File(path) => path.clone(),
            Source::Dir(dir) => dir.join(format!("{}.csv", ticker.trim().to_uppercase())),
        }
    }
}

impl MarketDataPort for CsvAdapter {
    fn fetch_info(&self, _ticker: &str) -> Result<QuotePayload, StockchatError> {
        Ok(QuotePayload::new())
    }

    fn fetch_fast_quote(&self, _ticker: &str) -> Result<Option<FastQuote>, StockchatError> {
        Ok(None)
    }

    /// The file holds whatever window it was exported with; `period` and
    /// `interval` are not applied.
    fn fetch_history(
        &self,
        ticker: &str,
        _period: &str,
        _interval: &str,
    ) -> Result<PriceHistory, StockchatError> {
        let path = self.csv_path(ticker);
        if matches!(self.source, Source::Dir(_)) && !path.exists() {
            tracing::debug!(ticker, path = %path.display(), "no csv history for ticker");
            return Ok(PriceHistory::empty());
        }
        read_history(&path)
    }
}

pub fn read_history(path: &Path) -> Result<PriceHistory, StockchatError> {
    let content = fs::read_to_string(path).map_err(|e| {
        StockchatError::market_data(format!("failed to read {}: {}", path.display(), e))
    })?;
    parse_history(&content)
}

struct Columns {
    date: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    close: Option<usize>,
    volume: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, StockchatError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        let date = find(&["date", "datetime", "timestamp"])
            .ok_or_else(|| StockchatError::market_data("missing date column"))?;
        Ok(Self {
            date,
            open: find(&["open"]),
            high: find(&["high"]),
            low: find(&["low"]),
            close: find(&["close", "adj close"]),
            volume: find(&["volume"]),
        })
    }
}

pub fn parse_history(content: &str) -> Result<PriceHistory, StockchatError> {
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| StockchatError::market_data(format!("CSV parse error: {}", e)))?
        .clone();
    let columns = Columns::from_headers(&headers)?;

    let mut bars = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let line = row + 2;
        let record = result
            .map_err(|e| StockchatError::market_data(format!("CSV parse error: {}", e)))?;

        let date_str = record.get(columns.date).unwrap_or_default();
        let timestamp = parse_timestamp(date_str).ok_or_else(|| {
            StockchatError::market_data(format!("line {line}: invalid date {date_str:?}"))
        })?;

        let price = |column: Option<usize>, name: &str| -> Result<Option<f64>, StockchatError> {
            match column.and_then(|c| record.get(c)) {
                Some(cell) => parse_cell(cell).map_err(|_| {
                    StockchatError::market_data(format!("line {line}: invalid {name} value {cell:?}"))
                }),
                None => Ok(None),
            }
        };

        bars.push(OhlcvBar {
            timestamp,
            open: price(columns.open, "open")?,
            high: price(columns.high, "high")?,
            low: price(columns.low, "low")?,
            close: price(columns.close, "close")?,
            volume: price(columns.volume, "volume")?.map(|v| v.trunc() as i64),
        });
    }

    Ok(PriceHistory::new(bars))
}

fn parse_cell(cell: &str) -> Result<Option<f64>, std::num::ParseFloatError> {
    let cell = cell.trim();
    if cell.is_empty() || ["nan", "null"].contains(&cell.to_lowercase().as_str()) {
        return Ok(None);
    }
    let value: f64 = cell.parse()?;
    Ok(value.is_finite().then_some(value))
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
