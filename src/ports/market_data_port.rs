//! Market data access port trait.

use crate::domain::error::StockchatError;
use crate::domain::ohlcv::PriceHistory;
use crate::domain::snapshot::{FastQuote, QuotePayload};

/// Source of quotes, fundamentals and OHLCV history for a ticker.
///
/// Implementations return an empty payload or empty history when the
/// provider simply has nothing; `Err` is reserved for transport failures.
pub trait MarketDataPort {
    fn fetch_info(&self, ticker: &str) -> Result<QuotePayload, StockchatError>;

    fn fetch_fast_quote(&self, ticker: &str) -> Result<Option<FastQuote>, StockchatError>;

    /// `period` and `interval` use the provider vocabulary ("1y", "1d", ...).
    fn fetch_history(
        &self,
        ticker: &str,
        period: &str,
        interval: &str,
    ) -> Result<PriceHistory, StockchatError>;
}
