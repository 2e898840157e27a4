use crate::models::record::{Exchange, MarketSummary, SecurityQuote};
use crate::errors::Result;
use crate::util::TradingDate;
use async_trait::async_trait;

/// Base trait for per-exchange daily scrapers
#[async_trait]
pub trait ExchangeScraper: Send + Sync {
    /// Get the exchange this scraper is for
    fn exchange(&self) -> Exchange;

    /// Market-wide institutional summary, if this exchange publishes the one
    /// the log uses
    async fn fetch_market_summary(&self, _date: &TradingDate) -> Result<Option<MarketSummary>> {
        Ok(None)
    }

    /// Fetch close and institutional figures for the given symbols.
    /// Returns one quote per symbol, same order, empty figures where the
    /// exchange has not published anything for the date.
    async fn fetch_quotes(&self, date: &TradingDate, symbols: &[String]) -> Result<Vec<SecurityQuote>>;
}
