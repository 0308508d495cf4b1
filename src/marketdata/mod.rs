//! Market data: the `PriceFeed` capability and the Finnhub-backed client.

pub mod finnhub;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::Quote;

pub use finnhub::FinnhubFeed;

#[derive(Debug, Error)]
pub enum FeedError {
    /// The provider does not know the symbol, or returned no usable price.
    /// A zero current price counts as unusable, never as a real quote.
    #[error("symbol {0} not found or has no usable price")]
    NotFound(String),

    #[error("market data unavailable: {0}")]
    Unavailable(String),
}

/// Source of live quotes. Symbols are compared case-insensitively by the
/// provider; callers normalize to uppercase before the call.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn quote(&self, symbol: &str) -> Result<Quote, FeedError>;

    async fn current_price(&self, symbol: &str) -> Result<Decimal, FeedError> {
        Ok(self.quote(symbol).await?.current_price)
    }
}
