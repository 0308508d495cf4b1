//! Finnhub quote client over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::marketdata::{FeedError, PriceFeed};
use crate::types::Quote;

/// Quotes must resolve quickly: a slow feed may never hold up an order,
/// let alone a locked account row.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct FinnhubFeed {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FinnhubFeed {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FeedError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

/// Finnhub's `/quote` payload uses single-letter keys.
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(rename = "c")]
    current: Option<Decimal>,
    #[serde(rename = "pc")]
    previous_close: Option<Decimal>,
    #[serde(rename = "h")]
    high: Option<Decimal>,
    #[serde(rename = "l")]
    low: Option<Decimal>,
    #[serde(rename = "o")]
    open: Option<Decimal>,
    #[serde(rename = "t")]
    timestamp: Option<i64>,
}

#[async_trait]
impl PriceFeed for FinnhubFeed {
    async fn quote(&self, symbol: &str) -> Result<Quote, FeedError> {
        let url = format!("{}/quote", self.base_url);
        tracing::debug!(symbol = %symbol, "fetching quote");

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("token", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| FeedError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FeedError::Unavailable(format!(
                "quote endpoint returned {}",
                response.status()
            )));
        }

        let raw: QuoteResponse = response
            .json()
            .await
            .map_err(|e| FeedError::Unavailable(e.to_string()))?;

        // Finnhub reports unknown symbols as an all-zero quote.
        let current_price = match raw.current {
            Some(price) if price > Decimal::ZERO => price,
            _ => return Err(FeedError::NotFound(symbol.to_string())),
        };

        let as_of = raw
            .timestamp
            .and_then(|t| DateTime::from_timestamp(t, 0))
            .unwrap_or_else(Utc::now);

        Ok(Quote {
            symbol: symbol.to_string(),
            current_price,
            previous_close: raw.previous_close.filter(|p| *p > Decimal::ZERO),
            high: raw.high,
            low: raw.low,
            open: raw.open,
            as_of,
        })
    }
}
