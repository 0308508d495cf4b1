//! Watchlist: tracked symbols enriched with current quotes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;
use uuid::Uuid;

use crate::engine::normalize_symbol;
use crate::error::TradeError;
use crate::marketdata::PriceFeed;
use crate::persistence::{Ledger, SharedLedger};
use crate::types::WatchlistEntry;

/// A watched symbol with its latest quote. Price fields are null when the
/// feed could not price the symbol.
#[derive(Debug, Clone, Serialize)]
pub struct WatchlistView {
    pub symbol: String,
    pub added_at: DateTime<Utc>,
    pub current_price: Option<Decimal>,
    pub change: Option<Decimal>,
    pub change_percent: Option<Decimal>,
}

#[derive(Clone)]
pub struct WatchlistService {
    ledger: SharedLedger,
    feed: Arc<dyn PriceFeed>,
}

impl WatchlistService {
    pub fn new(ledger: SharedLedger, feed: Arc<dyn PriceFeed>) -> Self {
        Self { ledger, feed }
    }

    /// Track a symbol. Only symbols the feed can actually quote may be
    /// watched; duplicates are refused.
    pub async fn add(&self, user_id: Uuid, symbol: &str) -> Result<WatchlistEntry, TradeError> {
        let symbol = normalize_symbol(symbol)?;
        self.feed
            .current_price(&symbol)
            .await
            .map_err(|err| TradeError::PriceUnavailable {
                symbol: symbol.clone(),
                reason: err.to_string(),
            })?;

        let entry = WatchlistEntry {
            user_id,
            symbol: symbol.clone(),
            added_at: Utc::now(),
        };
        if !self
            .ledger
            .add_watch(user_id, &symbol, entry.added_at)
            .await?
        {
            return Err(TradeError::AlreadyWatched { symbol });
        }
        Ok(entry)
    }

    pub async fn remove(&self, user_id: Uuid, symbol: &str) -> Result<(), TradeError> {
        let symbol = normalize_symbol(symbol)?;
        if !self.ledger.remove_watch(user_id, &symbol).await? {
            return Err(TradeError::NotWatched { symbol });
        }
        Ok(())
    }

    pub async fn contains(&self, user_id: Uuid, symbol: &str) -> Result<bool, TradeError> {
        let symbol = normalize_symbol(symbol)?;
        self.ledger.is_watching(user_id, &symbol).await
    }

    pub async fn clear(&self, user_id: Uuid) -> Result<u64, TradeError> {
        self.ledger.clear_watchlist(user_id).await
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<WatchlistView>, TradeError> {
        let entries = self.ledger.watchlist_for_user(user_id).await?;
        let mut views = Vec::with_capacity(entries.len());
        for entry in entries {
            let view = match self.feed.quote(&entry.symbol).await {
                Ok(quote) => {
                    let (change, change_percent) = match quote.previous_close {
                        Some(previous) if previous > Decimal::ZERO => {
                            let change = quote.current_price - previous;
                            let percent = (change / previous).round_dp_with_strategy(
                                4,
                                RoundingStrategy::MidpointAwayFromZero,
                            ) * dec!(100);
                            (Some(change), Some(percent))
                        }
                        _ => (None, None),
                    };
                    WatchlistView {
                        symbol: entry.symbol,
                        added_at: entry.added_at,
                        current_price: Some(quote.current_price),
                        change,
                        change_percent,
                    }
                }
                Err(err) => {
                    tracing::warn!(symbol = %entry.symbol, error = %err, "quote failed for watchlist entry");
                    WatchlistView {
                        symbol: entry.symbol,
                        added_at: entry.added_at,
                        current_price: None,
                        change: None,
                        change_percent: None,
                    }
                }
            };
            views.push(view);
        }
        Ok(views)
    }
}
