//! Trade execution: validate, price, settle, commit as one atomic unit.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::accounting::{OrderFill, round_money};
use crate::error::TradeError;
use crate::marketdata::PriceFeed;
use crate::persistence::{Ledger, SharedLedger};
use crate::types::{TradeSide, TransactionRecord};

/// Uppercase the ticker, rejecting empty input.
pub fn normalize_symbol(symbol: &str) -> Result<String, TradeError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(TradeError::InvalidSymbol);
    }
    Ok(symbol.to_uppercase())
}

#[derive(Clone)]
pub struct TradeEngine {
    ledger: SharedLedger,
    feed: Arc<dyn PriceFeed>,
}

impl TradeEngine {
    pub fn new(ledger: SharedLedger, feed: Arc<dyn PriceFeed>) -> Self {
        Self { ledger, feed }
    }

    /// Execute a market order at the current quote. On success the balance
    /// debit/credit, the position upsert or delete, and the transaction
    /// record are committed together; on any failure nothing is written.
    pub async fn execute(
        &self,
        user_id: Uuid,
        symbol: &str,
        side: TradeSide,
        quantity: i64,
    ) -> Result<TransactionRecord, TradeError> {
        if quantity <= 0 {
            return Err(TradeError::InvalidAmount);
        }
        let symbol = normalize_symbol(symbol)?;

        // Quote before the ledger takes any lock, so a slow feed can never
        // hold up this user's other orders.
        let quote = self.feed.quote(&symbol).await.map_err(|err| {
            TradeError::PriceUnavailable {
                symbol: symbol.clone(),
                reason: err.to_string(),
            }
        })?;

        let fill_price = round_money(quote.current_price);
        let total_amount = round_money(fill_price * Decimal::from(quantity));

        let fill = OrderFill {
            record_id: Uuid::new_v4(),
            user_id,
            symbol,
            side,
            quantity,
            fill_price,
            total_amount,
            executed_at: Utc::now(),
        };

        let record = self.ledger.apply_trade(&fill).await?;
        tracing::info!(
            user_id = %record.user_id,
            symbol = %record.symbol,
            side = record.side.as_str(),
            quantity = record.quantity,
            fill_price = %record.fill_price,
            total_amount = %record.total_amount,
            "order executed"
        );
        Ok(record)
    }
}
