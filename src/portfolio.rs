//! Portfolio valuation and trade history.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::accounting::{round_money, unrealized_pnl};
use crate::engine::normalize_symbol;
use crate::error::TradeError;
use crate::marketdata::PriceFeed;
use crate::persistence::{Ledger, SharedLedger};
use crate::types::TransactionRecord;

/// One holding priced at the current quote. When the feed cannot price a
/// symbol, the position is valued at its average cost instead: the row then
/// shows zero unrealized P/L rather than failing the whole portfolio.
#[derive(Debug, Clone, Serialize)]
pub struct PositionView {
    pub symbol: String,
    pub quantity: i64,
    pub average_cost: Decimal,
    pub current_price: Decimal,
    pub market_value: Decimal,
    pub unrealized_pnl: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioSummary {
    pub market_value: Decimal,
    pub unrealized_pnl: Decimal,
}

#[derive(Clone)]
pub struct PortfolioService {
    ledger: SharedLedger,
    feed: Arc<dyn PriceFeed>,
}

impl PortfolioService {
    pub fn new(ledger: SharedLedger, feed: Arc<dyn PriceFeed>) -> Self {
        Self { ledger, feed }
    }

    pub async fn holdings(&self, user_id: Uuid) -> Result<Vec<PositionView>, TradeError> {
        let positions = self.ledger.positions_for_user(user_id).await?;
        let mut views = Vec::with_capacity(positions.len());
        for position in positions {
            let quantity = Decimal::from(position.quantity);
            let view = match self.feed.quote(&position.symbol).await {
                Ok(quote) => {
                    let current_price = round_money(quote.current_price);
                    PositionView {
                        symbol: position.symbol.clone(),
                        quantity: position.quantity,
                        average_cost: position.average_cost,
                        current_price,
                        market_value: current_price * quantity,
                        unrealized_pnl: unrealized_pnl(&position, current_price),
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        symbol = %position.symbol,
                        error = %err,
                        "quote failed; valuing position at average cost"
                    );
                    PositionView {
                        symbol: position.symbol.clone(),
                        quantity: position.quantity,
                        average_cost: position.average_cost,
                        current_price: position.average_cost,
                        market_value: position.average_cost * quantity,
                        unrealized_pnl: Decimal::ZERO,
                    }
                }
            };
            views.push(view);
        }
        Ok(views)
    }

    /// Total market value and unrealized P/L across all holdings. Feed
    /// outages degrade to average-cost valuation per holding, so the sums
    /// stay available.
    pub async fn value(&self, user_id: Uuid) -> Result<PortfolioSummary, TradeError> {
        let holdings = self.holdings(user_id).await?;
        let mut summary = PortfolioSummary {
            market_value: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
        };
        for view in &holdings {
            summary.market_value += view.market_value;
            summary.unrealized_pnl += view.unrealized_pnl;
        }
        Ok(summary)
    }

    pub async fn transactions(
        &self,
        user_id: Uuid,
        symbol: Option<&str>,
    ) -> Result<Vec<TransactionRecord>, TradeError> {
        let normalized = symbol.map(normalize_symbol).transpose()?;
        self.ledger
            .transactions_for_user(user_id, normalized.as_deref())
            .await
    }

    pub async fn transactions_for_symbol(
        &self,
        symbol: &str,
    ) -> Result<Vec<TransactionRecord>, TradeError> {
        let symbol = normalize_symbol(symbol)?;
        self.ledger.transactions_for_symbol(&symbol).await
    }
}
