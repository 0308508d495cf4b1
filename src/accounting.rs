//! Pure settlement math: balance checks, average-cost recompute, position
//! lifecycle. Testable without storage or HTTP.
//!
//! All money amounts are `Decimal` at cent precision, rounded half-up.
//! The average-cost recompute uses the pre-trade average and pre-trade
//! quantity and rounds exactly once, at the end.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::error::TradeError;
use crate::types::{Position, TradeSide, TransactionRecord};

/// Fractional digits used for every stored money amount.
pub const MONEY_SCALE: u32 = 2;

/// Round half-up to cent precision and normalize the scale, so equal
/// amounts always compare and serialize identically.
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// A priced order, ready to settle. The id and timestamp are assigned by
/// the caller before settlement so the resulting record is deterministic.
#[derive(Debug, Clone)]
pub struct OrderFill {
    pub record_id: Uuid,
    pub user_id: Uuid,
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: i64,
    pub fill_price: Decimal,
    pub total_amount: Decimal,
    pub executed_at: DateTime<Utc>,
}

impl OrderFill {
    pub fn record(&self) -> TransactionRecord {
        TransactionRecord {
            id: self.record_id,
            user_id: self.user_id,
            symbol: self.symbol.clone(),
            side: self.side,
            quantity: self.quantity,
            fill_price: self.fill_price,
            total_amount: self.total_amount,
            executed_at: self.executed_at,
        }
    }
}

/// What the ledger must do to the position row after a fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionUpdate {
    Set { quantity: i64, average_cost: Decimal },
    Delete,
}

/// The full effect of a fill on one user's rows.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub new_balance: Decimal,
    pub position: PositionUpdate,
}

/// Decide how a fill changes the balance and the position, or fail without
/// deciding anything. Callers run this inside their atomic unit, against
/// rows they have exclusive access to.
pub fn settle(
    balance: Decimal,
    position: Option<&Position>,
    fill: &OrderFill,
) -> Result<Settlement, TradeError> {
    match fill.side {
        TradeSide::Buy => {
            if balance < fill.total_amount {
                return Err(TradeError::InsufficientFunds {
                    required: fill.total_amount,
                    available: balance,
                });
            }
            let new_balance = balance - fill.total_amount;
            let position = match position {
                None => PositionUpdate::Set {
                    quantity: fill.quantity,
                    average_cost: fill.fill_price,
                },
                Some(held) => {
                    let new_quantity = held.quantity + fill.quantity;
                    let total_cost =
                        held.average_cost * Decimal::from(held.quantity) + fill.total_amount;
                    PositionUpdate::Set {
                        quantity: new_quantity,
                        average_cost: round_money(total_cost / Decimal::from(new_quantity)),
                    }
                }
            };
            Ok(Settlement {
                new_balance,
                position,
            })
        }
        TradeSide::Sell => {
            let held = position.ok_or_else(|| TradeError::PositionNotFound {
                symbol: fill.symbol.clone(),
            })?;
            if held.quantity < fill.quantity {
                return Err(TradeError::InsufficientShares {
                    requested: fill.quantity,
                    held: held.quantity,
                });
            }
            let new_balance = balance + fill.total_amount;
            let remaining = held.quantity - fill.quantity;
            let position = if remaining == 0 {
                PositionUpdate::Delete
            } else {
                // Selling never moves the cost basis of what remains.
                PositionUpdate::Set {
                    quantity: remaining,
                    average_cost: held.average_cost,
                }
            };
            Ok(Settlement {
                new_balance,
                position,
            })
        }
    }
}

/// Paper gain/loss on an open position at the given price.
pub fn unrealized_pnl(position: &Position, current_price: Decimal) -> Decimal {
    (current_price - position.average_cost) * Decimal::from(position.quantity)
}
