//! Failure taxonomy for order execution, cash movements, and storage.
//!
//! Every variant is detected before any durable write: a failed operation
//! leaves the account, positions, and transaction log untouched.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TradeError {
    #[error("amount must be positive")]
    InvalidAmount,

    #[error("symbol must be a non-empty ticker")]
    InvalidSymbol,

    #[error("no usable price for {symbol}: {reason}")]
    PriceUnavailable { symbol: String, reason: String },

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("insufficient shares: tried to sell {requested}, holding {held}")]
    InsufficientShares { requested: i64, held: i64 },

    #[error("no open position in {symbol}")]
    PositionNotFound { symbol: String },

    #[error("account {0} not found")]
    AccountNotFound(Uuid),

    #[error("{symbol} is already on the watchlist")]
    AlreadyWatched { symbol: String },

    #[error("{symbol} is not on the watchlist")]
    NotWatched { symbol: String },

    /// Lock contention between concurrent orders for the same user. Nothing
    /// was written; the whole order is safe to retry from the price lookup.
    #[error("concurrent update conflict; retry the order")]
    StoreConflict,

    #[error("storage unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<sqlx::Error> for TradeError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            // 40001 = serialization_failure, 40P01 = deadlock_detected
            if matches!(db.code().as_deref(), Some("40001") | Some("40P01")) {
                return TradeError::StoreConflict;
            }
        }
        TradeError::StoreUnavailable(err.to_string())
    }
}
