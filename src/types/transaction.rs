use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "BUY" => Some(TradeSide::Buy),
            "SELL" => Some(TradeSide::Sell),
            _ => None,
        }
    }
}

/// One executed order. Written in the same transaction as the balance and
/// position mutations it describes, and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: i64,
    pub fill_price: Decimal,
    pub total_amount: Decimal,
    pub executed_at: DateTime<Utc>,
}
