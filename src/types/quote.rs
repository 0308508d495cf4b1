use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// A market quote as returned by the price feed. Only the current price is
/// guaranteed; the remaining fields depend on what the provider reports.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub symbol: String,
    pub current_price: Decimal,
    pub previous_close: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub open: Option<Decimal>,
    pub as_of: DateTime<Utc>,
}
