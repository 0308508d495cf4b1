use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Holding per (user, symbol). Quantity is always positive while the row
/// exists; a position sold down to zero is deleted, not retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    pub user_id: Uuid,
    pub symbol: String,
    pub quantity: i64,
    /// Weighted-average price paid per share, at cent precision.
    pub average_cost: Decimal,
}
