use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// A registered user and their cash balance. The balance is only ever
/// mutated through the ledger's balance primitive and stays >= 0 after
/// every committed operation.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: Uuid,
    /// Stored lowercase; lookups expect the caller to lowercase first.
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}
