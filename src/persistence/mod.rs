//! Storage layer: the `Ledger` trait plus Postgres and in-memory backends.

mod memory;
mod postgres;

pub use memory::MemoryLedger;
pub use postgres::PgLedger;
pub use sqlx::PgPool;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::accounting::OrderFill;
use crate::error::TradeError;
use crate::types::{Account, Position, TransactionRecord, WatchlistEntry};

pub type SharedLedger = Arc<dyn Ledger>;

/// Durable storage for accounts, positions, the transaction log, and the
/// watchlist. Implementations must serialize mutations touching the same
/// user: two concurrent orders may not interleave their read-modify-write
/// of a balance or of one position row.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn create_account(&self, account: &Account) -> Result<(), TradeError>;

    async fn account_by_id(&self, user_id: Uuid) -> Result<Option<Account>, TradeError>;

    /// Lookup for login; expects a lowercased username.
    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, TradeError>;

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, TradeError>;

    /// Atomically add `delta` (negative to debit) to the balance and return
    /// the new value. Fails with `InsufficientFunds` instead of ever letting
    /// the balance go negative.
    async fn adjust_balance(&self, user_id: Uuid, delta: Decimal) -> Result<Decimal, TradeError>;

    async fn position(&self, user_id: Uuid, symbol: &str)
    -> Result<Option<Position>, TradeError>;

    async fn positions_for_user(&self, user_id: Uuid) -> Result<Vec<Position>, TradeError>;

    /// The atomic unit of trade execution: load the account and position
    /// under exclusive access, settle the fill, then write the new balance,
    /// the position upsert/delete, and the transaction record together.
    /// Either all three land or none do.
    async fn apply_trade(&self, fill: &OrderFill) -> Result<TransactionRecord, TradeError>;

    /// Most recent first, optionally narrowed to one symbol.
    async fn transactions_for_user(
        &self,
        user_id: Uuid,
        symbol: Option<&str>,
    ) -> Result<Vec<TransactionRecord>, TradeError>;

    async fn transactions_for_symbol(
        &self,
        symbol: &str,
    ) -> Result<Vec<TransactionRecord>, TradeError>;

    /// Returns false if the symbol was already watched.
    async fn add_watch(
        &self,
        user_id: Uuid,
        symbol: &str,
        added_at: DateTime<Utc>,
    ) -> Result<bool, TradeError>;

    /// Returns false if the symbol was not watched.
    async fn remove_watch(&self, user_id: Uuid, symbol: &str) -> Result<bool, TradeError>;

    async fn is_watching(&self, user_id: Uuid, symbol: &str) -> Result<bool, TradeError>;

    async fn watchlist_for_user(&self, user_id: Uuid) -> Result<Vec<WatchlistEntry>, TradeError>;

    /// Returns how many entries were removed.
    async fn clear_watchlist(&self, user_id: Uuid) -> Result<u64, TradeError>;
}
