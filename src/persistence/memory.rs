//! In-memory ledger, used by the test suite and when no database is
//! configured. The single write lock makes every mutation an atomic unit,
//! which also gives per-user serialization for free.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::accounting::{self, OrderFill, PositionUpdate};
use crate::error::TradeError;
use crate::persistence::Ledger;
use crate::types::{Account, Position, TransactionRecord, WatchlistEntry};

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<Uuid, Account>,
    positions: HashMap<(Uuid, String), Position>,
    transactions: Vec<TransactionRecord>,
    watchlist: HashMap<(Uuid, String), WatchlistEntry>,
}

#[derive(Default)]
pub struct MemoryLedger {
    state: RwLock<LedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn create_account(&self, account: &Account) -> Result<(), TradeError> {
        let mut state = self.state.write().await;
        state.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn account_by_id(&self, user_id: Uuid) -> Result<Option<Account>, TradeError> {
        let state = self.state.read().await;
        Ok(state.accounts.get(&user_id).cloned())
    }

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, TradeError> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, TradeError> {
        let state = self.state.read().await;
        Ok(state.accounts.values().find(|a| a.email == email).cloned())
    }

    async fn adjust_balance(&self, user_id: Uuid, delta: Decimal) -> Result<Decimal, TradeError> {
        let mut state = self.state.write().await;
        let account = state
            .accounts
            .get_mut(&user_id)
            .ok_or(TradeError::AccountNotFound(user_id))?;
        let new_balance = account.balance + delta;
        if new_balance < Decimal::ZERO {
            return Err(TradeError::InsufficientFunds {
                required: -delta,
                available: account.balance,
            });
        }
        account.balance = new_balance;
        Ok(new_balance)
    }

    async fn position(
        &self,
        user_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Position>, TradeError> {
        let state = self.state.read().await;
        Ok(state
            .positions
            .get(&(user_id, symbol.to_string()))
            .cloned())
    }

    async fn positions_for_user(&self, user_id: Uuid) -> Result<Vec<Position>, TradeError> {
        let state = self.state.read().await;
        let mut positions: Vec<Position> = state
            .positions
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(positions)
    }

    async fn apply_trade(&self, fill: &OrderFill) -> Result<TransactionRecord, TradeError> {
        let mut state = self.state.write().await;

        let balance = state
            .accounts
            .get(&fill.user_id)
            .ok_or(TradeError::AccountNotFound(fill.user_id))?
            .balance;
        let key = (fill.user_id, fill.symbol.clone());
        let settlement = accounting::settle(balance, state.positions.get(&key), fill)?;

        // Settlement succeeded; apply all three writes before releasing the lock.
        if let Some(account) = state.accounts.get_mut(&fill.user_id) {
            account.balance = settlement.new_balance;
        }
        match settlement.position {
            PositionUpdate::Set {
                quantity,
                average_cost,
            } => {
                state.positions.insert(
                    key,
                    Position {
                        user_id: fill.user_id,
                        symbol: fill.symbol.clone(),
                        quantity,
                        average_cost,
                    },
                );
            }
            PositionUpdate::Delete => {
                state.positions.remove(&key);
            }
        }
        let record = fill.record();
        state.transactions.push(record.clone());
        Ok(record)
    }

    async fn transactions_for_user(
        &self,
        user_id: Uuid,
        symbol: Option<&str>,
    ) -> Result<Vec<TransactionRecord>, TradeError> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id && symbol.is_none_or(|s| t.symbol == s))
            .cloned()
            .collect())
    }

    async fn transactions_for_symbol(
        &self,
        symbol: &str,
    ) -> Result<Vec<TransactionRecord>, TradeError> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .iter()
            .rev()
            .filter(|t| t.symbol == symbol)
            .cloned()
            .collect())
    }

    async fn add_watch(
        &self,
        user_id: Uuid,
        symbol: &str,
        added_at: DateTime<Utc>,
    ) -> Result<bool, TradeError> {
        let mut state = self.state.write().await;
        let key = (user_id, symbol.to_string());
        if state.watchlist.contains_key(&key) {
            return Ok(false);
        }
        state.watchlist.insert(
            key,
            WatchlistEntry {
                user_id,
                symbol: symbol.to_string(),
                added_at,
            },
        );
        Ok(true)
    }

    async fn remove_watch(&self, user_id: Uuid, symbol: &str) -> Result<bool, TradeError> {
        let mut state = self.state.write().await;
        Ok(state
            .watchlist
            .remove(&(user_id, symbol.to_string()))
            .is_some())
    }

    async fn is_watching(&self, user_id: Uuid, symbol: &str) -> Result<bool, TradeError> {
        let state = self.state.read().await;
        Ok(state
            .watchlist
            .contains_key(&(user_id, symbol.to_string())))
    }

    async fn watchlist_for_user(&self, user_id: Uuid) -> Result<Vec<WatchlistEntry>, TradeError> {
        let state = self.state.read().await;
        let mut entries: Vec<WatchlistEntry> = state
            .watchlist
            .values()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.added_at.cmp(&b.added_at));
        Ok(entries)
    }

    async fn clear_watchlist(&self, user_id: Uuid) -> Result<u64, TradeError> {
        let mut state = self.state.write().await;
        let before = state.watchlist.len();
        state.watchlist.retain(|(uid, _), _| *uid != user_id);
        Ok((before - state.watchlist.len()) as u64)
    }
}
