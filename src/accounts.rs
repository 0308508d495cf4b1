//! Account lifecycle and cash movements.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::accounting::round_money;
use crate::error::TradeError;
use crate::persistence::{Ledger, SharedLedger};
use crate::types::Account;

/// Cash granted to every freshly opened account.
pub const STARTING_BALANCE: Decimal = dec!(10000.00);

#[derive(Clone)]
pub struct AccountService {
    ledger: SharedLedger,
}

impl AccountService {
    pub fn new(ledger: SharedLedger) -> Self {
        Self { ledger }
    }

    /// Open an account with the starting balance. Username and email are
    /// expected pre-validated and lowercased by the caller.
    pub async fn open(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Account, TradeError> {
        let account = Account {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            balance: STARTING_BALANCE,
            created_at: Utc::now(),
        };
        self.ledger.create_account(&account).await?;
        tracing::info!(user_id = %account.id, username = %account.username, "account opened");
        Ok(account)
    }

    pub async fn get(&self, user_id: Uuid) -> Result<Account, TradeError> {
        self.ledger
            .account_by_id(user_id)
            .await?
            .ok_or(TradeError::AccountNotFound(user_id))
    }

    pub async fn balance(&self, user_id: Uuid) -> Result<Decimal, TradeError> {
        Ok(self.get(user_id).await?.balance)
    }

    /// Add funds. The amount must be strictly positive.
    pub async fn deposit(&self, user_id: Uuid, amount: Decimal) -> Result<Decimal, TradeError> {
        if amount <= Decimal::ZERO {
            return Err(TradeError::InvalidAmount);
        }
        self.ledger
            .adjust_balance(user_id, round_money(amount))
            .await
    }

    /// Withdraw funds. Fails with `InsufficientFunds` rather than letting
    /// the balance go negative.
    pub async fn withdraw(&self, user_id: Uuid, amount: Decimal) -> Result<Decimal, TradeError> {
        if amount <= Decimal::ZERO {
            return Err(TradeError::InvalidAmount);
        }
        self.ledger
            .adjust_balance(user_id, -round_money(amount))
            .await
    }
}
