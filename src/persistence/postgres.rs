//! Postgres ledger. Trade execution runs in a single transaction with the
//! account and position rows locked, so concurrent orders for one user
//! serialize while different users proceed in parallel.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::accounting::{self, OrderFill, PositionUpdate};
use crate::error::TradeError;
use crate::persistence::Ledger;
use crate::types::{Account, Position, TradeSide, TransactionRecord, WatchlistEntry};

pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    /// Connect, run embedded migrations, and wrap the pool.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(FromRow)]
struct AccountRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    balance: Decimal,
    created_at: DateTime<Utc>,
}

fn to_account(row: AccountRow) -> Account {
    Account {
        id: row.id,
        username: row.username,
        email: row.email,
        password_hash: row.password_hash,
        balance: row.balance,
        created_at: row.created_at,
    }
}

#[derive(FromRow)]
struct PositionRow {
    user_id: Uuid,
    symbol: String,
    quantity: i64,
    average_cost: Decimal,
}

fn to_position(row: PositionRow) -> Position {
    Position {
        user_id: row.user_id,
        symbol: row.symbol,
        quantity: row.quantity,
        average_cost: row.average_cost,
    }
}

#[derive(FromRow)]
struct TransactionRow {
    id: Uuid,
    user_id: Uuid,
    symbol: String,
    side: String,
    quantity: i64,
    fill_price: Decimal,
    total_amount: Decimal,
    executed_at: DateTime<Utc>,
}

fn to_record(row: TransactionRow) -> Result<TransactionRecord, TradeError> {
    let side = TradeSide::parse(&row.side)
        .ok_or_else(|| TradeError::StoreUnavailable(format!("unknown trade side {}", row.side)))?;
    Ok(TransactionRecord {
        id: row.id,
        user_id: row.user_id,
        symbol: row.symbol,
        side,
        quantity: row.quantity,
        fill_price: row.fill_price,
        total_amount: row.total_amount,
        executed_at: row.executed_at,
    })
}

const SELECT_ACCOUNT: &str =
    "SELECT id, username, email, password_hash, balance, created_at FROM accounts";
const SELECT_TRANSACTIONS: &str =
    "SELECT id, user_id, symbol, side, quantity, fill_price, total_amount, executed_at \
     FROM transactions";

#[async_trait]
impl Ledger for PgLedger {
    async fn create_account(&self, account: &Account) -> Result<(), TradeError> {
        sqlx::query(
            "INSERT INTO accounts (id, username, email, password_hash, balance, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.balance)
        .bind(account.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn account_by_id(&self, user_id: Uuid) -> Result<Option<Account>, TradeError> {
        let row =
            sqlx::query_as::<_, AccountRow>(&format!("{SELECT_ACCOUNT} WHERE id = $1"))
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(to_account))
    }

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, TradeError> {
        let row =
            sqlx::query_as::<_, AccountRow>(&format!("{SELECT_ACCOUNT} WHERE username = $1"))
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(to_account))
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, TradeError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!("{SELECT_ACCOUNT} WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(to_account))
    }

    async fn adjust_balance(&self, user_id: Uuid, delta: Decimal) -> Result<Decimal, TradeError> {
        // One conditional UPDATE keeps check and mutation atomic.
        let updated = sqlx::query_scalar::<_, Decimal>(
            "UPDATE accounts SET balance = balance + $2 \
             WHERE id = $1 AND balance + $2 >= 0 RETURNING balance",
        )
        .bind(user_id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(balance) => Ok(balance),
            None => {
                let available =
                    sqlx::query_scalar::<_, Decimal>("SELECT balance FROM accounts WHERE id = $1")
                        .bind(user_id)
                        .fetch_optional(&self.pool)
                        .await?
                        .ok_or(TradeError::AccountNotFound(user_id))?;
                Err(TradeError::InsufficientFunds {
                    required: -delta,
                    available,
                })
            }
        }
    }

    async fn position(
        &self,
        user_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Position>, TradeError> {
        let row = sqlx::query_as::<_, PositionRow>(
            "SELECT user_id, symbol, quantity, average_cost FROM positions \
             WHERE user_id = $1 AND symbol = $2",
        )
        .bind(user_id)
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(to_position))
    }

    async fn positions_for_user(&self, user_id: Uuid) -> Result<Vec<Position>, TradeError> {
        let rows = sqlx::query_as::<_, PositionRow>(
            "SELECT user_id, symbol, quantity, average_cost FROM positions \
             WHERE user_id = $1 ORDER BY symbol",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(to_position).collect())
    }

    async fn apply_trade(&self, fill: &OrderFill) -> Result<TransactionRecord, TradeError> {
        let mut tx = self.pool.begin().await?;

        // Lock the account row first, then the position row. Every writer
        // takes the locks in this order, so same-user orders cannot deadlock.
        let balance = sqlx::query_scalar::<_, Decimal>(
            "SELECT balance FROM accounts WHERE id = $1 FOR UPDATE",
        )
        .bind(fill.user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(TradeError::AccountNotFound(fill.user_id))?;

        let position = sqlx::query_as::<_, PositionRow>(
            "SELECT user_id, symbol, quantity, average_cost FROM positions \
             WHERE user_id = $1 AND symbol = $2 FOR UPDATE",
        )
        .bind(fill.user_id)
        .bind(&fill.symbol)
        .fetch_optional(&mut *tx)
        .await?
        .map(to_position);

        let settlement = accounting::settle(balance, position.as_ref(), fill)?;

        sqlx::query("UPDATE accounts SET balance = $2 WHERE id = $1")
            .bind(fill.user_id)
            .bind(settlement.new_balance)
            .execute(&mut *tx)
            .await?;

        match settlement.position {
            PositionUpdate::Set {
                quantity,
                average_cost,
            } => {
                sqlx::query(
                    "INSERT INTO positions (user_id, symbol, quantity, average_cost) \
                     VALUES ($1, $2, $3, $4) \
                     ON CONFLICT (user_id, symbol) DO UPDATE SET quantity = $3, average_cost = $4",
                )
                .bind(fill.user_id)
                .bind(&fill.symbol)
                .bind(quantity)
                .bind(average_cost)
                .execute(&mut *tx)
                .await?;
            }
            PositionUpdate::Delete => {
                sqlx::query("DELETE FROM positions WHERE user_id = $1 AND symbol = $2")
                    .bind(fill.user_id)
                    .bind(&fill.symbol)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let record = fill.record();
        sqlx::query(
            "INSERT INTO transactions \
             (id, user_id, symbol, side, quantity, fill_price, total_amount, executed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.symbol)
        .bind(record.side.as_str())
        .bind(record.quantity)
        .bind(record.fill_price)
        .bind(record.total_amount)
        .bind(record.executed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn transactions_for_user(
        &self,
        user_id: Uuid,
        symbol: Option<&str>,
    ) -> Result<Vec<TransactionRecord>, TradeError> {
        let rows = if let Some(symbol) = symbol {
            sqlx::query_as::<_, TransactionRow>(&format!(
                "{SELECT_TRANSACTIONS} WHERE user_id = $1 AND symbol = $2 \
                 ORDER BY executed_at DESC"
            ))
            .bind(user_id)
            .bind(symbol)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, TransactionRow>(&format!(
                "{SELECT_TRANSACTIONS} WHERE user_id = $1 ORDER BY executed_at DESC"
            ))
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?
        };
        rows.into_iter().map(to_record).collect()
    }

    async fn transactions_for_symbol(
        &self,
        symbol: &str,
    ) -> Result<Vec<TransactionRecord>, TradeError> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "{SELECT_TRANSACTIONS} WHERE symbol = $1 ORDER BY executed_at DESC"
        ))
        .bind(symbol)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(to_record).collect()
    }

    async fn add_watch(
        &self,
        user_id: Uuid,
        symbol: &str,
        added_at: DateTime<Utc>,
    ) -> Result<bool, TradeError> {
        let result = sqlx::query(
            "INSERT INTO watchlist (user_id, symbol, added_at) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, symbol) DO NOTHING",
        )
        .bind(user_id)
        .bind(symbol)
        .bind(added_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_watch(&self, user_id: Uuid, symbol: &str) -> Result<bool, TradeError> {
        let result = sqlx::query("DELETE FROM watchlist WHERE user_id = $1 AND symbol = $2")
            .bind(user_id)
            .bind(symbol)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn is_watching(&self, user_id: Uuid, symbol: &str) -> Result<bool, TradeError> {
        let watching = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM watchlist WHERE user_id = $1 AND symbol = $2)",
        )
        .bind(user_id)
        .bind(symbol)
        .fetch_one(&self.pool)
        .await?;
        Ok(watching)
    }

    async fn watchlist_for_user(&self, user_id: Uuid) -> Result<Vec<WatchlistEntry>, TradeError> {
        #[derive(FromRow)]
        struct WatchRow {
            user_id: Uuid,
            symbol: String,
            added_at: DateTime<Utc>,
        }

        let rows = sqlx::query_as::<_, WatchRow>(
            "SELECT user_id, symbol, added_at FROM watchlist \
             WHERE user_id = $1 ORDER BY added_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| WatchlistEntry {
                user_id: row.user_id,
                symbol: row.symbol,
                added_at: row.added_at,
            })
            .collect())
    }

    async fn clear_watchlist(&self, user_id: Uuid) -> Result<u64, TradeError> {
        let result = sqlx::query("DELETE FROM watchlist WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
