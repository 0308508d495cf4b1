#![allow(dead_code)]
//! Shared test helpers: an in-memory ledger and a canned price feed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use papertrade::marketdata::{FeedError, PriceFeed};
use papertrade::persistence::{Ledger, MemoryLedger, SharedLedger};
use papertrade::types::{Account, Quote};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Price feed returning fixed quotes; unknown symbols fail with NotFound.
#[derive(Default)]
pub struct StaticFeed {
    prices: HashMap<String, Decimal>,
    previous_closes: HashMap<String, Decimal>,
}

impl StaticFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, symbol: &str, price: Decimal) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }

    pub fn with_previous_close(mut self, symbol: &str, close: Decimal) -> Self {
        self.previous_closes.insert(symbol.to_string(), close);
        self
    }
}

#[async_trait]
impl PriceFeed for StaticFeed {
    async fn quote(&self, symbol: &str) -> Result<Quote, FeedError> {
        let price = self
            .prices
            .get(symbol)
            .copied()
            .ok_or_else(|| FeedError::NotFound(symbol.to_string()))?;
        Ok(Quote {
            symbol: symbol.to_string(),
            current_price: price,
            previous_close: self.previous_closes.get(symbol).copied(),
            high: None,
            low: None,
            open: None,
            as_of: Utc::now(),
        })
    }
}

pub fn fresh_ledger() -> SharedLedger {
    Arc::new(MemoryLedger::new())
}

/// Insert an account with the given balance, bypassing registration.
pub async fn open_account(ledger: &SharedLedger, balance: Decimal) -> Uuid {
    let id = Uuid::new_v4();
    let account = Account {
        id,
        username: format!("user-{id}"),
        email: format!("{id}@example.com"),
        password_hash: "unused".to_string(),
        balance,
        created_at: Utc::now(),
    };
    ledger.create_account(&account).await.unwrap();
    id
}
