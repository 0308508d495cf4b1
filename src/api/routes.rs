use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};

use crate::accounts::AccountService;
use crate::api::handlers;
use crate::engine::TradeEngine;
use crate::marketdata::PriceFeed;
use crate::persistence::SharedLedger;
use crate::portfolio::PortfolioService;
use crate::watchlist::WatchlistService;

#[derive(Clone)]
pub struct AppState {
    pub ledger: SharedLedger,
    pub feed: Arc<dyn PriceFeed>,
    pub jwt_secret: Vec<u8>,
}

impl AppState {
    pub fn engine(&self) -> TradeEngine {
        TradeEngine::new(self.ledger.clone(), self.feed.clone())
    }

    pub fn accounts(&self) -> AccountService {
        AccountService::new(self.ledger.clone())
    }

    pub fn portfolio(&self) -> PortfolioService {
        PortfolioService::new(self.ledger.clone(), self.feed.clone())
    }

    pub fn watchlist(&self) -> WatchlistService {
        WatchlistService::new(self.ledger.clone(), self.feed.clone())
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/account", get(handlers::account))
        .route("/account/deposit", post(handlers::deposit))
        .route("/account/withdraw", post(handlers::withdraw))
        .route("/trades/buy", post(handlers::buy))
        .route("/trades/sell", post(handlers::sell))
        .route("/portfolio", get(handlers::portfolio))
        .route("/portfolio/value", get(handlers::portfolio_value))
        .route("/transactions", get(handlers::transactions))
        .route("/stocks/{symbol}/quote", get(handlers::quote))
        .route(
            "/stocks/{symbol}/transactions",
            get(handlers::symbol_transactions),
        )
        .route(
            "/watchlist",
            get(handlers::watchlist)
                .post(handlers::watch)
                .delete(handlers::clear_watchlist),
        )
        .route("/watchlist/check/{symbol}", get(handlers::check_watchlist))
        .route("/watchlist/{symbol}", delete(handlers::unwatch))
        .with_state(state)
}
