//! Request handlers. Core errors map to HTTP statuses here; the services
//! themselves know nothing about transport.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::api::auth::{self, AuthUser};
use crate::api::routes::AppState;
use crate::engine::normalize_symbol;
use crate::error::TradeError;
use crate::marketdata::{FeedError, PriceFeed};
use crate::persistence::Ledger;
use crate::types::TradeSide;

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.to_string(),
        }
    }

    pub fn unauthorized(message: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.to_string(),
        }
    }

    pub fn conflict(message: &str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.to_string(),
        }
    }

    pub fn internal(message: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<TradeError> for ApiError {
    fn from(err: TradeError) -> Self {
        let status = match &err {
            TradeError::InvalidAmount
            | TradeError::InvalidSymbol
            | TradeError::PriceUnavailable { .. }
            | TradeError::InsufficientFunds { .. }
            | TradeError::InsufficientShares { .. }
            | TradeError::AlreadyWatched { .. }
            | TradeError::NotWatched { .. } => StatusCode::BAD_REQUEST,
            TradeError::PositionNotFound { .. } | TradeError::AccountNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            TradeError::StoreConflict => StatusCode::CONFLICT,
            TradeError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %err, "request failed");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<FeedError> for ApiError {
    fn from(err: FeedError) -> Self {
        let status = match &err {
            FeedError::NotFound(_) => StatusCode::NOT_FOUND,
            FeedError::Unavailable(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

pub async fn health() -> &'static str {
    "healthy"
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_lowercase();
    let email = req.email.trim().to_lowercase();
    if username.is_empty() {
        return Err(ApiError::bad_request("username is required"));
    }
    if email.is_empty() {
        return Err(ApiError::bad_request("email is required"));
    }
    if req.password.is_empty() {
        return Err(ApiError::bad_request("password is required"));
    }

    if state.ledger.account_by_username(&username).await?.is_some() {
        return Err(ApiError::conflict("username already exists"));
    }
    if state.ledger.account_by_email(&email).await?.is_some() {
        return Err(ApiError::conflict("email already exists"));
    }

    let password_hash = auth::hash_password(&req.password)
        .map_err(|_| ApiError::internal("failed to hash password"))?;
    let account = state.accounts().open(&username, &email, &password_hash).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "user_id": account.id,
            "username": account.username,
            "balance": account.balance,
        })),
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_lowercase();
    let account = state
        .ledger
        .account_by_username(&username)
        .await?
        .ok_or_else(|| ApiError::unauthorized("invalid username or password"))?;
    if !auth::verify_password(&req.password, &account.password_hash) {
        return Err(ApiError::unauthorized("invalid username or password"));
    }
    let token = auth::create_token(&state.jwt_secret, account.id)
        .map_err(|_| ApiError::internal("failed to issue token"))?;
    Ok(Json(json!({
        "token": token,
        "user_id": account.id,
        "username": account.username,
    })))
}

pub async fn account(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state.accounts().get(user.user_id).await?;
    Ok(Json(json!({
        "user_id": account.id,
        "username": account.username,
        "email": account.email,
        "balance": account.balance,
    })))
}

#[derive(Deserialize)]
pub struct AmountRequest {
    amount: Decimal,
}

pub async fn deposit(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<AmountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let balance = state.accounts().deposit(user.user_id, req.amount).await?;
    Ok(Json(json!({ "user_id": user.user_id, "balance": balance })))
}

pub async fn withdraw(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<AmountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let balance = state.accounts().withdraw(user.user_id, req.amount).await?;
    Ok(Json(json!({ "user_id": user.user_id, "balance": balance })))
}

#[derive(Deserialize)]
pub struct TradeRequest {
    symbol: String,
    quantity: i64,
}

pub async fn buy(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TradeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .engine()
        .execute(user.user_id, &req.symbol, TradeSide::Buy, req.quantity)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "stock purchased successfully", "transaction": record })),
    ))
}

pub async fn sell(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TradeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .engine()
        .execute(user.user_id, &req.symbol, TradeSide::Sell, req.quantity)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "stock sold successfully", "transaction": record })),
    ))
}

pub async fn portfolio(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let holdings = state.portfolio().holdings(user.user_id).await?;
    Ok(Json(holdings))
}

pub async fn portfolio_value(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state.portfolio().value(user.user_id).await?;
    Ok(Json(summary))
}

#[derive(Deserialize)]
pub struct TransactionsQuery {
    symbol: Option<String>,
}

pub async fn transactions(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<TransactionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let records = state
        .portfolio()
        .transactions(user.user_id, query.symbol.as_deref())
        .await?;
    Ok(Json(records))
}

pub async fn quote(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let symbol = normalize_symbol(&symbol)?;
    let quote = state.feed.quote(&symbol).await?;
    Ok(Json(quote))
}

pub async fn symbol_transactions(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let records = state.portfolio().transactions_for_symbol(&symbol).await?;
    Ok(Json(records))
}

#[derive(Deserialize)]
pub struct WatchRequest {
    symbol: String,
}

pub async fn watch(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<WatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state.watchlist().add(user.user_id, &req.symbol).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "stock added to watchlist", "symbol": entry.symbol })),
    ))
}

pub async fn unwatch(
    user: AuthUser,
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.watchlist().remove(user.user_id, &symbol).await?;
    Ok(Json(json!({ "message": "stock removed from watchlist" })))
}

pub async fn check_watchlist(
    user: AuthUser,
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let symbol = normalize_symbol(&symbol)?;
    let watching = state.watchlist().contains(user.user_id, &symbol).await?;
    Ok(Json(json!({ "symbol": symbol, "in_watchlist": watching })))
}

pub async fn watchlist(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let views = state.watchlist().list(user.user_id).await?;
    Ok(Json(views))
}

pub async fn clear_watchlist(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state.watchlist().clear(user.user_id).await?;
    Ok(Json(json!({ "message": "watchlist cleared", "removed": removed })))
}
