//! HTTP integration tests: register, login, trading, portfolio, and the
//! watchlist, driven end to end with reqwest against a spawned server.

mod common;

use std::sync::Arc;

use common::StaticFeed;
use papertrade::api::routes::{AppState, app_router};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn test_state(feed: StaticFeed) -> AppState {
    AppState {
        ledger: common::fresh_ledger(),
        feed: Arc::new(feed),
        jwt_secret: b"test-jwt-secret".to_vec(),
    }
}

/// Spawn the app on a random port and return (base_url, guard that keeps
/// the server running).
async fn spawn_app(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);
    let app = app_router(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (base_url, handle)
}

async fn register_and_login(
    client: &reqwest::Client,
    base_url: &str,
    username: &str,
) -> String {
    let res = client
        .post(format!("{}/auth/register", base_url))
        .json(&serde_json::json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "secret123",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 201);

    let res = client
        .post(format!("{}/auth/login", base_url))
        .json(&serde_json::json!({ "username": username, "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    json["token"].as_str().unwrap().to_string()
}

fn decimal_field(value: &serde_json::Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn register_returns_201_with_starting_balance() {
    let (base_url, _handle) = spawn_app(test_state(StaticFeed::new())).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/register", base_url))
        .json(&serde_json::json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "secret123",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 201);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json["user_id"].as_str().is_some());
    assert_eq!(json["username"].as_str(), Some("alice"));
    assert_eq!(decimal_field(&json["balance"]), dec!(10000.00));
}

#[tokio::test]
async fn register_missing_fields_returns_400() {
    let (base_url, _handle) = spawn_app(test_state(StaticFeed::new())).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/register", base_url))
        .json(&serde_json::json!({ "username": "", "email": "a@b.com", "password": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("required"));
}

#[tokio::test]
async fn register_duplicate_username_returns_409() {
    let (base_url, _handle) = spawn_app(test_state(StaticFeed::new())).await;
    let client = reqwest::Client::new();

    for expected in [201, 409] {
        let res = client
            .post(format!("{}/auth/register", base_url))
            .json(&serde_json::json!({
                "username": "bob",
                "email": format!("bob{expected}@example.com"),
                "password": "secret123",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), expected);
    }
}

#[tokio::test]
async fn login_with_wrong_password_returns_401() {
    let (base_url, _handle) = spawn_app(test_state(StaticFeed::new())).await;
    let client = reqwest::Client::new();
    register_and_login(&client, &base_url, "carol").await;

    let res = client
        .post(format!("{}/auth/login", base_url))
        .json(&serde_json::json!({ "username": "carol", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn protected_routes_require_bearer_token() {
    let (base_url, _handle) = spawn_app(test_state(StaticFeed::new())).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/account", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);

    let res = client
        .get(format!("{}/portfolio", base_url))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn buy_updates_balance_portfolio_and_history() {
    let feed = StaticFeed::new().with_price("AAPL", dec!(100.00));
    let (base_url, _handle) = spawn_app(test_state(feed)).await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &base_url, "dave").await;

    let res = client
        .post(format!("{}/trades/buy", base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "symbol": "aapl", "quantity": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 201);
    let json: serde_json::Value = res.json().await.unwrap();
    let transaction = &json["transaction"];
    assert_eq!(transaction["symbol"].as_str(), Some("AAPL"));
    assert_eq!(transaction["side"].as_str(), Some("BUY"));
    assert_eq!(decimal_field(&transaction["total_amount"]), dec!(1000.00));

    let res = client
        .get(format!("{}/account", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(decimal_field(&json["balance"]), dec!(9000.00));

    let res = client
        .get(format!("{}/portfolio", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let holdings: serde_json::Value = res.json().await.unwrap();
    assert_eq!(holdings.as_array().unwrap().len(), 1);
    assert_eq!(holdings[0]["quantity"].as_i64(), Some(10));

    let res = client
        .get(format!("{}/transactions", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let records: serde_json::Value = res.json().await.unwrap();
    assert_eq!(records.as_array().unwrap().len(), 1);

    let res = client
        .get(format!("{}/stocks/aapl/transactions", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let records: serde_json::Value = res.json().await.unwrap();
    assert_eq!(records.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn buy_beyond_balance_returns_400() {
    let feed = StaticFeed::new().with_price("AAPL", dec!(100.00));
    let (base_url, _handle) = spawn_app(test_state(feed)).await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &base_url, "erin").await;

    let res = client
        .post(format!("{}/trades/buy", base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "symbol": "AAPL", "quantity": 101 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("insufficient funds"));
}

#[tokio::test]
async fn sell_without_holding_returns_404() {
    let feed = StaticFeed::new().with_price("AAPL", dec!(100.00));
    let (base_url, _handle) = spawn_app(test_state(feed)).await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &base_url, "frank").await;

    let res = client
        .post(format!("{}/trades/sell", base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "symbol": "AAPL", "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
}

#[tokio::test]
async fn deposit_and_withdraw_move_the_balance() {
    let (base_url, _handle) = spawn_app(test_state(StaticFeed::new())).await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &base_url, "grace").await;

    let res = client
        .post(format!("{}/account/deposit", base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "amount": "500.00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(decimal_field(&json["balance"]), dec!(10500.00));

    let res = client
        .post(format!("{}/account/withdraw", base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "amount": "10500.00" }))
        .send()
        .await
        .unwrap();
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(decimal_field(&json["balance"]), dec!(0.00));

    let res = client
        .post(format!("{}/account/withdraw", base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "amount": "0.01" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
}

#[tokio::test]
async fn quote_endpoint_normalizes_and_reports_unknowns() {
    let feed = StaticFeed::new()
        .with_price("AAPL", dec!(187.50))
        .with_previous_close("AAPL", dec!(180.00));
    let (base_url, _handle) = spawn_app(test_state(feed)).await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &base_url, "heidi").await;

    let res = client
        .get(format!("{}/stocks/aapl/quote", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["symbol"].as_str(), Some("AAPL"));
    assert_eq!(decimal_field(&json["current_price"]), dec!(187.50));

    let res = client
        .get(format!("{}/stocks/ZZZZ/quote", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
}

#[tokio::test]
async fn watchlist_flow_add_check_list_remove_clear() {
    let feed = StaticFeed::new()
        .with_price("AAPL", dec!(110.00))
        .with_previous_close("AAPL", dec!(100.00))
        .with_price("MSFT", dec!(300.00));
    let (base_url, _handle) = spawn_app(test_state(feed)).await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &base_url, "ivan").await;

    let res = client
        .post(format!("{}/watchlist", base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "symbol": "aapl" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 201);

    // Duplicates are refused.
    let res = client
        .post(format!("{}/watchlist", base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "symbol": "AAPL" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);

    // Unquotable symbols cannot be watched.
    let res = client
        .post(format!("{}/watchlist", base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "symbol": "ZZZZ" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);

    let res = client
        .get(format!("{}/watchlist/check/AAPL", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["in_watchlist"].as_bool(), Some(true));

    let res = client
        .get(format!("{}/watchlist", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let json: serde_json::Value = res.json().await.unwrap();
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(decimal_field(&entries[0]["current_price"]), dec!(110.00));
    assert_eq!(decimal_field(&entries[0]["change"]), dec!(10.00));
    assert_eq!(decimal_field(&entries[0]["change_percent"]), dec!(10.00));

    let res = client
        .delete(format!("{}/watchlist/AAPL", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let res = client
        .get(format!("{}/watchlist/check/AAPL", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["in_watchlist"].as_bool(), Some(false));

    for symbol in ["AAPL", "MSFT"] {
        let res = client
            .post(format!("{}/watchlist", base_url))
            .bearer_auth(&token)
            .json(&serde_json::json!({ "symbol": symbol }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 201);
    }
    let res = client
        .delete(format!("{}/watchlist", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["removed"].as_u64(), Some(2));
}
