use std::sync::Arc;

use papertrade::api::routes::{AppState, app_router};
use papertrade::config::Config;
use papertrade::marketdata::{FinnhubFeed, PriceFeed};
use papertrade::persistence::{MemoryLedger, PgLedger, SharedLedger};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().expect("invalid configuration");

    let ledger: SharedLedger = match &config.database_url {
        Some(url) => {
            let ledger = PgLedger::connect(url)
                .await
                .expect("failed to connect to database");
            tracing::info!("using postgres ledger");
            Arc::new(ledger)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; state will not survive restarts");
            Arc::new(MemoryLedger::new())
        }
    };

    let feed: Arc<dyn PriceFeed> = Arc::new(
        FinnhubFeed::new(&config.finnhub_base_url, &config.finnhub_api_key)
            .expect("failed to build market data client"),
    );

    let state = AppState {
        ledger,
        feed,
        jwt_secret: config.jwt_secret.into_bytes(),
    };

    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind");
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await.expect("server error");
}
