use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Watchlist row, unique per (user, symbol).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchlistEntry {
    pub user_id: Uuid,
    pub symbol: String,
    pub added_at: DateTime<Utc>,
}
