//! Domain types shared across the engine, storage, and API layers.

pub mod account;
pub mod position;
pub mod quote;
pub mod transaction;
pub mod watchlist;

pub use account::Account;
pub use position::Position;
pub use quote::Quote;
pub use transaction::{TradeSide, TransactionRecord};
pub use watchlist::WatchlistEntry;
