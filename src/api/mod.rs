//! HTTP layer: router, handlers, and bearer-token auth.

pub mod auth;
pub mod handlers;
pub mod routes;
