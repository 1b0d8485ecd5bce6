//! HTTP boundary: server, admission middleware, and the runtime config endpoint.

mod admin;
mod middleware;
mod server;

pub use admin::TokenLimitUpdate;
pub use middleware::{rate_limit, SharedLimiter, API_KEY_HEADER};
pub use server::HttpServer;
