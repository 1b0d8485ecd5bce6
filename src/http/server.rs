//! HTTP server implementation.

use std::net::SocketAddr;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tracing::{error, info};

use super::admin;
use super::middleware::{rate_limit, SharedLimiter};
use crate::error::{Result, TollgateError};

/// HTTP server hosting the rate-limited routes.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// The shared rate limiter
    limiter: SharedLimiter,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(addr: SocketAddr, limiter: SharedLimiter) -> Self {
        Self { addr, limiter }
    }

    /// Build the application router.
    ///
    /// The admission middleware wraps the whole router, so `/config` is
    /// itself subject to the limiter like any other path.
    pub fn router(limiter: SharedLimiter) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/config", post(admin::update_config))
            .with_state(limiter.clone())
            .layer(middleware::from_fn_with_state(limiter, rate_limit))
    }

    /// Start the HTTP server.
    ///
    /// This method will block until the server is shut down.
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = Self::router(self.limiter);

        info!(addr = %self.addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(TollgateError::Io)?;

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| {
            error!(error = %e, "HTTP server failed");
            TollgateError::Io(e)
        })
    }
}

/// Trivial downstream handler standing in for the protected application.
async fn root() -> &'static str {
    "Hello from Tollgate!"
}
