//! Server Module
//!
//! HTTP/JSON facade over the cache lookup. Each connection is served on
//! its own tokio task; the facade adds no locking of its own.

mod config;
mod handler;

pub use config::Config;
pub use handler::{AppState, FacadeError, KeyRequest};

use axum::routing::{get, post};
use axum::Router;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{Error, Result};
use crate::metrics::Metrics;
use crate::runtime::ShutdownSignal;
use crate::storage::Cache;

/// Build the facade's routes
pub fn router(cache: Cache, metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/cache/get", post(handler::cache_get))
        .route("/healthz", get(handler::healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { cache, metrics })
}

/// Bound, not yet running, facade server
pub struct Server {
    listener: TcpListener,
    router: Router,
}

impl Server {
    /// Bind the listener. Port 0 picks a free port.
    pub async fn bind(config: &Config, cache: Cache, metrics: Arc<Metrics>) -> Result<Self> {
        let addr = config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;

        Ok(Self {
            listener,
            router: router(cache, metrics),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until the shutdown signal is raised, then finish in-flight requests
    pub async fn run(self, shutdown: ShutdownSignal) -> Result<()> {
        if let Ok(addr) = self.listener.local_addr() {
            info!("voxcache facade listening on {}", addr);
        }

        let token = shutdown.token();
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await
            .map_err(Error::Serve)?;

        info!("voxcache facade stopped");
        Ok(())
    }
}
