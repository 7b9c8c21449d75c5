//! Grant negotiation server.
//!
//! Owns the listener and shutdown; request handling lives in [`grant`] and
//! routing in [`transport`].

pub mod grant;
pub mod transport;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::Notify;

use crate::config::Config;
use grant::GrantEngine;

/// HTTP server wrapping a [`GrantEngine`].
pub struct GrantServer {
    engine: GrantEngine,
}

impl GrantServer {
    /// Create a server with a fresh store.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { engine: GrantEngine::new(config) }
    }

    /// Create a server around an existing engine.
    #[must_use]
    pub const fn with_engine(engine: GrantEngine) -> Self {
        Self { engine }
    }

    #[must_use]
    pub const fn engine(&self) -> &GrantEngine {
        &self.engine
    }

    /// Serve until SIGINT/SIGTERM, then drain in-flight requests for at most
    /// the configured shutdown timeout.
    ///
    /// # Errors
    ///
    /// Returns error on bind or server failure.
    pub async fn run_http(self, port: u16) -> anyhow::Result<()> {
        tracing::info!("Starting grant server on port {}", port);

        let shutdown_timeout = self.engine.config().shutdown_timeout;
        let router = transport::create_router(self.engine);
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("HTTP server listening on http://{}", addr);

        let drain = Arc::new(Notify::new());
        let notified = Arc::clone(&drain);
        let server = axum::serve(listener, router)
            .with_graceful_shutdown(async move { notified.notified().await })
            .into_future();
        tokio::pin!(server);

        tokio::select! {
            result = &mut server => {
                result?;
                tracing::info!("HTTP server stopped");
                return Ok(());
            }
            () = shutdown_signal() => {
                drain.notify_one();
            }
        }

        match tokio::time::timeout(shutdown_timeout, server).await {
            Ok(result) => {
                result?;
                tracing::info!("HTTP server shut down");
            }
            Err(_) => {
                tracing::warn!(timeout = ?shutdown_timeout, "Drain timed out, dropping open connections");
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for GrantServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantServer").field("engine", &self.engine).finish()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Received shutdown signal");
}
