//! HTTP server with deferred startup lifecycle.
//!
//! `new()` creates resources, `start()` binds the TCP listener, and
//! `serve()` starts accepting connections. Binding early lets the process
//! fail fast on a busy port before any other transport starts serving.

use std::future::Future;
use std::time::Duration;

use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use super::config::NetworkConfig;
use super::handlers::{concat_handler, sum_handler, AppState};
use super::middleware::{build_http_layers, effective_request_timeout};
use crate::service::EndpointSet;

/// Manages the HTTP server lifecycle.
///
/// 1. `new()` -- captures configuration and the shared endpoints
/// 2. `start()` -- binds TCP listener to the configured address
/// 3. `serve()` -- accepts connections until shutdown is signalled
pub struct NetworkModule {
    config: NetworkConfig,
    endpoints: EndpointSet,
    listener: Option<TcpListener>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, endpoints: EndpointSet) -> Self {
        Self {
            config,
            endpoints,
            listener: None,
        }
    }

    /// Timeout applied by the HTTP layer, never shorter than the operation
    /// deadline plus a margin.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        effective_request_timeout(self.config.request_timeout, self.endpoints.operation_timeout())
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `POST /sum` -- `{"A": int, "B": int}` to `{"v": int}`
    /// - `POST /concat` -- `{"A": string, "B": string}` to `{"v": string}`
    pub fn build_router(&self) -> Router {
        let state = AppState {
            endpoints: self.endpoints.clone(),
        };

        Router::new()
            .route("/sum", post(sum_handler))
            .route("/concat", post(concat_handler))
            .layer(build_http_layers(self.request_timeout()))
            .with_state(state)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("HTTP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves connections until the shutdown signal fires, then lets
    /// in-flight requests finish.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first or the server
    /// encounters a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let router = self.build_router();

        info!("Serving HTTP connections");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}
