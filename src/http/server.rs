//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the API handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Serve on a bound listener until shutdown

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::anchoring::AnchorEngine;
use crate::config::ServerConfig;
use crate::http::handlers;
use crate::lifecycle::ShutdownSignal;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// `None` when the engine could not be built; anchoring routes answer 503.
    pub engine: Option<AnchorEngine>,
    pub shutdown: ShutdownSignal,
}

/// HTTP server for the anchoring API.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    shutdown: ShutdownSignal,
}

impl HttpServer {
    pub fn new(config: ServerConfig, engine: Option<AnchorEngine>, shutdown: ShutdownSignal) -> Self {
        let state = AppState {
            engine,
            shutdown: shutdown.clone(),
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            shutdown,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .route("/api/health", get(handlers::health))
            .route("/api/evidence", post(handlers::submit_evidence))
            .route("/api/upload-evidence", post(handlers::upload_evidence))
            .with_state(state)
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs))),
            )
    }

    /// Run the server, accepting connections on the given listener until the
    /// shutdown signal fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let shutdown = self.shutdown;
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move { shutdown.triggered().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The router, for in-process serving.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}
