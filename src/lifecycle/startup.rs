//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the metrics exporter
//! - Build the anchor engine from the validated config and environment
//! - Bind the listener and serve until a termination signal
//!
//! # Design Decisions
//! - Fail fast: a listener that cannot bind is fatal
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::anchoring::AnchorEngine;
use crate::config::{AnchorConfig, ValueSource};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::wait_for_termination;
use crate::observability::metrics;

pub async fn run(config: AnchorConfig, source: &dyn ValueSource) -> Result<(), std::io::Error> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let engine = AnchorEngine::from_config(&config.anchor, source);
    if !engine.has_rpc_url() {
        tracing::warn!(
            names = ?config.anchor.rpc_url_names,
            "No RPC URL configured; anchoring requests will fail with missing_rpc_url"
        );
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config.server.clone(), Some(engine), shutdown.signal());

    let serve = server.run(listener);
    tokio::pin!(serve);

    tokio::select! {
        result = &mut serve => return result,
        _ = wait_for_termination() => {
            tracing::info!("Shutdown requested, draining in-flight requests");
            shutdown.trigger();
        }
    }

    serve.await
}
