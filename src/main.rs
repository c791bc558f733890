//! Evidence anchoring service.
//!
//! ```text
//!  Client ──▶ http (axum) ──▶ anchoring engine ──▶ evidence (canonical hash, payload)
//!                                   │
//!                                   ▼
//!                             blockchain (rpc client, signer, nonce lock, broadcaster) ──▶ EVM node
//! ```

use std::path::PathBuf;

use clap::Parser;

use evidence_anchor::config::{self, AnchorConfig, EnvSource};
use evidence_anchor::lifecycle::startup;
use evidence_anchor::observability;

#[derive(Parser, Debug)]
#[command(name = "evidence-anchor", version, about = "Evidence anchoring service")]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "EVIDENCE_ANCHOR_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => AnchorConfig::default(),
    };

    observability::init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?args.config,
        bind_address = %config.server.bind_address,
        "evidence-anchor starting"
    );

    startup::run(config, &EnvSource).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
