//! Configuration schema definitions.
//!
//! Every section derives `Default` and is `#[serde(default)]`, so an empty
//! file is a valid configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::blockchain::{ReceiptPolicy, TxPolicy};

/// Root configuration for the anchoring service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AnchorConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,

    /// Chain, key and transaction settings.
    pub anchor: AnchorSettings,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Whole-request timeout. Must cover connectivity, broadcast and the
    /// receipt wait.
    pub request_timeout_secs: u64,

    /// Largest accepted upload body.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            request_timeout_secs: 90,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Anchoring settings.
///
/// Endpoint, key and explorer base are not stored here; the `*_name` fields
/// name the values to look up in the environment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnchorSettings {
    /// Checked in order; the first non-empty value wins.
    pub rpc_url_names: Vec<String>,

    pub private_key_name: String,

    /// Block explorer base URL for `explorer_url`.
    pub scan_url_name: String,

    /// Directory of one-file-per-secret entries, consulted before the
    /// environment for the private key.
    pub secrets_dir: Option<PathBuf>,

    pub rpc_timeout_secs: u64,
    pub connect_timeout_secs: u64,

    pub wait_for_receipt: bool,
    pub receipt_timeout_secs: u64,
    pub receipt_poll_base_ms: u64,
    pub receipt_poll_max_ms: u64,

    /// Gas limit when estimation fails.
    pub fallback_gas_limit: u64,
    pub gas_estimate_multiplier: u64,

    /// Refuse to sign for any other chain.
    pub expected_chain_id: Option<u64>,

    /// Refuse to sign above this gas price.
    pub max_gas_price_gwei: Option<u64>,
}

impl Default for AnchorSettings {
    fn default() -> Self {
        Self {
            rpc_url_names: vec![
                "WEB3_RPC_URL".to_string(),
                "RPC_URL".to_string(),
                "NEOX_RPC_URL".to_string(),
            ],
            private_key_name: "PRIVATE_KEY".to_string(),
            scan_url_name: "SCAN_URL".to_string(),
            secrets_dir: None,
            rpc_timeout_secs: 10,
            connect_timeout_secs: 5,
            wait_for_receipt: true,
            receipt_timeout_secs: 30,
            receipt_poll_base_ms: 500,
            receipt_poll_max_ms: 4_000,
            fallback_gas_limit: 80_000,
            gas_estimate_multiplier: 2,
            expected_chain_id: None,
            max_gas_price_gwei: None,
        }
    }
}

impl AnchorSettings {
    pub fn tx_policy(&self) -> TxPolicy {
        TxPolicy {
            fallback_gas_limit: self.fallback_gas_limit,
            gas_estimate_multiplier: self.gas_estimate_multiplier,
            expected_chain_id: self.expected_chain_id,
            max_gas_price_gwei: self.max_gas_price_gwei,
        }
    }

    pub fn receipt_policy(&self) -> ReceiptPolicy {
        ReceiptPolicy {
            wait: self.wait_for_receipt,
            timeout: Duration::from_secs(self.receipt_timeout_secs),
            poll_base: Duration::from_millis(self.receipt_poll_base_ms),
            poll_max: Duration::from_millis(self.receipt_poll_max_ms),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` overrides.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
