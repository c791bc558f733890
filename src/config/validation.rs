//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, multiplier ≥ 1)
//! - Validate addresses and log settings
//!
//! Returns every problem found, not just the first.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::AnchorConfig;

/// RPC calls an anchor makes between the connectivity probe and the receipt
/// wait: nonce, chain id, gas price, estimate, broadcast.
const RPC_CALLS_PER_ANCHOR: u64 = 5;

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: &'static str,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &AnchorConfig) -> Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        issues.push(ValidationIssue::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        issues.push(ValidationIssue::new("server.request_timeout_secs", "must be greater than 0"));
    }
    if config.server.max_upload_bytes == 0 {
        issues.push(ValidationIssue::new("server.max_upload_bytes", "must be greater than 0"));
    }

    let anchor = &config.anchor;
    if anchor.rpc_url_names.iter().all(|n| n.trim().is_empty()) {
        issues.push(ValidationIssue::new("anchor.rpc_url_names", "at least one name is required"));
    }
    if anchor.private_key_name.trim().is_empty() {
        issues.push(ValidationIssue::new("anchor.private_key_name", "must not be empty"));
    }
    if anchor.rpc_timeout_secs == 0 {
        issues.push(ValidationIssue::new("anchor.rpc_timeout_secs", "must be greater than 0"));
    }
    if anchor.connect_timeout_secs == 0 {
        issues.push(ValidationIssue::new("anchor.connect_timeout_secs", "must be greater than 0"));
    }
    if anchor.gas_estimate_multiplier == 0 {
        issues.push(ValidationIssue::new("anchor.gas_estimate_multiplier", "must be at least 1"));
    }
    if anchor.fallback_gas_limit < 21_000 {
        issues.push(ValidationIssue::new(
            "anchor.fallback_gas_limit",
            "must cover the 21000 intrinsic gas of a transfer",
        ));
    }
    if anchor.receipt_poll_base_ms == 0 || anchor.receipt_poll_base_ms > anchor.receipt_poll_max_ms {
        issues.push(ValidationIssue::new(
            "anchor.receipt_poll_base_ms",
            "must be greater than 0 and not above receipt_poll_max_ms",
        ));
    }
    let receipt_wait = if anchor.wait_for_receipt {
        anchor.receipt_timeout_secs
    } else {
        0
    };
    let worst_case = anchor
        .connect_timeout_secs
        .saturating_add(anchor.rpc_timeout_secs.saturating_mul(RPC_CALLS_PER_ANCHOR))
        .saturating_add(receipt_wait);
    if config.server.request_timeout_secs <= worst_case {
        issues.push(ValidationIssue::new(
            "server.request_timeout_secs",
            format!(
                "must exceed the {worst_case}s an anchor can take \
                 (connect_timeout_secs + {RPC_CALLS_PER_ANCHOR} x rpc_timeout_secs + receipt_timeout_secs)"
            ),
        ));
    }

    let obs = &config.observability;
    if tracing_subscriber::EnvFilter::try_new(&obs.log_level).is_err() {
        issues.push(ValidationIssue::new(
            "observability.log_level",
            format!("'{}' is not a valid filter", obs.log_level),
        ));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        issues.push(ValidationIssue::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}
