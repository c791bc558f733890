//! Chain-specific types and error definitions.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC request failed.
    #[error("RPC error during {op}: {message}")]
    Rpc { op: &'static str, message: String },

    /// RPC request timed out.
    #[error("RPC timeout during {op} after {millis} ms")]
    Timeout { op: &'static str, millis: u128 },

    /// Endpoint did not answer the connectivity probe.
    #[error("RPC endpoint {endpoint} unreachable: {reason}")]
    Unreachable { endpoint: String, reason: String },

    /// Endpoint string is not a valid URL.
    #[error("invalid RPC endpoint: {0}")]
    InvalidEndpoint(String),

    /// No transport compiled in for the endpoint's scheme.
    #[error("no transport available for '{0}' endpoints")]
    UnsupportedTransport(String),

    /// Invalid private key or signing failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Gas price exceeded maximum allowed.
    #[error("Gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// Node refused the signed transaction.
    #[error("broadcast rejected: {0}")]
    Broadcast(String),
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Inclusion outcome of a broadcast transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    /// Mined and executed successfully.
    Confirmed,
    /// Mined but execution failed.
    Reverted,
    /// Not observed within the wait window, or not waited for.
    Unknown,
}

impl ReceiptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptStatus::Confirmed => "confirmed",
            ReceiptStatus::Reverted => "reverted",
            ReceiptStatus::Unknown => "unknown",
        }
    }

    pub fn from_execution(success: bool) -> Self {
        if success {
            ReceiptStatus::Confirmed
        } else {
            ReceiptStatus::Reverted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_conversion() {
        let chain_id = ChainId::from(1u64);
        assert_eq!(chain_id.0, 1);
        assert_eq!(u64::from(chain_id), 1);
        assert_eq!(chain_id.to_string(), "1");
    }

    #[test]
    fn test_error_display() {
        let err = BlockchainError::Timeout { op: "eth_gasPrice", millis: 10_000 };
        assert_eq!(err.to_string(), "RPC timeout during eth_gasPrice after 10000 ms");

        let err = BlockchainError::GasPriceTooHigh {
            current_gwei: 600,
            max_gwei: 500,
        };
        assert!(err.to_string().contains("600"));
    }

    #[test]
    fn test_receipt_status_serialization() {
        assert_eq!(serde_json::to_string(&ReceiptStatus::Unknown).unwrap(), "\"unknown\"");
        assert_eq!(ReceiptStatus::from_execution(true), ReceiptStatus::Confirmed);
        assert_eq!(ReceiptStatus::from_execution(false).as_str(), "reverted");
    }
}
