//! Error taxonomy of the anchoring pipeline.
//!
//! Subsystem errors are converted here once, at the engine boundary, into the
//! stable wire codes carried by error results.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blockchain::BlockchainError;

/// Rejected input. Raised before any network interaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("evidence content is empty")]
    EmptyContent,

    #[error("unsupported evidence type '{0}'")]
    UnsupportedType(String),
}

/// A required named value is not configured.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("no RPC URL configured (checked {0})")]
    MissingRpcUrl(String),

    #[error("no private key configured (checked secret store and {0})")]
    MissingPrivateKey(String),
}

#[derive(Debug, Error)]
pub enum AnchorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("RPC endpoint unreachable: {0}")]
    Connectivity(String),

    #[error("required capability unavailable: {0}")]
    Dependency(String),

    #[error("on-chain anchoring failed: {0}")]
    Chain(String),

    #[error("anchoring cancelled before broadcast")]
    Cancelled,
}

impl AnchorError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AnchorError::Validation(ValidationError::EmptyContent) => ErrorCode::EmptyContent,
            AnchorError::Validation(ValidationError::UnsupportedType(_)) => ErrorCode::UnsupportedType,
            AnchorError::Configuration(ConfigurationError::MissingRpcUrl(_)) => ErrorCode::MissingRpcUrl,
            AnchorError::Configuration(ConfigurationError::MissingPrivateKey(_)) => {
                ErrorCode::MissingPrivateKey
            }
            AnchorError::Connectivity(_) => ErrorCode::RpcUnreachable,
            AnchorError::Dependency(_) => ErrorCode::MissingDependencies,
            AnchorError::Chain(_) => ErrorCode::OnchainFailed,
            AnchorError::Cancelled => ErrorCode::Cancelled,
        }
    }
}

impl From<BlockchainError> for AnchorError {
    fn from(err: BlockchainError) -> Self {
        match err {
            BlockchainError::Unreachable { .. } | BlockchainError::InvalidEndpoint(_) => {
                AnchorError::Connectivity(err.to_string())
            }
            BlockchainError::UnsupportedTransport(_) => AnchorError::Dependency(err.to_string()),
            other => AnchorError::Chain(other.to_string()),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, AnchorError>;

/// Stable machine-readable error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    EmptyContent,
    UnsupportedType,
    MissingRpcUrl,
    MissingPrivateKey,
    RpcUnreachable,
    MissingDependencies,
    OnchainFailed,
    Cancelled,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::EmptyContent => "empty_content",
            ErrorCode::UnsupportedType => "unsupported_type",
            ErrorCode::MissingRpcUrl => "missing_rpc_url",
            ErrorCode::MissingPrivateKey => "missing_private_key",
            ErrorCode::RpcUnreachable => "rpc_unreachable",
            ErrorCode::MissingDependencies => "missing_dependencies",
            ErrorCode::OnchainFailed => "onchain_failed",
            ErrorCode::Cancelled => "cancelled",
        }
    }

    /// Input was rejected, as opposed to an environment or chain fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ErrorCode::EmptyContent | ErrorCode::UnsupportedType)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq<&str> for ErrorCode {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}
