//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! RPC URL (named config value)
//!     → client.rs (connect, reachability probe, chain reads with timeouts)
//! Key (secret store, then plain config)
//!     → wallet.rs (resolution, transaction + attestation signing)
//! nonce.rs (per-address lock around nonce read → broadcast)
//!     → transaction.rs (build, broadcast, receipt wait)
//! ```
//!
//! # Security Constraints
//! - Never log private keys or full RPC URLs
//! - All RPC calls have configurable timeouts
//! - No automatic re-broadcast

pub mod client;
pub mod nonce;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::{ChainClient, ChainRpc, HttpConnector, RpcConnector};
pub use nonce::NonceLocks;
pub use transaction::{AnchorTxBuilder, Broadcaster, PreparedTx, ReceiptPolicy, TxPolicy};
pub use types::{BlockchainError, BlockchainResult, ChainId, ReceiptStatus};
pub use wallet::{
    attestation_message, recover_attestation_signer, DirectorySecretStore, KeyResolver, SecretStore,
    SignedTransaction, Wallet,
};
