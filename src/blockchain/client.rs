//! Blockchain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to a JSON-RPC endpoint
//! - Probe reachability before any state read
//! - Query chain state (nonce, chain id, gas price, gas estimate, receipts)
//! - Submit raw signed transactions
//!
//! All reads hit the node at call time. Nothing is cached between calls, so a
//! nonce is always as fresh as the node's pending state.

use std::fmt;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use alloy::eips::BlockId;
use alloy::primitives::{Address, TxHash};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use tokio::time::timeout;

use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainId};

/// Chain operations the anchoring pipeline needs.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Fail with [`BlockchainError::Unreachable`] if the node does not answer.
    async fn check_connectivity(&self) -> BlockchainResult<()>;

    /// Next usable nonce for `address`, counting pending transactions.
    async fn get_transaction_count(&self, address: Address) -> BlockchainResult<u64>;

    async fn get_chain_id(&self) -> BlockchainResult<ChainId>;

    /// Current gas price in wei.
    async fn get_gas_price(&self) -> BlockchainResult<u128>;

    async fn estimate_gas(&self, request: TransactionRequest) -> BlockchainResult<u64>;

    /// Submit signed transaction bytes. Returns once the node accepted them.
    async fn send_raw_transaction(&self, raw: &[u8]) -> BlockchainResult<TxHash>;

    /// `None` while the transaction is not mined, otherwise its execution
    /// status.
    async fn get_receipt_status(&self, tx_hash: TxHash) -> BlockchainResult<Option<bool>>;
}

/// Opens a [`ChainRpc`] for an endpoint URL.
pub trait RpcConnector: Send + Sync {
    fn connect(&self, rpc_url: &str) -> BlockchainResult<Arc<dyn ChainRpc>>;
}

/// Connector for `http`/`https` JSON-RPC endpoints.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    rpc_timeout: Duration,
    connect_timeout: Duration,
}

impl HttpConnector {
    pub fn new(rpc_timeout: Duration, connect_timeout: Duration) -> Self {
        Self {
            rpc_timeout,
            connect_timeout,
        }
    }
}

impl RpcConnector for HttpConnector {
    fn connect(&self, rpc_url: &str) -> BlockchainResult<Arc<dyn ChainRpc>> {
        let client = ChainClient::connect_http(rpc_url, self.rpc_timeout, self.connect_timeout)?;
        Ok(Arc::new(client))
    }
}

/// Blockchain RPC client backed by an alloy HTTP provider.
#[derive(Clone)]
pub struct ChainClient {
    provider: DynProvider,
    /// Scheme, host and port only; endpoint paths often embed API keys.
    endpoint: String,
    timeout_duration: Duration,
    connect_timeout: Duration,
}

impl ChainClient {
    /// Create a client for an HTTP(S) endpoint. No request is made here.
    pub fn connect_http(
        rpc_url: &str,
        timeout_duration: Duration,
        connect_timeout: Duration,
    ) -> BlockchainResult<Self> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e| BlockchainError::InvalidEndpoint(format!("{e}")))?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(BlockchainError::UnsupportedTransport(other.to_string())),
        }

        let endpoint = redact(&url);
        let provider = ProviderBuilder::new().connect_http(url).erased();

        tracing::debug!(endpoint = %endpoint, "RPC client created");

        Ok(Self {
            provider,
            endpoint,
            timeout_duration,
            connect_timeout,
        })
    }

    /// Endpoint with credentials and path stripped, safe to log.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<T, E, F>(&self, op: &'static str, fut: F) -> BlockchainResult<T>
    where
        F: IntoFuture<Output = Result<T, E>>,
        E: fmt::Display,
    {
        match timeout(self.timeout_duration, fut.into_future()).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                tracing::warn!(endpoint = %self.endpoint, op, error = %e, "RPC error");
                Err(BlockchainError::Rpc {
                    op,
                    message: e.to_string(),
                })
            }
            Err(_) => {
                tracing::warn!(endpoint = %self.endpoint, op, "RPC timeout");
                Err(BlockchainError::Timeout {
                    op,
                    millis: self.timeout_duration.as_millis(),
                })
            }
        }
    }
}

#[async_trait]
impl ChainRpc for ChainClient {
    async fn check_connectivity(&self) -> BlockchainResult<()> {
        let probe = self.provider.get_block_number().into_future();
        match timeout(self.connect_timeout, probe).await {
            Ok(Ok(block)) => {
                tracing::debug!(endpoint = %self.endpoint, block, "RPC endpoint reachable");
                Ok(())
            }
            Ok(Err(e)) => Err(BlockchainError::Unreachable {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            }),
            Err(_) => Err(BlockchainError::Unreachable {
                endpoint: self.endpoint.clone(),
                reason: format!("no answer within {} ms", self.connect_timeout.as_millis()),
            }),
        }
    }

    async fn get_transaction_count(&self, address: Address) -> BlockchainResult<u64> {
        let fut = self
            .provider
            .get_transaction_count(address)
            .block_id(BlockId::pending());
        self.call("eth_getTransactionCount", fut).await
    }

    async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        let id = self.call("eth_chainId", self.provider.get_chain_id()).await?;
        Ok(ChainId(id))
    }

    async fn get_gas_price(&self) -> BlockchainResult<u128> {
        self.call("eth_gasPrice", self.provider.get_gas_price()).await
    }

    async fn estimate_gas(&self, request: TransactionRequest) -> BlockchainResult<u64> {
        self.call("eth_estimateGas", self.provider.estimate_gas(request)).await
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> BlockchainResult<TxHash> {
        match timeout(self.timeout_duration, self.provider.send_raw_transaction(raw)).await {
            Ok(Ok(pending)) => Ok(*pending.tx_hash()),
            // A JSON-RPC error body is the node refusing the transaction.
            Ok(Err(e)) if e.is_error_resp() => Err(BlockchainError::Broadcast(e.to_string())),
            Ok(Err(e)) => Err(BlockchainError::Rpc {
                op: "eth_sendRawTransaction",
                message: e.to_string(),
            }),
            Err(_) => Err(BlockchainError::Timeout {
                op: "eth_sendRawTransaction",
                millis: self.timeout_duration.as_millis(),
            }),
        }
    }

    async fn get_receipt_status(&self, tx_hash: TxHash) -> BlockchainResult<Option<bool>> {
        let receipt = self
            .call("eth_getTransactionReceipt", self.provider.get_transaction_receipt(tx_hash))
            .await?;
        Ok(receipt.map(|r| r.status()))
    }
}

impl fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainClient")
            .field("endpoint", &self.endpoint)
            .field("timeout_ms", &self.timeout_duration.as_millis())
            .field("connect_timeout_ms", &self.connect_timeout.as_millis())
            .finish()
    }
}

fn redact(url: &url::Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}://{}:{}", url.scheme(), host, port),
        (Some(host), None) => format!("{}://{}", url.scheme(), host),
        _ => url.scheme().to_string(),
    }
}
