//! Anchor transaction construction and broadcast.
//!
//! # Responsibilities
//! - Read nonce, chain id and gas price, and estimate gas
//! - Build the self-transfer carrying the anchor payload
//! - Submit signed bytes and optionally poll for the receipt
//!
//! Broadcast is never retried here. Callers retry by running the whole
//! pipeline again, which re-reads the nonce.

use std::time::Duration;

use alloy::consensus::TxLegacy;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash, TxKind, U256};
use alloy::rpc::types::TransactionRequest;
use tokio::time::{sleep, timeout, Instant};

use crate::blockchain::client::ChainRpc;
use crate::blockchain::types::{BlockchainError, BlockchainResult, ReceiptStatus};
use crate::blockchain::wallet::SignedTransaction;
use crate::evidence::AnchorPayload;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Gas and chain guards applied while building the transaction.
#[derive(Debug, Clone)]
pub struct TxPolicy {
    /// Used when estimation fails.
    pub fallback_gas_limit: u64,
    /// Applied to a successful estimate.
    pub gas_estimate_multiplier: u64,
    pub expected_chain_id: Option<u64>,
    pub max_gas_price_gwei: Option<u64>,
}

impl Default for TxPolicy {
    fn default() -> Self {
        Self {
            fallback_gas_limit: 80_000,
            gas_estimate_multiplier: 2,
            expected_chain_id: None,
            max_gas_price_gwei: None,
        }
    }
}

/// How long and how often to look for a receipt after broadcast.
#[derive(Debug, Clone)]
pub struct ReceiptPolicy {
    pub wait: bool,
    pub timeout: Duration,
    pub poll_base: Duration,
    pub poll_max: Duration,
}

impl Default for ReceiptPolicy {
    fn default() -> Self {
        Self {
            wait: true,
            timeout: Duration::from_secs(30),
            poll_base: Duration::from_millis(500),
            poll_max: Duration::from_secs(4),
        }
    }
}

/// Unsigned anchor transaction and the chain state it was built from.
#[derive(Debug, Clone)]
pub struct PreparedTx {
    pub tx: TxLegacy,
    pub from: Address,
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub gas_estimated: bool,
}

/// Builds anchor transactions from live chain state.
pub struct AnchorTxBuilder<'a> {
    rpc: &'a dyn ChainRpc,
    policy: &'a TxPolicy,
}

impl<'a> AnchorTxBuilder<'a> {
    pub fn new(rpc: &'a dyn ChainRpc, policy: &'a TxPolicy) -> Self {
        Self { rpc, policy }
    }

    /// Build the self-transfer carrying `payload` for `from`.
    ///
    /// Must run under the sender's nonce lock.
    pub async fn prepare(&self, from: Address, payload: &AnchorPayload) -> BlockchainResult<PreparedTx> {
        let nonce = self.rpc.get_transaction_count(from).await?;

        let chain_id = self.rpc.get_chain_id().await?.0;
        if let Some(expected) = self.policy.expected_chain_id {
            if expected != chain_id {
                return Err(BlockchainError::ChainMismatch {
                    expected,
                    actual: chain_id,
                });
            }
        }

        let gas_price = self.rpc.get_gas_price().await?;
        if let Some(max_gwei) = self.policy.max_gas_price_gwei {
            let current_gwei = gas_price / WEI_PER_GWEI;
            if current_gwei > u128::from(max_gwei) {
                return Err(BlockchainError::GasPriceTooHigh {
                    current_gwei: u64::try_from(current_gwei).unwrap_or(u64::MAX),
                    max_gwei,
                });
            }
        }

        let request = TransactionRequest::default()
            .with_from(from)
            .with_to(from)
            .with_value(U256::ZERO)
            .with_input(payload.to_input());

        let (gas_limit, gas_estimated) = match self.rpc.estimate_gas(request).await {
            Ok(estimate) => (estimate.saturating_mul(self.policy.gas_estimate_multiplier), true),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    fallback = self.policy.fallback_gas_limit,
                    "Gas estimation failed, using fallback limit"
                );
                metrics::record_gas_estimate_fallback();
                (self.policy.fallback_gas_limit, false)
            }
        };

        tracing::debug!(
            from = %from,
            nonce,
            chain_id,
            gas_price,
            gas_limit,
            "Anchor transaction prepared"
        );

        let tx = TxLegacy {
            chain_id: Some(chain_id),
            nonce,
            gas_price,
            gas_limit,
            to: TxKind::Call(from),
            value: U256::ZERO,
            input: payload.to_input(),
        };

        Ok(PreparedTx {
            tx,
            from,
            chain_id,
            nonce,
            gas_limit,
            gas_price,
            gas_estimated,
        })
    }
}

/// Submits signed transactions and watches for their receipts.
pub struct Broadcaster<'a> {
    rpc: &'a dyn ChainRpc,
    policy: &'a ReceiptPolicy,
}

impl<'a> Broadcaster<'a> {
    pub fn new(rpc: &'a dyn ChainRpc, policy: &'a ReceiptPolicy) -> Self {
        Self { rpc, policy }
    }

    /// Hand the signed bytes to the node. Success means accepted for
    /// propagation, not mined.
    ///
    /// Only an explicit rejection from the node is an error. A timeout or a
    /// transport failure after the bytes went out leaves the outcome unknown,
    /// so the locally computed hash is returned and the receipt wait decides.
    pub async fn submit(&self, signed: &SignedTransaction) -> BlockchainResult<TxHash> {
        match self.rpc.send_raw_transaction(&signed.raw).await {
            Ok(node_hash) => {
                if node_hash != signed.tx_hash {
                    tracing::warn!(
                        local = %signed.tx_hash,
                        node = %node_hash,
                        "Node reported a different transaction hash"
                    );
                }
                tracing::info!(tx_hash = %node_hash, "Anchor transaction broadcast");
                Ok(node_hash)
            }
            Err(e @ BlockchainError::Broadcast(_)) => Err(e),
            Err(e) => {
                tracing::warn!(
                    tx_hash = %signed.tx_hash,
                    error = %e,
                    "Broadcast outcome unknown, continuing with the local transaction hash"
                );
                Ok(signed.tx_hash)
            }
        }
    }

    /// Poll for the receipt until it appears or the wait window closes.
    ///
    /// Never fails: a missing receipt, persistent RPC errors or a disabled
    /// wait all come back as [`ReceiptStatus::Unknown`].
    pub async fn wait_for_receipt(&self, tx_hash: TxHash) -> ReceiptStatus {
        if !self.policy.wait {
            return ReceiptStatus::Unknown;
        }

        let deadline = Instant::now() + self.policy.timeout;
        let base_ms = u64::try_from(self.policy.poll_base.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.policy.poll_max.as_millis()).unwrap_or(u64::MAX);
        let mut attempt = 0u32;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let poll = match timeout(remaining, self.rpc.get_receipt_status(tx_hash)).await {
                Ok(poll) => poll,
                Err(_) => break,
            };
            match poll {
                Ok(Some(success)) => {
                    let status = ReceiptStatus::from_execution(success);
                    tracing::info!(tx_hash = %tx_hash, status = status.as_str(), "Receipt observed");
                    return status;
                }
                Ok(None) => {
                    tracing::debug!(tx_hash = %tx_hash, attempt, "Transaction pending");
                }
                Err(e) => {
                    tracing::warn!(tx_hash = %tx_hash, error = %e, "Receipt poll failed");
                }
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            attempt = attempt.saturating_add(1);
            let delay = calculate_backoff(attempt, base_ms, max_ms).min(deadline - now);
            sleep(delay).await;
        }

        tracing::info!(
            tx_hash = %tx_hash,
            waited_ms = self.policy.timeout.as_millis() as u64,
            "No receipt within wait window"
        );
        ReceiptStatus::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::ChainId;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use crate::evidence::EvidenceHash;

    struct StubRpc {
        chain_id: u64,
        gas_price: u128,
        estimate: Option<u64>,
        receipt_after: Option<u32>,
        receipt_polls: AtomicU32,
        receipt_delay: Duration,
        send: SendOutcome,
        last_estimate: Mutex<Option<TransactionRequest>>,
    }

    #[derive(Clone, Copy)]
    enum SendOutcome {
        Accept,
        Reject,
        TimeOut,
    }

    impl StubRpc {
        fn new() -> Self {
            Self {
                chain_id: 47763,
                gas_price: 40 * WEI_PER_GWEI,
                estimate: Some(23_000),
                receipt_after: Some(2),
                receipt_polls: AtomicU32::new(0),
                receipt_delay: Duration::ZERO,
                send: SendOutcome::Accept,
                last_estimate: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl ChainRpc for StubRpc {
        async fn check_connectivity(&self) -> BlockchainResult<()> {
            Ok(())
        }

        async fn get_transaction_count(&self, _address: Address) -> BlockchainResult<u64> {
            Ok(5)
        }

        async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
            Ok(ChainId(self.chain_id))
        }

        async fn get_gas_price(&self) -> BlockchainResult<u128> {
            Ok(self.gas_price)
        }

        async fn estimate_gas(&self, request: TransactionRequest) -> BlockchainResult<u64> {
            *self.last_estimate.lock().unwrap() = Some(request);
            self.estimate.ok_or(BlockchainError::Rpc {
                op: "eth_estimateGas",
                message: "execution reverted".into(),
            })
        }

        async fn send_raw_transaction(&self, _raw: &[u8]) -> BlockchainResult<TxHash> {
            match self.send {
                SendOutcome::Accept => Ok(TxHash::repeat_byte(0x42)),
                SendOutcome::Reject => Err(BlockchainError::Broadcast("nonce too low".into())),
                SendOutcome::TimeOut => Err(BlockchainError::Timeout {
                    op: "eth_sendRawTransaction",
                    millis: 1000,
                }),
            }
        }

        async fn get_receipt_status(&self, _tx_hash: TxHash) -> BlockchainResult<Option<bool>> {
            let polls = self.receipt_polls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.receipt_delay.is_zero() {
                tokio::time::sleep(self.receipt_delay).await;
            }
            match self.receipt_after {
                Some(n) if polls >= n => Ok(Some(true)),
                _ => Ok(None),
            }
        }
    }

    fn payload() -> AnchorPayload {
        AnchorPayload::build(&EvidenceHash::from_bytes([1; 32]))
    }

    fn fast_receipts() -> ReceiptPolicy {
        ReceiptPolicy {
            wait: true,
            timeout: Duration::from_millis(200),
            poll_base: Duration::from_millis(10),
            poll_max: Duration::from_millis(20),
        }
    }

    #[tokio::test]
    async fn test_prepare_self_transfer() {
        let rpc = StubRpc::new();
        let policy = TxPolicy::default();
        let from = Address::repeat_byte(0xaa);

        let prepared = AnchorTxBuilder::new(&rpc, &policy).prepare(from, &payload()).await.unwrap();
        assert_eq!(prepared.nonce, 5);
        assert_eq!(prepared.chain_id, 47763);
        assert_eq!(prepared.gas_limit, 46_000);
        assert!(prepared.gas_estimated);
        assert_eq!(prepared.tx.to, TxKind::Call(from));
        assert_eq!(prepared.tx.value, U256::ZERO);
        assert_eq!(prepared.tx.input.as_ref(), payload().as_bytes());

        let request = rpc.last_estimate.lock().unwrap().clone().unwrap();
        assert_eq!(request.from, Some(from));
    }

    #[tokio::test]
    async fn test_prepare_estimate_fallback() {
        let mut rpc = StubRpc::new();
        rpc.estimate = None;
        let policy = TxPolicy::default();

        let prepared = AnchorTxBuilder::new(&rpc, &policy)
            .prepare(Address::ZERO, &payload())
            .await
            .unwrap();
        assert_eq!(prepared.gas_limit, 80_000);
        assert!(!prepared.gas_estimated);
    }

    #[tokio::test]
    async fn test_prepare_guards() {
        let rpc = StubRpc::new();
        let policy = TxPolicy {
            expected_chain_id: Some(1),
            ..TxPolicy::default()
        };
        let err = AnchorTxBuilder::new(&rpc, &policy)
            .prepare(Address::ZERO, &payload())
            .await
            .unwrap_err();
        assert!(matches!(err, BlockchainError::ChainMismatch { expected: 1, actual: 47763 }));

        let policy = TxPolicy {
            max_gas_price_gwei: Some(10),
            ..TxPolicy::default()
        };
        let err = AnchorTxBuilder::new(&rpc, &policy)
            .prepare(Address::ZERO, &payload())
            .await
            .unwrap_err();
        assert!(matches!(err, BlockchainError::GasPriceTooHigh { current_gwei: 40, max_gwei: 10 }));
    }

    #[tokio::test]
    async fn test_wait_for_receipt_confirmed() {
        let rpc = StubRpc::new();
        let policy = fast_receipts();
        let status = Broadcaster::new(&rpc, &policy).wait_for_receipt(TxHash::ZERO).await;
        assert_eq!(status, ReceiptStatus::Confirmed);
        assert_eq!(rpc.receipt_polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_wait_for_receipt_times_out_as_unknown() {
        let mut rpc = StubRpc::new();
        rpc.receipt_after = None;
        let policy = fast_receipts();

        let started = Instant::now();
        let status = Broadcaster::new(&rpc, &policy).wait_for_receipt(TxHash::ZERO).await;
        assert_eq!(status, ReceiptStatus::Unknown);
        assert!(started.elapsed() >= Duration::from_millis(200));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_wait_disabled() {
        let rpc = StubRpc::new();
        let policy = ReceiptPolicy {
            wait: false,
            ..fast_receipts()
        };
        let status = Broadcaster::new(&rpc, &policy).wait_for_receipt(TxHash::ZERO).await;
        assert_eq!(status, ReceiptStatus::Unknown);
        assert_eq!(rpc.receipt_polls.load(Ordering::SeqCst), 0);
    }

    fn signed() -> SignedTransaction {
        SignedTransaction {
            raw: vec![0x01, 0x02].into(),
            tx_hash: TxHash::repeat_byte(0x42),
        }
    }

    #[tokio::test]
    async fn test_submit_timeout_keeps_local_hash() {
        let mut rpc = StubRpc::new();
        rpc.send = SendOutcome::TimeOut;
        let policy = fast_receipts();

        let tx_hash = Broadcaster::new(&rpc, &policy).submit(&signed()).await.unwrap();
        assert_eq!(tx_hash, TxHash::repeat_byte(0x42));
    }

    #[tokio::test]
    async fn test_submit_rejection_is_error() {
        let mut rpc = StubRpc::new();
        rpc.send = SendOutcome::Reject;
        let policy = fast_receipts();

        let err = Broadcaster::new(&rpc, &policy).submit(&signed()).await.unwrap_err();
        assert!(matches!(err, BlockchainError::Broadcast(_)));
    }

    #[tokio::test]
    async fn test_slow_receipt_poll_bounded_by_window() {
        let mut rpc = StubRpc::new();
        rpc.receipt_after = Some(1);
        rpc.receipt_delay = Duration::from_secs(5);
        let policy = fast_receipts();

        let started = Instant::now();
        let status = Broadcaster::new(&rpc, &policy).wait_for_receipt(TxHash::ZERO).await;
        assert_eq!(status, ReceiptStatus::Unknown);
        assert!(started.elapsed() < policy.timeout + Duration::from_millis(200));
        assert_eq!(rpc.receipt_polls.load(Ordering::SeqCst), 1);
    }
}
