//! Shared utilities for integration tests: an in-process chain double that
//! decodes and checks every raw transaction it receives.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::consensus::{SignableTransaction, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{Address, Bytes, TxHash, TxKind, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use evidence_anchor::anchoring::{AnchorEngine, EngineBuilder};
use evidence_anchor::blockchain::{
    BlockchainError, BlockchainResult, ChainId, ChainRpc, KeyResolver, ReceiptPolicy, RpcConnector,
};
use evidence_anchor::evidence::{EvidenceRecord, EvidenceType};

/// Anvil's first account.
pub const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

/// Anvil's second account.
pub const OTHER_PRIVATE_KEY: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
pub const OTHER_ADDRESS: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

pub const TEST_CHAIN_ID: u64 = 47763;
pub const TEST_GAS_PRICE: u128 = 40_000_000_000;
pub const TEST_ESTIMATE: u64 = 24_500;
pub const TEST_RPC_URL: &str = "http://chain.test:8545";
pub const TEST_SCAN_URL: &str = "https://scan.test/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptMode {
    Confirmed,
    Reverted,
    Never,
}

/// A transaction the double accepted.
#[derive(Debug, Clone)]
pub struct SentTx {
    pub hash: TxHash,
    pub from: Address,
    pub to: TxKind,
    pub nonce: u64,
    pub chain_id: Option<u64>,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub value: U256,
    pub input: Bytes,
}

#[derive(Default)]
pub struct CallCounts {
    pub connectivity: AtomicUsize,
    pub nonce_reads: AtomicUsize,
    pub chain_id_reads: AtomicUsize,
    pub gas_price_reads: AtomicUsize,
    pub estimates: AtomicUsize,
    pub sends: AtomicUsize,
    pub receipt_polls: AtomicUsize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        [
            &self.connectivity,
            &self.nonce_reads,
            &self.chain_id_reads,
            &self.gas_price_reads,
            &self.estimates,
            &self.sends,
            &self.receipt_polls,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }
}

/// Deterministic local chain.
pub struct MockChain {
    pub calls: CallCounts,
    pub chain_id: u64,
    pub unreachable: AtomicBool,
    pub fail_estimate: AtomicBool,
    pub panic_on_gas_price: AtomicBool,
    /// Accept sends but answer as if the call timed out.
    pub send_times_out: AtomicBool,
    pub receipt_mode: Mutex<ReceiptMode>,
    /// Receipts appear on this poll (1-based).
    pub receipt_after_polls: AtomicU32,
    /// Delay inside the nonce read, to widen race windows.
    pub nonce_read_delay: Mutex<Duration>,
    pending_nonces: Mutex<HashMap<Address, u64>>,
    sent: Mutex<Vec<SentTx>>,
}

impl MockChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::with_chain_id(TEST_CHAIN_ID))
    }

    pub fn with_chain_id(chain_id: u64) -> Self {
        Self {
            calls: CallCounts::default(),
            chain_id,
            unreachable: AtomicBool::new(false),
            fail_estimate: AtomicBool::new(false),
            panic_on_gas_price: AtomicBool::new(false),
            send_times_out: AtomicBool::new(false),
            receipt_mode: Mutex::new(ReceiptMode::Confirmed),
            receipt_after_polls: AtomicU32::new(1),
            nonce_read_delay: Mutex::new(Duration::ZERO),
            pending_nonces: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn set_receipt_mode(&self, mode: ReceiptMode) {
        *self.receipt_mode.lock().unwrap() = mode;
    }

    pub fn set_nonce_read_delay(&self, delay: Duration) {
        *self.nonce_read_delay.lock().unwrap() = delay;
    }

    /// Pre-existing transaction count for an address.
    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.pending_nonces.lock().unwrap().insert(address, nonce);
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.sent.lock().unwrap().clone()
    }

    fn count(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decode(raw: &[u8]) -> BlockchainResult<SentTx> {
        let envelope = TxEnvelope::decode_2718(&mut &raw[..])
            .map_err(|e| BlockchainError::Broadcast(format!("undecodable transaction: {e}")))?;
        let signed = envelope
            .as_legacy()
            .ok_or_else(|| BlockchainError::Broadcast("expected a legacy transaction".into()))?;
        let tx = signed.tx();
        let from = signed
            .signature()
            .recover_address_from_prehash(&tx.signature_hash())
            .map_err(|e| BlockchainError::Broadcast(format!("bad signature: {e}")))?;

        Ok(SentTx {
            hash: *envelope.tx_hash(),
            from,
            to: tx.to,
            nonce: tx.nonce,
            chain_id: tx.chain_id,
            gas_limit: tx.gas_limit,
            gas_price: tx.gas_price,
            value: tx.value,
            input: tx.input.clone(),
        })
    }
}

#[async_trait]
impl ChainRpc for MockChain {
    async fn check_connectivity(&self) -> BlockchainResult<()> {
        Self::count(&self.calls.connectivity);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(BlockchainError::Unreachable {
                endpoint: TEST_RPC_URL.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    async fn get_transaction_count(&self, address: Address) -> BlockchainResult<u64> {
        Self::count(&self.calls.nonce_reads);
        let nonce = self
            .pending_nonces
            .lock()
            .unwrap()
            .get(&address)
            .copied()
            .unwrap_or(0);
        let delay = *self.nonce_read_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(nonce)
    }

    async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        Self::count(&self.calls.chain_id_reads);
        Ok(ChainId(self.chain_id))
    }

    async fn get_gas_price(&self) -> BlockchainResult<u128> {
        Self::count(&self.calls.gas_price_reads);
        if self.panic_on_gas_price.load(Ordering::SeqCst) {
            panic!("gas oracle exploded");
        }
        Ok(TEST_GAS_PRICE)
    }

    async fn estimate_gas(&self, _request: TransactionRequest) -> BlockchainResult<u64> {
        Self::count(&self.calls.estimates);
        if self.fail_estimate.load(Ordering::SeqCst) {
            return Err(BlockchainError::Rpc {
                op: "eth_estimateGas",
                message: "execution reverted".to_string(),
            });
        }
        Ok(TEST_ESTIMATE)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> BlockchainResult<TxHash> {
        Self::count(&self.calls.sends);
        let tx = Self::decode(raw)?;

        if tx.chain_id != Some(self.chain_id) {
            return Err(BlockchainError::Broadcast("invalid chain id".into()));
        }

        let mut nonces = self.pending_nonces.lock().unwrap();
        let expected = nonces.get(&tx.from).copied().unwrap_or(0);
        if tx.nonce != expected {
            return Err(BlockchainError::Broadcast(format!(
                "nonce too low: expected {expected}, got {}",
                tx.nonce
            )));
        }
        nonces.insert(tx.from, expected + 1);
        drop(nonces);

        let hash = tx.hash;
        self.sent.lock().unwrap().push(tx);
        if self.send_times_out.load(Ordering::SeqCst) {
            return Err(BlockchainError::Timeout {
                op: "eth_sendRawTransaction",
                millis: 1000,
            });
        }
        Ok(hash)
    }

    async fn get_receipt_status(&self, tx_hash: TxHash) -> BlockchainResult<Option<bool>> {
        let polls = self.calls.receipt_polls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.sent.lock().unwrap().iter().any(|t| t.hash == tx_hash) {
            return Ok(None);
        }
        if (polls as u32) < self.receipt_after_polls.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(match *self.receipt_mode.lock().unwrap() {
            ReceiptMode::Confirmed => Some(true),
            ReceiptMode::Reverted => Some(false),
            ReceiptMode::Never => None,
        })
    }
}

/// Hands out the same [`MockChain`] for every endpoint and counts connects.
pub struct MockConnector {
    pub chain: Arc<MockChain>,
    pub connects: AtomicUsize,
    pub urls: Mutex<Vec<String>>,
}

impl MockConnector {
    pub fn new(chain: Arc<MockChain>) -> Arc<Self> {
        Arc::new(Self {
            chain,
            connects: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        })
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl RpcConnector for MockConnector {
    fn connect(&self, rpc_url: &str) -> BlockchainResult<Arc<dyn ChainRpc>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(rpc_url.to_string());
        Ok(self.chain.clone() as Arc<dyn ChainRpc>)
    }
}

pub fn fast_receipts() -> ReceiptPolicy {
    ReceiptPolicy {
        wait: true,
        timeout: Duration::from_millis(300),
        poll_base: Duration::from_millis(10),
        poll_max: Duration::from_millis(40),
    }
}

/// Engine wired to `connector` with the test key, endpoint and explorer.
pub fn engine_builder(connector: Arc<MockConnector>) -> EngineBuilder {
    AnchorEngine::builder()
        .rpc_url(Some(TEST_RPC_URL.to_string()))
        .rpc_url_names(vec!["WEB3_RPC_URL".into(), "RPC_URL".into(), "NEOX_RPC_URL".into()])
        .scan_url(Some(TEST_SCAN_URL.to_string()))
        .keys(KeyResolver::new("PRIVATE_KEY").with_plain(Some(TEST_PRIVATE_KEY.to_string())))
        .connector(connector)
        .receipt_policy(fast_receipts())
}

pub fn engine(connector: Arc<MockConnector>) -> AnchorEngine {
    engine_builder(connector).build()
}

/// `{content: "a", type: "document", source: "user_upload"}` at a fixed instant.
pub fn scenario_record() -> EvidenceRecord {
    EvidenceRecord::new("a", EvidenceType::Document, "user_upload")
        .with_timestamp(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap())
        .with_uploader("user")
}

pub fn address(s: &str) -> Address {
    s.parse().unwrap()
}
