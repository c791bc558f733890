//! Anchoring pipeline orchestration.
//!
//! ```text
//! validate → resolve rpc url → resolve key → hash + payload
//!     → connect + reachability probe
//!     → [nonce lock] read chain state → sign tx + attestation → broadcast [unlock]
//!     → receipt wait → result
//! ```
//!
//! Every invocation returns an [`AnchorResult`]. Errors and panics raised
//! anywhere in the pipeline are folded into an error result.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tracing::Instrument;
use uuid::Uuid;

use crate::anchoring::error::{AnchorError, ConfigurationError, EngineResult};
use crate::anchoring::result::{explorer_url, AnchorReceipt, AnchorResult, ANCHOR_MODE};
use crate::blockchain::{
    AnchorTxBuilder, Broadcaster, DirectorySecretStore, HttpConnector, KeyResolver, NonceLocks,
    ReceiptPolicy, ReceiptStatus, RpcConnector, TxPolicy,
};
use crate::config::source::{first_non_empty, ValueSource};
use crate::config::AnchorSettings;
use crate::evidence::record::{format_timestamp, now};
use crate::evidence::{self, AnchorPayload, EvidenceHash, EvidenceRecord, EvidenceSubmission};
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::observability::metrics;

/// Evidence anchoring engine. Cheap to clone; clones share nonce locks.
#[derive(Clone)]
pub struct AnchorEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    rpc_url: Option<String>,
    rpc_url_names: Vec<String>,
    scan_url: Option<String>,
    keys: KeyResolver,
    connector: Arc<dyn RpcConnector>,
    tx_policy: TxPolicy,
    receipt_policy: ReceiptPolicy,
    nonce_locks: NonceLocks,
}

/// Builder for [`AnchorEngine`].
pub struct EngineBuilder {
    rpc_url: Option<String>,
    rpc_url_names: Vec<String>,
    scan_url: Option<String>,
    keys: KeyResolver,
    connector: Option<Arc<dyn RpcConnector>>,
    tx_policy: TxPolicy,
    receipt_policy: ReceiptPolicy,
}

impl EngineBuilder {
    /// Endpoint URL. Empty values count as unset.
    pub fn rpc_url(mut self, url: Option<String>) -> Self {
        self.rpc_url = url.filter(|u| !u.trim().is_empty());
        self
    }

    /// Names reported when no endpoint is configured.
    pub fn rpc_url_names(mut self, names: Vec<String>) -> Self {
        self.rpc_url_names = names;
        self
    }

    pub fn scan_url(mut self, url: Option<String>) -> Self {
        self.scan_url = url.filter(|u| !u.trim().is_empty());
        self
    }

    pub fn keys(mut self, keys: KeyResolver) -> Self {
        self.keys = keys;
        self
    }

    pub fn connector(mut self, connector: Arc<dyn RpcConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn tx_policy(mut self, policy: TxPolicy) -> Self {
        self.tx_policy = policy;
        self
    }

    pub fn receipt_policy(mut self, policy: ReceiptPolicy) -> Self {
        self.receipt_policy = policy;
        self
    }

    pub fn build(self) -> AnchorEngine {
        let connector = self.connector.unwrap_or_else(|| {
            Arc::new(HttpConnector::new(Duration::from_secs(10), Duration::from_secs(5)))
        });
        AnchorEngine {
            inner: Arc::new(EngineInner {
                rpc_url: self.rpc_url,
                rpc_url_names: self.rpc_url_names,
                scan_url: self.scan_url,
                keys: self.keys,
                connector,
                tx_policy: self.tx_policy,
                receipt_policy: self.receipt_policy,
                nonce_locks: NonceLocks::new(),
            }),
        }
    }
}

impl AnchorEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder {
            rpc_url: None,
            rpc_url_names: Vec::new(),
            scan_url: None,
            keys: KeyResolver::new("PRIVATE_KEY"),
            connector: None,
            tx_policy: TxPolicy::default(),
            receipt_policy: ReceiptPolicy::default(),
        }
    }

    /// Build an engine from settings, looking the named values up in
    /// `source` once.
    pub fn from_config(settings: &AnchorSettings, source: &dyn ValueSource) -> Self {
        let rpc_url = first_non_empty(source, &settings.rpc_url_names);
        let scan_url = source.get_non_empty(&settings.scan_url_name);

        let mut keys = KeyResolver::new(settings.private_key_name.clone())
            .with_plain(source.get_non_empty(&settings.private_key_name));
        if let Some(dir) = &settings.secrets_dir {
            keys = keys.with_store(Arc::new(DirectorySecretStore::new(dir)));
        }

        tracing::info!(
            rpc_url_configured = rpc_url.is_some(),
            scan_url_configured = scan_url.is_some(),
            secret_store = settings.secrets_dir.is_some(),
            wait_for_receipt = settings.wait_for_receipt,
            "Anchor engine configured"
        );

        Self::builder()
            .rpc_url(rpc_url)
            .rpc_url_names(settings.rpc_url_names.clone())
            .scan_url(scan_url)
            .keys(keys)
            .connector(Arc::new(HttpConnector::new(
                Duration::from_secs(settings.rpc_timeout_secs),
                Duration::from_secs(settings.connect_timeout_secs),
            )))
            .tx_policy(settings.tx_policy())
            .receipt_policy(settings.receipt_policy())
            .build()
    }

    /// Whether an RPC endpoint was configured.
    pub fn has_rpc_url(&self) -> bool {
        self.inner.rpc_url.is_some()
    }

    /// Anchor a record.
    ///
    /// Dropping the returned future before broadcast submits nothing.
    pub async fn anchor(&self, record: EvidenceRecord) -> AnchorResult {
        self.run(Ok(record), None).await
    }

    /// Like [`anchor`](Self::anchor), but stops with a `cancelled` result if
    /// `signal` fires before broadcast. After broadcast the signal only ends
    /// the receipt wait.
    pub async fn anchor_cancellable(&self, record: EvidenceRecord, signal: ShutdownSignal) -> AnchorResult {
        self.run(Ok(record), Some(signal)).await
    }

    /// Validate a submission and anchor the resulting record.
    pub async fn submit(&self, submission: EvidenceSubmission) -> AnchorResult {
        self.run(submission.into_record(), None).await
    }

    pub async fn submit_cancellable(&self, submission: EvidenceSubmission, signal: ShutdownSignal) -> AnchorResult {
        self.run(submission.into_record(), Some(signal)).await
    }

    async fn run(&self, record: EngineResult<EvidenceRecord>, signal: Option<ShutdownSignal>) -> AnchorResult {
        let invocation_id = Uuid::new_v4();
        let span = tracing::info_span!("anchor", %invocation_id);
        let started = Instant::now();

        let inner = self.inner.clone();
        let outcome = AssertUnwindSafe(async move { inner.pipeline(record, signal).await })
            .catch_unwind()
            .instrument(span.clone())
            .await;

        let result = match outcome {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(parent: &span, panic = %message, "Anchoring pipeline panicked");
                AnchorResult::failure(&AnchorError::Chain(format!("internal fault: {message}")), None)
            }
        };

        metrics::record_anchor(result.status(), result.error_code(), started.elapsed());
        result
    }
}

impl EngineInner {
    async fn pipeline(&self, record: EngineResult<EvidenceRecord>, signal: Option<ShutdownSignal>) -> AnchorResult {
        let mut evidence_hash = None;
        match self.execute(record, signal.as_ref(), &mut evidence_hash).await {
            Ok(receipt) => {
                tracing::info!(
                    tx_hash = %receipt.tx_hash,
                    evidence_hash = %receipt.evidence_hash,
                    receipt_status = receipt.receipt_status.as_str(),
                    "Evidence anchored"
                );
                AnchorResult::Success(receipt)
            }
            Err(err) => {
                let code = err.code();
                if code.is_client_error() {
                    tracing::info!(error = %code, message = %err, "Evidence rejected");
                } else {
                    tracing::warn!(error = %code, message = %err, "Anchoring failed");
                }
                AnchorResult::failure(&err, evidence_hash)
            }
        }
    }

    async fn execute(
        &self,
        record: EngineResult<EvidenceRecord>,
        signal: Option<&ShutdownSignal>,
        evidence_hash: &mut Option<EvidenceHash>,
    ) -> EngineResult<AnchorReceipt> {
        let record = record?;
        record.validate()?;

        let rpc_url = self
            .rpc_url
            .as_deref()
            .ok_or_else(|| ConfigurationError::MissingRpcUrl(self.rpc_url_names.join(", ")))?;

        let key = self
            .keys
            .resolve()
            .ok_or_else(|| ConfigurationError::MissingPrivateKey(self.keys.key_name().to_string()))?;
        tracing::debug!(key_origin = key.origin().as_str(), "Signing key resolved");

        let hash = evidence::hash(&record);
        *evidence_hash = Some(hash);
        let payload = AnchorPayload::build(&hash);
        let timestamp = format_timestamp(&now());

        let rpc = self.connector.connect(rpc_url)?;
        rpc.check_connectivity().await?;

        let wallet = key.into_wallet()?;
        let from = wallet.address();

        let prepare = async {
            let wait_started = Instant::now();
            let guard = self.nonce_locks.acquire(from).await;
            metrics::record_nonce_wait(wait_started.elapsed());

            let prepared = AnchorTxBuilder::new(rpc.as_ref(), &self.tx_policy)
                .prepare(from, &payload)
                .await?;
            let signed = wallet.sign_transaction(prepared.tx.clone())?;
            let signature = wallet.sign_attestation(&hash, &timestamp)?;
            Ok::<_, AnchorError>((guard, prepared, signed, signature))
        };

        let (guard, prepared, signed, signature) = match signal {
            Some(signal) => tokio::select! {
                biased;
                _ = signal.triggered() => return Err(AnchorError::Cancelled),
                prepared = prepare => prepared?,
            },
            None => prepare.await?,
        };
        drop(wallet);

        if signal.is_some_and(ShutdownSignal::is_triggered) {
            return Err(AnchorError::Cancelled);
        }

        let broadcaster = Broadcaster::new(rpc.as_ref(), &self.receipt_policy);
        let tx_hash = broadcaster.submit(&signed).await?;
        drop(guard);

        let receipt_status = match signal {
            Some(signal) => tokio::select! {
                biased;
                _ = signal.triggered() => {
                    tracing::info!(tx_hash = %tx_hash, "Receipt wait interrupted by shutdown");
                    ReceiptStatus::Unknown
                }
                status = broadcaster.wait_for_receipt(tx_hash) => status,
            },
            None => broadcaster.wait_for_receipt(tx_hash).await,
        };
        metrics::record_receipt(receipt_status);

        let tx_hash = alloy::hex::encode_prefixed(tx_hash);
        let explorer_url = explorer_url(self.scan_url.as_deref(), &tx_hash);

        Ok(AnchorReceipt {
            mode: ANCHOR_MODE.to_string(),
            chain_id: prepared.chain_id,
            from: prepared.from.to_checksum(None),
            nonce: prepared.nonce,
            gas_limit: prepared.gas_limit,
            tx_hash,
            receipt_status,
            evidence_hash: hash,
            data_hex: payload.to_data_hex(),
            signature,
            explorer_url,
            timestamp,
            evidence_data: record,
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl std::fmt::Debug for AnchorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnchorEngine")
            .field("rpc_url_configured", &self.inner.rpc_url.is_some())
            .field("keys", &self.inner.keys)
            .field("tx_policy", &self.inner.tx_policy)
            .field("receipt_policy", &self.inner.receipt_policy)
            .finish()
    }
}
