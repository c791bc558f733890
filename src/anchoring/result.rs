//! Structured outcome of an anchoring invocation.

use serde::{Deserialize, Serialize};

use crate::anchoring::error::{AnchorError, ErrorCode};
use crate::blockchain::ReceiptStatus;
use crate::evidence::record::{format_timestamp, now};
use crate::evidence::{EvidenceHash, EvidenceRecord};

/// Anchoring mode reported in success results.
pub const ANCHOR_MODE: &str = "calldata_anchor_tx";

/// Outcome of one invocation. Every path through the engine ends in one of
/// these; nothing is thrown past it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnchorResult {
    Success(AnchorReceipt),
    Error(AnchorFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorReceipt {
    pub mode: String,
    pub chain_id: u64,
    /// Checksummed sender address.
    pub from: String,
    pub nonce: u64,
    pub gas_limit: u64,
    pub tx_hash: String,
    pub receipt_status: ReceiptStatus,
    pub evidence_hash: EvidenceHash,
    pub data_hex: String,
    /// EIP-191 attestation over `evidence_hash` and `timestamp`.
    pub signature: String,
    pub explorer_url: Option<String>,
    pub timestamp: String,
    pub evidence_data: EvidenceRecord,
}

impl AnchorReceipt {
    /// Text the attestation signature was made over.
    pub fn attestation_message(&self) -> String {
        crate::blockchain::attestation_message(&self.evidence_hash, &self.timestamp)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorFailure {
    pub error: ErrorCode,
    pub message: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_hash: Option<EvidenceHash>,
}

impl AnchorResult {
    /// Error result stamped with the current instant.
    pub fn failure(err: &AnchorError, evidence_hash: Option<EvidenceHash>) -> Self {
        AnchorResult::Error(AnchorFailure {
            error: err.code(),
            message: err.to_string(),
            timestamp: format_timestamp(&now()),
            evidence_hash,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AnchorResult::Success(_))
    }

    pub fn status(&self) -> &'static str {
        match self {
            AnchorResult::Success(_) => "success",
            AnchorResult::Error(_) => "error",
        }
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            AnchorResult::Success(_) => None,
            AnchorResult::Error(f) => Some(f.error),
        }
    }

    pub fn tx_hash(&self) -> Option<&str> {
        match self {
            AnchorResult::Success(r) => Some(&r.tx_hash),
            AnchorResult::Error(_) => None,
        }
    }

    pub fn evidence_hash(&self) -> Option<&EvidenceHash> {
        match self {
            AnchorResult::Success(r) => Some(&r.evidence_hash),
            AnchorResult::Error(f) => f.evidence_hash.as_ref(),
        }
    }

    pub fn timestamp(&self) -> &str {
        match self {
            AnchorResult::Success(r) => &r.timestamp,
            AnchorResult::Error(f) => &f.timestamp,
        }
    }

    pub fn receipt(&self) -> Option<&AnchorReceipt> {
        match self {
            AnchorResult::Success(r) => Some(r),
            AnchorResult::Error(_) => None,
        }
    }

    pub fn failure_detail(&self) -> Option<&AnchorFailure> {
        match self {
            AnchorResult::Success(_) => None,
            AnchorResult::Error(f) => Some(f),
        }
    }
}

/// `{base}/tx/{tx_hash}`, or `None` without a usable base.
pub fn explorer_url(base: Option<&str>, tx_hash: &str) -> Option<String> {
    let base = base.map(str::trim).filter(|b| !b.is_empty())?;
    Some(format!("{}/tx/{}", base.trim_end_matches('/'), tx_hash))
}
