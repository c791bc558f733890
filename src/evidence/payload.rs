//! On-chain payload layout: protocol tag followed by the evidence hash.
//!
//! ```text
//! 0                  18                                  50
//! ┌──────────────────┬───────────────────────────────────┐
//! │SPOON_EVIDENCE_V1|│        SHA-256 evidence hash      │
//! └──────────────────┴───────────────────────────────────┘
//! ```
//!
//! A layout change must come with a new tag so that verifiers can always tell
//! historical anchors apart.

use alloy::primitives::Bytes;
use thiserror::Error;

use crate::evidence::canonical::EvidenceHash;

pub const TAG_LEN: usize = 18;

/// Version tag of the current layout.
pub const PROTOCOL_TAG: &[u8; TAG_LEN] = b"SPOON_EVIDENCE_V1|";

/// Total payload size in bytes.
pub const PAYLOAD_LEN: usize = TAG_LEN + EvidenceHash::LEN;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("payload must be 50 bytes, got {0}")]
    Length(usize),

    #[error("unknown protocol tag {0:?}")]
    UnknownTag(String),

    #[error("invalid hex data: {0}")]
    Hex(String),
}

/// Fixed 50-byte anchor payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorPayload([u8; PAYLOAD_LEN]);

impl AnchorPayload {
    pub fn build(hash: &EvidenceHash) -> Self {
        let mut bytes = [0u8; PAYLOAD_LEN];
        bytes[..TAG_LEN].copy_from_slice(PROTOCOL_TAG);
        bytes[TAG_LEN..].copy_from_slice(hash.as_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PAYLOAD_LEN] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// The embedded evidence hash.
    pub fn evidence_hash(&self) -> EvidenceHash {
        let mut hash = [0u8; EvidenceHash::LEN];
        hash.copy_from_slice(&self.0[TAG_LEN..]);
        EvidenceHash::from_bytes(hash)
    }

    /// `0x`-prefixed hex for a transaction data field.
    pub fn to_data_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Transaction input bytes.
    pub fn to_input(&self) -> Bytes {
        Bytes::copy_from_slice(&self.0)
    }

    /// Decode a transaction's data field.
    pub fn parse(data: &[u8]) -> Result<Self, PayloadError> {
        if data.len() != PAYLOAD_LEN {
            return Err(PayloadError::Length(data.len()));
        }
        let (tag, _) = data.split_at(TAG_LEN);
        if tag != PROTOCOL_TAG {
            return Err(PayloadError::UnknownTag(
                String::from_utf8_lossy(tag).into_owned(),
            ));
        }
        let mut bytes = [0u8; PAYLOAD_LEN];
        bytes.copy_from_slice(data);
        Ok(Self(bytes))
    }

    pub fn from_data_hex(data: &str) -> Result<Self, PayloadError> {
        let raw = data.strip_prefix("0x").unwrap_or(data);
        let bytes = hex::decode(raw).map_err(|e| PayloadError::Hex(e.to_string()))?;
        Self::parse(&bytes)
    }
}
