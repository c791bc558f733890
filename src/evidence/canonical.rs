//! Canonical serialization and hashing of evidence records.
//!
//! The canonical form is a JSON text with object keys sorted at every level,
//! `", "` between items and `": "` between key and value, and non-ASCII text
//! written as raw UTF-8. The layout is the one produced by earlier
//! deployments, so their anchors re-hash to the same digest.
//!
//! Integers, strings, booleans and null are layout-stable. Floating point
//! metadata values hash consistently within this crate but should be avoided
//! when anchors must be re-verified by other tooling.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::evidence::record::{format_timestamp, EvidenceRecord};

/// SHA-256 digest of a record's canonical form.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvidenceHash([u8; 32]);

impl EvidenceHash {
    pub const LEN: usize = 32;

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex, no prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for EvidenceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for EvidenceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EvidenceHash({})", self.to_hex())
    }
}

/// Error parsing a hex evidence hash.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashParseError {
    #[error("invalid hex: {0}")]
    Hex(String),
    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}

impl FromStr for EvidenceHash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw).map_err(|e| HashParseError::Hex(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| HashParseError::Length {
                expected: Self::LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(bytes))
    }
}

impl From<EvidenceHash> for alloy::primitives::B256 {
    fn from(hash: EvidenceHash) -> Self {
        alloy::primitives::B256::from(hash.0)
    }
}

impl Serialize for EvidenceHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for EvidenceHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Canonical bytes of a record.
pub fn canonicalize(record: &EvidenceRecord) -> Vec<u8> {
    canonical_bytes(&record_value(record))
}

/// Evidence hash of a record.
pub fn hash(record: &EvidenceRecord) -> EvidenceHash {
    digest(&canonicalize(record))
}

/// Evidence hash of an already-decoded JSON document, e.g. the `evidence_data`
/// echoed in an anchor result.
pub fn hash_value(value: &Value) -> EvidenceHash {
    digest(&canonical_bytes(value))
}

/// Canonical bytes of an arbitrary JSON value.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(256);
    write_value(&mut out, value);
    out
}

fn digest(bytes: &[u8]) -> EvidenceHash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    EvidenceHash(hasher.finalize().into())
}

/// JSON document for a record. Key names here define the hashed layout and
/// must match the record's serde representation.
fn record_value(record: &EvidenceRecord) -> Value {
    let metadata: Map<String, Value> = record
        .metadata
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let mut doc = Map::new();
    doc.insert("content".into(), Value::String(record.content.clone()));
    doc.insert("type".into(), Value::String(record.evidence_type.as_str().into()));
    doc.insert("source".into(), Value::String(record.source.clone()));
    doc.insert("timestamp".into(), Value::String(format_timestamp(&record.timestamp)));
    doc.insert("uploader".into(), Value::String(record.uploader.clone()));
    doc.insert("metadata".into(), Value::Object(metadata));
    Value::Object(doc)
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));

            out.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.extend_from_slice(b", ");
                }
                write_str(out, key);
                out.extend_from_slice(b": ");
                write_value(out, item);
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.extend_from_slice(b", ");
                }
                write_value(out, item);
            }
            out.push(b']');
        }
        Value::String(s) => write_str(out, s),
        // Scalars: serde_json's Display is the compact JSON text.
        scalar => out.extend_from_slice(scalar.to_string().as_bytes()),
    }
}

// serde_json escapes quotes, backslashes and control characters only, leaving
// non-ASCII text as raw UTF-8.
fn write_str(out: &mut Vec<u8>, s: &str) {
    let quoted = Value::String(s.to_owned()).to_string();
    out.extend_from_slice(quoted.as_bytes());
}
