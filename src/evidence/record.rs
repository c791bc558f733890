//! Evidence records and the submission contract that produces them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::anchoring::error::{AnchorError, ValidationError};

/// Uploader recorded when a submission carries no address.
pub const DEFAULT_UPLOADER: &str = "user";

/// Closed set of evidence kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceType {
    Message,
    Document,
    Image,
    Audio,
    Video,
    Binary,
    Other,
}

impl EvidenceType {
    pub const ALL: [EvidenceType; 7] = [
        EvidenceType::Message,
        EvidenceType::Document,
        EvidenceType::Image,
        EvidenceType::Audio,
        EvidenceType::Video,
        EvidenceType::Binary,
        EvidenceType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceType::Message => "message",
            EvidenceType::Document => "document",
            EvidenceType::Image => "image",
            EvidenceType::Audio => "audio",
            EvidenceType::Video => "video",
            EvidenceType::Binary => "binary",
            EvidenceType::Other => "other",
        }
    }
}

impl fmt::Display for EvidenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvidenceType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::UnsupportedType(s.to_string()))
    }
}

/// A record whose existence is to be proven on-chain.
///
/// Field names are part of the hashed layout; renaming any of them changes
/// every evidence hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub content: String,
    #[serde(rename = "type")]
    pub evidence_type: EvidenceType,
    pub source: String,
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
    pub uploader: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl EvidenceRecord {
    /// Create a record stamped with the current instant.
    pub fn new(content: impl Into<String>, evidence_type: EvidenceType, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            evidence_type,
            source: source.into(),
            timestamp: now(),
            uploader: String::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp.trunc_subsecs(6);
        self
    }

    pub fn with_uploader(mut self, uploader: impl Into<String>) -> Self {
        self.uploader = uploader.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Check the record invariants. Runs before any network interaction.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.content.trim().is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        Ok(())
    }

    /// First `max_chars` characters of the content, for display.
    pub fn content_preview(&self, max_chars: usize) -> String {
        self.content.chars().take(max_chars).collect()
    }
}

/// Evidence as handed over by an upload or agent layer.
///
/// The type is kept as free text here so an unknown kind can be reported as
/// `unsupported_type` instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceSubmission {
    pub content: String,
    #[serde(rename = "type", alias = "evidence_type")]
    pub evidence_type: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploader_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl EvidenceSubmission {
    /// Validate the submission and build the record to anchor.
    ///
    /// Optional descriptive fields are folded into the metadata so they are
    /// covered by the evidence hash.
    pub fn into_record(self) -> Result<EvidenceRecord, AnchorError> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(ValidationError::EmptyContent.into());
        }
        let evidence_type: EvidenceType = self.evidence_type.parse()?;

        let mut metadata = self.metadata;
        let uploader = non_empty(self.uploader_address);
        for (key, value) in [
            ("description", non_empty(self.description)),
            ("uploader_address", uploader.clone()),
            ("file_name", non_empty(self.file_name)),
        ] {
            if let Some(value) = value {
                metadata.insert(key.to_string(), serde_json::Value::String(value));
            }
        }

        Ok(EvidenceRecord {
            content: content.to_string(),
            evidence_type,
            source: self.source,
            timestamp: now(),
            uploader: uploader.unwrap_or_else(|| DEFAULT_UPLOADER.to_string()),
            metadata,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Current instant at the precision used in hashed timestamps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Timestamp rendering shared by records, results and attestation messages.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

pub(crate) mod iso8601 {
    use chrono::{DateTime, SubsecRound, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc).trunc_subsecs(6))
            .map_err(serde::de::Error::custom)
    }
}
