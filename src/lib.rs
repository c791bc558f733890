//! Evidence anchoring service library.
//!
//! Hashes evidence records into a canonical digest and anchors the digest on
//! an EVM chain inside a zero-value self-transfer, with an attestation
//! signature binding the digest to the anchoring time.

pub mod anchoring;
pub mod blockchain;
pub mod config;
pub mod evidence;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use anchoring::{AnchorEngine, AnchorResult};
pub use config::schema::AnchorConfig;
pub use evidence::{EvidenceRecord, EvidenceSubmission};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
