//! Evidence model, canonical hashing and on-chain payload layout.
//!
//! # Data Flow
//! ```text
//! EvidenceSubmission (upload / agent layer)
//!     → record.rs (validate, fold optional fields into metadata)
//!     → canonical.rs (sorted-key canonical bytes → SHA-256)
//!     → payload.rs (protocol tag + hash → 50-byte tx data)
//! ```
//!
//! Everything in this module is pure: no I/O, no clocks except when a
//! submission is stamped.

pub mod canonical;
pub mod payload;
pub mod record;

pub use canonical::{canonicalize, hash, EvidenceHash};
pub use payload::{AnchorPayload, PayloadError, PROTOCOL_TAG};
pub use record::{EvidenceRecord, EvidenceSubmission, EvidenceType};
