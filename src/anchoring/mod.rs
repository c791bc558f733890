//! Evidence anchoring engine.
//!
//! Ties the evidence model to the chain: validation, hashing, signing,
//! broadcast and result assembly, with per-signer nonce serialization.

pub mod engine;
pub mod error;
pub mod result;

pub use engine::{AnchorEngine, EngineBuilder};
pub use error::{AnchorError, ConfigurationError, EngineResult, ErrorCode, ValidationError};
pub use result::{explorer_url, AnchorFailure, AnchorReceipt, AnchorResult, ANCHOR_MODE};
