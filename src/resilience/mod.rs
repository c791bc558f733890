//! Resilience helpers.
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every RPC call has a deadline (see
//!   `blockchain::client`)
//! - Receipt polling backs off exponentially with jitter
//! - Broadcasts are never retried automatically

pub mod backoff;
