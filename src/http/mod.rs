//! HTTP API subsystem.
//!
//! # Data Flow
//! ```text
//! Client request
//!     → server.rs (request ID, trace, timeout, body limit)
//!     → handlers.rs (decode JSON or multipart into an EvidenceSubmission)
//!     → AnchorEngine on a detached task
//!     → response.rs (AnchorResult as JSON, or flattened for uploads)
//! ```

pub mod handlers;
pub mod response;
pub mod server;

pub use response::{HealthResponse, UploadResponse};
pub use server::{AppState, HttpServer};
