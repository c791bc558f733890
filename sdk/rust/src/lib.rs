//! HTTP client for the evidence anchoring service.

pub mod client;

pub use client::{
    AnchorClient, ApiResponse, EvidenceRequest, HealthResponse, SdkError, UploadRequest, UploadResponse,
};
