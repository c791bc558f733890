//! Response bodies and error responses of the HTTP API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::anchoring::{AnchorResult, ErrorCode};

/// Upload response: the common result fields flattened next to the full
/// result, for front-ends that only read the top level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub status: String,
    pub message: String,
    pub error: Option<ErrorCode>,
    pub tx_hash: Option<String>,
    pub evidence_hash: Option<String>,
    pub signature: Option<String>,
    pub timestamp: Option<String>,
    pub explorer_url: Option<String>,
    pub result: AnchorResult,
}

impl From<AnchorResult> for UploadResponse {
    fn from(result: AnchorResult) -> Self {
        let receipt = result.receipt();
        Self {
            success: result.is_success(),
            status: result.status().to_string(),
            message: result
                .failure_detail()
                .map_or_else(|| "OK".to_string(), |f| f.message.clone()),
            error: result.error_code(),
            tx_hash: result.tx_hash().map(str::to_string),
            evidence_hash: result.evidence_hash().map(|h| h.to_hex()),
            signature: receipt.map(|r| r.signature.clone()),
            timestamp: Some(result.timestamp().to_string()),
            explorer_url: receipt.and_then(|r| r.explorer_url.clone()),
            result,
        }
    }
}

/// Health probe body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub engine_ready: bool,
    pub version: String,
}

/// HTTP status for a JSON anchoring result.
pub fn status_for(result: &AnchorResult) -> StatusCode {
    match result.error_code() {
        None => StatusCode::OK,
        Some(ErrorCode::EmptyContent | ErrorCode::UnsupportedType) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(ErrorCode::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
        Some(ErrorCode::RpcUnreachable | ErrorCode::OnchainFailed) => StatusCode::BAD_GATEWAY,
        Some(
            ErrorCode::MissingRpcUrl | ErrorCode::MissingPrivateKey | ErrorCode::MissingDependencies,
        ) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Failures that happen before the engine is reached.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no evidence file provided")]
    MissingFile,

    #[error("invalid multipart body: {0}")]
    Multipart(String),

    #[error("anchor engine not initialized")]
    EngineUnavailable,

    #[error("anchoring task failed: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFile | ApiError::Multipart(_) => StatusCode::BAD_REQUEST,
            ApiError::EngineUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::MissingFile => "missing_file",
            ApiError::Multipart(_) => "invalid_request",
            ApiError::EngineUnavailable => "engine_unavailable",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.code().to_string(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
