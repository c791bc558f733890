//! Request handlers.
//!
//! Anchoring runs on its own task: once a request reaches the engine, a
//! client disconnect cannot drop the invocation between broadcast and result.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine as _;

use crate::anchoring::{AnchorEngine, AnchorResult};
use crate::evidence::EvidenceSubmission;
use crate::http::response::{status_for, ApiError, HealthResponse, UploadResponse};
use crate::http::server::AppState;
use crate::observability::metrics;

const DEFAULT_UPLOAD_TYPE: &str = "document";
const DEFAULT_UPLOAD_SOURCE: &str = "user_upload";

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    metrics::record_http_request("/api/health", 200);
    Json(HealthResponse {
        status: "ok".to_string(),
        engine_ready: state.engine.is_some(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /api/evidence` with a JSON submission.
pub async fn submit_evidence(
    State(state): State<AppState>,
    Json(submission): Json<EvidenceSubmission>,
) -> Response {
    let outcome = match state.engine.clone() {
        Some(engine) => run_detached(engine, submission, &state).await,
        None => Err(ApiError::EngineUnavailable),
    };

    match outcome {
        Ok(result) => {
            let status = status_for(&result);
            metrics::record_http_request("/api/evidence", status.as_u16());
            (status, Json(result)).into_response()
        }
        Err(e) => {
            metrics::record_http_request("/api/evidence", e.status().as_u16());
            e.into_response()
        }
    }
}

/// `POST /api/upload-evidence` with a multipart form.
pub async fn upload_evidence(State(state): State<AppState>, multipart: Multipart) -> Response {
    let outcome = async {
        let engine = state.engine.clone().ok_or(ApiError::EngineUnavailable)?;
        let submission = read_upload(multipart).await?;
        run_detached(engine, submission, &state).await
    }
    .await;

    match outcome {
        Ok(result) => {
            metrics::record_http_request("/api/upload-evidence", 200);
            (StatusCode::OK, Json(UploadResponse::from(result))).into_response()
        }
        Err(e) => {
            tracing::info!(error = %e, "Upload rejected");
            metrics::record_http_request("/api/upload-evidence", e.status().as_u16());
            e.into_response()
        }
    }
}

async fn run_detached(
    engine: AnchorEngine,
    submission: EvidenceSubmission,
    state: &AppState,
) -> Result<AnchorResult, ApiError> {
    let signal = state.shutdown.clone();
    tokio::spawn(async move { engine.submit_cancellable(submission, signal).await })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))
}

#[derive(Default)]
struct UploadForm {
    file: Option<(String, Vec<u8>)>,
    evidence_type: Option<String>,
    evidence_source: Option<String>,
    user_address: Option<String>,
    description: Option<String>,
}

async fn read_upload(mut multipart: Multipart) -> Result<EvidenceSubmission, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Multipart(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "evidence_file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Multipart(e.body_text()))?;
                form.file = Some((file_name, bytes.to_vec()));
            }
            "evidence_type" | "evidence_source" | "user_address" | "description" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Multipart(e.body_text()))?;
                let slot = match name.as_str() {
                    "evidence_type" => &mut form.evidence_type,
                    "evidence_source" => &mut form.evidence_source,
                    "user_address" => &mut form.user_address,
                    _ => &mut form.description,
                };
                *slot = Some(value);
            }
            other => tracing::debug!(field = other, "Ignoring unknown upload field"),
        }
    }

    build_submission(form)
}

fn build_submission(form: UploadForm) -> Result<EvidenceSubmission, ApiError> {
    let (file_name, bytes) = form
        .file
        .filter(|(name, _)| !name.is_empty())
        .ok_or(ApiError::MissingFile)?;

    let mut evidence_type = match form.evidence_type.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_UPLOAD_TYPE.to_string(),
        // Older front-ends send "text" for plain documents.
        Some("text") => DEFAULT_UPLOAD_TYPE.to_string(),
        Some(other) => other.to_string(),
    };

    let (content, encoding) = match String::from_utf8(bytes) {
        Ok(text) => (text, "utf-8"),
        Err(e) => {
            evidence_type = "binary".to_string();
            (base64::engine::general_purpose::STANDARD.encode(e.into_bytes()), "base64")
        }
    };

    let mut submission = EvidenceSubmission {
        content,
        evidence_type,
        source: form
            .evidence_source
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_UPLOAD_SOURCE.to_string()),
        description: form.description,
        uploader_address: form.user_address,
        file_name: Some(file_name),
        ..Default::default()
    };
    submission
        .metadata
        .insert("content_encoding".to_string(), encoding.into());
    Ok(submission)
}
