use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub type SdkError = Box<dyn std::error::Error + Send + Sync>;

/// JSON submission for `POST /api/evidence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceRequest {
    pub content: String,
    #[serde(rename = "type")]
    pub evidence_type: String, // message, document, image, audio, video, binary or other
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Multipart upload for `POST /api/upload-evidence`.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub evidence_type: Option<String>,
    pub evidence_source: Option<String>,
    pub user_address: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub engine_ready: bool,
    pub version: String,
}

/// Upload outcome. Request-level errors (missing file, engine down) only
/// fill `success`, `error` and `message`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadResponse {
    pub success: bool,
    pub status: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub tx_hash: Option<String>,
    pub evidence_hash: Option<String>,
    pub signature: Option<String>,
    pub timestamp: Option<String>,
    pub explorer_url: Option<String>,
    pub result: Option<serde_json::Value>,
}

/// HTTP status plus decoded body.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub http_status: u16,
    pub body: T,
}

pub struct AnchorClient {
    client: Client,
    base_url: String,
}

impl AnchorClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Use a preconfigured `reqwest` client (proxies, timeouts, TLS).
    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn health(&self) -> Result<HealthResponse, SdkError> {
        let resp = self
            .client
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(format!("Service returned error status {}: {}", status, text).into());
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Anchor a JSON submission. The body is the anchoring result for both
    /// success and error outcomes.
    pub async fn submit(&self, req: &EvidenceRequest) -> Result<ApiResponse<serde_json::Value>, SdkError> {
        let resp = self
            .client
            .post(format!("{}/api/evidence", self.base_url))
            .json(req)
            .send()
            .await?;

        let http_status = resp.status().as_u16();
        let body = resp.json().await?;
        Ok(ApiResponse { http_status, body })
    }

    /// Upload a file as evidence.
    pub async fn upload_file(&self, req: UploadRequest) -> Result<ApiResponse<UploadResponse>, SdkError> {
        let mut form = Form::new().part(
            "evidence_file",
            Part::bytes(req.bytes).file_name(req.file_name),
        );
        for (name, value) in [
            ("evidence_type", req.evidence_type),
            ("evidence_source", req.evidence_source),
            ("user_address", req.user_address),
            ("description", req.description),
        ] {
            if let Some(value) = value {
                form = form.text(name, value);
            }
        }

        let resp = self
            .client
            .post(format!("{}/api/upload-evidence", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let http_status = resp.status().as_u16();
        let body = resp.json().await?;
        Ok(ApiResponse { http_status, body })
    }
}
