use bytes::Bytes;
use futures::stream;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Method, Response};
use serde::de::DeserializeOwned;

use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::error::{ClientError, ClientResult};
use crate::metrics;
use crate::models::{DocumentFile, HealthResponse, PdfInfoResponse, PdfUploadResponse};
use crate::services::http_client::ApiClient;

const HEALTH: &str = "api/health";
const UPLOAD: &str = "api/pdf/upload";
const INFO: &str = "api/pdf/info";

const PROGRESS_CHUNK_BYTES: usize = 64 * 1024;

/// Client for the PDF text-extraction endpoints.
#[derive(Clone)]
pub struct PdfApiClient {
    api: ApiClient,
    max_upload_bytes: u64,
}

impl PdfApiClient {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max: u64) -> Self {
        self.max_upload_bytes = max;
        self
    }

    pub async fn check_health(&self) -> ClientResult<HealthResponse> {
        let builder = self.api.request(Method::GET, HEALTH).await?;
        let response = self.api.execute(builder, "GET", HEALTH).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Http {
                status,
                message: "API health check failed".to_string(),
            });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Uploads a PDF and returns its extracted text.
    pub async fn upload_and_extract(&self, file: &DocumentFile) -> ClientResult<PdfUploadResponse> {
        self.validate(file, true)?;
        let form = Form::new().part("file", file.to_part()?);
        let response = self.send_form(UPLOAD, form).await?;
        let result = read_response(response, "Failed to upload PDF").await;
        metrics::record_upload("pdf", result.is_ok());
        result
    }

    /// Page count and size, without the text. Only the extension is checked.
    pub async fn pdf_info(&self, file: &DocumentFile) -> ClientResult<PdfInfoResponse> {
        self.validate(file, false)?;
        let form = Form::new().part("file", file.to_part()?);
        let response = self.send_form(INFO, form).await?;
        read_response(response, "Failed to get PDF info").await
    }

    /// Same as [`upload_and_extract`](Self::upload_and_extract), reporting
    /// percent of the body handed to the connection (0-100, non-decreasing,
    /// ending at 100).
    pub async fn upload_with_progress<F>(
        &self,
        file: &DocumentFile,
        mut on_progress: F,
    ) -> ClientResult<PdfUploadResponse>
    where
        F: FnMut(f64) + Send + Sync + 'static,
    {
        self.validate(file, true)?;

        let total = file.bytes.len();
        if total == 0 {
            on_progress(100.0);
        }

        let chunks: Vec<Bytes> = (0..total)
            .step_by(PROGRESS_CHUNK_BYTES)
            .map(|start| file.bytes.slice(start..(start + PROGRESS_CHUNK_BYTES).min(total)))
            .collect();

        let mut sent = 0usize;
        let body = stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len();
            on_progress(sent as f64 / total as f64 * 100.0);
            Ok::<Bytes, std::io::Error>(chunk)
        }));

        let part = Part::stream_with_length(Body::wrap_stream(body), file.len())
            .file_name(file.file_name.clone())
            .mime_str("application/pdf")?;
        let form = Form::new().part("file", part);

        let response = self.send_form(UPLOAD, form).await?;
        let result = read_response(response, "Upload failed").await;
        metrics::record_upload("pdf", result.is_ok());
        result
    }

    fn validate(&self, file: &DocumentFile, check_size: bool) -> ClientResult<()> {
        if !file.is_pdf() {
            return Err(ClientError::Validation(
                "Only PDF files are allowed".to_string(),
            ));
        }
        if check_size && file.len() > self.max_upload_bytes {
            return Err(ClientError::Validation(format!(
                "File size exceeds {}MB limit",
                self.max_upload_bytes / (1024 * 1024)
            )));
        }
        Ok(())
    }

    async fn send_form(&self, path: &str, form: Form) -> ClientResult<Response> {
        let builder = self.api.request(Method::POST, path).await?.multipart(form);
        self.api.execute(builder, "POST", path).await
    }
}

/// Decodes a 2xx body; otherwise fails with the body's `error` field or `fallback`.
async fn read_response<T: DeserializeOwned>(response: Response, fallback: &str) -> ClientResult<T> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if status.is_success() {
        return Ok(serde_json::from_slice(&bytes)?);
    }

    let message = error_field(&bytes).unwrap_or_else(|| fallback.to_string());
    tracing::warn!(status = status.as_u16(), %message, "PDF request failed");
    Err(ClientError::Http { status, message })
}

fn error_field(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()?
        .get("error")?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
