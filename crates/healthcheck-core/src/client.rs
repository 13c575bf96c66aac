//! HTTP client for the PDF analysis endpoint.
//!
//! One request per file: `POST {base}/upload-pdf` with the PDF as the
//! multipart field `file`. Files are validated locally first (extension,
//! `%PDF-` signature, size) so obviously bad input never reaches the network.

use std::path::Path;
use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;

use crate::session::ProcessingStats;
use crate::{AnalysisResult, Config};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 10;

pub const UPLOAD_PATH: &str = "/upload-pdf";

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid file: {0}")]
    InvalidFile(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned HTTP {code}: {detail}")]
    Status { code: u16, detail: String },
    #[error("could not decode server response: {0}")]
    Decode(String),
    #[error("the document was rejected: {0}")]
    Rejected(String),
}

/// A successful analysis plus what the server and the client measured.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub file_name: String,
    pub result: AnalysisResult,
    pub message: Option<String>,
    pub pages: Option<u32>,
    pub elapsed: Duration,
    pub size_bytes: u64,
}

impl UploadOutcome {
    pub fn stats(&self) -> ProcessingStats {
        ProcessingStats {
            processing_secs: Some(self.elapsed.as_secs_f64()),
            pages: self.pages,
            file_size_mb: Some(self.size_bytes as f64 / (1024.0 * 1024.0)),
        }
    }
}

pub struct AnalysisClient {
    http: reqwest::Client,
    base_url: String,
    max_upload_bytes: u64,
}

impl AnalysisClient {
    pub fn new(base_url: &str, timeout: Duration, max_upload_bytes: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_upload_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.api_base_url,
            config.request_timeout,
            config.max_upload_bytes,
        )
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, UPLOAD_PATH)
    }

    /// Read and validate a PDF from disk, then upload it.
    pub async fn analyze_file(&self, path: &Path) -> Result<UploadOutcome, ApiError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ApiError::InvalidFile(format!("{} is not a file", path.display())))?;
        check_extension(&file_name)?;
        let bytes = tokio::fs::read(path).await?;
        self.analyze_bytes(&file_name, bytes).await
    }

    /// Validate and upload an in-memory PDF.
    pub async fn analyze_bytes(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadOutcome, ApiError> {
        validate_pdf(file_name, &bytes, self.max_upload_bytes)?;
        let size_bytes = bytes.len() as u64;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        tracing::info!(file_name, size_bytes, url = %self.endpoint(), "uploading PDF");
        let started = Instant::now();
        let resp = self.http.post(self.endpoint()).multipart(form).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        let elapsed = started.elapsed();

        if !status.is_success() {
            let detail = error_detail(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });
            tracing::warn!(file_name, status = status.as_u16(), %detail, "upload failed");
            return Err(ApiError::Status {
                code: status.as_u16(),
                detail,
            });
        }

        let mut outcome = parse_upload_response(&body)?;
        if outcome.file_name.is_empty() {
            outcome.file_name = file_name.to_string();
        }
        outcome.elapsed = elapsed;
        outcome.size_bytes = size_bytes;
        tracing::info!(
            file_name,
            elapsed_ms = elapsed.as_millis() as u64,
            pages = outcome.pages,
            "analysis received"
        );
        Ok(outcome)
    }
}

fn check_extension(file_name: &str) -> Result<(), ApiError> {
    if file_name.to_ascii_lowercase().ends_with(".pdf") {
        Ok(())
    } else {
        Err(ApiError::InvalidFile(format!("{file_name} is not a PDF")))
    }
}

/// Local checks mirroring the server's: `.pdf` name, PDF signature, size.
pub fn validate_pdf(file_name: &str, bytes: &[u8], max_bytes: u64) -> Result<(), ApiError> {
    check_extension(file_name)?;
    if bytes.is_empty() {
        return Err(ApiError::InvalidFile(format!("{file_name} is empty")));
    }
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(ApiError::InvalidFile(format!(
            "{file_name} does not look like a PDF document"
        )));
    }
    if bytes.len() as u64 > max_bytes {
        return Err(ApiError::InvalidFile(format!(
            "{file_name} is {:.1} MB, the limit is {:.0} MB",
            bytes.len() as f64 / (1024.0 * 1024.0),
            max_bytes as f64 / (1024.0 * 1024.0)
        )));
    }
    Ok(())
}

fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Decode a 2xx response body. Timing and size are filled in by the caller.
pub fn parse_upload_response(body: &str) -> Result<UploadOutcome, ApiError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    let Value::Object(map) = &value else {
        return Err(ApiError::Decode("expected a JSON object".to_string()));
    };

    let result = match map.get("analysis_result") {
        None | Some(Value::Null) => {
            return Err(ApiError::Decode(
                "response has no analysis_result".to_string(),
            ));
        }
        Some(Value::String(text)) => parse_analysis_text(text)?,
        Some(obj @ Value::Object(_)) => parse_analysis_object(obj)?,
        Some(other) => {
            return Err(ApiError::Decode(format!(
                "unexpected analysis_result type: {other}"
            )));
        }
    };

    Ok(UploadOutcome {
        file_name: map
            .get("filename")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        result,
        message: map.get("message").and_then(Value::as_str).map(str::to_string),
        pages: map
            .get("pages")
            .and_then(Value::as_u64)
            .and_then(|p| u32::try_from(p).ok()),
        elapsed: Duration::ZERO,
        size_bytes: 0,
    })
}

/// `analysis_result` delivered as a string: JSON inside a string (possibly
/// fenced as a code block), or plain text from the model.
fn parse_analysis_text(text: &str) -> Result<AnalysisResult, ApiError> {
    let unfenced = strip_code_fence(text);
    match serde_json::from_str::<Value>(unfenced) {
        Ok(obj @ Value::Object(_)) => parse_analysis_object(&obj),
        _ => Ok(AnalysisResult {
            resultados_simplificados: Some(text.to_string()),
            ..Default::default()
        }),
    }
}

fn parse_analysis_object(obj: &Value) -> Result<AnalysisResult, ApiError> {
    if obj.get("isValid").and_then(Value::as_bool) == Some(false) {
        let reason = obj
            .get("errorMessage")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("the document is not a laboratory report");
        return Err(ApiError::Rejected(reason.to_string()));
    }
    serde_json::from_value(obj.clone()).map_err(|e| ApiError::Decode(e.to_string()))
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
