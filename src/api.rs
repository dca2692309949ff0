// src/api.rs

use crate::config::{ApiConfig, Questionnaire};
use crate::ingest::RawFile;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};
use urlencoding::encode;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{operation} failed: {status} {body}")]
    Status {
        operation: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("Upload response did not contain an upload id")]
    MissingUploadId,

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Returned by the upload endpoint. Older servers use `upload_id`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    #[serde(rename = "uploadId", alias = "upload_id")]
    pub upload_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    upload_id: &'a str,
    questionnaire: &'a Questionnaire,
}

/// The remote readiness analysis service.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn upload(&self, file: &RawFile) -> Result<UploadReceipt, ApiError>;

    /// Run the analysis; the response shape varies by server version.
    async fn analyze(
        &self,
        upload_id: &str,
        questionnaire: &Questionnaire,
    ) -> Result<Value, ApiError>;

    async fn fetch_report(&self, report_id: &str) -> Result<Value, ApiError>;
}

/// Shareable URL of a stored report.
pub fn report_url(base_url: &str, report_id: &str) -> String {
    format!("{}/report/{}", base_url.trim_end_matches('/'), encode(report_id))
}

pub struct HttpAnalysisClient {
    client: Client,
    base_url: String,
}

impl HttpAnalysisClient {
    pub fn new(cfg: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(cfg.timeout()).build()?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Turn a non-success response into `ApiError::Status`, keeping the body
/// text for the message.
async fn ensure_success(operation: &'static str, response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(operation, status = %status, "Analysis service returned an error");
    Err(ApiError::Status {
        operation,
        status,
        body,
    })
}

#[async_trait]
impl AnalysisService for HttpAnalysisClient {
    async fn upload(&self, file: &RawFile) -> Result<UploadReceipt, ApiError> {
        let url = format!("{}/upload", self.base_url);
        info!(url = %url, file = %file.name, bytes = file.text.len(), "Uploading file");

        let part = Part::bytes(file.text.clone().into_bytes()).file_name(file.name.clone());
        let form = Form::new().part("file", part);

        let response = self.client.post(&url).multipart(form).send().await?;
        let body: Value = ensure_success("Upload", response).await?.json().await?;

        let receipt: UploadReceipt =
            serde_json::from_value(body).map_err(|_| ApiError::MissingUploadId)?;
        info!(upload_id = %receipt.upload_id, "Upload accepted");
        Ok(receipt)
    }

    async fn analyze(
        &self,
        upload_id: &str,
        questionnaire: &Questionnaire,
    ) -> Result<Value, ApiError> {
        let url = format!("{}/analyze", self.base_url);
        info!(url = %url, upload_id = %upload_id, "Requesting analysis");

        let request = AnalyzeRequest {
            upload_id,
            questionnaire,
        };
        let response = self.client.post(&url).json(&request).send().await?;
        Ok(ensure_success("Analyze", response).await?.json().await?)
    }

    async fn fetch_report(&self, report_id: &str) -> Result<Value, ApiError> {
        let url = report_url(&self.base_url, report_id);
        info!(url = %url, "Fetching report");

        let response = self.client.get(&url).send().await?;
        Ok(ensure_success("Get report", response).await?.json().await?)
    }
}
