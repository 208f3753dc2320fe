//! Line Server Client
//!
//! HTTP access to every endpoint the dashboard consumes. The [`LineApi`]
//! trait is the seam the scrap desk and the feed tasks work against.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::model::records::{CodeReply, DescriptionReply};
use crate::model::{PartEntry, PayloadPatch, ScrapRecord, ScrapReport, UploadReply, WirePayload};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {path} failed: {source}")]
    Http {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{path} answered with status {status}")]
    Status { path: String, status: StatusCode },
    #[error("{0} not found")]
    NotFound(String),
    #[error("server rejected the request: {0}")]
    Rejected(String),
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait LineApi: Send + Sync {
    async fn production_data(&self) -> Result<PayloadPatch, ClientError>;
    async fn upload_video(&self, path: &Path) -> Result<(), ClientError>;
    async fn programs(&self) -> Result<Vec<String>, ClientError>;
    async fn parts(&self, program: &str) -> Result<Vec<PartEntry>, ClientError>;
    async fn defect_codes(&self) -> Result<Vec<String>, ClientError>;
    async fn defect_descriptions(&self) -> Result<Vec<String>, ClientError>;
    async fn description_for_code(&self, code: &str) -> Result<String, ClientError>;
    async fn code_for_description(&self, description: &str) -> Result<String, ClientError>;
    async fn submit_scrap(&self, report: &ScrapReport) -> Result<ScrapRecord, ClientError>;
    async fn scrap_history(&self) -> Result<Vec<ScrapRecord>, ClientError>;
}

/// reqwest-backed [`LineApi`].
#[derive(Debug, Clone)]
pub struct LineClient {
    client: Client,
    /// Separate client without a request timeout for the push channel.
    streaming: Client,
    base_url: String,
}

impl LineClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            streaming: Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Preview reference with a cache-busting query parameter.
    pub fn preview_url(&self, video_feed_path: &str, stamp_millis: i64) -> String {
        format!("{}?t={}", self.url(video_feed_path), stamp_millis)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        debug!("GET {}", path);
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|source| ClientError::Http { path: path.to_string(), source })?;
        decode(path, response).await
    }

    /// Open the push channel. The caller drains the body as a byte stream.
    pub async fn open_event_stream(&self, path: &str) -> Result<Response, ClientError> {
        let response = self
            .streaming
            .get(self.url(path))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|source| ClientError::Http { path: path.to_string(), source })?;
        if !response.status().is_success() {
            return Err(ClientError::Status { path: path.to_string(), status: response.status() });
        }
        Ok(response)
    }
}

async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound(path.to_string()));
    }
    if !status.is_success() {
        return Err(ClientError::Status { path: path.to_string(), status });
    }
    response
        .json::<T>()
        .await
        .map_err(|source| ClientError::Http { path: path.to_string(), source })
}

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[async_trait]
impl LineApi for LineClient {
    async fn production_data(&self) -> Result<PayloadPatch, ClientError> {
        let wire: WirePayload = self.get_json("/production_data").await?;
        Ok(wire.into())
    }

    async fn upload_video(&self, path: &Path) -> Result<(), ClientError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ClientError::Io { path: path.to_path_buf(), source })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        let form = reqwest::multipart::Form::new()
            .part("video", reqwest::multipart::Part::bytes(bytes).file_name(file_name));

        let endpoint = "/upload_video";
        let response = self
            .client
            .post(self.url(endpoint))
            .multipart(form)
            .send()
            .await
            .map_err(|source| ClientError::Http { path: endpoint.to_string(), source })?;
        let reply: UploadReply = decode(endpoint, response).await?;
        if reply.success {
            Ok(())
        } else {
            Err(ClientError::Rejected(
                reply.error.unwrap_or_else(|| "Unknown error".to_string()),
            ))
        }
    }

    async fn programs(&self) -> Result<Vec<String>, ClientError> {
        self.get_json("/get_programs").await
    }

    async fn parts(&self, program: &str) -> Result<Vec<PartEntry>, ClientError> {
        self.get_json(&format!("/get_parts/{}", segment(program))).await
    }

    async fn defect_codes(&self) -> Result<Vec<String>, ClientError> {
        self.get_json("/get_defect_codes").await
    }

    async fn defect_descriptions(&self) -> Result<Vec<String>, ClientError> {
        self.get_json("/get_defect_descriptions").await
    }

    async fn description_for_code(&self, code: &str) -> Result<String, ClientError> {
        let reply: DescriptionReply = self
            .get_json(&format!("/get_description/{}", segment(code)))
            .await?;
        Ok(reply.description)
    }

    async fn code_for_description(&self, description: &str) -> Result<String, ClientError> {
        let reply: CodeReply = self
            .get_json(&format!("/get_code/{}", segment(description)))
            .await?;
        Ok(reply.code)
    }

    async fn submit_scrap(&self, report: &ScrapReport) -> Result<ScrapRecord, ClientError> {
        let endpoint = "/submit_scrap";
        let response = self
            .client
            .post(self.url(endpoint))
            .json(report)
            .send()
            .await
            .map_err(|source| ClientError::Http { path: endpoint.to_string(), source })?;
        decode(endpoint, response).await
    }

    async fn scrap_history(&self) -> Result<Vec<ScrapRecord>, ClientError> {
        self.get_json("/get_scrap_history").await
    }
}
