//! HTTP client for a stowage server.
//!
//! Speaks the same framing as the server: an upload is a multipart body
//! with one `info` part and one `chunk` part per slice of content.

use bytes::{Bytes, BytesMut};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};

use crate::transfer::FileInfo;
use crate::web::dto::{ListResponse, UploadResponse};
use crate::web::error::{ErrorBody, ErrorCode};
use crate::{Result, StowageError};

/// Client for the `/api/files` endpoints.
#[derive(Debug, Clone)]
pub struct StowageClient {
    http: reqwest::Client,
    base_url: String,
}

impl StowageClient {
    /// Create a client for the server at `base_url` (e.g. `http://localhost:50051`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Get the server base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload `content` as `info`, sending one chunk part per `chunk_size` bytes.
    pub async fn upload(
        &self,
        info: &FileInfo,
        content: &[u8],
        chunk_size: usize,
    ) -> Result<UploadResponse> {
        if chunk_size == 0 {
            return Err(StowageError::InvalidArgument(
                "chunk size must be positive".to_string(),
            ));
        }
        let info_json = serde_json::to_string(info)
            .map_err(|e| StowageError::Transfer(format!("failed to encode file info: {e}")))?;

        let form = content
            .chunks(chunk_size)
            .fold(Form::new().part("info", Part::text(info_json)), |form, chunk| {
                form.part("chunk", Part::bytes(chunk.to_vec()))
            });

        let response = self
            .http
            .post(format!("{}/api/files", self.base_url))
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response, &info.filename).await?;
        Ok(response.json().await?)
    }

    /// Fetch one page of the file listing.
    pub async fn list(&self, page: u32, page_size: u32) -> Result<ListResponse> {
        let response = self
            .http
            .get(format!("{}/api/files", self.base_url))
            .query(&[("page", page), ("page_size", page_size)])
            .send()
            .await?;
        let response = check_status(response, "listing").await?;
        Ok(response.json().await?)
    }

    /// Download the file stored as `filename`, frame by frame.
    pub async fn download(&self, filename: &str) -> Result<Bytes> {
        let response = self
            .http
            .get(format!("{}/api/files/{}", self.base_url, filename))
            .send()
            .await?;
        let mut response = check_status(response, filename).await?;

        let mut data = BytesMut::new();
        while let Some(frame) = response.chunk().await? {
            data.extend_from_slice(&frame);
        }
        Ok(data.freeze())
    }
}

/// Turn an error response into the matching [`StowageError`].
async fn check_status(response: Response, subject: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await?;
    let Ok(ErrorBody { error }) = serde_json::from_slice::<ErrorBody>(&body) else {
        return Err(unexpected_status(status, &String::from_utf8_lossy(&body)));
    };

    Err(match error.code {
        ErrorCode::InvalidArgument => StowageError::InvalidArgument(error.message),
        ErrorCode::NotFound => StowageError::NotFound(format!("file '{subject}'")),
        ErrorCode::ResourceExhausted => StowageError::ResourceExhausted(error.message),
        ErrorCode::Internal => unexpected_status(status, &error.message),
    })
}

fn unexpected_status(status: StatusCode, message: &str) -> StowageError {
    StowageError::Transfer(format!("server returned {status}: {message}"))
}
