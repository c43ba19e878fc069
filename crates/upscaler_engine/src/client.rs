use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;

use crate::{
    ApiError, FailureKind, FetchedAsset, HealthResponse, JobStatusResponse, UploadFile,
    UploadResponse, VerifyResponse,
};

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_base_url: String,
    /// Base of the auth service; verification is unavailable without it.
    pub auth_base_url: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_asset_bytes: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            auth_base_url: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_asset_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Remote upscaling service.
#[async_trait::async_trait]
pub trait UpscaleApi: Send + Sync {
    async fn upload(&self, file: UploadFile) -> Result<UploadResponse, ApiError>;

    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse, ApiError>;

    /// Fetches an image from an absolute URL (result asset or test image).
    async fn fetch_asset(&self, url: &str) -> Result<FetchedAsset, ApiError>;

    async fn health(&self) -> Result<HealthResponse, ApiError>;
}

/// Server-side check of a sign-in credential.
#[async_trait::async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifyResponse, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestUpscaleClient {
    settings: ClientSettings,
    client: reqwest::Client,
}

impl ReqwestUpscaleClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn endpoint(base: &str, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(base)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::new(FailureKind::InvalidUrl, "base url cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn api_endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        Self::endpoint(&self.settings.api_base_url, segments)
    }

    /// `image/*`, or the generic binary type some object stores send.
    fn is_image_content_type(content_type: &str) -> bool {
        let essence = content_type
            .split_once(';')
            .map_or(content_type, |(essence, _)| essence)
            .trim()
            .to_ascii_lowercase();
        essence.starts_with("image/") || essence == "application/octet-stream"
    }
}

#[async_trait::async_trait]
impl UpscaleApi for ReqwestUpscaleClient {
    async fn upload(&self, file: UploadFile) -> Result<UploadResponse, ApiError> {
        let url = self.api_endpoint(&["upscale"])?;
        let part = Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str(&file.mime)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode_json(response).await
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse, ApiError> {
        let url = self.api_endpoint(&["download", job_id])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode_json(response).await
    }

    async fn fetch_asset(&self, url: &str) -> Result<FetchedAsset, ApiError> {
        let parsed =
            Url::parse(url).map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if let Err(err) = response.error_for_status_ref() {
            let code = err.status().map_or(0, |status| status.as_u16());
            return Err(ApiError::new(FailureKind::HttpStatus(code), err.to_string()));
        }

        let content_type = header_content_type(&response);
        if let Some(declared) = content_type.as_deref() {
            if !Self::is_image_content_type(declared) {
                return Err(ApiError::new(
                    FailureKind::UnsupportedContentType {
                        content_type: declared.to_string(),
                    },
                    "not an image",
                ));
            }
        }

        let final_url = response.url().to_string();
        let bytes = read_capped(response, self.settings.max_asset_bytes).await?;
        Ok(FetchedAsset {
            final_url,
            content_type,
            bytes,
        })
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        let url = self.api_endpoint(&["health"])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode_json(response).await
    }
}

#[async_trait::async_trait]
impl CredentialVerifier for ReqwestUpscaleClient {
    async fn verify(&self, token: &str) -> Result<VerifyResponse, ApiError> {
        let base = self.settings.auth_base_url.as_deref().ok_or_else(|| {
            ApiError::new(FailureKind::NotConfigured, "no auth service configured")
        })?;
        let mut url = Self::endpoint(base, &["auth", "verify"])?;
        url.query_pairs_mut().append_pair("token", token);

        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        // The auth service answers 401 for bad tokens; that is a verdict, not an outage.
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(VerifyResponse {
                valid: false,
                user: None,
            });
        }
        decode_json(response).await
    }
}

fn header_content_type(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)?
        .to_str()
        .ok()
        .map(ToOwned::to_owned)
}

/// Streams the body, failing as soon as it grows past `max_bytes`.
async fn read_capped(response: Response, max_bytes: u64) -> Result<Bytes, ApiError> {
    let too_large = |actual: u64| {
        ApiError::new(
            FailureKind::TooLarge {
                max_bytes,
                actual: Some(actual),
            },
            "asset exceeds the size limit",
        )
    };
    if let Some(declared) = response.content_length().filter(|len| *len > max_bytes) {
        return Err(too_large(declared));
    }

    let mut body = BytesMut::new();
    let mut chunks = response.bytes_stream();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(map_reqwest_error)?;
        let received = (body.len() + chunk.len()) as u64;
        if received > max_bytes {
            return Err(too_large(received));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::new(
            FailureKind::HttpStatus(status.as_u16()),
            error_detail(&body).unwrap_or_else(|| status.to_string()),
        ));
    }
    response
        .json::<T>()
        .await
        .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
}

/// FastAPI-style `{"detail": "..."}` bodies carry the useful message.
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("detail")
        .and_then(|detail| detail.as_str())
        .map(ToOwned::to_owned)
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(FailureKind::Decode, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::{error_detail, ReqwestUpscaleClient};

    #[test]
    fn endpoint_joins_segments_and_escapes_job_id() {
        let url =
            ReqwestUpscaleClient::endpoint("http://api.test/v1/", &["download", "a b/c"]).unwrap();
        assert_eq!(url.as_str(), "http://api.test/v1/download/a%20b%2Fc");
    }

    #[test]
    fn detail_is_extracted_from_fastapi_errors() {
        assert_eq!(
            error_detail(r#"{"detail":"File not found: nope"}"#),
            Some("File not found: nope".to_string())
        );
        assert_eq!(error_detail("<html>"), None);
    }

    #[test]
    fn octet_stream_counts_as_image() {
        assert!(ReqwestUpscaleClient::is_image_content_type(
            "image/jpeg; charset=binary"
        ));
        assert!(ReqwestUpscaleClient::is_image_content_type(
            "application/octet-stream"
        ));
        assert!(!ReqwestUpscaleClient::is_image_content_type("text/html"));
    }
}
