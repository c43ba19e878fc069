use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use serde::Deserialize;

/// Generation number chosen by the caller; cancellation is per ticket.
pub type Ticket = u64;

/// `POST /upscale` answer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadResponse {
    pub job_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub input_file: Option<String>,
}

/// `GET /download/{job_id}` answer. Only `download_url` is guaranteed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JobStatusResponse {
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub model: Option<String>,
}

/// `POST /auth/verify` answer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(default)]
    pub user: Option<serde_json::Value>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAsset {
    pub final_url: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl FetchedAsset {
    /// Last non-empty path segment of the final URL.
    pub fn file_name(&self) -> Option<String> {
        reqwest::Url::parse(&self.final_url)
            .ok()?
            .path_segments()?
            .filter(|segment| !segment.is_empty())
            .last()
            .map(ToOwned::to_owned)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Uploaded {
        ticket: Ticket,
        result: Result<UploadResponse, ApiError>,
    },
    StatusPolled {
        ticket: Ticket,
        result: Result<JobStatusResponse, ApiError>,
    },
    /// Enhanced asset fetched; `Ok` carries its size in bytes.
    AssetLoaded {
        ticket: Ticket,
        result: Result<u64, ApiError>,
    },
    CredentialChecked {
        sign_in: u64,
        result: Result<VerifyResponse, ApiError>,
    },
    ImageFetched {
        result: Result<FetchedAsset, ApiError>,
    },
    Downloaded {
        result: Result<PathBuf, ApiError>,
    },
    Health {
        result: Result<HealthResponse, ApiError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Decode,
    NotConfigured,
    Io,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Decode => write!(f, "malformed response"),
            FailureKind::NotConfigured => write!(f, "not configured"),
            FailureKind::Io => write!(f, "io error"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
