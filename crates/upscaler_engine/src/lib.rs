//! Upscaler engine: HTTP client, IO thread and effect execution.
mod client;
mod engine;
mod filename;
mod persist;
mod types;

pub use client::{ClientSettings, CredentialVerifier, ReqwestUpscaleClient, UpscaleApi};
pub use engine::EngineHandle;
pub use filename::enhanced_filename;
pub use persist::{ensure_dir, AtomicFileWriter, PersistError};
pub use types::{
    ApiError, EngineEvent, FailureKind, FetchedAsset, HealthResponse, JobStatusResponse, Ticket,
    UploadFile, UploadResponse, VerifyResponse,
};
