use std::time::{Duration, Instant};

use chrono::Utc;
use engine_logging::{engine_debug, engine_info, engine_warn};
use upscaler_core::{cache_busted_url, Effect, Msg, StatusReport, VerificationOutcome};
use upscaler_engine::{
    enhanced_filename, ApiError, EngineEvent, EngineHandle, HealthResponse, JobStatusResponse,
    UploadFile, VerifyResponse,
};

use super::files::candidate_from_download;
use super::persistence::SessionCache;

/// Executes core effects: network work goes to the engine, session writes
/// go to the cache. Engine results come back through [`EffectRunner::next_msg`].
pub struct EffectRunner {
    engine: EngineHandle,
    cache: SessionCache,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, cache: SessionCache) -> Self {
        Self { engine, cache }
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::PersistSession(snapshot) => self.cache.store(&snapshot),
                Effect::ClearCachedSession => self.cache.clear(),
                Effect::VerifyCredential {
                    sign_in,
                    credential,
                } => {
                    engine_debug!(
                        "VerifyCredential sign_in={} token_len={}",
                        sign_in,
                        credential.expose().len()
                    );
                    self.engine.verify(sign_in, credential.expose());
                }
                Effect::FetchTestImage { url } => {
                    engine_info!("FetchTestImage url={}", url);
                    self.engine.fetch_image(url);
                }
                Effect::UploadFile { ticket, file } => {
                    self.engine.upload(
                        ticket,
                        UploadFile {
                            name: file.name,
                            mime: file.mime,
                            bytes: file.bytes,
                        },
                    );
                }
                Effect::PollStatus {
                    ticket,
                    job_id,
                    delay,
                } => self.engine.poll_status(ticket, job_id, delay),
                Effect::LoadEnhancedImage {
                    ticket,
                    url,
                    retry,
                    delay,
                } => {
                    let url = cache_busted_url(&url, retry, Utc::now().timestamp_millis());
                    self.engine.load_asset(ticket, url, delay);
                }
                Effect::CancelTicket { ticket } => self.engine.cancel(ticket),
                Effect::SaveDownload {
                    url,
                    job_id,
                    input_file,
                } => {
                    let file_name = enhanced_filename(input_file.as_deref(), &job_id, &url);
                    engine_info!("SaveDownload job_id={} file={}", job_id, file_name);
                    self.engine.download(url, file_name);
                }
            }
        }
    }

    /// Waits up to `timeout` for the next engine result that maps to a message.
    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = self.engine.recv_timeout(remaining)?;
            if let Some(msg) = map_event(event) {
                return Some(msg);
            }
            if remaining.is_zero() {
                return None;
            }
        }
    }

    /// Asks the service for its health, waiting up to `timeout`.
    pub fn check_health(&self, timeout: Duration) -> Option<Result<HealthResponse, ApiError>> {
        self.engine.check_health();
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.engine.recv_timeout(remaining)? {
                EngineEvent::Health { result } => return Some(result),
                other => engine_debug!("Ignoring event while checking health: {:?}", other),
            }
        }
    }
}

fn map_event(event: EngineEvent) -> Option<Msg> {
    let msg = match event {
        EngineEvent::Uploaded { ticket, result } => match result {
            Ok(response) => Msg::UploadSucceeded {
                ticket,
                job_id: response.job_id,
                input_file: response.input_file,
            },
            Err(err) => Msg::UploadFailed {
                ticket,
                message: err.to_string(),
            },
        },
        EngineEvent::StatusPolled { ticket, result } => match result {
            Ok(response) => Msg::StatusReceived {
                ticket,
                report: status_report(response),
            },
            Err(err) => Msg::StatusFailed {
                ticket,
                message: err.to_string(),
            },
        },
        EngineEvent::AssetLoaded { ticket, result } => match result {
            Ok(bytes) => Msg::EnhancedImageLoaded { ticket, bytes },
            Err(err) => Msg::EnhancedImageFailed {
                ticket,
                message: err.to_string(),
            },
        },
        EngineEvent::CredentialChecked { sign_in, result } => Msg::CredentialChecked {
            sign_in,
            outcome: verification_outcome(result),
        },
        EngineEvent::ImageFetched { result } => match result {
            Ok(asset) => Msg::TestImageLoaded(candidate_from_download(
                asset.file_name(),
                asset.content_type.as_deref(),
                asset.bytes.to_vec(),
            )),
            Err(err) => Msg::TestImageFailed(err.to_string()),
        },
        EngineEvent::Downloaded { result } => Msg::DownloadFinished(
            result
                .map(|path| path.display().to_string())
                .map_err(|err| err.to_string()),
        ),
        EngineEvent::Health { result } => {
            engine_debug!("Unsolicited health result: {:?}", result);
            return None;
        }
    };
    Some(msg)
}

/// A download URL means done; a `failed` status is terminal; anything else
/// is still processing.
pub fn status_report(response: JobStatusResponse) -> StatusReport {
    if let Some(download_url) = response.download_url.filter(|url| !url.trim().is_empty()) {
        return StatusReport::Ready { download_url };
    }
    if response
        .status
        .as_deref()
        .is_some_and(|status| status.eq_ignore_ascii_case("failed"))
    {
        return StatusReport::Failed {
            error: response
                .error
                .unwrap_or_else(|| "Processing failed".to_string()),
        };
    }
    StatusReport::Processing {
        stage: response.stage,
        progress: response.progress,
    }
}

pub fn verification_outcome(result: Result<VerifyResponse, ApiError>) -> VerificationOutcome {
    match result {
        Ok(response) if response.valid => VerificationOutcome::Verified,
        Ok(_) => VerificationOutcome::Rejected("auth service rejected the credential".to_string()),
        Err(err) => {
            engine_warn!("Credential verification failed: {}", err);
            VerificationOutcome::Unavailable(err.to_string())
        }
    }
}
