use engine_logging::{engine_debug, engine_info, engine_warn};

use crate::{
    accept_file, decode_credential, AppState, EnhancedImage, Effect, FileCandidate, ImagePhase,
    ImageRetryDecision, IntakeRejection, Job, JobStatus, JobTicket, Msg, PollDecision,
    StatusReport, UploadPayload, UserSession, Verification, VerificationOutcome,
};

pub const TIMEOUT_ERROR: &str = "Processing timeout";

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::SessionRestored(snapshot) => {
            if state.session().is_none() {
                state.set_session(Some(UserSession {
                    name: snapshot.name,
                    email: snapshot.email,
                    picture: snapshot.picture,
                    verification: Verification::Unverified,
                }));
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::CredentialReceived(credential) => match decode_credential(&credential) {
            Ok(claims) => {
                let verifier = state.settings().verifier_configured;
                let sign_in = state.begin_sign_in(verifier);
                let session = UserSession {
                    name: claims.name,
                    email: claims.email,
                    picture: claims.picture,
                    verification: if verifier {
                        Verification::Pending
                    } else {
                        Verification::Unverified
                    },
                };
                engine_info!(
                    "Signed in sign_in={} email_len={}",
                    sign_in,
                    session.email.len()
                );
                let mut effects = vec![Effect::PersistSession(session.snapshot())];
                if verifier {
                    effects.push(Effect::VerifyCredential {
                        sign_in,
                        credential,
                    });
                }
                state.set_session(Some(session));
                state.set_notice(None);
                state.mark_dirty();
                effects
            }
            Err(err) => {
                engine_warn!("Discarding malformed credential: {}", err);
                Vec::new()
            }
        },
        Msg::CredentialChecked { sign_in, outcome } => {
            let Some(session) = state.session_for_sign_in_mut(sign_in) else {
                engine_debug!("Ignoring stale verification sign_in={}", sign_in);
                return (state, Vec::new());
            };
            session.verification = match outcome {
                VerificationOutcome::Verified => Verification::Verified,
                VerificationOutcome::Rejected(reason) => {
                    engine_warn!("Credential rejected by verifier: {}", reason);
                    Verification::Rejected(reason)
                }
                VerificationOutcome::Unavailable(reason) => {
                    engine_warn!("Credential verifier unavailable: {}", reason);
                    Verification::Unverified
                }
            };
            state.mark_dirty();
            Vec::new()
        }
        Msg::SignOutClicked => {
            if state.session().is_none() {
                return (state, Vec::new());
            }
            let cancelled = state.reset_for_sign_out();
            state.mark_dirty();
            engine_info!("Signed out");
            let mut effects = cancel_effect(cancelled);
            effects.push(Effect::ClearCachedSession);
            effects
        }
        Msg::FileSelected(candidate) => {
            if state.session().is_none() {
                engine_debug!("Ignoring file selection while signed out");
                return (state, Vec::new());
            }
            let name = candidate.name.clone();
            select_file(&mut state, candidate).unwrap_or_else(|rejection| {
                engine_info!("Ignoring file {}: {}", name, rejection);
                Vec::new()
            })
        }
        Msg::TestImageLoaded(candidate) => {
            if !state.is_fetching_test_image() {
                return (state, Vec::new());
            }
            select_file(&mut state, candidate).unwrap_or_else(|rejection| {
                engine_warn!("Test image refused: {}", rejection);
                state.set_fetching_test_image(false);
                state.set_notice(Some(format!("Could not load test image: {rejection}")));
                state.mark_dirty();
                Vec::new()
            })
        }
        Msg::ClearFileClicked => {
            if state.selected().is_none() && state.job().is_none() && !state.is_uploading() {
                return (state, Vec::new());
            }
            state.set_selected(None);
            let cancelled = state.drop_job();
            state.mark_dirty();
            cancel_effect(cancelled)
        }
        Msg::TestImageRequested => {
            let url = state.settings().test_image_url.clone();
            match url {
                Some(url)
                    if state.session().is_some()
                        && state.selected().is_none()
                        && !state.is_fetching_test_image() =>
                {
                    state.set_fetching_test_image(true);
                    state.mark_dirty();
                    vec![Effect::FetchTestImage { url }]
                }
                _ => Vec::new(),
            }
        }
        Msg::TestImageFailed(message) => {
            engine_warn!("Failed to load test image: {}", message);
            state.set_fetching_test_image(false);
            state.set_notice(Some(format!("Could not load test image: {message}")));
            state.mark_dirty();
            Vec::new()
        }
        Msg::UploadClicked => upload_clicked(&mut state),
        Msg::UploadSucceeded {
            ticket,
            job_id,
            input_file,
        } => {
            if !state.is_upload_ticket(ticket) {
                engine_debug!("Dropping stale upload result ticket={}", ticket);
                return (state, Vec::new());
            }
            state.mark_dirty();
            if job_id.trim().is_empty() {
                state.finish_upload(failed_job(ticket, "Upload response carried no job id"));
                return (state, Vec::new());
            }
            engine_info!("Upload accepted job_id={}", job_id);
            let delay = state.settings().poll.interval;
            state.finish_upload(Job {
                ticket,
                job_id: Some(job_id.clone()),
                status: JobStatus::Processing,
                input_file,
                stage: None,
                progress: None,
                download_url: None,
                error: None,
            });
            vec![Effect::PollStatus {
                ticket,
                job_id,
                delay,
            }]
        }
        Msg::UploadFailed { ticket, message } => {
            if !state.is_upload_ticket(ticket) {
                return (state, Vec::new());
            }
            engine_warn!("Upload failed: {}", message);
            state.finish_upload(failed_job(ticket, &message));
            state.mark_dirty();
            Vec::new()
        }
        Msg::StatusReceived { ticket, report } => status_received(&mut state, ticket, report),
        Msg::StatusFailed { ticket, message } => {
            if !is_polling(&mut state, ticket) {
                return (state, Vec::new());
            }
            engine_debug!("Status fetch failed ticket={}: {}", ticket, message);
            count_attempt(&mut state, ticket)
        }
        Msg::EnhancedImageLoaded { ticket, bytes } => {
            if !is_loading_image(&mut state, ticket) {
                return (state, Vec::new());
            }
            state.set_enhanced(EnhancedImage {
                retries: 0,
                phase: ImagePhase::Loaded { bytes },
            });
            state.mark_dirty();
            Vec::new()
        }
        Msg::EnhancedImageFailed { ticket, message } => {
            if !is_loading_image(&mut state, ticket) {
                return (state, Vec::new());
            }
            image_failed(&mut state, ticket, &message)
        }
        Msg::DownloadClicked => {
            let request = state.job().and_then(|job| match (&job.status, &job.download_url) {
                (JobStatus::Completed, Some(url)) => Some(Effect::SaveDownload {
                    url: url.clone(),
                    job_id: job.job_id.clone().unwrap_or_default(),
                    input_file: job.input_file.clone(),
                }),
                _ => None,
            });
            match request {
                Some(effect) if !state.is_downloading() => {
                    state.set_downloading(true);
                    state.mark_dirty();
                    vec![effect]
                }
                _ => Vec::new(),
            }
        }
        Msg::DownloadFinished(result) => {
            if !state.is_downloading() {
                return (state, Vec::new());
            }
            state.set_downloading(false);
            match result {
                Ok(path) => {
                    engine_info!("Saved enhanced image to {}", path);
                    state.set_last_download(Some(path));
                }
                Err(message) => {
                    engine_warn!("Download failed: {}", message);
                    state.set_notice(Some(format!("Download failed: {message}")));
                }
            }
            state.mark_dirty();
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

/// Replaces the selection with an accepted candidate and drops the current job.
fn select_file(
    state: &mut AppState,
    candidate: FileCandidate,
) -> Result<Vec<Effect>, IntakeRejection> {
    let selected = accept_file(candidate, &state.settings().intake)?;
    engine_info!("Selected file={} bytes={}", selected.name, selected.size());
    state.set_fetching_test_image(false);
    state.set_selected(Some(selected));
    let cancelled = state.drop_job();
    state.set_notice(None);
    state.mark_dirty();
    Ok(cancel_effect(cancelled))
}

fn upload_clicked(state: &mut AppState) -> Vec<Effect> {
    let Some(session) = state.session() else {
        return Vec::new();
    };
    if state.is_uploading() {
        return Vec::new();
    }
    if state.settings().require_verified_session && session.verification != Verification::Verified
    {
        state.set_notice(Some(
            "Sign-in has not been verified yet; upload is disabled".to_string(),
        ));
        state.mark_dirty();
        return Vec::new();
    }
    let Some(file) = state.selected().map(|selected| UploadPayload {
        name: selected.name.clone(),
        mime: selected.mime.clone(),
        bytes: selected.bytes.clone(),
    }) else {
        return Vec::new();
    };

    let (ticket, previous) = state.begin_upload();
    state.set_notice(None);
    state.mark_dirty();
    engine_info!("Uploading file={} ticket={}", file.name, ticket);

    let mut effects = cancel_effect(previous);
    effects.push(Effect::UploadFile { ticket, file });
    effects
}

fn status_received(state: &mut AppState, ticket: JobTicket, report: StatusReport) -> Vec<Effect> {
    if !is_polling(state, ticket) {
        return Vec::new();
    }
    match report {
        StatusReport::Ready { download_url } => {
            if let Some(job) = state.job_mut() {
                job.status = JobStatus::Completed;
                job.download_url = Some(download_url.clone());
            }
            engine_info!("Job completed ticket={}", ticket);
            state.set_enhanced(EnhancedImage {
                retries: 0,
                phase: ImagePhase::Loading,
            });
            state.mark_dirty();
            vec![Effect::LoadEnhancedImage {
                ticket,
                url: download_url,
                retry: 0,
                delay: std::time::Duration::ZERO,
            }]
        }
        StatusReport::Failed { error } => {
            if let Some(job) = state.job_mut() {
                job.status = JobStatus::Failed;
                job.error = Some(error);
            }
            state.mark_dirty();
            Vec::new()
        }
        StatusReport::Processing { stage, progress } => {
            if let Some(job) = state.job_mut() {
                if stage.is_some() {
                    job.stage = stage;
                }
                if progress.is_some() {
                    job.progress = progress.map(|p| p.min(100));
                }
            }
            state.mark_dirty();
            count_attempt(state, ticket)
        }
    }
}

fn count_attempt(state: &mut AppState, ticket: JobTicket) -> Vec<Effect> {
    let attempts = state.record_poll_attempt();
    let decision = state.settings().poll.after_attempt(attempts);
    let Some(job) = state.job_mut() else {
        return Vec::new();
    };
    match decision {
        PollDecision::RetryAfter(delay) => match job.job_id.clone() {
            Some(job_id) => vec![Effect::PollStatus {
                ticket,
                job_id,
                delay,
            }],
            None => Vec::new(),
        },
        PollDecision::GiveUp => {
            engine_warn!("Giving up on ticket={} after {} attempts", ticket, attempts);
            job.status = JobStatus::Failed;
            job.error = Some(TIMEOUT_ERROR.to_string());
            state.mark_dirty();
            Vec::new()
        }
    }
}

fn image_failed(state: &mut AppState, ticket: JobTicket, message: &str) -> Vec<Effect> {
    let current = state.enhanced();
    let decision = state.settings().image.on_failure(current.retries);
    let url = state.job().and_then(|job| job.download_url.clone());
    state.mark_dirty();
    match (decision, url) {
        (ImageRetryDecision::Retry { attempt, delay }, Some(url)) => {
            engine_debug!(
                "Enhanced image failed ({}), retry {} in {:?}",
                message,
                attempt,
                delay
            );
            state.set_enhanced(EnhancedImage {
                retries: attempt,
                phase: ImagePhase::Retrying,
            });
            vec![Effect::LoadEnhancedImage {
                ticket,
                url,
                retry: attempt,
                delay,
            }]
        }
        _ => {
            engine_warn!(
                "Enhanced image failed after {} retries: {}",
                current.retries,
                message
            );
            state.set_enhanced(EnhancedImage {
                retries: current.retries,
                phase: ImagePhase::Failed,
            });
            Vec::new()
        }
    }
}

fn is_polling(state: &mut AppState, ticket: JobTicket) -> bool {
    state
        .job_for_ticket_mut(ticket)
        .is_some_and(|job| job.status == JobStatus::Processing)
}

fn is_loading_image(state: &mut AppState, ticket: JobTicket) -> bool {
    let completed = state
        .job_for_ticket_mut(ticket)
        .is_some_and(|job| job.status == JobStatus::Completed);
    completed
        && matches!(
            state.enhanced().phase,
            ImagePhase::Loading | ImagePhase::Retrying
        )
}

fn failed_job(ticket: JobTicket, message: &str) -> Job {
    Job {
        ticket,
        job_id: None,
        status: JobStatus::Failed,
        input_file: None,
        stage: None,
        progress: None,
        download_url: None,
        error: Some(message.to_string()),
    }
}

fn cancel_effect(ticket: Option<JobTicket>) -> Vec<Effect> {
    ticket
        .map(|ticket| vec![Effect::CancelTicket { ticket }])
        .unwrap_or_default()
}
