use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use engine_logging::{engine_info, engine_warn};
use upscaler_core::{accept_file, Credential, ImagePhase, JobStatus, Msg, Verification};
use upscaler_engine::EngineHandle;

use crate::cli::Command;
use crate::config::AppConfig;
use crate::platform::files::read_candidate;
use crate::platform::{Controller, EffectRunner, SessionCache};

pub fn run(command: Command, config: &AppConfig) -> anyhow::Result<()> {
    match command {
        Command::SignIn { credential } => sign_in(config, credential),
        Command::SignOut => sign_out(config),
        Command::Whoami => whoami(config),
        Command::Upscale {
            file,
            test_image: _,
            no_download,
            credential,
        } => upscale(config, file.as_deref(), no_download, credential),
        Command::Health => health(config),
    }
}

fn build_controller(config: &AppConfig) -> anyhow::Result<Controller> {
    let engine = EngineHandle::new(config.client_settings(), config.output_dir.clone())
        .context("cannot start the network engine")?;
    let cache = SessionCache::new(config.state_dir.clone());
    Ok(Controller::new(config.settings(), EffectRunner::new(engine, cache)))
}

fn restore_session(controller: &mut Controller) {
    if let Some(snapshot) = controller.runner().cache().load() {
        controller.dispatch(Msg::SessionRestored(snapshot));
    }
}

fn sign_in(config: &AppConfig, credential: String) -> anyhow::Result<()> {
    let mut controller = build_controller(config)?;
    authenticate(&mut controller, config, credential)
}

/// Signs in with `credential` and waits for the verifier, if any.
fn authenticate(
    controller: &mut Controller,
    config: &AppConfig,
    credential: String,
) -> anyhow::Result<()> {
    controller.dispatch(Msg::CredentialReceived(Credential::new(credential)));
    if controller.state().session().is_none() {
        bail!("Credential could not be decoded; still signed out");
    }

    let verified = controller.run_until(config.round_trip_budget(), |state| {
        state
            .session()
            .is_some_and(|session| session.verification != Verification::Pending)
    });
    if !verified {
        engine_warn!("Credential verification did not answer in time");
    }

    let rejection = controller
        .state()
        .session()
        .and_then(|session| match &session.verification {
            Verification::Rejected(reason) => Some(reason.clone()),
            _ => None,
        });
    if let Some(reason) = rejection {
        controller.dispatch(Msg::SignOutClicked);
        bail!("Credential rejected: {reason}");
    }
    Ok(())
}

fn sign_out(config: &AppConfig) -> anyhow::Result<()> {
    let mut controller = build_controller(config)?;
    restore_session(&mut controller);
    if controller.state().session().is_some() {
        controller.dispatch(Msg::SignOutClicked);
    } else {
        controller.runner().cache().clear();
        println!("Signed out");
    }
    Ok(())
}

fn whoami(config: &AppConfig) -> anyhow::Result<()> {
    match SessionCache::new(config.state_dir.clone()).load() {
        Some(snapshot) => println!("{} <{}>", snapshot.name, snapshot.email),
        None => println!("Signed out"),
    }
    Ok(())
}

fn upscale(
    config: &AppConfig,
    file: Option<&Path>,
    no_download: bool,
    credential: Option<String>,
) -> anyhow::Result<()> {
    let mut controller = build_controller(config)?;
    match credential {
        Some(credential) => authenticate(&mut controller, config, credential)?,
        None => restore_session(&mut controller),
    }
    if controller.state().session().is_none() {
        bail!("Not signed in; run `upscaler_app sign-in --credential <TOKEN>` first");
    }
    let round_trip = config.round_trip_budget();

    match file {
        Some(path) => {
            let candidate =
                read_candidate(path).with_context(|| format!("cannot read {}", path.display()))?;
            if let Err(rejection) = accept_file(candidate.clone(), &config.settings().intake) {
                bail!("{}: {rejection}", path.display());
            }
            controller.dispatch(Msg::FileSelected(candidate));
        }
        None => {
            if config.test_image_url.is_none() {
                bail!("No test_image_url configured");
            }
            controller.dispatch(Msg::TestImageRequested);
            let arrived = controller.run_until(round_trip, |state| {
                state.selected().is_some() || state.notice().is_some()
            });
            if let Some(notice) = controller.state().notice() {
                bail!("{notice}");
            }
            if !arrived {
                bail!("Test image did not arrive or is not an acceptable image");
            }
        }
    }

    controller.dispatch(Msg::UploadClicked);
    if !controller.state().is_uploading() {
        let reason = controller.state().notice().unwrap_or("Upload could not start");
        bail!("{reason}");
    }

    if !controller.run_until(job_budget(config), job_settled) {
        bail!("Gave up waiting for the job");
    }
    let job = controller
        .state()
        .job()
        .context("job disappeared while waiting")?;
    if job.status == JobStatus::Failed {
        bail!(
            "Job failed: {}",
            job.error.as_deref().unwrap_or("unknown error")
        );
    }
    engine_info!("Job finished job_id={:?}", job.job_id);
    if no_download {
        return Ok(());
    }

    controller.dispatch(Msg::DownloadClicked);
    if !controller.run_until(round_trip, |state| !state.is_downloading()) {
        bail!("Download timed out");
    }
    match controller.state().last_download() {
        Some(_) => Ok(()),
        None => bail!(
            "{}",
            controller.state().notice().unwrap_or("Download failed")
        ),
    }
}

fn health(config: &AppConfig) -> anyhow::Result<()> {
    let controller = build_controller(config)?.quiet();
    match controller
        .runner()
        .check_health(config.round_trip_budget())
    {
        Some(Ok(health)) => {
            match health.model {
                Some(model) => println!("{} (model {model})", health.status),
                None => println!("{}", health.status),
            }
            Ok(())
        }
        Some(Err(err)) => bail!("Service unhealthy: {err}"),
        None => bail!("Service did not answer"),
    }
}

/// Failed, or completed with the enhanced image settled either way.
fn job_settled(state: &upscaler_core::AppState) -> bool {
    let Some(job) = state.job() else {
        return false;
    };
    match job.status {
        JobStatus::Processing => false,
        JobStatus::Failed => true,
        JobStatus::Completed => matches!(
            state.enhanced().phase,
            ImagePhase::Loaded { .. } | ImagePhase::Failed
        ),
    }
}

/// Worst case for upload, every poll and every image retry.
fn job_budget(config: &AppConfig) -> Duration {
    let settings = config.settings();
    let backoff: Duration = (1..=settings.image.max_retries)
        .map(|retry| settings.image.base_delay.saturating_mul(retry))
        .sum();
    let requests = settings.poll.max_attempts + settings.image.max_retries + 2;
    settings.poll.worst_case() + backoff + config.round_trip_budget().saturating_mul(requests)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_covers_polling_and_backoff() {
        let config = AppConfig::default();
        // 30 polls at 2s, plus 1s+2s+3s of backoff.
        let floor = Duration::from_secs(60 + 6);
        assert!(job_budget(&config) > floor);
    }

    #[test]
    fn nothing_settles_without_a_job() {
        assert!(!job_settled(&upscaler_core::AppState::new()));
    }
}
