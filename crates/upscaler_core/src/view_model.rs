use crate::{AppState, ImagePhase, JobStatus, Verification};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    SignedOut,
    SignedIn(Box<SignedInView>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppViewModel {
    pub screen: Screen,
    pub notice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInView {
    pub user: UserView,
    pub selected: Option<SelectedFileView>,
    pub can_upload: bool,
    pub uploading: bool,
    pub can_use_test_image: bool,
    pub job: Option<JobCardView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserView {
    pub name: String,
    pub email: String,
    pub picture: String,
    pub verification: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFileView {
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBadge {
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCardView {
    pub badge: StatusBadge,
    /// `(stage, percent)` while processing.
    pub progress: Option<(String, u8)>,
    pub comparison: Option<ComparisonView>,
    pub download_available: bool,
    pub downloading: bool,
    pub saved_to: Option<String>,
    pub error_line: Option<String>,
}

/// Original and enhanced image, side by side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonView {
    pub original_preview: String,
    pub enhanced_url: String,
    pub enhanced: EnhancedView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnhancedView {
    Loading,
    Retrying { attempt: u32, max: u32 },
    Loaded { bytes: u64 },
    Failed { placeholder: String },
}

impl AppViewModel {
    pub(crate) fn project(state: &AppState) -> Self {
        let notice = state.notice().map(ToOwned::to_owned);
        let Some(session) = state.session() else {
            return Self {
                screen: Screen::SignedOut,
                notice,
            };
        };

        let user = UserView {
            name: session.name.clone(),
            email: session.email.clone(),
            picture: session.picture.clone(),
            verification: match session.verification {
                Verification::Unverified => "unverified",
                Verification::Pending => "verifying",
                Verification::Verified => "verified",
                Verification::Rejected(_) => "rejected",
            },
        };

        let upload_gate = !state.settings().require_verified_session
            || session.verification == Verification::Verified;

        let view = SignedInView {
            user,
            selected: state.selected().map(|file| SelectedFileView {
                name: file.name.clone(),
                size: file.size(),
            }),
            can_upload: state.selected().is_some() && !state.is_uploading() && upload_gate,
            uploading: state.is_uploading(),
            can_use_test_image: state.selected().is_none()
                && state.settings().test_image_url.is_some(),
            job: job_card(state),
        };

        Self {
            screen: Screen::SignedIn(Box::new(view)),
            notice,
        }
    }
}

fn job_card(state: &AppState) -> Option<JobCardView> {
    let job = state.job()?;
    let badge = match job.status {
        JobStatus::Processing => StatusBadge::Processing,
        JobStatus::Completed => StatusBadge::Completed,
        JobStatus::Failed => StatusBadge::Failed,
    };

    let progress = (job.status == JobStatus::Processing).then(|| {
        (
            job.stage
                .clone()
                .unwrap_or_else(|| "Processing...".to_string()),
            job.progress.unwrap_or(0),
        )
    });

    let comparison = match (&job.status, &job.download_url, state.selected()) {
        (JobStatus::Completed, Some(url), Some(original)) => Some(ComparisonView {
            original_preview: original.preview.clone(),
            enhanced_url: url.clone(),
            enhanced: enhanced_view(state),
        }),
        _ => None,
    };

    Some(JobCardView {
        badge,
        progress,
        comparison,
        download_available: job.status == JobStatus::Completed && job.download_url.is_some(),
        downloading: state.is_downloading(),
        saved_to: state.last_download().map(ToOwned::to_owned),
        error_line: job.error.as_ref().map(|error| format!("Error: {error}")),
    })
}

fn enhanced_view(state: &AppState) -> EnhancedView {
    let enhanced = state.enhanced();
    let max = state.settings().image.max_retries;
    match enhanced.phase {
        ImagePhase::Idle | ImagePhase::Loading => EnhancedView::Loading,
        ImagePhase::Retrying => EnhancedView::Retrying {
            attempt: enhanced.retries,
            max,
        },
        ImagePhase::Loaded { bytes } => EnhancedView::Loaded { bytes },
        ImagePhase::Failed => EnhancedView::Failed {
            placeholder: format!("Failed to load image after {max} attempts"),
        },
    }
}
