use crate::view_model::AppViewModel;
use crate::{ImageRetryPolicy, IntakePolicy, PollPolicy, SelectedFile};

/// Controller-local generation number for one upload and its job.
pub type JobTicket = u64;

/// Generation number for one received credential and its verification.
pub type SignInTicket = u64;

/// The persisted identity record: `{name, email, picture}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub name: String,
    pub email: String,
    pub picture: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Verification {
    /// Restored from cache, or no verifier configured.
    #[default]
    Unverified,
    Pending,
    Verified,
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    pub name: String,
    pub email: String,
    pub picture: String,
    pub verification: Verification,
}

impl UserSession {
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            name: self.name.clone(),
            email: self.email.clone(),
            picture: self.picture.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub ticket: JobTicket,
    /// `None` when the upload itself failed.
    pub job_id: Option<String>,
    pub status: JobStatus,
    pub input_file: Option<String>,
    pub stage: Option<String>,
    pub progress: Option<u8>,
    pub download_url: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImagePhase {
    #[default]
    Idle,
    Loading,
    Retrying,
    Loaded {
        bytes: u64,
    },
    Failed,
}

/// Load state of the enhanced asset for the current job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnhancedImage {
    pub retries: u32,
    pub phase: ImagePhase,
}

/// Knobs fixed at startup; the reducer reads but never changes them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Settings {
    pub poll: PollPolicy,
    pub image: ImageRetryPolicy,
    pub intake: IntakePolicy,
    /// Credential verification round trip is available.
    pub verifier_configured: bool,
    /// Uploads wait for a `Verified` session.
    pub require_verified_session: bool,
    pub test_image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    settings: Settings,
    session: Option<UserSession>,
    selected: Option<SelectedFile>,
    job: Option<Job>,
    /// Ticket owning the in-flight upload or the current job's timers.
    ticket: Option<JobTicket>,
    last_ticket: JobTicket,
    /// Sign-in whose verification answer is still awaited.
    pending_sign_in: Option<SignInTicket>,
    last_sign_in: SignInTicket,
    uploading: bool,
    poll_attempts: u32,
    enhanced: EnhancedImage,
    fetching_test_image: bool,
    downloading: bool,
    last_download: Option<String>,
    notice: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn session(&self) -> Option<&UserSession> {
        self.session.as_ref()
    }

    pub fn selected(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    pub fn active_ticket(&self) -> Option<JobTicket> {
        self.ticket
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn poll_attempts(&self) -> u32 {
        self.poll_attempts
    }

    pub fn enhanced(&self) -> EnhancedImage {
        self.enhanced
    }

    pub fn is_downloading(&self) -> bool {
        self.downloading
    }

    pub fn last_download(&self) -> Option<&str> {
        self.last_download.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel::project(self)
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn is_fetching_test_image(&self) -> bool {
        self.fetching_test_image
    }

    pub(crate) fn set_fetching_test_image(&mut self, fetching: bool) {
        self.fetching_test_image = fetching;
    }

    pub(crate) fn set_session(&mut self, session: Option<UserSession>) {
        self.session = session;
    }

    /// Starts a new sign-in generation; any earlier verification goes stale.
    pub(crate) fn begin_sign_in(&mut self, awaits_verification: bool) -> SignInTicket {
        self.last_sign_in += 1;
        self.pending_sign_in = awaits_verification.then_some(self.last_sign_in);
        self.last_sign_in
    }

    /// Session still waiting on the verification issued under `sign_in`.
    pub(crate) fn session_for_sign_in_mut(
        &mut self,
        sign_in: SignInTicket,
    ) -> Option<&mut UserSession> {
        if self.pending_sign_in != Some(sign_in) {
            return None;
        }
        self.pending_sign_in = None;
        self.session
            .as_mut()
            .filter(|session| session.verification == Verification::Pending)
    }

    pub(crate) fn set_selected(&mut self, selected: Option<SelectedFile>) {
        self.selected = selected;
    }

    pub(crate) fn set_notice(&mut self, notice: Option<String>) {
        self.notice = notice;
    }

    pub(crate) fn job_mut(&mut self) -> Option<&mut Job> {
        self.job.as_mut()
    }

    /// Current job, but only while `ticket` still owns it.
    pub(crate) fn job_for_ticket_mut(&mut self, ticket: JobTicket) -> Option<&mut Job> {
        if self.ticket != Some(ticket) {
            return None;
        }
        self.job.as_mut().filter(|job| job.ticket == ticket)
    }

    pub(crate) fn is_upload_ticket(&self, ticket: JobTicket) -> bool {
        self.uploading && self.ticket == Some(ticket)
    }

    /// Starts a new generation, returning the ticket it replaced (if any).
    pub(crate) fn begin_upload(&mut self) -> (JobTicket, Option<JobTicket>) {
        let previous = self.drop_job();
        self.last_ticket += 1;
        self.ticket = Some(self.last_ticket);
        self.uploading = true;
        (self.last_ticket, previous)
    }

    pub(crate) fn finish_upload(&mut self, job: Job) {
        self.uploading = false;
        self.poll_attempts = 0;
        self.enhanced = EnhancedImage::default();
        self.job = Some(job);
    }

    /// Forgets the current job and upload, returning the ticket to cancel.
    pub(crate) fn drop_job(&mut self) -> Option<JobTicket> {
        self.job = None;
        self.uploading = false;
        self.poll_attempts = 0;
        self.enhanced = EnhancedImage::default();
        self.downloading = false;
        self.last_download = None;
        self.ticket.take()
    }

    pub(crate) fn record_poll_attempt(&mut self) -> u32 {
        self.poll_attempts += 1;
        self.poll_attempts
    }

    pub(crate) fn set_enhanced(&mut self, enhanced: EnhancedImage) {
        self.enhanced = enhanced;
    }

    pub(crate) fn set_downloading(&mut self, downloading: bool) {
        self.downloading = downloading;
    }

    pub(crate) fn set_last_download(&mut self, path: Option<String>) {
        self.last_download = path;
    }

    /// Sign-out: everything except settings and the ticket counter.
    pub(crate) fn reset_for_sign_out(&mut self) -> Option<JobTicket> {
        let cancelled = self.drop_job();
        self.session = None;
        self.pending_sign_in = None;
        self.selected = None;
        self.fetching_test_image = false;
        self.notice = None;
        cancelled
    }
}
