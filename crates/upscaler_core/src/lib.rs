//! Upscaler core: pure state machine, policies and view-model helpers.
mod credential;
mod effect;
mod intake;
mod msg;
mod policy;
mod state;
mod update;
mod view_model;

pub use credential::{decode_credential, Credential, CredentialError, IdentityClaims};
pub use effect::{Effect, UploadPayload};
pub use intake::{accept_file, FileCandidate, IntakeRejection, SelectedFile};
pub use msg::{Msg, StatusReport, VerificationOutcome};
pub use policy::{
    cache_busted_url, ImageRetryDecision, ImageRetryPolicy, IntakePolicy, PollDecision,
    PollPolicy,
};
pub use state::{
    AppState, EnhancedImage, ImagePhase, Job, JobStatus, JobTicket, SessionSnapshot, Settings,
    SignInTicket, UserSession, Verification,
};
pub use update::{update, TIMEOUT_ERROR};
pub use view_model::{
    AppViewModel, ComparisonView, EnhancedView, JobCardView, Screen, SelectedFileView,
    SignedInView, StatusBadge, UserView,
};
