use crate::{Credential, FileCandidate, JobTicket, SessionSnapshot, SignInTicket};

/// Core view of one `GET /download/{job_id}` answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusReport {
    Ready {
        download_url: String,
    },
    Processing {
        stage: Option<String>,
        progress: Option<u8>,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    Rejected(String),
    /// The verifier could not be reached; the session stays unverified.
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Session record loaded from the cache at startup.
    SessionRestored(SessionSnapshot),
    /// Sign-in provider handed over a credential.
    CredentialReceived(Credential),
    /// Server-side verification answered for the sign-in `sign_in`.
    CredentialChecked {
        sign_in: SignInTicket,
        outcome: VerificationOutcome,
    },
    SignOutClicked,
    /// User picked a file.
    FileSelected(FileCandidate),
    ClearFileClicked,
    TestImageRequested,
    /// The requested test image arrived; it still goes through intake.
    TestImageLoaded(FileCandidate),
    TestImageFailed(String),
    UploadClicked,
    UploadSucceeded {
        ticket: JobTicket,
        job_id: String,
        input_file: Option<String>,
    },
    UploadFailed {
        ticket: JobTicket,
        message: String,
    },
    StatusReceived {
        ticket: JobTicket,
        report: StatusReport,
    },
    StatusFailed {
        ticket: JobTicket,
        message: String,
    },
    EnhancedImageLoaded {
        ticket: JobTicket,
        bytes: u64,
    },
    EnhancedImageFailed {
        ticket: JobTicket,
        message: String,
    },
    DownloadClicked,
    DownloadFinished(Result<String, String>),
    /// Render tick.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
