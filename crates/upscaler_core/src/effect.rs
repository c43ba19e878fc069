use std::time::Duration;

use crate::{Credential, JobTicket, SessionSnapshot, SignInTicket};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    PersistSession(SessionSnapshot),
    ClearCachedSession,
    VerifyCredential {
        sign_in: SignInTicket,
        credential: Credential,
    },
    FetchTestImage {
        url: String,
    },
    UploadFile {
        ticket: JobTicket,
        file: UploadPayload,
    },
    /// One status fetch after `delay`; the next is only requested once this one answers.
    PollStatus {
        ticket: JobTicket,
        job_id: String,
        delay: Duration,
    },
    /// Load the enhanced asset after `delay`. `retry > 0` means cache-bust.
    LoadEnhancedImage {
        ticket: JobTicket,
        url: String,
        retry: u32,
        delay: Duration,
    },
    /// Stop every timer and request owned by `ticket`.
    CancelTicket {
        ticket: JobTicket,
    },
    SaveDownload {
        url: String,
        job_id: String,
        input_file: Option<String>,
    },
}

#[derive(Clone, PartialEq, Eq)]
pub struct UploadPayload {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for UploadPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadPayload")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}
