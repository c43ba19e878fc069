use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use tokio_util::sync::CancellationToken;

use crate::client::{ClientSettings, CredentialVerifier, ReqwestUpscaleClient, UpscaleApi};
use crate::persist::AtomicFileWriter;
use crate::{ApiError, EngineEvent, FailureKind, Ticket, UploadFile};

enum EngineCommand {
    Upload {
        ticket: Ticket,
        file: UploadFile,
    },
    PollStatus {
        ticket: Ticket,
        job_id: String,
        delay: Duration,
    },
    LoadAsset {
        ticket: Ticket,
        url: String,
        delay: Duration,
    },
    Cancel {
        ticket: Ticket,
    },
    Verify {
        sign_in: u64,
        credential: String,
    },
    FetchImage {
        url: String,
    },
    Download {
        url: String,
        file_name: String,
    },
    Health,
}

impl EngineCommand {
    fn ticket(&self) -> Option<Ticket> {
        match self {
            EngineCommand::Upload { ticket, .. }
            | EngineCommand::PollStatus { ticket, .. }
            | EngineCommand::LoadAsset { ticket, .. } => Some(*ticket),
            _ => None,
        }
    }
}

struct Worker {
    api: Arc<dyn UpscaleApi>,
    verifier: Option<Arc<dyn CredentialVerifier>>,
    writer: AtomicFileWriter,
}

/// Handle to the IO thread. Commands go in, [`EngineEvent`]s come out.
///
/// Work tied to a ticket runs under that ticket's cancellation token;
/// a cancelled ticket never reports back.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    /// Engine backed by the reqwest client; downloads land in `output_dir`.
    pub fn new(settings: ClientSettings, output_dir: PathBuf) -> Result<Self, ApiError> {
        let verifier_configured = settings.auth_base_url.is_some();
        let client = Arc::new(ReqwestUpscaleClient::new(settings)?);
        let verifier: Option<Arc<dyn CredentialVerifier>> = if verifier_configured {
            Some(client.clone())
        } else {
            None
        };
        Ok(Self::with_api(client, verifier, output_dir))
    }

    pub fn with_api(
        api: Arc<dyn UpscaleApi>,
        verifier: Option<Arc<dyn CredentialVerifier>>,
        output_dir: PathBuf,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<EngineCommand>();
        let (event_tx, event_rx) = mpsc::channel();
        let worker = Arc::new(Worker {
            api,
            verifier,
            writer: AtomicFileWriter::new(output_dir),
        });

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            let mut tokens: HashMap<Ticket, CancellationToken> = HashMap::new();
            while let Ok(command) = cmd_rx.recv() {
                if let EngineCommand::Cancel { ticket } = command {
                    if let Some(token) = tokens.remove(&ticket) {
                        engine_debug!("Cancelling ticket={}", ticket);
                        token.cancel();
                    }
                    continue;
                }
                let token = command
                    .ticket()
                    .map(|ticket| tokens.entry(ticket).or_default().clone());
                let worker = worker.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    handle_command(worker.as_ref(), command, token, event_tx).await;
                });
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn upload(&self, ticket: Ticket, file: UploadFile) {
        self.send(EngineCommand::Upload { ticket, file });
    }

    pub fn poll_status(&self, ticket: Ticket, job_id: impl Into<String>, delay: Duration) {
        self.send(EngineCommand::PollStatus {
            ticket,
            job_id: job_id.into(),
            delay,
        });
    }

    pub fn load_asset(&self, ticket: Ticket, url: impl Into<String>, delay: Duration) {
        self.send(EngineCommand::LoadAsset {
            ticket,
            url: url.into(),
            delay,
        });
    }

    pub fn cancel(&self, ticket: Ticket) {
        self.send(EngineCommand::Cancel { ticket });
    }

    /// Checks `credential`; the answer echoes `sign_in`.
    pub fn verify(&self, sign_in: u64, credential: impl Into<String>) {
        self.send(EngineCommand::Verify {
            sign_in,
            credential: credential.into(),
        });
    }

    pub fn fetch_image(&self, url: impl Into<String>) {
        self.send(EngineCommand::FetchImage { url: url.into() });
    }

    pub fn download(&self, url: impl Into<String>, file_name: impl Into<String>) {
        self.send(EngineCommand::Download {
            url: url.into(),
            file_name: file_name.into(),
        });
    }

    pub fn check_health(&self) {
        self.send(EngineCommand::Health);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    fn send(&self, command: EngineCommand) {
        let _ = self.cmd_tx.send(command);
    }
}

async fn handle_command(
    worker: &Worker,
    command: EngineCommand,
    token: Option<CancellationToken>,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let event = match command {
        EngineCommand::Upload { ticket, file } => {
            engine_info!(
                "Uploading ticket={} file={} bytes={}",
                ticket,
                file.name,
                file.bytes.len()
            );
            let outcome = cancellable(token.as_ref(), worker.api.upload(file)).await;
            outcome.map(|result| EngineEvent::Uploaded { ticket, result })
        }
        EngineCommand::PollStatus {
            ticket,
            job_id,
            delay,
        } => {
            let poll = async {
                tokio::time::sleep(delay).await;
                engine_debug!("Polling ticket={} job_id={}", ticket, job_id);
                worker.api.job_status(&job_id).await
            };
            cancellable(token.as_ref(), poll)
                .await
                .map(|result| EngineEvent::StatusPolled { ticket, result })
        }
        EngineCommand::LoadAsset { ticket, url, delay } => {
            let load = async {
                tokio::time::sleep(delay).await;
                worker
                    .api
                    .fetch_asset(&url)
                    .await
                    .map(|asset| asset.bytes.len() as u64)
            };
            cancellable(token.as_ref(), load)
                .await
                .map(|result| EngineEvent::AssetLoaded { ticket, result })
        }
        EngineCommand::Verify {
            sign_in,
            credential,
        } => {
            let result = match worker.verifier.as_ref() {
                Some(verifier) => verifier.verify(&credential).await,
                None => Err(ApiError::new(
                    FailureKind::NotConfigured,
                    "no auth service configured",
                )),
            };
            Some(EngineEvent::CredentialChecked { sign_in, result })
        }
        EngineCommand::FetchImage { url } => Some(EngineEvent::ImageFetched {
            result: worker.api.fetch_asset(&url).await,
        }),
        EngineCommand::Download { url, file_name } => Some(EngineEvent::Downloaded {
            result: download(worker, &url, file_name).await,
        }),
        EngineCommand::Health => Some(EngineEvent::Health {
            result: worker.api.health().await,
        }),
        EngineCommand::Cancel { .. } => None,
    };

    if let Some(event) = event {
        let _ = event_tx.send(event);
    }
}

async fn download(worker: &Worker, url: &str, file_name: String) -> Result<PathBuf, ApiError> {
    let asset = worker.api.fetch_asset(url).await?;
    let writer = worker.writer.clone();
    tokio::task::spawn_blocking(move || writer.write_bytes(&file_name, &asset.bytes))
        .await
        .map_err(|err| ApiError::new(FailureKind::Io, err.to_string()))?
        .map_err(|err| ApiError::new(FailureKind::Io, err.to_string()))
}

/// Runs `work` unless `token` fires first; `None` means cancelled.
async fn cancellable<F: Future>(token: Option<&CancellationToken>, work: F) -> Option<F::Output> {
    match token {
        Some(token) => tokio::select! {
            _ = token.cancelled() => None,
            output = work => Some(output),
        },
        None => Some(work.await),
    }
}
