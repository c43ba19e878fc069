#![allow(dead_code)]

use std::sync::Once;

use upscaler_core::{
    update, AppState, Effect, FileCandidate, JobTicket, Msg, SessionSnapshot, Settings,
};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

pub fn snapshot() -> SessionSnapshot {
    SessionSnapshot {
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        picture: "https://example.com/ada.png".to_string(),
    }
}

pub fn image(name: &str) -> FileCandidate {
    FileCandidate {
        name: name.to_string(),
        mime: "image/png".to_string(),
        bytes: vec![0x89, b'P', b'N', b'G'],
    }
}

pub fn signed_in(settings: Settings) -> AppState {
    let (state, _) = update(
        AppState::with_settings(settings),
        Msg::SessionRestored(snapshot()),
    );
    state
}

pub fn with_selected_file(settings: Settings) -> AppState {
    let (state, _) = update(signed_in(settings), Msg::FileSelected(image("cat.png")));
    state
}

pub fn upload_ticket(effects: &[Effect]) -> JobTicket {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::UploadFile { ticket, .. } => Some(*ticket),
            _ => None,
        })
        .expect("upload effect")
}

/// Selects a file, uploads it, and accepts `job_id`. Returns the ticket.
pub fn processing_job(settings: Settings, job_id: &str) -> (AppState, JobTicket, Vec<Effect>) {
    let (state, effects) = update(with_selected_file(settings), Msg::UploadClicked);
    let ticket = upload_ticket(&effects);
    let (state, effects) = update(
        state,
        Msg::UploadSucceeded {
            ticket,
            job_id: job_id.to_string(),
            input_file: Some("cat.png".to_string()),
        },
    );
    (state, ticket, effects)
}

pub fn poll_count(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|effect| matches!(effect, Effect::PollStatus { .. }))
        .count()
}
