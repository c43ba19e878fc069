mod common;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use common::{image, init_logging, processing_job, signed_in, snapshot, with_selected_file};
use pretty_assertions::assert_eq;
use upscaler_core::{
    update, AppState, Credential, Effect, FileCandidate, Msg, Screen, SessionSnapshot, Settings,
    SignInTicket, Verification, VerificationOutcome,
};

fn credential(payload: &str) -> Credential {
    Credential::new(format!(
        "eyJhbGciOiJSUzI1NiJ9.{}.c2lnbmF0dXJl",
        URL_SAFE_NO_PAD.encode(payload)
    ))
}

fn grace_credential() -> Credential {
    credential(r#"{"name":"Grace","email":"grace@example.com","picture":"https://p/g.png"}"#)
}

fn verifying() -> Settings {
    Settings {
        verifier_configured: true,
        ..Settings::default()
    }
}

fn verify_sign_in(effects: &[Effect]) -> SignInTicket {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::VerifyCredential { sign_in, .. } => Some(*sign_in),
            _ => None,
        })
        .expect("verify effect")
}

#[test]
fn restored_session_shows_signed_in_view() {
    init_logging();
    let mut state = signed_in(Settings::default());
    assert!(state.consume_dirty());
    match state.view().screen {
        Screen::SignedIn(view) => {
            assert_eq!(view.user.name, "Ada");
            assert_eq!(view.user.verification, "unverified");
            assert!(view.selected.is_none());
        }
        Screen::SignedOut => panic!("expected signed-in view"),
    }
}

#[test]
fn credential_populates_and_persists_session() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::CredentialReceived(grace_credential()));

    let session = state.session().expect("session");
    assert_eq!(session.email, "grace@example.com");
    assert_eq!(session.verification, Verification::Unverified);
    assert_eq!(
        effects,
        vec![Effect::PersistSession(SessionSnapshot {
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            picture: "https://p/g.png".to_string(),
        })]
    );
}

#[test]
fn malformed_credential_leaves_prior_session_untouched() {
    init_logging();
    let state = signed_in(Settings::default());
    for token in ["garbage", "a.!!!.c", "a.bm90IGpzb24.c"] {
        let (next, effects) =
            update(state.clone(), Msg::CredentialReceived(Credential::new(token)));
        assert_eq!(next, state);
        assert!(effects.is_empty());
    }
}

#[test]
fn verifier_round_trip_marks_session_verified() {
    init_logging();
    let (state, effects) = update(
        AppState::with_settings(verifying()),
        Msg::CredentialReceived(grace_credential()),
    );
    assert_eq!(state.session().unwrap().verification, Verification::Pending);
    let sign_in = verify_sign_in(&effects);
    assert!(effects.contains(&Effect::VerifyCredential {
        sign_in,
        credential: grace_credential(),
    }));

    // An answer for a sign-in that was never issued is ignored.
    let (state, _) = update(
        state,
        Msg::CredentialChecked {
            sign_in: sign_in + 1,
            outcome: VerificationOutcome::Verified,
        },
    );
    assert_eq!(state.session().unwrap().verification, Verification::Pending);

    let (state, _) = update(
        state,
        Msg::CredentialChecked {
            sign_in,
            outcome: VerificationOutcome::Verified,
        },
    );
    assert_eq!(state.session().unwrap().verification, Verification::Verified);
}

#[test]
fn earlier_verdict_does_not_carry_over_to_a_later_sign_in() {
    init_logging();
    let genuine = credential(r#"{"name":"Ada","email":"ada@example.com"}"#);
    let forged = credential(r#"{"name":"Mallory","email":"ada@example.com"}"#);

    let (state, effects) = update(
        AppState::with_settings(verifying()),
        Msg::CredentialReceived(genuine),
    );
    let first = verify_sign_in(&effects);
    let (state, effects) = update(state, Msg::CredentialReceived(forged));
    let second = verify_sign_in(&effects);
    assert_ne!(first, second);

    let (state, _) = update(
        state,
        Msg::CredentialChecked {
            sign_in: first,
            outcome: VerificationOutcome::Verified,
        },
    );
    let session = state.session().unwrap();
    assert_eq!(session.name, "Mallory");
    assert_eq!(session.verification, Verification::Pending);

    let (state, _) = update(
        state,
        Msg::CredentialChecked {
            sign_in: second,
            outcome: VerificationOutcome::Rejected("Invalid token".to_string()),
        },
    );
    assert_eq!(
        state.session().unwrap().verification,
        Verification::Rejected("Invalid token".to_string())
    );

    // Only one verdict lands per sign-in.
    let (state, _) = update(
        state,
        Msg::CredentialChecked {
            sign_in: second,
            outcome: VerificationOutcome::Verified,
        },
    );
    assert_eq!(
        state.session().unwrap().verification,
        Verification::Rejected("Invalid token".to_string())
    );
}

#[test]
fn verdict_after_sign_out_and_restore_is_ignored() {
    init_logging();
    let (state, effects) = update(
        AppState::with_settings(verifying()),
        Msg::CredentialReceived(grace_credential()),
    );
    let sign_in = verify_sign_in(&effects);
    let (state, _) = update(state, Msg::SignOutClicked);
    let (state, _) = update(state, Msg::SessionRestored(snapshot()));

    let (state, _) = update(
        state,
        Msg::CredentialChecked {
            sign_in,
            outcome: VerificationOutcome::Verified,
        },
    );
    assert_eq!(
        state.session().unwrap().verification,
        Verification::Unverified
    );
}

#[test]
fn unverified_session_cannot_upload_when_verification_required() {
    init_logging();
    let settings = Settings {
        verifier_configured: true,
        require_verified_session: true,
        ..Settings::default()
    };
    let state = with_selected_file(settings);
    let (state, effects) = update(state, Msg::UploadClicked);
    assert!(effects.is_empty());
    assert!(state.notice().is_some());
    assert!(state.job().is_none());
}

#[test]
fn rejected_session_keeps_claims_as_hints() {
    init_logging();
    let (state, effects) = update(
        AppState::with_settings(verifying()),
        Msg::CredentialReceived(grace_credential()),
    );
    let (state, _) = update(
        state,
        Msg::CredentialChecked {
            sign_in: verify_sign_in(&effects),
            outcome: VerificationOutcome::Rejected("Invalid token".to_string()),
        },
    );
    let session = state.session().unwrap();
    assert_eq!(session.name, "Grace");
    assert_eq!(
        session.verification,
        Verification::Rejected("Invalid token".to_string())
    );
}

#[test]
fn sign_out_clears_everything_and_cancels_active_ticket() {
    init_logging();
    let (state, ticket, _) = processing_job(Settings::default(), "abc123");
    assert!(state.selected().is_some());

    let (state, effects) = update(state, Msg::SignOutClicked);

    assert!(state.session().is_none());
    assert!(state.selected().is_none());
    assert!(state.job().is_none());
    assert_eq!(state.active_ticket(), None);
    assert_eq!(state.view().screen, Screen::SignedOut);
    assert_eq!(
        effects,
        vec![
            Effect::CancelTicket { ticket },
            Effect::ClearCachedSession
        ]
    );
}

#[test]
fn sign_out_when_signed_out_is_noop() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::SignOutClicked);
    assert_eq!(state, AppState::new());
    assert!(effects.is_empty());
}

#[test]
fn selecting_non_image_is_noop() {
    init_logging();
    let (state, _, _) = processing_job(Settings::default(), "abc123");
    let (next, effects) = update(
        state.clone(),
        Msg::FileSelected(FileCandidate {
            name: "notes.txt".to_string(),
            mime: "text/plain".to_string(),
            bytes: b"hello".to_vec(),
        }),
    );
    assert_eq!(next, state);
    assert!(effects.is_empty());
}

#[test]
fn new_selection_replaces_file_and_clears_job() {
    init_logging();
    let (state, ticket, _) = processing_job(Settings::default(), "abc123");
    let (state, effects) = update(state, Msg::FileSelected(image("dog.png")));

    assert_eq!(state.selected().unwrap().name, "dog.png");
    assert!(state.job().is_none());
    assert_eq!(effects, vec![Effect::CancelTicket { ticket }]);
}

#[test]
fn clear_file_drops_selection_and_preview() {
    init_logging();
    let state = with_selected_file(Settings::default());
    let (state, effects) = update(state, Msg::ClearFileClicked);
    assert!(state.selected().is_none());
    assert!(effects.is_empty());
}

#[test]
fn test_image_only_offered_without_selection() {
    init_logging();
    let settings = Settings {
        test_image_url: Some("https://example.com/sample.jpg".to_string()),
        ..Settings::default()
    };
    let (state, effects) = update(signed_in(settings.clone()), Msg::TestImageRequested);
    assert_eq!(
        effects,
        vec![Effect::FetchTestImage {
            url: "https://example.com/sample.jpg".to_string()
        }]
    );

    // Second request while the first is in flight does nothing.
    let (state, effects) = update(state, Msg::TestImageRequested);
    assert!(effects.is_empty());

    let (state, _) = update(state, Msg::TestImageLoaded(image("sample.jpg")));
    assert_eq!(state.selected().unwrap().name, "sample.jpg");
    let (_, effects) = update(state, Msg::TestImageRequested);
    assert!(effects.is_empty());

    let (_, effects) = update(with_selected_file(settings), Msg::TestImageRequested);
    assert!(effects.is_empty());
}

#[test]
fn restore_does_not_override_live_session() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::CredentialReceived(grace_credential()));
    let (state, _) = update(state, Msg::SessionRestored(snapshot()));
    assert_eq!(state.session().unwrap().email, "grace@example.com");
}

fn test_image_settings() -> Settings {
    Settings {
        test_image_url: Some("https://example.com/sample.jpg".to_string()),
        ..Settings::default()
    }
}

fn html_page() -> FileCandidate {
    FileCandidate {
        name: "sample.jpg".to_string(),
        mime: "text/html".to_string(),
        bytes: b"<html></html>".to_vec(),
    }
}

#[test]
fn refused_test_image_allows_another_request() {
    init_logging();
    let (state, _) = update(signed_in(test_image_settings()), Msg::TestImageRequested);
    let (state, effects) = update(state, Msg::TestImageLoaded(html_page()));

    assert!(effects.is_empty());
    assert!(state.selected().is_none());
    assert!(state.notice().unwrap().starts_with("Could not load test image"));

    let (_, effects) = update(state, Msg::TestImageRequested);
    assert_eq!(effects.len(), 1);
}

#[test]
fn unrequested_test_image_is_ignored() {
    init_logging();
    let state = signed_in(test_image_settings());
    let (next, effects) = update(state.clone(), Msg::TestImageLoaded(image("sample.jpg")));
    assert_eq!(next, state);
    assert!(effects.is_empty());
}

#[test]
fn refused_selection_leaves_test_image_request_in_flight() {
    init_logging();
    let (state, _) = update(signed_in(test_image_settings()), Msg::TestImageRequested);
    let (next, effects) = update(state.clone(), Msg::FileSelected(html_page()));
    assert_eq!(next, state);
    assert!(effects.is_empty());

    // Still in flight: a second request does nothing.
    let (_, effects) = update(next, Msg::TestImageRequested);
    assert!(effects.is_empty());
}
