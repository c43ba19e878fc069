use std::time::Duration;

use tempfile::TempDir;
use upscaler_engine::{ClientSettings, EngineEvent, EngineHandle, UploadFile};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn engine_for(server: &MockServer, output: &TempDir) -> EngineHandle {
    EngineHandle::new(
        ClientSettings {
            api_base_url: server.uri(),
            ..ClientSettings::default()
        },
        output.path().to_path_buf(),
    )
    .expect("engine")
}

/// Waits on the engine without blocking the test runtime.
async fn next_event(
    engine: EngineHandle,
    timeout: Duration,
) -> (EngineHandle, Option<EngineEvent>) {
    tokio::task::spawn_blocking(move || {
        let event = engine.recv_timeout(timeout);
        (engine, event)
    })
    .await
    .expect("join")
}

#[tokio::test(flavor = "multi_thread")]
async fn upload_then_poll_reports_both_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upscale"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"job_id": "abc123"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/download/abc123"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"download_url": "https://x/out.png"})),
        )
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let engine = engine_for(&server, &output);
    engine.upload(
        1,
        UploadFile {
            name: "cat.png".to_string(),
            mime: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        },
    );
    let (engine, event) = next_event(engine, Duration::from_secs(5)).await;
    match event {
        Some(EngineEvent::Uploaded { ticket, result }) => {
            assert_eq!(ticket, 1);
            assert_eq!(result.unwrap().job_id, "abc123");
        }
        other => panic!("unexpected event {other:?}"),
    }

    engine.poll_status(1, "abc123", Duration::from_millis(10));
    let (_, event) = next_event(engine, Duration::from_secs(5)).await;
    match event {
        Some(EngineEvent::StatusPolled { ticket, result }) => {
            assert_eq!(ticket, 1);
            assert_eq!(
                result.unwrap().download_url.as_deref(),
                Some("https://x/out.png")
            );
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_ticket_never_reports() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/abc123"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"download_url": "https://x/out.png"})),
        )
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let engine = engine_for(&server, &output);
    engine.poll_status(7, "abc123", Duration::from_millis(300));
    engine.cancel(7);

    let (engine, event) = next_event(engine, Duration::from_millis(800)).await;
    assert!(event.is_none(), "cancelled poll reported {event:?}");

    // Other tickets are unaffected.
    engine.poll_status(8, "abc123", Duration::ZERO);
    let (_, event) = next_event(engine, Duration::from_secs(5)).await;
    assert!(matches!(
        event,
        Some(EngineEvent::StatusPolled { ticket: 8, .. })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn download_writes_file_atomically() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/output/abc123/upscaled.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![9u8; 16], "image/jpeg"))
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let engine = engine_for(&server, &output);
    engine.download(
        format!("{}/output/abc123/upscaled.jpg", server.uri()),
        "cat--deadbeef-upscaled.jpg",
    );
    let (_, event) = next_event(engine, Duration::from_secs(5)).await;
    let written = match event {
        Some(EngineEvent::Downloaded { result }) => result.expect("downloaded"),
        other => panic!("unexpected event {other:?}"),
    };
    assert_eq!(written, output.path().join("cat--deadbeef-upscaled.jpg"));
    assert_eq!(std::fs::read(&written).unwrap(), vec![9u8; 16]);
}

#[tokio::test(flavor = "multi_thread")]
async fn verify_without_auth_service_reports_not_configured() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    let engine = engine_for(&server, &output);
    engine.verify(4, "a.b.c");
    let (_, event) = next_event(engine, Duration::from_secs(5)).await;
    match event {
        Some(EngineEvent::CredentialChecked { sign_in, result }) => {
            assert_eq!(sign_in, 4);
            assert!(result.is_err());
        }
        other => panic!("unexpected event {other:?}"),
    }
}
