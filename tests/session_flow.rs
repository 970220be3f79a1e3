//! Integration tests: full sessions against an in-process HTTP service.
//!
//! Each test spins up an axum server on an ephemeral port that speaks the
//! upload / convert / download protocol, then drives a [`Controller`] over
//! real HTTP with [`HttpConversionService`].
//!
//! Run with:
//!   cargo test --test session_flow -- --nocapture

use anyfile_convert::session::{perform, unsupported_format_message, NO_SUPPORTED_CONVERSIONS};
use anyfile_convert::{
    ClientConfig, Controller, ConversionService, ConvertClientError, Event, FileUpload,
    HttpConversionService, Mode, Phase, RequestKind, RequestSeq, SessionObserver, ToolCatalog,
    ToolConfig,
};
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

// ── Mock conversion service ──────────────────────────────────────────────────

/// How the mock answers. Every field defaults to the happy path.
#[derive(Default)]
struct Behaviour {
    formats: Vec<&'static str>,
    upload_error: Option<(StatusCode, &'static str)>,
    upload_raw: Option<(StatusCode, &'static str)>,
    convert_error: Option<(StatusCode, &'static str)>,
}

#[derive(Default)]
struct Recorded {
    uploads: Mutex<Vec<String>>,
    converts: Mutex<Vec<(String, String)>>,
}

#[derive(Clone)]
struct MockState {
    behaviour: Arc<Behaviour>,
    recorded: Arc<Recorded>,
}

async fn handle_upload(State(state): State<MockState>, mut multipart: Multipart) -> Response {
    let mut file_name = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            file_name = field.file_name().map(str::to_string);
            let _ = field.bytes().await;
        }
    }
    let Some(file_name) = file_name else {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "no file"}))).into_response();
    };
    state.recorded.uploads.lock().unwrap().push(file_name.clone());

    let b = &state.behaviour;
    if let Some((status, body)) = b.upload_raw {
        return (status, body).into_response();
    }
    if let Some((status, message)) = b.upload_error {
        return (status, Json(json!({"error": message}))).into_response();
    }
    Json(json!({
        "filename": format!("tok-{file_name}"),
        "supported_formats": b.formats,
    }))
    .into_response()
}

async fn handle_convert(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    let token = body["filename"].as_str().unwrap_or_default().to_string();
    let format = body["format"].as_str().unwrap_or_default().to_string();
    state
        .recorded
        .converts
        .lock()
        .unwrap()
        .push((token.clone(), format.clone()));

    if let Some((status, message)) = state.behaviour.convert_error {
        return (status, Json(json!({"error": message}))).into_response();
    }
    let original = token.trim_start_matches("tok-");
    let stem = original.rsplit_once('.').map_or(original, |(s, _)| s);
    Json(json!({"download_url": format!("/download/{stem}.{format}")})).into_response()
}

async fn handle_download(Path(name): Path<String>) -> Response {
    if name.starts_with("missing") {
        return StatusCode::NOT_FOUND.into_response();
    }
    (
        [(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{name}\""),
        )],
        format!("converted:{name}"),
    )
        .into_response()
}

/// Route library logs to the test output; `RUST_LOG=debug` shows them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn spawn_service(behaviour: Behaviour) -> (String, Arc<Recorded>) {
    init_tracing();
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let recorded = Arc::new(Recorded::default());
    let state = MockState {
        behaviour: Arc::new(behaviour),
        recorded: recorded.clone(),
    };
    let app = Router::new()
        .route("/upload", post(handle_upload))
        .route("/convert", post(handle_convert))
        .route("/download/:name", get(handle_download))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), recorded)
}

fn http_service(base_url: &str) -> Arc<HttpConversionService> {
    let config = ClientConfig::builder()
        .base_url(base_url)
        .request_timeout_secs(10)
        .build()
        .expect("config");
    Arc::new(HttpConversionService::new(config).expect("client"))
}

fn tool(slug: &str) -> ToolConfig {
    ToolCatalog::builtin()
        .find(slug)
        .expect("builtin tool")
        .config
        .clone()
}

// ── Forced-format tools ──────────────────────────────────────────────────────

#[tokio::test]
async fn word_to_pdf_converts_and_downloads() {
    let (url, recorded) = spawn_service(Behaviour {
        formats: vec!["pdf", "txt"],
        ..Default::default()
    })
    .await;
    let mut c = Controller::new(http_service(&url));

    c.enter_tool(tool("word-to-pdf"));
    c.submit_file(FileUpload::from_bytes("report.docx", b"PK\x03\x04".to_vec()))
        .await
        .unwrap();

    let session = c.session();
    assert_eq!(session.phase(), Phase::AwaitingFormatChoice);
    assert_eq!(session.uploaded_file_token(), Some("tok-report.docx"));
    assert_eq!(session.available_formats(), ["pdf", "txt"]);
    assert_eq!(session.selected_format(), Some("pdf"));
    let selector = c.view().format_selector.expect("selector visible");
    assert!(selector.locked);
    assert!(c.view().show_convert_button);

    c.request_conversion().await.unwrap();
    assert_eq!(c.session().phase(), Phase::Done);
    assert_eq!(c.session().download_url(), Some("/download/report.pdf"));
    assert_eq!(
        c.view().download_link.as_deref(),
        Some("/download/report.pdf")
    );
    assert_eq!(
        recorded.converts.lock().unwrap().as_slice(),
        [("tok-report.docx".to_string(), "pdf".to_string())]
    );

    let dir = tempfile::tempdir().unwrap();
    let saved = c.download_to(dir.path()).await.unwrap();
    assert_eq!(saved, dir.path().join("report.pdf"));
    assert_eq!(std::fs::read_to_string(&saved).unwrap(), "converted:report.pdf");
    assert!(!dir.path().join("report.pdf.part").exists());
}

#[tokio::test]
async fn forced_format_not_offered_fails_without_converting() {
    let (url, recorded) = spawn_service(Behaviour {
        formats: vec!["txt", "html"],
        ..Default::default()
    })
    .await;
    let mut c = Controller::new(http_service(&url));

    c.enter_tool(tool("word-to-pdf"));
    c.submit_file(FileUpload::from_bytes("notes.docx", vec![1, 2, 3]))
        .await
        .unwrap();

    assert_eq!(c.session().phase(), Phase::Failed);
    assert_eq!(
        c.session().error_text(),
        Some(unsupported_format_message("pdf").as_str())
    );
    assert_eq!(
        c.session().error_text(),
        Some("Conversion to PDF not supported for this file.")
    );
    assert!(c.request_conversion().await.is_err());
    assert!(recorded.converts.lock().unwrap().is_empty());
}

// ── Universal tool ───────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_error_message_is_shown_verbatim() {
    let (url, _) = spawn_service(Behaviour {
        upload_error: Some((StatusCode::BAD_REQUEST, "unsupported file type")),
        ..Default::default()
    })
    .await;
    let mut c = Controller::new(http_service(&url));

    c.enter_tool(tool("universal"));
    c.submit_file(FileUpload::from_bytes("data.xyz", vec![0; 16]))
        .await
        .unwrap();

    assert_eq!(c.session().phase(), Phase::Failed);
    assert_eq!(c.session().error_text(), Some("unsupported file type"));
    assert_eq!(c.session().uploaded_file_token(), None);
    let view = c.view();
    assert_eq!(view.error_message.as_deref(), Some("unsupported file type"));
    assert!(view.show_upload_trigger);
    assert!(view.format_selector.is_none());
}

#[tokio::test]
async fn auto_tool_preselects_first_format() {
    let (url, recorded) = spawn_service(Behaviour {
        formats: vec!["jpg", "webp", "pdf"],
        ..Default::default()
    })
    .await;
    let mut c = Controller::new(http_service(&url));

    c.enter_tool(tool("universal"));
    c.submit_file(FileUpload::from_bytes("photo.png", vec![9; 32]))
        .await
        .unwrap();

    assert_eq!(c.session().selected_format(), Some("jpg"));
    let selector = c.view().format_selector.unwrap();
    assert!(!selector.locked);
    let labels: Vec<_> = selector.options.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, ["JPG", "WEBP", "PDF"]);

    c.select_format("WEBP").unwrap();
    c.request_conversion().await.unwrap();
    assert_eq!(c.session().download_url(), Some("/download/photo.webp"));
    assert_eq!(recorded.uploads.lock().unwrap().as_slice(), ["photo.png"]);
}

#[tokio::test]
async fn upper_case_server_formats_are_usable() {
    let (url, recorded) = spawn_service(Behaviour {
        formats: vec!["PDF", "TXT"],
        ..Default::default()
    })
    .await;
    let mut c = Controller::new(http_service(&url));

    c.enter_tool(tool("word-to-pdf"));
    c.submit_file(FileUpload::from_bytes("report.docx", vec![1]))
        .await
        .unwrap();
    assert_eq!(c.session().phase(), Phase::AwaitingFormatChoice);
    c.request_conversion().await.unwrap();
    assert_eq!(c.session().phase(), Phase::Done);

    c.enter_tool(tool("universal"));
    c.submit_file(FileUpload::from_bytes("notes.docx", vec![1]))
        .await
        .unwrap();
    c.select_format("txt").unwrap();
    c.request_conversion().await.unwrap();

    let converts = recorded.converts.lock().unwrap();
    assert_eq!(converts[0].1, "PDF");
    assert_eq!(converts[1].1, "TXT");
}

#[tokio::test]
async fn empty_format_list_fails() {
    let (url, _) = spawn_service(Behaviour::default()).await;
    let mut c = Controller::new(http_service(&url));

    c.enter_tool(tool("universal"));
    c.submit_file(FileUpload::from_bytes("blob.bin", vec![1]))
        .await
        .unwrap();

    assert_eq!(c.session().phase(), Phase::Failed);
    assert_eq!(c.session().error_text(), Some(NO_SUPPORTED_CONVERSIONS));
    assert_eq!(c.session().uploaded_file_token(), None);
}

#[tokio::test]
async fn convert_failure_keeps_upload_for_another_format() {
    let (url, recorded) = spawn_service(Behaviour {
        formats: vec!["png", "jpg"],
        convert_error: Some((StatusCode::INTERNAL_SERVER_ERROR, "conversion timed out")),
        ..Default::default()
    })
    .await;
    let mut c = Controller::new(http_service(&url));

    c.enter_tool(tool("universal"));
    c.submit_file(FileUpload::from_bytes("photo.png", vec![7; 8]))
        .await
        .unwrap();
    c.select_format("jpg").unwrap();
    c.request_conversion().await.unwrap();

    assert_eq!(c.session().phase(), Phase::Failed);
    assert_eq!(c.session().error_text(), Some("conversion timed out"));
    assert_eq!(c.session().uploaded_file_token(), Some("tok-photo.png"));
    assert_eq!(c.session().download_url(), None);

    c.select_format("png").unwrap();
    assert_eq!(c.session().phase(), Phase::AwaitingFormatChoice);
    assert_eq!(c.session().error_text(), None);
    c.request_conversion().await.unwrap();

    let converts = recorded.converts.lock().unwrap();
    assert_eq!(converts.len(), 2);
    assert_eq!(converts[1], ("tok-photo.png".to_string(), "png".to_string()));
}

// ── Malformed and unreachable services ───────────────────────────────────────

#[tokio::test]
async fn non_json_reply_fails_the_upload() {
    let (url, _) = spawn_service(Behaviour {
        upload_raw: Some((StatusCode::BAD_GATEWAY, "<html>bad gateway</html>")),
        ..Default::default()
    })
    .await;
    let mut c = Controller::new(http_service(&url));

    c.enter_tool(tool("universal"));
    c.submit_file(FileUpload::from_bytes("a.txt", b"hi".to_vec()))
        .await
        .unwrap();

    assert_eq!(c.session().phase(), Phase::Failed);
    let text = c.session().error_text().unwrap();
    assert!(text.starts_with("Upload failed: "), "got: {text}");
    assert!(text.contains("502"), "got: {text}");
}

#[tokio::test]
async fn unreachable_service_fails_the_upload() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut c = Controller::new(http_service(&format!("http://{addr}")));
    c.enter_tool(tool("universal"));
    c.submit_file(FileUpload::from_bytes("a.txt", b"hi".to_vec()))
        .await
        .unwrap();

    assert_eq!(c.session().phase(), Phase::Failed);
    assert!(c
        .session()
        .error_text()
        .unwrap()
        .starts_with("Upload failed: "));
    assert!(c.session().pending_request().is_none());
}

#[tokio::test]
async fn hung_service_times_out() {
    init_tracing();
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept connections and never answer.
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let config = ClientConfig::builder()
        .base_url(format!("http://{addr}"))
        .request_timeout_secs(1)
        .build()
        .unwrap();
    let mut c = Controller::new(Arc::new(HttpConversionService::new(config).unwrap()));
    c.enter_tool(tool("universal"));
    c.submit_file(FileUpload::from_bytes("a.txt", b"hi".to_vec()))
        .await
        .unwrap();

    assert_eq!(c.session().phase(), Phase::Failed);
    let text = c.session().error_text().unwrap();
    assert!(text.starts_with("Upload failed: "), "got: {text}");
    assert!(text.contains("timed out after 1s"), "got: {text}");
    assert!(c.session().pending_request().is_none());
}

#[tokio::test]
async fn missing_download_is_an_error() {
    let (url, _) = spawn_service(Behaviour::default()).await;
    let service = http_service(&url);
    let err = service.download("/download/missing.pdf").await.unwrap_err();
    match err {
        ConvertClientError::DownloadFailed { reason, .. } => {
            assert!(reason.contains("404"), "got: {reason}")
        }
        other => panic!("unexpected: {other:?}"),
    }
}

// ── Overlapping requests ─────────────────────────────────────────────────────

#[derive(Default)]
struct StaleCounter(AtomicUsize);

impl SessionObserver for StaleCounter {
    fn on_stale_response(&self, kind: RequestKind, _seq: RequestSeq) {
        assert_eq!(kind, RequestKind::Upload);
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn superseded_upload_response_is_ignored() {
    let (url, recorded) = spawn_service(Behaviour {
        formats: vec!["pdf"],
        ..Default::default()
    })
    .await;
    let stale = Arc::new(StaleCounter::default());
    let mut c = Controller::new(http_service(&url)).with_observer(stale.clone());
    c.enter_tool(tool("universal"));

    let mut first = c.dispatch(Event::SubmitFile(FileUpload::from_bytes("old.png", vec![1])));
    let mut second = c.dispatch(Event::SubmitFile(FileUpload::from_bytes("new.jpg", vec![2])));
    assert_eq!(c.session().file_name(), Some("new.jpg"));

    let service = c.service();
    let (old_done, new_done) = futures::join!(
        perform(service.as_ref(), first.remove(0)),
        perform(service.as_ref(), second.remove(0))
    );
    assert_eq!(recorded.uploads.lock().unwrap().len(), 2);

    // The newer answer lands first, the older one arrives late.
    assert!(c.dispatch(new_done).is_empty());
    assert_eq!(c.session().phase(), Phase::AwaitingFormatChoice);
    c.dispatch(old_done);

    assert_eq!(c.session().file_name(), Some("new.jpg"));
    assert_eq!(c.session().uploaded_file_token(), Some("tok-new.jpg"));
    assert_eq!(stale.0.load(Ordering::SeqCst), 1);
    assert!(c.session().invariants_hold());
}

#[tokio::test]
async fn response_after_navigation_is_ignored() {
    let (url, _) = spawn_service(Behaviour {
        formats: vec!["pdf"],
        ..Default::default()
    })
    .await;
    let mut c = Controller::new(http_service(&url));
    c.enter_tool(tool("universal"));

    let mut effects = c.dispatch(Event::SubmitFile(FileUpload::from_bytes("a.doc", vec![1])));
    c.return_home();

    let done = perform(c.service().as_ref(), effects.remove(0)).await;
    c.dispatch(done);

    assert_eq!(c.session().mode(), Mode::Home);
    assert_eq!(c.session().uploaded_file_token(), None);
    assert_eq!(c.session().phase(), Phase::Idle);
}
