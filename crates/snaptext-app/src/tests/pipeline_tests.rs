use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use snaptext_config::{ApiKey, Config};
use snaptext_io::TextSink;
use snaptext_ocr::{ChatRequest, ChatTransport, EncodedImage, OcrClient, OcrError};
use snaptext_types::{AppEvent, SelectionRect};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::pipeline::{CycleError, CycleOutcome, Pipeline, pipeline_loop};
use crate::state::AppState;

enum Reply {
    Body(&'static str),
    Status(u16),
}

struct MockTransport {
    reply: Reply,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send(&self, _api_key: &ApiKey, request: &ChatRequest) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(request.model, "test-model");
        match &self.reply {
            Reply::Body(body) => Ok(body.to_string()),
            Reply::Status(status) => Err(OcrError::Api {
                status: *status,
                message: "server exploded".to_string(),
            }),
        }
    }
}

#[derive(Clone, Default)]
struct RecordingSink {
    published: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl TextSink for RecordingSink {
    fn publish(&mut self, text: &str) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("clipboard is locked");
        }
        self.published.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

impl RecordingSink {
    fn published(&self) -> Vec<String> {
        self.published.lock().unwrap().clone()
    }
}

struct Harness {
    pipeline: Pipeline<MockTransport, RecordingSink>,
    state: Arc<AppState>,
    sink: RecordingSink,
    calls: Arc<AtomicUsize>,
}

fn harness(reply: Reply, key: Option<&str>, sink: RecordingSink) -> Harness {
    let config = Config {
        credential: key.and_then(ApiKey::parse),
        ..Config::default()
    };
    let state = Arc::new(AppState::new(config));

    let calls = Arc::new(AtomicUsize::new(0));
    let transport = MockTransport {
        reply,
        calls: calls.clone(),
    };
    let ocr = OcrClient::new(
        transport,
        state.config.credential.clone(),
        "test-model".to_string(),
        "Extract the text.".to_string(),
    );

    Harness {
        pipeline: Pipeline::new(state.clone(), ocr, sink.clone()),
        state,
        sink,
        calls,
    }
}

fn payload() -> EncodedImage {
    EncodedImage {
        base64: "/9j/4AAQSkZJRg==".to_string(),
        mime: "image/jpeg",
    }
}

const HELLO: &str = r#"{"choices":[{"message":{"role":"assistant","content":"  Hello\nWorld \n"}}]}"#;

#[tokio::test]
async fn test_recognized_text_is_copied() {
    let mut h = harness(Reply::Body(HELLO), Some("sk-test-key"), RecordingSink::default());

    let outcome = h.pipeline.recognize_and_publish(&payload()).await.unwrap();

    assert_eq!(outcome, CycleOutcome::Copied("Hello\nWorld".to_string()));
    assert_eq!(h.sink.published(), vec!["Hello\nWorld".to_string()]);
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_malformed_response_leaves_clipboard_alone() {
    let mut h = harness(
        Reply::Body(r#"{"id":"abc","object":"chat.completion"}"#),
        Some("sk-test-key"),
        RecordingSink::default(),
    );

    let result = h.pipeline.recognize_and_publish(&payload()).await;

    assert!(matches!(
        result,
        Err(CycleError::Ocr(OcrError::MalformedResponse { .. }))
    ));
    assert!(h.sink.published().is_empty());
}

#[tokio::test]
async fn test_blank_text_is_not_copied() {
    let mut h = harness(
        Reply::Body(r#"{"choices":[{"message":{"content":" \n\t "}}]}"#),
        Some("sk-test-key"),
        RecordingSink::default(),
    );

    let result = h.pipeline.recognize_and_publish(&payload()).await;

    assert!(matches!(result, Err(CycleError::Ocr(OcrError::EmptyResult))));
    assert!(h.sink.published().is_empty());
}

#[tokio::test]
async fn test_api_failure_is_transport_error() {
    let mut h = harness(Reply::Status(500), Some("sk-test-key"), RecordingSink::default());

    let err = h.pipeline.recognize_and_publish(&payload()).await.unwrap_err();

    match &err {
        CycleError::Ocr(e) => assert!(e.is_transport()),
        other => panic!("Expected an OCR error, got {:?}", other),
    }
    assert!(h.sink.published().is_empty());
    h.pipeline.report_failure(&err);
}

#[tokio::test]
async fn test_clipboard_failure_still_reports_text() {
    let sink = RecordingSink {
        fail: true,
        ..RecordingSink::default()
    };
    let mut h = harness(Reply::Body(HELLO), Some("sk-test-key"), sink);

    let outcome = h.pipeline.recognize_and_publish(&payload()).await.unwrap();

    assert_eq!(outcome, CycleOutcome::CopyFailed("Hello\nWorld".to_string()));
}

#[tokio::test]
async fn test_missing_key_sends_nothing() {
    let mut h = harness(Reply::Body(HELLO), None, RecordingSink::default());

    let result = h.pipeline.recognize_and_publish(&payload()).await;
    assert!(matches!(
        result,
        Err(CycleError::Ocr(OcrError::MissingCredential))
    ));

    // A full cycle stops before touching the screen
    let rect = SelectionRect::from_corners((0, 0), (200, 100));
    let result = h.pipeline.run_cycle(rect).await;
    assert!(matches!(
        result,
        Err(CycleError::Ocr(OcrError::MissingCredential))
    ));

    assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    assert!(h.sink.published().is_empty());
}

#[tokio::test]
async fn test_loop_releases_slot_after_cycle() {
    let h = harness(Reply::Body(HELLO), None, RecordingSink::default());
    let state = h.state.clone();
    let (tx, rx) = kanal::bounded_async(4);
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(pipeline_loop(h.pipeline, rx, cancel.clone()));

    assert!(state.try_begin_capture());
    let rect = SelectionRect::from_corners((0, 0), (200, 100));
    tx.send(AppEvent::RegionSelected(rect)).await.unwrap();
    tx.send(AppEvent::Shutdown).await.unwrap();

    let result = timeout(Duration::from_secs(2), handle).await;
    assert!(matches!(result, Ok(Ok(Ok(())))));
    assert!(!state.capture_in_flight());
}

#[tokio::test]
async fn test_loop_stops_on_cancel() {
    let h = harness(Reply::Body(HELLO), Some("sk-test-key"), RecordingSink::default());
    let (_tx, rx) = kanal::bounded_async::<AppEvent>(4);
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(pipeline_loop(h.pipeline, rx, cancel.clone()));
    cancel.cancel();

    let result = timeout(Duration::from_secs(2), handle).await;
    assert!(matches!(result, Ok(Ok(Ok(())))));
    assert_eq!(h.calls.load(Ordering::SeqCst), 0);
}
