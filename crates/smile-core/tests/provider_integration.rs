//! End-to-end tests against a local OpenAI-compatible HTTP server
//!
//! Each test binds a one-shot TCP listener that answers a single request
//! with a canned HTTP response, so the real reqwest and SSE paths run.

use smile_core::chat::{ChatSession, PromptSettings};
use smile_core::config::RequestOptions;
use smile_core::llm::{ChatOrchestrator, ModelSettings, OpenAiProvider, StreamOutcome};
use smile_core::recovery::RetryConfig;
use smile_core::storage::{ConversationStore, FileConversationStore};
use smile_core::types::{ChatMessage, CompletionOptions};
use smile_core::SmileError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Route library logs to the test harness; repeat calls are no-ops
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("smile_core=debug")
        .with_test_writer()
        .try_init();
}

/// Serve one request with `response`, returning the raw request text
async fn one_shot_server(response: String) -> (SocketAddr, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local test server");
    let addr = listener.local_addr().expect("local addr");

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept connection");
        let request = read_request(&mut socket).await;
        socket
            .write_all(response.as_bytes())
            .await
            .expect("write response");
        let _ = socket.shutdown().await;
        request
    });

    (addr, server)
}

/// Read headers and a Content-Length body
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.expect("read request");
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&raw).to_string();
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if raw.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&raw).to_string()
}

fn sse_response(events: &[&str]) -> String {
    let mut body = String::new();
    for event in events {
        body.push_str("data: ");
        body.push_str(event);
        body.push_str("\n\n");
    }
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n{}",
        body
    )
}

fn delta(text: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion.chunk",
        "choices": [{ "index": 0, "delta": { "content": text }, "finish_reason": null }]
    })
    .to_string()
}

fn finish() -> String {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion.chunk",
        "choices": [{ "index": 0, "delta": {}, "finish_reason": "stop" }]
    })
    .to_string()
}

fn orchestrator(api_base: &str) -> ChatOrchestrator {
    let provider = OpenAiProvider::new(
        api_base,
        Some("sk-test".to_string()),
        &RequestOptions::default().with_timeout(Duration::from_secs(10)),
    )
    .expect("provider");
    let settings = ModelSettings {
        model: "gpt-4o-mini".to_string(),
        context_length: 128_000,
        max_tokens: 256,
        supports_images: true,
    };
    ChatOrchestrator::new(Arc::new(provider), settings)
        .with_defaults(CompletionOptions::new("gpt-4o-mini").with_stream(true))
        .with_retry(RetryConfig::default().with_max_attempts(1))
}

#[tokio::test]
async fn streams_completion_from_sse_endpoint() {
    init_tracing();
    let (hello, world, done) = (delta("Hello"), delta(" world"), finish());
    let (addr, server) = one_shot_server(sse_response(&[&hello, &world, &done, "[DONE]"])).await;
    let orchestrator = orchestrator(&format!("http://{}/v1", addr));

    let mut updates = Vec::new();
    let outcome = orchestrator
        .complete(
            &[ChatMessage::system("Be brief"), ChatMessage::user("Hi")],
            &CancellationToken::new(),
            None,
            |text| updates.push(text.to_string()),
        )
        .await
        .expect("completion succeeds");

    match outcome {
        StreamOutcome::Completed {
            content,
            finish_reason,
            ..
        } => {
            assert_eq!(content, "Hello world");
            assert_eq!(finish_reason.as_deref(), Some("stop"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(updates, vec!["Hello", "Hello world"]);

    let request = server.await.expect("server task completes");
    let lowered = request.to_lowercase();
    assert!(request.starts_with("POST /v1/chat/completions"));
    assert!(lowered.contains("authorization: bearer sk-test"));
    assert!(request.contains("\"stream\":true"));
    assert!(request.contains("\"model\":\"gpt-4o-mini\""));
}

#[tokio::test]
async fn missing_v1_suffix_is_explained() {
    init_tracing();
    let body = "404 page not found";
    let response = format!(
        "HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let (addr, server) = one_shot_server(response).await;
    let orchestrator = orchestrator(&format!("http://{}", addr));

    let error = orchestrator
        .complete(&[ChatMessage::user("Hi")], &CancellationToken::new(), None, |_| {})
        .await
        .expect_err("404 surfaces as an error");

    assert_eq!(error.status_code(), Some(404));
    assert!(error.to_string().contains("/v1") || format!("{:?}", error).contains("/v1"));
    server.await.expect("server task completes");
}

#[tokio::test]
async fn session_persists_streamed_exchange_to_disk() {
    init_tracing();
    let (answer, done) = (delta("Stored answer"), finish());
    let (addr, server) = one_shot_server(sse_response(&[&answer, &done, "[DONE]"])).await;
    let dir = tempfile::tempdir().expect("temp dir");
    let store = Arc::new(FileConversationStore::new(dir.path()));

    let session = ChatSession::new(
        Arc::new(orchestrator(&format!("http://{}/v1", addr))),
        store.clone(),
        PromptSettings::default(),
    );
    session
        .submit_user_message("Remember this", &CancellationToken::new(), &mut |_| {})
        .await
        .expect("exchange completes");
    server.await.expect("server task completes");

    let saved = store.get().await.expect("list conversations");
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].title, "Remember this");
    assert_eq!(saved[0].messages.len(), 2);
    assert_eq!(saved[0].messages[1].content, "Stored answer");
}

#[tokio::test]
async fn unreachable_provider_is_a_network_error() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let error = orchestrator(&format!("http://{}/v1", addr))
        .complete(&[ChatMessage::user("Hi")], &CancellationToken::new(), None, |_| {})
        .await
        .expect_err("connection refused");
    assert!(matches!(error, SmileError::Network { .. }));
}
