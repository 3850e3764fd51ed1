//! Tests the Ollama client against a `wiremock` mock server.

use futures::StreamExt;
use localchat::ai::{LLMBackend, OllamaBackend, build_request};
use localchat::config::ChatConfig;
use localchat::error::ChatError;
use localchat::types::ChatMessage;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "llama3.2";

fn backend_for(endpoint: String, timeout: Option<Duration>) -> OllamaBackend {
    let config = ChatConfig {
        endpoint,
        request_timeout: timeout,
        ..ChatConfig::default()
    };
    OllamaBackend::new(&config).expect("client builds")
}

async fn server_replying(template: ResponseTemplate) -> (MockServer, OllamaBackend) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(template)
        .mount(&server)
        .await;
    let backend = backend_for(format!("{}/api/chat", server.uri()), Some(Duration::from_secs(5)));
    (server, backend)
}

#[tokio::test]
async fn sends_model_messages_and_disabled_stream_flag() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({
            "model": MODEL,
            "messages": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"},
                {"role": "user", "content": "how are you?"}
            ],
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": {"content": "fine"}})))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(format!("{}/api/chat", server.uri()), None);
    let history = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
    let reply = backend
        .complete(&build_request(&history, "how are you?"), MODEL)
        .await
        .unwrap();
    assert_eq!(reply, "fine");
}

#[tokio::test]
async fn reads_nested_message_content() {
    let (_server, backend) =
        server_replying(ResponseTemplate::new(200).set_body_json(json!({"message": {"content": "hi"}}))).await;
    let reply = backend.complete(&build_request(&[], "hey"), MODEL).await;
    assert_eq!(reply, Ok("hi".to_string()));
}

#[tokio::test]
async fn falls_back_to_top_level_response() {
    let (_server, backend) =
        server_replying(ResponseTemplate::new(200).set_body_json(json!({"response": "hi"}))).await;
    let reply = backend.complete(&build_request(&[], "hey"), MODEL).await;
    assert_eq!(reply, Ok("hi".to_string()));
}

#[tokio::test]
async fn unknown_success_body_is_malformed() {
    let (_server, backend) = server_replying(ResponseTemplate::new(200).set_body_json(json!({}))).await;
    let reply = backend.complete(&build_request(&[], "hey"), MODEL).await;
    assert_eq!(reply, Err(ChatError::MalformedResponse));
}

#[tokio::test]
async fn error_status_reports_error_field() {
    let (_server, backend) =
        server_replying(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"}))).await;
    let reply = backend.complete(&build_request(&[], "hey"), MODEL).await;
    assert_eq!(reply, Err(ChatError::Remote("boom".into())));
}

#[tokio::test]
async fn error_status_without_body_reports_status() {
    let (_server, backend) = server_replying(ResponseTemplate::new(404)).await;
    let reply = backend.complete(&build_request(&[], "hey"), MODEL).await;
    assert_eq!(reply, Err(ChatError::Remote("HTTP error! status: 404".into())));
}

#[tokio::test]
async fn unreachable_endpoint_is_a_network_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let backend = backend_for(format!("http://127.0.0.1:{port}/api/chat"), Some(Duration::from_secs(5)));

    let err = backend
        .complete(&build_request(&[], "hey"), MODEL)
        .await
        .unwrap_err();
    assert!(err.is_network(), "expected a network error, got {err:?}");
    assert!(matches!(err, ChatError::Network { .. }));
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": {"content": "late"}}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    let backend = backend_for(format!("{}/api/chat", server.uri()), Some(Duration::from_millis(200)));

    let err = backend
        .complete(&build_request(&[], "hey"), MODEL)
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Timeout { .. }), "got {err:?}");
    assert!(err.is_network());
}

#[tokio::test]
async fn stream_yields_pieces_until_done() {
    let body = concat!(
        r#"{"message":{"content":"Hel"},"done":false}"#,
        "\n",
        "\n",
        r#"{"message":{"content":"lo"},"done":false}"#,
        "\n",
        "garbage\n",
        r#"{"message":{"content":""},"done":true}"#,
        "\n",
        r#"{"message":{"content":"ignored"},"done":false}"#,
        "\n",
    );
    let (_server, backend) = server_replying(ResponseTemplate::new(200).set_body_string(body)).await;

    let pieces: Vec<String> = backend
        .stream(&build_request(&[], "hey"), MODEL)
        .await
        .unwrap()
        .map(|piece| piece.unwrap())
        .collect()
        .await;
    assert_eq!(pieces, vec!["Hel", "lo"]);
}

#[tokio::test]
async fn stream_reports_error_status_before_yielding() {
    let (_server, backend) =
        server_replying(ResponseTemplate::new(404).set_body_json(json!({"error": "model not found"}))).await;
    let result = backend.stream(&build_request(&[], "hey"), MODEL).await;
    assert!(matches!(result, Err(ChatError::Remote(ref msg)) if msg == "model not found"));
}
