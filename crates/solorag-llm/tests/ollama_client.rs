//! Integration tests for the Ollama client against a stub HTTP server.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use futures::{StreamExt, TryStreamExt};
use solorag_core::Error;
use solorag_llm::{GenerationBackend, OllamaClient, RetryWrapper};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "llama3:8b-instruct-q5_K_M";

fn retrying(server: &MockServer, attempts: u32) -> RetryWrapper {
    let client = OllamaClient::new(server.uri(), MODEL).with_timeout(Duration::from_secs(5));
    RetryWrapper::new(Arc::new(client))
        .with_max_attempts(attempts)
        .with_delay(Duration::from_millis(10))
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}

fn ndjson(lines: &[&str]) -> ResponseTemplate {
    let mut body = lines.join("\n");
    body.push('\n');
    ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson")
}

// ============================================================================
// Blocking generation
// ============================================================================

#[tokio::test]
async fn generate_sends_model_prompt_and_trims_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(serde_json::json!({
            "model": MODEL,
            "prompt": "What is Stripe?",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": MODEL,
            "response": "\n  A payments platform.  \n",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let answer = retrying(&server, 3).generate("What is Stripe?").await.unwrap();
    assert_eq!(answer, "A payments platform.");
}

#[tokio::test]
async fn generate_succeeds_on_third_attempt_after_two_503s() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": "recovered"
        })))
        .mount(&server)
        .await;

    let answer = retrying(&server, 3).generate("q").await.unwrap();
    assert_eq!(answer, "recovered");
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn generate_always_500_makes_exactly_retries_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    let err = retrying(&server, 2).generate("q").await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("internal"));
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn generate_404_fails_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(404).set_body_string(r#"{"error":"model not found"}"#),
        )
        .mount(&server)
        .await;

    let err = retrying(&server, 3).generate("q").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(!err.is_retryable());
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn generate_malformed_body_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = retrying(&server, 3).generate("q").await.unwrap_err();
    assert!(matches!(err, Error::InvalidData(_)));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn generate_timeout_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"response": "late"}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = OllamaClient::new(server.uri(), MODEL).with_timeout(Duration::from_millis(100));
    let backend = RetryWrapper::new(Arc::new(client))
        .with_max_attempts(2)
        .with_delay(Duration::from_millis(10));

    let err = backend.generate("q").await.unwrap_err();
    assert!(matches!(err, Error::Transport { .. }));
    assert_eq!(request_count(&server).await, 2);
}

// ============================================================================
// Streaming generation
// ============================================================================

#[tokio::test]
async fn stream_yields_tokens_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(serde_json::json!({"stream": true})))
        .respond_with(ndjson(&[
            r#"{"response":"Hello","done":false}"#,
            r#"{"response":" world","done":false}"#,
            r#"{"response":"","done":true}"#,
        ]))
        .mount(&server)
        .await;

    let client = OllamaClient::new(server.uri(), MODEL);
    let chunks: Vec<String> = client
        .stream_generate("q")
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(chunks, vec!["Hello", " world"]);
}

#[tokio::test]
async fn stream_handles_sentinel_blank_and_malformed_lines() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ndjson(&[
            r#"{"response":"a"}"#,
            "",
            "garbage line",
            r#"{"response":"b"}"#,
            "[DONE]",
            r#"{"response":"after"}"#,
        ]))
        .mount(&server)
        .await;

    let client = OllamaClient::new(server.uri(), MODEL);
    let chunks: Vec<String> = client
        .stream_generate("q")
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(chunks, vec!["a", "garbage line", "b"]);
}

#[tokio::test]
async fn stream_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = retrying(&server, 3).stream_generate("q").await;
    let err = result.err().unwrap();
    assert_eq!(err.status(), Some(503));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn stream_can_be_abandoned_early() {
    let server = MockServer::start().await;
    let lines: Vec<String> = (0..50)
        .map(|i| format!(r#"{{"response":"t{i}"}}"#))
        .collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ndjson(&refs))
        .mount(&server)
        .await;

    let client = OllamaClient::new(server.uri(), MODEL);
    let mut stream = client.stream_generate("q").await.unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), "t0");
    drop(stream);

    // The client is still usable after abandoning a stream.
    let again: Vec<String> = client
        .stream_generate("q")
        .await
        .unwrap()
        .take(2)
        .try_collect()
        .await
        .unwrap();
    assert_eq!(again, vec!["t0", "t1"]);
}

// ============================================================================
// Health probe
// ============================================================================

#[tokio::test]
async fn ping_lists_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [{"name": MODEL}, {"name": "nomic-embed-text:latest"}]
        })))
        .mount(&server)
        .await;

    let models = OllamaClient::new(server.uri(), MODEL).ping().await.unwrap();
    assert_eq!(models, vec![MODEL.to_string(), "nomic-embed-text:latest".to_string()]);
}

#[tokio::test]
async fn ping_reports_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = OllamaClient::new(server.uri(), MODEL).ping().await.unwrap_err();
    assert_eq!(err.status(), Some(502));
}
