//! Generation backend abstraction.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use solorag_core::Result;

/// Incremental answer text. Ends when the backend signals completion or the
/// connection closes; an `Err` item is always the last one.
pub type TokenStream = BoxStream<'static, Result<String>>;

/// Abstraction over text generation backends.
///
/// This trait lets the answer pipeline swap the HTTP client for a retrying
/// wrapper or a canned mock without changing orchestration code.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate the complete answer for a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Open a token stream for a prompt.
    ///
    /// Failures before the first byte (connection refused, non-success
    /// status) are returned here; later failures arrive as stream items.
    async fn stream_generate(&self, prompt: &str) -> Result<TokenStream>;

    /// Backend name for diagnostics.
    fn name(&self) -> &str;
}

/// Body of a `/api/generate` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier.
    pub model: String,

    /// Full prompt text.
    pub prompt: String,

    /// Whether the backend should stream NDJSON.
    pub stream: bool,
}

/// Non-streaming `/api/generate` response. Other fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    /// Complete answer text.
    pub response: String,
}

/// One line of a streaming `/api/generate` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamChunk {
    /// Token text, absent on some final lines.
    #[serde(default)]
    pub response: Option<String>,

    /// Set on the final line.
    #[serde(default)]
    pub done: bool,

    /// Backend-reported failure.
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_wire_shape() {
        let request = GenerateRequest {
            model: "llama3:8b-instruct-q5_K_M".to_string(),
            prompt: "hi".to_string(),
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"model": "llama3:8b-instruct-q5_K_M", "prompt": "hi", "stream": false})
        );
    }

    #[test]
    fn test_generate_response_ignores_extra_fields() {
        let body = r#"{"model":"m","response":" Hello ","done":true,"eval_count":12}"#;
        let response: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.response, " Hello ");
    }

    #[test]
    fn test_stream_chunk_defaults() {
        let chunk: StreamChunk = serde_json::from_str(r#"{"done": true}"#).unwrap();
        assert!(chunk.done);
        assert!(chunk.response.is_none());
        assert!(chunk.error.is_none());
    }

    #[test]
    fn test_trait_object_safety() {
        fn _assert_object_safe(_: &dyn GenerationBackend) {}
    }
}
