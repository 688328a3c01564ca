//! Ollama HTTP client.
//!
//! One call to [`OllamaClient::generate`] is one attempt; wrap the client in
//! [`RetryWrapper`](crate::RetryWrapper) for the retry policy.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use solorag_core::{Error, Result};
use tracing::debug;

use crate::ndjson::decode_token_stream;
use crate::provider::{GenerateRequest, GenerateResponse, GenerationBackend, TokenStream};

/// Default backend base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "llama3:8b-instruct-q5_K_M";

/// Generation backend speaking Ollama's `/api/generate` protocol.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    timeout: Duration,
    stream_idle_timeout: Option<Duration>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaClient {
    /// Creates a client for `base_url` and `model` with default timeouts.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Server root, e.g. `http://localhost:11434`
    /// * `model` - Model ID (e.g., "llama3:8b-instruct-q5_K_M")
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout: Duration::from_secs(30),
            stream_idle_timeout: Some(Duration::from_secs(120)),
            client: reqwest::Client::new(),
        }
    }

    /// Sets the per-attempt timeout for blocking generation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the longest gap allowed between stream reads; `None` waits forever.
    pub fn with_stream_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stream_idle_timeout = timeout;
        self
    }

    /// Server root URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Model identifier sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    fn request(&self, prompt: &str, stream: bool) -> GenerateRequest {
        GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream,
        }
    }

    /// Turn a non-success response into a backend error carrying its body.
    async fn status_error(response: reqwest::Response) -> Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("no reason").to_string()
        } else {
            body.trim().to_string()
        };
        Error::backend(status.as_u16(), message)
    }

    /// List the models the backend has available.
    pub async fn ping(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::transport_with_source("Failed to reach generation backend", e))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| Error::invalid_data(format!("Unexpected /api/tags response: {e}")))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl GenerationBackend for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, prompt_chars = prompt.len(), "sending generate request");

        let response = self
            .client
            .post(self.generate_url())
            .timeout(self.timeout)
            .json(&self.request(prompt, false))
            .send()
            .await
            .map_err(|e| Error::transport_with_source("Failed to call generation backend", e))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport_with_source("Failed to read generation response", e))?;
        let parsed: GenerateResponse = serde_json::from_slice(&body)
            .map_err(|e| Error::invalid_data(format!("Unexpected generation response: {e}")))?;

        Ok(parsed.response.trim().to_string())
    }

    async fn stream_generate(&self, prompt: &str) -> Result<TokenStream> {
        debug!(model = %self.model, prompt_chars = prompt.len(), "opening generation stream");

        // No overall timeout: the stream lives as long as the answer takes.
        let response = self
            .client
            .post(self.generate_url())
            .json(&self.request(prompt, true))
            .send()
            .await
            .map_err(|e| Error::transport_with_source("Failed to open generation stream", e))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        Ok(decode_token_stream(
            response.bytes_stream(),
            self.stream_idle_timeout,
        ))
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_client_construction() {
        let client = OllamaClient::new("http://ollama:11434/", DEFAULT_MODEL)
            .with_timeout(Duration::from_secs(5))
            .with_stream_idle_timeout(None);
        assert_eq!(client.base_url(), "http://ollama:11434");
        assert_eq!(client.model(), DEFAULT_MODEL);
        assert_eq!(client.generate_url(), "http://ollama:11434/api/generate");
        assert_eq!(client.timeout, Duration::from_secs(5));
        assert!(client.stream_idle_timeout.is_none());
    }

    #[test]
    fn test_request_body() {
        let client = OllamaClient::new(DEFAULT_BASE_URL, "m");
        let request = client.request("hello", true);
        assert_eq!(request.model, "m");
        assert_eq!(request.prompt, "hello");
        assert!(request.stream);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_retryable() {
        // Port 9 (discard) is almost never listening.
        let client = OllamaClient::new("http://127.0.0.1:9", "m").with_timeout(Duration::from_secs(2));
        let err = client.generate("hi").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
