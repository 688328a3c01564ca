//! Mock generation backend for testing.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use solorag_core::{Error, Result};
use tokio::sync::Mutex;

use crate::provider::{GenerationBackend, TokenStream};

/// Mock backend that returns canned responses.
///
/// Queued errors are returned first, one per call. After that, answers are
/// returned in order, cycling back to the first. Streaming yields the
/// configured chunks. Clones share state, so a test can keep a handle for
/// inspecting calls after handing the backend to the code under test.
#[derive(Clone)]
pub struct MockGenerationBackend {
    state: Arc<Mutex<MockState>>,
    chunks: Vec<String>,
    stream_error: Option<String>,
}

struct MockState {
    answers: Vec<String>,
    index: usize,
    errors: VecDeque<Error>,
    calls: usize,
    prompts: Vec<String>,
}

impl MockGenerationBackend {
    /// Creates a mock that answers with the given responses in turn.
    ///
    /// # Examples
    ///
    /// ```
    /// use solorag_llm::MockGenerationBackend;
    ///
    /// let backend = MockGenerationBackend::new(vec![
    ///     "First answer".to_string(),
    ///     "Second answer".to_string(),
    /// ]);
    /// ```
    pub fn new(answers: Vec<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                answers,
                index: 0,
                errors: VecDeque::new(),
                calls: 0,
                prompts: Vec::new(),
            })),
            chunks: Vec::new(),
            stream_error: None,
        }
    }

    /// Creates a mock with a single answer.
    pub fn with_response(answer: impl Into<String>) -> Self {
        Self::new(vec![answer.into()])
    }

    /// Sets the chunks yielded by `stream_generate`.
    pub fn with_chunks<I, S>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chunks = chunks.into_iter().map(Into::into).collect();
        self
    }

    /// Makes the stream fail with a stream error after its chunks.
    pub fn with_stream_failure(mut self, message: impl Into<String>) -> Self {
        self.stream_error = Some(message.into());
        self
    }

    /// Queues an error to be returned by the next call.
    pub async fn push_error(&self, error: Error) {
        self.state.lock().await.errors.push_back(error);
    }

    /// Number of `generate` and `stream_generate` calls so far.
    pub async fn call_count(&self) -> usize {
        self.state.lock().await.calls
    }

    /// Prompts received so far, in call order.
    pub async fn prompts(&self) -> Vec<String> {
        self.state.lock().await.prompts.clone()
    }
}

#[async_trait]
impl GenerationBackend for MockGenerationBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        state.prompts.push(prompt.to_string());

        if let Some(error) = state.errors.pop_front() {
            return Err(error);
        }
        if state.answers.is_empty() {
            return Err(Error::internal("mock backend has no answers"));
        }

        let answer = state.answers[state.index].clone();
        state.index = (state.index + 1) % state.answers.len();
        Ok(answer)
    }

    async fn stream_generate(&self, prompt: &str) -> Result<TokenStream> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        state.prompts.push(prompt.to_string());

        if let Some(error) = state.errors.pop_front() {
            return Err(error);
        }

        let mut items: Vec<Result<String>> = self.chunks.iter().cloned().map(Ok).collect();
        if let Some(message) = &self.stream_error {
            items.push(Err(Error::stream(message.clone())));
        }
        Ok(futures::stream::iter(items).boxed())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_mock_cycles_answers() {
        let backend = MockGenerationBackend::new(vec!["First".into(), "Second".into()]);
        assert_eq!(backend.generate("a").await.unwrap(), "First");
        assert_eq!(backend.generate("b").await.unwrap(), "Second");
        assert_eq!(backend.generate("c").await.unwrap(), "First");
        assert_eq!(backend.call_count().await, 3);
        assert_eq!(backend.prompts().await, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_mock_errors_come_first() {
        let backend = MockGenerationBackend::with_response("ok");
        backend.push_error(Error::backend(500, "boom")).await;
        assert!(backend.generate("p").await.is_err());
        assert_eq!(backend.generate("p").await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_mock_stream_chunks() {
        let backend = MockGenerationBackend::with_response("").with_chunks(["Hello", " world"]);
        let chunks: Vec<String> = backend
            .stream_generate("p")
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(chunks, vec!["Hello", " world"]);
    }

    #[tokio::test]
    async fn test_mock_stream_failure() {
        let backend = MockGenerationBackend::with_response("")
            .with_chunks(["partial"])
            .with_stream_failure("reset");
        let items: Vec<_> = backend.stream_generate("p").await.unwrap().collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[1].is_err());
    }

    #[tokio::test]
    async fn test_mock_no_answers() {
        let backend = MockGenerationBackend::new(Vec::new());
        assert!(matches!(
            backend.generate("p").await.unwrap_err(),
            Error::Internal(_)
        ));
    }
}
