//! Retry wrapper for generation backends.
//!
//! Blocking generation runs as a small state machine: each attempt ends in
//! an [`AttemptOutcome`], and the driver either returns, or waits a fixed
//! delay and tries again while attempts remain.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::{BackoffBuilder, ConstantBuilder};
use solorag_core::{Error, Result};
use tracing::warn;

use crate::provider::{GenerationBackend, TokenStream};

/// Classified result of a single generation attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// The backend produced an answer.
    Success(String),
    /// Transient failure (5xx or network); another attempt may succeed.
    Retryable(Error),
    /// Permanent failure (4xx, malformed response); stop immediately.
    Terminal(Error),
}

impl From<Result<String>> for AttemptOutcome {
    fn from(result: Result<String>) -> Self {
        match result {
            Ok(text) => Self::Success(text),
            Err(e) if e.is_retryable() => Self::Retryable(e),
            Err(e) => Self::Terminal(e),
        }
    }
}

/// Wraps a generation backend with fixed-delay retry.
///
/// `max_attempts` counts every attempt, including the first. Streaming
/// passes straight through: a stream that has started emitting text cannot
/// be replayed.
pub struct RetryWrapper {
    inner: Arc<dyn GenerationBackend>,
    max_attempts: u32,
    delay: Duration,
}

impl RetryWrapper {
    /// Creates a new retry wrapper with default settings.
    ///
    /// Default settings:
    /// - Max attempts: 3
    /// - Delay: 500 milliseconds, constant
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            inner: backend,
            max_attempts: 3,
            delay: Duration::from_millis(500),
        }
    }

    /// Sets the total number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the delay between attempts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Total attempts per call.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay between attempts.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl GenerationBackend for RetryWrapper {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut delays = ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
            .build();
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match AttemptOutcome::from(self.inner.generate(prompt).await) {
                AttemptOutcome::Success(text) => return Ok(text),
                AttemptOutcome::Terminal(e) => return Err(e),
                AttemptOutcome::Retryable(e) => {
                    match delays.next() {
                        Some(delay) => {
                            warn!(
                                backend = self.inner.name(),
                                attempt,
                                max_attempts = self.max_attempts,
                                error = %e,
                                "retrying generation attempt"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => warn!(
                            backend = self.inner.name(),
                            attempts = attempt,
                            error = %e,
                            "generation retries exhausted"
                        ),
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::internal("generation retry loop finished without an outcome")
        }))
    }

    async fn stream_generate(&self, prompt: &str) -> Result<TokenStream> {
        self.inner.stream_generate(prompt).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
