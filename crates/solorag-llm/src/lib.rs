//! Generation backend client for SoloRAG.
//!
//! - [`GenerationBackend`]: the async trait the answer pipeline depends on
//! - [`OllamaClient`]: single-attempt HTTP client for `/api/generate`,
//!   blocking and NDJSON streaming
//! - [`RetryWrapper`]: fixed-delay retry for blocking calls, driven by
//!   [`AttemptOutcome`]
//! - [`MockGenerationBackend`]: canned answers and chunks for tests
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use solorag_llm::{GenerationBackend, OllamaClient, RetryWrapper};
//!
//! let client = OllamaClient::new("http://localhost:11434", "llama3:8b-instruct-q5_K_M");
//! let backend = RetryWrapper::new(Arc::new(client))
//!     .with_max_attempts(3)
//!     .with_delay(Duration::from_millis(500));
//! let answer = backend.generate("Say hello").await?;
//! ```

pub mod mock;
pub mod ndjson;
pub mod ollama;
pub mod provider;
pub mod retry;

pub use mock::MockGenerationBackend;
pub use ndjson::{LineDecoder, LineEvent, classify_line, decode_token_stream};
pub use ollama::{DEFAULT_BASE_URL, DEFAULT_MODEL, OllamaClient};
pub use provider::{GenerateRequest, GenerationBackend, StreamChunk, TokenStream};
pub use retry::{AttemptOutcome, RetryWrapper};
