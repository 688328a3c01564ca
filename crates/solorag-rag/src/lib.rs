//! Answer orchestration for SoloRAG.
//!
//! Wires retrieval ([`Retriever`]), prompt assembly ([`PromptComposer`]) and
//! a [`GenerationBackend`](solorag_llm::GenerationBackend) into the two
//! public operations on [`AnswerService`]:
//!
//! - `get_answer(question)`: answer text plus the sources behind it
//! - `stream_answer(question)`: answer chunks, then one trailer chunk
//!   carrying the sources (see [`framing`])
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use solorag_rag::{AnswerService, RetrievalConfig, Retriever};
//!
//! let retriever = Retriever::new(store, embedder, reranker, RetrievalConfig::default());
//! let service = AnswerService::new(retriever, backend);
//! let answer = service.get_answer("How long do refunds take?").await?;
//! for source in &answer.sources {
//!     println!("{:.2} {}", source.score, source.text);
//! }
//! ```

pub mod answer;
pub mod eval;
pub mod framing;
pub mod prompt;
pub mod retrieval;

pub use answer::{AnswerService, AnswerStream};
pub use eval::{CaseResult, DevCase, EvalSummary, evaluate, read_dev_set};
pub use framing::{SOURCES_DELIMITER, sources_trailer, split_sources_trailer};
pub use prompt::{PromptComposer, SYSTEM_MSG, build_prompt};
pub use retrieval::{RetrievalConfig, Retriever};
