//! SoloRAG core: shared types and errors.
//!
//! This crate has no internal SoloRAG dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`de`]: Lenient serde helpers for configuration values
//! - [`error`]: Error taxonomy and Result alias
//! - [`types`]: Candidates, scored passages, and answers

pub mod de;
pub mod error;
pub mod types;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};
pub use types::{Answer, Candidate, CandidateSource, ScoredPassage};
