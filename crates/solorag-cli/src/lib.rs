//! Terminal client for SoloRAG.
//!
//! Provides the `solorag` binary's building blocks:
//!
//! - [`SoloragConfig`]: layered configuration (file, `SOLORAG_*` env, legacy
//!   `OLLAMA_URL` / `OLLAMA_MODEL`)
//! - [`CliArgs`]: `ask`, `index`, `eval`, `health`, `version`, `config`
//! - [`SoloragCli`]: logging setup and command dispatch

pub mod app;
pub mod cli;
pub mod config;
pub mod config_handlers;
pub mod handlers;

pub use app::SoloragCli;
pub use cli::{CliArgs, Command, ConfigAction, ConfigCommand};
pub use config::{ArtifactsConfig, GenerationConfig, LoggingConfig, SoloragConfig};
