//! CLI argument parsing and command definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::CONFIG_ENV_VAR;

// ============================================================================
// CLI argument types
// ============================================================================

/// Top-level arguments for `solorag`.
#[derive(Parser, Debug)]
#[command(name = "solorag", version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file.
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    pub config: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask a question against the support corpus.
    Ask {
        /// The question.
        question: String,

        /// Print the answer as it is generated.
        #[arg(short, long)]
        stream: bool,

        /// Print `{"answer": ..., "sources": [...]}` instead of text.
        #[arg(long, conflicts_with = "stream")]
        json: bool,
    },

    /// Embed a JSON Lines corpus and write the artifact directory.
    Index {
        /// Corpus file, one `{"text": ...}` object per line.
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory (defaults to `artifacts.path`).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a keyword-hit evaluation over a dev set.
    Eval {
        /// Dev set file, one `{"question": ..., "keywords": [...]}` per line.
        #[arg(short, long)]
        dev_set: PathBuf,

        /// Print the full summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check that artifacts load and the backend is reachable.
    Health,

    /// Print version information.
    Version,

    /// Configuration operations.
    Config(ConfigCommand),
}

/// Config-specific subcommands.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    /// Config subcommand to execute.
    #[command(subcommand)]
    pub command: ConfigAction,
}

/// Available config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path.
    Path,

    /// Print a resolved configuration value by dotted key.
    Get {
        /// Dotted key (e.g., "generation.model").
        key: String,
    },

    /// Write a default configuration file.
    Init {
        /// Output file path (defaults to XDG config path).
        #[arg(short, long)]
        file: Option<String>,

        /// Overwrite existing file.
        #[arg(long)]
        force: bool,
    },

    /// Print the resolved configuration as environment variables.
    Export {
        /// Format as Docker --env flags.
        #[arg(long)]
        docker_env: bool,
    },
}

// ============================================================================
// Tests
// ============================================================================
