//! Configuration for the `solorag` binary.
//!
//! [`SoloragConfig`] is loaded with `confyg` from a TOML file, then overlaid
//! with `SOLORAG_*` environment variables, then with the legacy
//! `OLLAMA_URL` / `OLLAMA_MODEL` variables.
//!
//! # Loading Priority
//!
//! 1. Explicit `--config <path>` flag
//! 2. `SOLORAG_CONFIG` environment variable
//! 3. XDG default: `~/.config/solorag/config.toml`
//! 4. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use confyg::{Confygery, env};
use serde::{Deserialize, Serialize};
use solorag_core::{Error, Result};
use solorag_llm::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use solorag_rag::RetrievalConfig;
use solorag_vector::EmbeddingConfig;

/// Prefix for environment overrides, e.g. `SOLORAG_GENERATION_MODEL`.
pub const ENV_PREFIX: &str = "SOLORAG";

/// Variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "SOLORAG_CONFIG";

const SECTIONS: &[&str] = &["generation", "retrieval", "embedding", "artifacts", "logging"];

// ============================================================================
// Configuration structs
// ============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SoloragConfig {
    /// Generation backend.
    pub generation: GenerationConfig,

    /// Retrieval depth and prompt snippet width.
    pub retrieval: RetrievalConfig,

    /// Embedding and reranking models.
    pub embedding: EmbeddingConfig,

    /// Prebuilt artifact location.
    pub artifacts: ArtifactsConfig,

    /// Log output.
    pub logging: LoggingConfig,
}

/// Generation backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Backend root URL.
    pub base_url: String,

    /// Model identifier passed on every request.
    pub model: String,

    /// Per-attempt timeout for blocking generation.
    #[serde(deserialize_with = "solorag_core::de::lenient")]
    pub timeout_secs: u64,

    /// Total attempts for blocking generation.
    #[serde(deserialize_with = "solorag_core::de::lenient")]
    pub retries: u32,

    /// Fixed delay between attempts.
    #[serde(deserialize_with = "solorag_core::de::lenient")]
    pub retry_delay_ms: u64,

    /// Longest silence tolerated between stream lines; 0 disables.
    #[serde(deserialize_with = "solorag_core::de::lenient")]
    pub stream_idle_timeout_secs: u64,
}

/// Where the prebuilt artifacts live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Directory holding `manifest.json`, `vectors.f32` and `texts.json`.
    pub path: String,
}

/// Log output settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output.
    #[serde(deserialize_with = "solorag_core::de::lenient")]
    pub json: bool,
}

// ============================================================================
// Default implementations
// ============================================================================

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 30,
            retries: 3,
            retry_delay_ms: 500,
            stream_idle_timeout_secs: 120,
        }
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            path: "artifacts".to_string(),
        }
    }
}

impl GenerationConfig {
    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay between attempts.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Stream idle timeout, or `None` when disabled.
    pub fn stream_idle_timeout(&self) -> Option<Duration> {
        (self.stream_idle_timeout_secs > 0)
            .then(|| Duration::from_secs(self.stream_idle_timeout_secs))
    }
}

// ============================================================================
// Config loading
// ============================================================================

impl SoloragConfig {
    /// Load configuration from file, environment, and defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder =
            Confygery::new().map_err(|e| Error::config(format!("config init: {e}")))?;

        if let Some(path) = Self::resolve_config_path(config_path)
            && path.exists()
        {
            builder
                .add_file(&path.to_string_lossy())
                .map_err(|e| Error::config(format!("config file {}: {e}", path.display())))?;
        }

        let mut env_opts = env::Options::with_top_level(ENV_PREFIX);
        for section in SECTIONS {
            env_opts.add_section(*section);
        }
        builder
            .add_env(env_opts)
            .map_err(|e| Error::config(format!("config env: {e}")))?;

        let mut config: Self = builder
            .build()
            .map_err(|e| Error::config(format!("config build: {e}")))?;
        config.apply_legacy_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `OLLAMA_URL` and `OLLAMA_MODEL` when `lookup` yields them.
    pub fn apply_legacy_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_blank("OLLAMA_URL") {
            self.generation.base_url = url;
        }
        if let Some(model) = non_blank("OLLAMA_MODEL") {
            self.generation.model = model;
        }
    }

    /// Resolve the config file path from explicit flag, env var, or XDG default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        explicit
            .map(PathBuf::from)
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
            .or_else(Self::default_config_path)
    }

    /// Return the XDG default config path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("solorag").join("config.toml"))
    }

    /// Serialize this config to a pretty-printed TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// This config as a TOML value tree.
    pub fn to_toml_value(&self) -> Result<toml::Value> {
        toml::Value::try_from(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Flatten this config into `SOLORAG_SECTION_KEY=value` pairs.
    pub fn to_env_vars(&self) -> Result<Vec<(String, String)>> {
        let mut vars = Vec::new();
        flatten(&self.to_toml_value()?, ENV_PREFIX, &mut vars);
        Ok(vars)
    }
}

fn flatten(value: &toml::Value, prefix: &str, out: &mut Vec<(String, String)>) {
    match value {
        toml::Value::Table(table) => {
            for (key, val) in table {
                flatten(val, &format!("{prefix}_{}", key.to_uppercase()), out);
            }
        }
        toml::Value::String(s) => out.push((prefix.to_string(), s.clone())),
        toml::Value::Array(items) => {
            if let Ok(json) = serde_json::to_string(items) {
                out.push((prefix.to_string(), json));
            }
        }
        other => out.push((prefix.to_string(), other.to_string())),
    }
}

// ============================================================================
// Tests
// ============================================================================
