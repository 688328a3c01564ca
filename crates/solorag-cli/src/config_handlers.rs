//! Handlers for `solorag config {path,get,init,export}`.

use std::io::Write;
use std::path::{Path, PathBuf};

use solorag_core::{Error, Result};

use crate::cli::ConfigAction;
use crate::config::SoloragConfig;

/// Handle a config subcommand.
///
/// Takes the raw `--config` value rather than a loaded config, since `path`
/// and `init` must work before any file exists.
pub fn handle_config_command(config_path: Option<&str>, action: ConfigAction) -> Result<()> {
    let mut out = std::io::stdout().lock();
    match action {
        ConfigAction::Path => config_path_cmd(&mut out, config_path),
        ConfigAction::Get { key } => {
            let config = SoloragConfig::load(config_path)?;
            config_get(&mut out, &config, &key)
        }
        ConfigAction::Init { file, force } => {
            let path = match file {
                Some(p) => PathBuf::from(p),
                None => SoloragConfig::default_config_path()
                    .ok_or_else(|| Error::config("Could not determine config directory"))?,
            };
            config_init(&path, force)?;
            writeln!(out, "Config file created at {}", path.display())?;
            Ok(())
        }
        ConfigAction::Export { docker_env } => {
            let config = SoloragConfig::load(config_path)?;
            config_export(&mut out, &config, docker_env)
        }
    }
}

fn config_path_cmd(out: &mut impl Write, config_path: Option<&str>) -> Result<()> {
    let path = SoloragConfig::resolve_config_path(config_path)
        .ok_or_else(|| Error::config("Could not determine config directory for this platform"))?;
    writeln!(out, "{}", path.display())?;
    if !path.exists() {
        eprintln!("(file does not exist; run `solorag config init` to create it)");
    }
    Ok(())
}

/// Look up a dotted key such as `generation.model`.
pub fn lookup<'a>(root: &'a toml::Value, key: &str) -> Option<&'a toml::Value> {
    key.split('.')
        .try_fold(root, |node, part| node.as_table()?.get(part))
}

fn config_get(out: &mut impl Write, config: &SoloragConfig, key: &str) -> Result<()> {
    let root = config.to_toml_value()?;
    let value = lookup(&root, key)
        .ok_or_else(|| Error::config(format!("Key '{key}' not found in configuration")))?;
    match value {
        toml::Value::String(s) => writeln!(out, "{s}")?,
        toml::Value::Table(_) => write!(
            out,
            "{}",
            toml::to_string_pretty(value).map_err(|e| Error::config(e.to_string()))?
        )?,
        other => writeln!(out, "{other}")?,
    }
    Ok(())
}

fn config_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::config(format!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io_with_path(e, parent))?;
    }
    let content = SoloragConfig::default().to_toml_string()?;
    std::fs::write(path, content).map_err(|e| Error::io_with_path(e, path))
}

fn config_export(out: &mut impl Write, config: &SoloragConfig, docker_env: bool) -> Result<()> {
    let flag = if docker_env { "--env " } else { "" };
    for (key, value) in config.to_env_vars()? {
        writeln!(out, "{flag}{key}={value}")?;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
