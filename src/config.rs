//! User configuration handling.
//!
//! The user configuration is a YAML file (`~/.kilnrc` by default)
//! declaring where template checkouts and replay records live, default
//! context values applied to every template, and extra repository
//! abbreviations. Precedence: explicit `--config-file`, then the
//! `KILN_CONFIG` environment variable, then `~/.kilnrc`, then built-in
//! defaults.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::loader::builtin_abbreviations;
use crate::utils::expand_path;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an alternative configuration file.
pub const CONFIG_ENV_VAR: &str = "KILN_CONFIG";

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "~/.kilnrc";

const DEFAULT_TEMPLATES_DIR: &str = "~/.kiln/templates";
const DEFAULT_REPLAY_DIR: &str = "~/.kiln/replay";

/// Resolved user configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct UserConfig {
    /// Where remote templates are cloned/extracted and cached.
    pub templates_dir: PathBuf,
    /// Where replay records are stored.
    pub replay_dir: PathBuf,
    /// Context defaults layered over every template's declared values.
    pub default_context: Context,
    /// Repository abbreviations, merged over the built-in ones.
    pub abbreviations: IndexMap<String, String>,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            templates_dir: expand_path(DEFAULT_TEMPLATES_DIR),
            replay_dir: expand_path(DEFAULT_REPLAY_DIR),
            default_context: Context::new(),
            abbreviations: builtin_abbreviations(),
        }
    }
}

/// On-disk shape of the configuration file; every field optional.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    templates_dir: Option<String>,
    replay_dir: Option<String>,
    default_context: Option<Context>,
    abbreviations: Option<IndexMap<String, String>>,
}

fn load_config_file(path: &Path) -> Result<UserConfig> {
    log::debug!("Loading user configuration from '{}'", path.display());
    let raw = std::fs::read_to_string(path).map_err(|e| {
        Error::ConfigError(format!(
            "unable to read configuration file '{}': {e}",
            path.display()
        ))
    })?;
    let parsed: RawConfig = serde_yaml::from_str(&raw).map_err(|e| {
        Error::ConfigError(format!(
            "invalid configuration file '{}': {e}",
            path.display()
        ))
    })?;

    let mut config = UserConfig::default();
    if let Some(dir) = parsed.templates_dir {
        config.templates_dir = expand_path(&dir);
    }
    if let Some(dir) = parsed.replay_dir {
        config.replay_dir = expand_path(&dir);
    }
    if let Some(context) = parsed.default_context {
        config.default_context = context;
    }
    if let Some(abbreviations) = parsed.abbreviations {
        // User entries extend and may shadow the built-ins.
        config.abbreviations.extend(abbreviations);
    }
    Ok(config)
}

/// Returns the user configuration, honoring the documented precedence.
/// With `default_config` set, every other source is ignored.
pub fn get_user_config(config_file: Option<&Path>, default_config: bool) -> Result<UserConfig> {
    if default_config {
        return Ok(UserConfig::default());
    }

    if let Some(path) = config_file {
        if !path.is_file() {
            return Err(Error::ConfigError(format!(
                "configuration file '{}' does not exist",
                path.display()
            )));
        }
        return load_config_file(path);
    }

    if let Some(env_path) = std::env::var_os(CONFIG_ENV_VAR) {
        let path = PathBuf::from(env_path);
        if !path.is_file() {
            return Err(Error::ConfigError(format!(
                "configuration file '{}' (from {CONFIG_ENV_VAR}) does not exist",
                path.display()
            )));
        }
        return load_config_file(&path);
    }

    let default_path = expand_path(DEFAULT_CONFIG_PATH);
    if default_path.is_file() {
        return load_config_file(&default_path);
    }

    Ok(UserConfig::default())
}
