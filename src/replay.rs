//! Persisting resolved contexts for replay: regenerating a project
//! without answering the prompts again.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::utils;
use std::path::{Path, PathBuf};

fn record_path(replay_dir: &Path, template_name: &str) -> PathBuf {
    replay_dir.join(format!("{template_name}.json"))
}

/// Writes the resolved context for `template_name`, overwriting any
/// previous record. Called once, after a fully successful generation.
pub fn dump(replay_dir: &Path, template_name: &str, context: &Context) -> Result<()> {
    utils::make_sure_path_exists(replay_dir)?;
    let path = record_path(replay_dir, template_name);
    let payload = serde_json::to_string_pretty(context)
        .map_err(|e| Error::ConfigError(format!("unable to serialize context: {e}")))?;
    log::debug!("Saving replay record '{}'", path.display());
    std::fs::write(path, payload).map_err(Error::IoError)
}

/// Reads the stored context for `template_name`. The result replaces the
/// context built for generation; it is never merged.
pub fn load(replay_dir: &Path, template_name: &str) -> Result<Context> {
    let path = record_path(replay_dir, template_name);
    log::debug!("Loading replay record '{}'", path.display());
    let raw = std::fs::read_to_string(&path).map_err(Error::IoError)?;
    serde_json::from_str(&raw).map_err(|e| Error::ContextDecoding {
        context_file: path.display().to_string(),
        source: e,
    })
}
