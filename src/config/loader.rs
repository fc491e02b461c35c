// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Parse a config file into a [`RawConfigFile`] without validating it.
///
/// A relative `save_state` directory is resolved against the file's own
/// directory, the same place commands run from.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let mut config: RawConfigFile = toml::from_str(&contents)?;
    if let Some(dir) = config.config.save_state.take() {
        config.config.save_state = Some(resolve_against(path, dir));
    }

    debug!(
        path = ?path,
        projects = config.project.len(),
        actions = config.actions.len(),
        "parsed config file"
    );
    Ok(config)
}

/// Parse and validate: project references, cycles, action names and numeric
/// bounds. This is what the binary uses.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    ConfigFile::try_from(load_from_path(path)?)
}

fn resolve_against(config_path: &Path, dir: PathBuf) -> PathBuf {
    match config_path.parent() {
        Some(parent) if dir.is_relative() && !parent.as_os_str().is_empty() => parent.join(dir),
        _ => dir,
    }
}
