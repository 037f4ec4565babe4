//! Config file lookup following the XDG base directory conventions.

use std::env;
use std::path::{Path, PathBuf};

use super::ConfigError;

pub const CONFIG_DIR_NAME: &str = "rsbar";
pub const CONFIG_FILE_NAME: &str = "rsbar.yaml";
/// `--config NONE` skips the lookup entirely.
pub const NO_CONFIG: &str = "NONE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Disabled,
    NotFound,
}

/// Candidate locations in priority order, given an environment lookup.
pub fn config_file_candidates<F>(lookup: F) -> Vec<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let mut candidates = Vec::new();
    let in_dir = |dir: PathBuf| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);

    if let Some(config_home) = lookup("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        candidates.push(in_dir(PathBuf::from(config_home)));
    }
    if let Some(home) = lookup("HOME").filter(|v| !v.is_empty()) {
        candidates.push(in_dir(PathBuf::from(home).join(".config")));
    }
    if let Some(dirs) = lookup("XDG_CONFIG_DIRS") {
        for dir in dirs.split(':').filter(|dir| !dir.is_empty()) {
            candidates.push(in_dir(PathBuf::from(dir)));
        }
    }
    candidates.push(in_dir(PathBuf::from("/etc/xdg")));
    candidates
}

/// Pick the config file to load.
///
/// An explicit path is used as-is (made absolute); it must exist. Without
/// one, the first existing candidate wins.
pub fn resolve_config_path(flag: Option<&Path>) -> Result<ConfigSource, ConfigError> {
    if let Some(path) = flag {
        if path.as_os_str() == NO_CONFIG {
            return Ok(ConfigSource::Disabled);
        }
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            env::current_dir()
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?
                .join(path)
        };
        return Ok(ConfigSource::File(absolute));
    }

    let found = config_file_candidates(|key| env::var(key).ok())
        .into_iter()
        .find(|candidate| candidate.is_file());
    Ok(found.map_or(ConfigSource::NotFound, ConfigSource::File))
}
