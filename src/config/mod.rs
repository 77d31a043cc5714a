pub mod types;

use crate::error::{ConfigError, Result};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = ".netpol-synth.toml";

/// Get the global config file path (~/.netpol-synth.toml)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(CONFIG_FILE_NAME))
}

/// Get the local config file path (./.netpol-synth.toml)
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

/// Read and parse one config file.
pub fn read_config(path: &Path) -> Result<types::Config> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let config = toml::from_str(&content).map_err(|e| ConfigError::ParsingFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(config)
}

/// Load configuration from file or use defaults.
///
/// An explicit path must be readable. Otherwise the local config is tried
/// first, then the global one; broken files are skipped with a warning.
pub fn load_config(explicit: Option<&Path>) -> Result<types::Config> {
    if let Some(path) = explicit {
        return read_config(path);
    }

    let candidates = std::env::current_dir()
        .ok()
        .map(|dir| local_config_path(&dir))
        .into_iter()
        .chain(global_config_path());

    for candidate in candidates {
        if !candidate.exists() {
            continue;
        }
        match read_config(&candidate) {
            Ok(config) => {
                log::debug!("Loaded configuration from {}", candidate.display());
                return Ok(config);
            }
            Err(e) => log::warn!("Ignoring configuration: {}", e),
        }
    }

    Ok(types::Config::default())
}
