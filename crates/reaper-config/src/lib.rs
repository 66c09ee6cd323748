pub mod error;
pub mod file;

pub use error::*;
pub use file::{ReaperFile, load_config};

use std::path::PathBuf;

/// Environment variable naming the configuration file directly
pub const CONFIG_PATH_ENV: &str = "REAPER_CONFIG_PATH";

const CANDIDATES: [&str; 4] = [
    "reaper.local.yaml",
    ".reaper.local.yaml",
    "reaper.yaml",
    ".reaper.yaml",
];

/// The reaper's directory under the user configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("reaper");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Locate the configuration file
///
/// Search order:
/// 1. `REAPER_CONFIG_PATH`
/// 2. the current directory: reaper.local.yaml, .reaper.local.yaml, reaper.yaml, .reaper.yaml
/// 3. `./.reaper/` with the same names
/// 4. `~/.config/reaper/reaper.yaml`
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!("{} points at missing file {}", CONFIG_PATH_ENV, path.display());
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let reaper_dir = current_dir.join(".reaper");
    if reaper_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = reaper_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("reaper").join("reaper.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// Find, load and validate the configuration
pub fn load() -> Result<(PathBuf, ReaperFile)> {
    let path = find_config_file()?;
    tracing::debug!("Using configuration {}", path.display());
    let file = load_config(&path)?;
    file.validate()?;
    Ok((path, file))
}
