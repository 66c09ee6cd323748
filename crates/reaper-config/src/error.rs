use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    #[error(
        "No reaper configuration found. Looked in:\n\
        - the current directory: reaper.local.yaml, .reaper.local.yaml, reaper.yaml, .reaper.yaml\n\
        - the ./.reaper/ directory\n\
        - ~/.config/reaper/reaper.yaml\n\
        Set REAPER_CONFIG_PATH to point at a file directly"
    )]
    ConfigFileNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {}: {}", .path.display(), .source)]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
