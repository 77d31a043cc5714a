use crate::analyzer::netpol::FileProcessingError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetpolError {
    #[error("Analysis failed: {0}")]
    Analysis(#[from] FileProcessingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {reason}")]
    ParsingFailed { path: PathBuf, reason: String },

    #[error("Invalid output format: {0}")]
    InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, NetpolError>;
