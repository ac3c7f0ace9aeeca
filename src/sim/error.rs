use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub(super) enum SimError {
    #[error("failed to read {}: {source}", path.display())]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    ParseConfig {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("failed to serialize config: {0}")]
    SerializeConfig(#[from] ron::Error),
    #[error("failed to write {}: {source}", path.display())]
    WriteConfig {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{flag} expects a value")]
    MissingCliValue { flag: String },
    #[error("unknown option: {0}")]
    UnknownCliOption(String),
    #[error("host completion API is not available")]
    HostApiUnavailable,
    #[error("host bridge call failed: {0}")]
    HostBridge(String),
}
