use std::path::PathBuf;
use thiserror::Error;

/// Startup errors. Any of these ends the process before watching begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("path '{}' does not exist or is not a folder", .0.display())]
    InvalidFolder(PathBuf),
    #[error("port '{}' does not exist or is a folder", .0.display())]
    InvalidPort(PathBuf),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to parse config: {0}")]
    Parse(#[source] serde_yaml::Error),
}

/// The board could not be reached within the configured attempt budget.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("could not connect to board {address} after {attempts} attempts")]
    Exhausted { address: String, attempts: u32 },
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to watch folder: {0}")]
    Watch(#[from] notify::Error),
    #[error("sync worker terminated abnormally: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
