use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Glob pattern (wrapper type for clarity)
/// Stored as plain String and compiled into a `globset::GlobSet` by [`crate::PathFilter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern(pub String);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Local folder mirrored onto the board.
    #[serde(default = "SyncConfig::default_folder")]
    pub folder: PathBuf,
    /// Serial device address of the board.
    #[serde(default = "SyncConfig::default_port_path")]
    pub port: PathBuf,
    #[serde(default)]
    pub verbose: bool,
    /// Quiet period that must pass without new events before a batch starts.
    #[serde(default = "SyncConfig::default_quiet_period_ms")]
    pub quiet_period_ms: u64,
    /// How often the debounce gate is evaluated.
    #[serde(default = "SyncConfig::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Max consecutive open attempts per batch
    #[serde(default = "SyncConfig::default_connect_tries")]
    pub connect_tries: u32,
    /// Fixed pause after the board could not be reached.
    #[serde(default = "SyncConfig::default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Directory on the board that the folder maps to.
    #[serde(default = "SyncConfig::default_remote_root")]
    pub remote_root: String,
    #[serde(default)]
    pub exclude: Vec<Pattern>,
    /// Queue every existing file once before watching starts.
    #[serde(default)]
    pub initial_sync: bool,
}

impl SyncConfig {
    fn default_folder() -> PathBuf { PathBuf::from(".") }
    fn default_port_path() -> PathBuf { PathBuf::from(default_port()) }
    fn default_quiet_period_ms() -> u64 { 500 }
    fn default_poll_interval_ms() -> u64 { 100 }
    fn default_connect_tries() -> u32 { 5 }
    fn default_retry_backoff_ms() -> u64 { 5000 }
    fn default_remote_root() -> String { "/".to_string() }

    pub fn new(folder: impl Into<PathBuf>, port: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            port: port.into(),
            verbose: false,
            quiet_period_ms: Self::default_quiet_period_ms(),
            poll_interval_ms: Self::default_poll_interval_ms(),
            connect_tries: Self::default_connect_tries(),
            retry_backoff_ms: Self::default_retry_backoff_ms(),
            remote_root: Self::default_remote_root(),
            exclude: Vec::new(),
            initial_sync: false,
        }
    }

    /// Parse a YAML config file. Missing keys fall back to defaults; the
    /// folder defaults to the working directory.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(ConfigError::Parse)
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Startup checks. Every error here is fatal: the process must exit
    /// before any watching begins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.folder.is_dir() {
            return Err(ConfigError::InvalidFolder(self.folder.clone()));
        }
        if !is_windows_device(&self.port) && (!self.port.exists() || self.port.is_dir()) {
            return Err(ConfigError::InvalidPort(self.port.clone()));
        }
        if self.connect_tries == 0 {
            return Err(ConfigError::Invalid("connect_tries must be at least 1".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be at least 1".into()));
        }
        Ok(())
    }
}

/// Windows serial devices (`COM3`, `\\.\COM10`) are not filesystem entries.
fn is_windows_device(port: &Path) -> bool {
    let name = port.to_string_lossy();
    cfg!(windows) && (name.starts_with(r"\\.\") || !name.contains(['/', '\\']))
}

/// Platform default for the board's serial device.
pub fn default_port() -> &'static str {
    if cfg!(target_os = "macos") {
        "/dev/tty.SLAB_USBtoUART"
    } else if cfg!(windows) {
        "COM3"
    } else {
        "/dev/ttyUSB0"
    }
}
