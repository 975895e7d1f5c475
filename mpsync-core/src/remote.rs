use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Single remote operation derived from a local change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOp {
    Upload { local: PathBuf, remote: String },
    MkDir { remote: String },
    Remove { remote: String },
}

/// Capability of the device link. All calls complete before returning;
/// failures come back as errors, never as panics.
#[async_trait]
pub trait RemoteClient: Send + Sync + 'static {
    async fn open(&self, address: &str) -> Result<()>;
    async fn is_open(&self) -> bool;
    async fn close(&self) -> Result<()>;
    async fn put(&self, local: &Path, remote: &str) -> Result<()>;
    async fn mkdir(&self, remote: &str) -> Result<()>;
    async fn remove(&self, remote: &str) -> Result<()>;
}
