//! Serial-port backend for mpsync: drives a MicroPython board through its
//! raw REPL.

mod repl;
mod utils;

pub use crate::repl::{BoardError, RawRepl};
use crate::utils::{make_dir, put_bytes, remove_path};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use mpsync_core::RemoteClient;
use serialport::SerialPort;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BAUD: u32 = 115_200;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

type Link = RawRepl<Box<dyn SerialPort>>;

pub struct SerialRemote {
    baud: u32,
    timeout: Duration,
    link: Arc<Mutex<Option<Link>>>,
}

impl Default for SerialRemote {
    fn default() -> Self {
        Self::new(DEFAULT_BAUD, DEFAULT_TIMEOUT)
    }
}

impl SerialRemote {
    pub fn new(baud: u32, timeout: Duration) -> Self {
        Self { baud, timeout, link: Arc::new(Mutex::new(None)) }
    }

    /// Run a blocking raw-REPL exchange off the async runtime. A failure of
    /// the link itself (not of the code on the board) drops the link, so the
    /// next `is_open` reports it closed.
    async fn with_link<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Link) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let link = self.link.clone();
        tokio::task::spawn_blocking(move || -> Result<R> {
            let mut guard = link.lock().unwrap_or_else(PoisonError::into_inner);
            let repl = guard.as_mut().ok_or_else(|| anyhow!("not connected to board"))?;
            let result = f(repl);
            if let Err(e) = &result {
                if e.downcast_ref::<BoardError>().is_none() {
                    debug!(error = %e, "serial link failed, dropping it");
                    *guard = None;
                }
            }
            result
        })
        .await?
    }
}

#[async_trait]
impl RemoteClient for SerialRemote {
    async fn open(&self, address: &str) -> Result<()> {
        let link = self.link.clone();
        let address = address.to_string();
        let (baud, timeout) = (self.baud, self.timeout);
        tokio::task::spawn_blocking(move || -> Result<()> {
            let port = serialport::new(&address, baud).timeout(timeout).open()?;
            let repl = RawRepl::enter(port)?;
            debug!(%address, baud, "raw REPL ready");
            *link.lock().unwrap_or_else(PoisonError::into_inner) = Some(repl);
            Ok(())
        })
        .await?
    }

    async fn is_open(&self) -> bool {
        self.link.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    async fn close(&self) -> Result<()> {
        let link = self.link.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let taken = link.lock().unwrap_or_else(PoisonError::into_inner).take();
            match taken {
                Some(repl) => repl.exit().map(drop),
                None => Ok(()),
            }
        })
        .await?
    }

    async fn put(&self, local: &Path, remote: &str) -> Result<()> {
        let data = tokio::fs::read(local).await?;
        let remote = remote.to_string();
        self.with_link(move |repl| put_bytes(repl, &data, &remote)).await
    }

    async fn mkdir(&self, remote: &str) -> Result<()> {
        let remote = remote.to_string();
        self.with_link(move |repl| make_dir(repl, &remote)).await
    }

    async fn remove(&self, remote: &str) -> Result<()> {
        let remote = remote.to_string();
        self.with_link(move |repl| remove_path(repl, &remote)).await
    }
}
