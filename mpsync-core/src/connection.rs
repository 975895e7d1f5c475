//! Lifecycle of the single link to the board.
//!
//! ```text
//! Closed ──acquire──▶ Opening ──ok──▶ Open ──release──▶ Closed
//!                        │                    │
//!                        └─tries exhausted─▶ Failed ──acquire──▶ Opening
//!                                             (close did not take: stays Open)
//! ```

use crate::error::ConnectError;
use crate::remote::RemoteClient;
use anyhow::Result;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Opening,
    Open,
    Failed,
}

/// Borrowed view of an open link. Only the dispatcher holds one, and only
/// for the duration of a batch.
#[derive(Debug)]
pub struct Session<'a, C: RemoteClient> {
    client: &'a C,
}

impl<C: RemoteClient> Session<'_, C> {
    pub async fn put(&self, local: &Path, remote: &str) -> Result<()> {
        self.client.put(local, remote).await
    }

    pub async fn mkdir(&self, remote: &str) -> Result<()> {
        self.client.mkdir(remote).await
    }

    pub async fn remove(&self, remote: &str) -> Result<()> {
        self.client.remove(remote).await
    }
}

#[derive(Debug)]
pub struct ConnectionManager<C: RemoteClient> {
    client: C,
    address: String,
    connect_tries: u32,
    state: SessionState,
}

impl<C: RemoteClient> ConnectionManager<C> {
    pub fn new(client: C, address: impl Into<String>, connect_tries: u32) -> Self {
        Self {
            client,
            address: address.into(),
            connect_tries: connect_tries.max(1),
            state: SessionState::Closed,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Open the link, or reuse it if it is already open.
    ///
    /// Makes at most `connect_tries` attempts; each attempt blocks until
    /// the client reports success or failure.
    pub async fn acquire(&mut self) -> Result<Session<'_, C>, ConnectError> {
        if self.state == SessionState::Open {
            if self.client.is_open().await {
                debug!(address = %self.address, "reusing open session");
                return Ok(Session { client: &self.client });
            }
            debug!(address = %self.address, "session dropped by device, reopening");
            self.state = SessionState::Closed;
        }

        self.state = SessionState::Opening;
        for attempt in 1..=self.connect_tries {
            debug!(address = %self.address, attempt, max = self.connect_tries, "opening session");
            let opened = match self.client.open(&self.address).await {
                Ok(()) => self.client.is_open().await,
                Err(e) => {
                    debug!(attempt, error = %e, "open attempt failed");
                    false
                }
            };
            if opened {
                self.state = SessionState::Open;
                debug!(address = %self.address, attempt, "session open");
                return Ok(Session { client: &self.client });
            }
        }

        self.state = SessionState::Failed;
        Err(ConnectError::Exhausted { address: self.address.clone(), attempts: self.connect_tries })
    }

    /// Close the link after a batch. A close that does not take effect is
    /// only a warning; the next batch goes through `acquire` again.
    pub async fn release(&mut self) {
        if self.state != SessionState::Open && !self.client.is_open().await {
            self.state = SessionState::Closed;
            return;
        }
        if let Err(e) = self.client.close().await {
            debug!(error = %e, "close reported an error");
        }
        if self.client.is_open().await {
            warn!(address = %self.address, "could not close connection to board");
            self.state = SessionState::Open;
        } else {
            debug!(address = %self.address, "session closed");
            self.state = SessionState::Closed;
        }
    }
}
