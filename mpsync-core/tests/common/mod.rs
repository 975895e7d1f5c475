//! Shared fixtures for dispatcher scenarios.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use mpsync_core::{
    spawn_worker, ActionQueue, ActivityClock, ConnectionManager, Dispatcher, EventIntake, FsProbe,
    PathKind, RemoteClient, SyncHandle, WorkerTiming,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ADDRESS: &str = "/dev/ttyUSB0";

/// Everything the mock board saw, in order.
#[derive(Default)]
pub struct BoardLog {
    pub calls: Mutex<Vec<String>>,
    pub opens: AtomicU32,
    /// When false every open attempt fails.
    pub reachable: AtomicBool,
    pub open: AtomicBool,
    /// Remote paths whose put fails.
    pub failing: Mutex<Vec<String>>,
    /// Fired on the first put of a batch, e.g. to enqueue while draining.
    pub on_put: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    /// How long every put takes.
    pub put_delay: Mutex<Duration>,
}

impl BoardLog {
    pub fn new(reachable: bool) -> Arc<Self> {
        let log = Self::default();
        log.reachable.store(reachable, Ordering::SeqCst);
        Arc::new(log)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

pub struct MockBoard(pub Arc<BoardLog>);

#[async_trait]
impl RemoteClient for MockBoard {
    async fn open(&self, address: &str) -> Result<()> {
        self.0.opens.fetch_add(1, Ordering::SeqCst);
        if !self.0.reachable.load(Ordering::SeqCst) {
            bail!("no board at {address}");
        }
        self.0.open.store(true, Ordering::SeqCst);
        self.0.record("open".into());
        Ok(())
    }

    async fn is_open(&self) -> bool {
        self.0.open.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<()> {
        self.0.open.store(false, Ordering::SeqCst);
        self.0.record("close".into());
        Ok(())
    }

    async fn put(&self, _local: &Path, remote: &str) -> Result<()> {
        if let Some(hook) = self.0.on_put.lock().unwrap().take() {
            hook();
        }
        let delay = *self.0.put_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.0.record(format!("put {remote}"));
        if self.0.failing.lock().unwrap().iter().any(|f| f == remote) {
            bail!("write failed");
        }
        Ok(())
    }

    async fn mkdir(&self, remote: &str) -> Result<()> {
        self.0.record(format!("mkdir {remote}"));
        Ok(())
    }

    async fn remove(&self, remote: &str) -> Result<()> {
        self.0.record(format!("remove {remote}"));
        Ok(())
    }
}

/// In-memory stand-in for the local filesystem.
#[derive(Debug, Default, Clone)]
pub struct FakeFs(pub Arc<Mutex<HashMap<PathBuf, PathKind>>>);

impl FakeFs {
    pub fn set(&self, path: &str, kind: PathKind) {
        self.0.lock().unwrap().insert(PathBuf::from(path), kind);
    }
}

impl FsProbe for FakeFs {
    fn kind(&self, path: &Path) -> PathKind {
        self.0.lock().unwrap().get(path).copied().unwrap_or(PathKind::Missing)
    }
}

pub struct Rig {
    pub log: Arc<BoardLog>,
    pub fs: FakeFs,
    pub queue: Arc<ActionQueue>,
    pub intake: EventIntake,
    pub handle: SyncHandle,
}

pub const TIMING: WorkerTiming = WorkerTiming {
    poll_interval: Duration::from_millis(100),
    quiet_period: Duration::from_millis(500),
    retry_backoff: Duration::from_secs(5),
};

/// Spawn a worker over a mock board; local root is `root`, remote root `/`.
pub fn rig(reachable: bool) -> Rig {
    let log = BoardLog::new(reachable);
    let fs = FakeFs::default();
    let queue = Arc::new(ActionQueue::new());
    let clock = Arc::new(ActivityClock::new());
    let intake = EventIntake::new(queue.clone(), clock.clone());
    let connection = ConnectionManager::new(MockBoard(log.clone()), ADDRESS, 5);
    let dispatcher = Dispatcher::new("root", "/", fs.clone(), connection);
    let handle = spawn_worker(dispatcher, queue.clone(), clock, TIMING);
    Rig { log, fs, queue, intake, handle }
}
