use crate::config::SyncConfig;
use crate::connection::ConnectionManager;
use crate::dispatcher::Dispatcher;
use crate::error::{ConfigError, SyncError};
use crate::filter::PathFilter;
use crate::intake::EventIntake;
use crate::probe::LocalFs;
use crate::queue::{ActionQueue, ActivityClock};
use crate::remote::RemoteClient;
use crate::task::{spawn_worker, SyncHandle, TaskState, WorkerTiming};
use crate::watcher::{queue_existing_files, FolderWatcher};
use std::sync::Arc;
use tracing::{debug, info};

/// A running folder-to-board mirror: OS watcher plus dispatcher loop.
pub struct Synchronizer {
    watcher: Option<FolderWatcher>,
    worker: SyncHandle,
    queue: Arc<ActionQueue>,
}

impl Synchronizer {
    /// Validate `cfg`, start watching and spawn the dispatcher. Returns
    /// immediately; must be called inside a tokio runtime.
    pub fn start<C: RemoteClient>(cfg: &SyncConfig, client: C) -> Result<Self, SyncError> {
        cfg.validate()?;
        let root = cfg
            .folder
            .canonicalize()
            .map_err(|_| ConfigError::InvalidFolder(cfg.folder.clone()))?;
        let filter = PathFilter::new(&root, &cfg.exclude)?;

        let queue = Arc::new(ActionQueue::new());
        let clock = Arc::new(ActivityClock::new());
        let intake = EventIntake::new(queue.clone(), clock.clone());

        if cfg.initial_sync {
            let queued = queue_existing_files(&root, &filter, &intake);
            info!("Queued {queued} existing files for upload");
        }

        let watcher = FolderWatcher::start(&root, intake, filter)?;

        let address = cfg.port.to_string_lossy().into_owned();
        let connection = ConnectionManager::new(client, address, cfg.connect_tries);
        let dispatcher = Dispatcher::new(root, cfg.remote_root.clone(), LocalFs, connection);
        let timing = WorkerTiming {
            poll_interval: cfg.poll_interval(),
            quiet_period: cfg.quiet_period(),
            retry_backoff: cfg.retry_backoff(),
        };
        let worker = spawn_worker(dispatcher, queue.clone(), clock, timing);
        Ok(Self { watcher: Some(watcher), worker, queue })
    }

    pub fn state(&self) -> TaskState {
        self.worker.state().clone()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Stop watching, then let the dispatcher finish its current batch and
    /// exit. Returns the number of changes left unsynced.
    pub async fn stop(mut self) -> Result<usize, SyncError> {
        drop(self.watcher.take());
        self.worker.stop().await?;
        let pending = self.queue.len();
        debug!(pending, "synchronizer stopped");
        Ok(pending)
    }
}
