use crate::event::{ChangeEvent, ChangeKind};
use crate::queue::{ActionQueue, ActivityClock};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::trace;

/// Entry point for raw watcher notifications.
///
/// Every call appends exactly one event and bumps the activity clock. No
/// filtering or merging happens here; the dispatcher replays each event.
#[derive(Debug, Clone)]
pub struct EventIntake {
    queue: Arc<ActionQueue>,
    clock: Arc<ActivityClock>,
}

impl EventIntake {
    pub fn new(queue: Arc<ActionQueue>, clock: Arc<ActivityClock>) -> Self {
        Self { queue, clock }
    }

    pub fn on_create(&self, path: PathBuf) {
        self.enqueue(ChangeKind::Create, path, None);
    }

    pub fn on_modify(&self, path: PathBuf) {
        self.enqueue(ChangeKind::Modify, path, None);
    }

    pub fn on_delete(&self, path: PathBuf) {
        self.enqueue(ChangeKind::Delete, path, None);
    }

    pub fn on_move(&self, from: PathBuf, to: PathBuf) {
        self.enqueue(ChangeKind::Move, from, Some(to));
    }

    fn enqueue(&self, kind: ChangeKind, path: PathBuf, dest_path: Option<PathBuf>) {
        let now = Instant::now();
        trace!(?kind, path = %path.display(), "queued");
        self.queue.push(ChangeEvent { kind, path, dest_path, observed_at: now });
        self.clock.touch(now);
    }
}
