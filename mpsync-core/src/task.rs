use crate::dispatcher::{BatchOutcome, Dispatcher};
use crate::gate::DebounceGate;
use crate::probe::FsProbe;
use crate::queue::{ActionQueue, ActivityClock};
use crate::remote::RemoteClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch::Ref;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Handle for controlling the running dispatcher loop.
#[derive(Debug)]
pub struct SyncHandle {
    ctrl_tx: mpsc::Sender<TaskCommand>,
    state_rx: watch::Receiver<TaskState>,
    join: JoinHandle<()>,
}

impl SyncHandle {
    pub fn state(&self) -> Ref<'_, TaskState> {
        self.state_rx.borrow()
    }

    /// Ask the loop to exit and wait for it. A batch in flight runs to the end.
    pub async fn stop(self) -> Result<(), tokio::task::JoinError> {
        let _ = self.ctrl_tx.send(TaskCommand::Stop).await;
        self.join.await
    }
}

#[derive(Debug, Clone)]
pub enum TaskCommand {
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    Watching,
    Syncing,
    /// Board unreachable; waiting out the backoff.
    Retrying(String),
    Stopped,
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerTiming {
    pub poll_interval: Duration,
    pub quiet_period: Duration,
    pub retry_backoff: Duration,
}

pub(crate) struct SyncWorker<C: RemoteClient, P: FsProbe> {
    dispatcher: Dispatcher<C, P>,
    queue: Arc<ActionQueue>,
    clock: Arc<ActivityClock>,
    timing: WorkerTiming,
}

impl<C: RemoteClient, P: FsProbe> SyncWorker<C, P> {
    async fn run(mut self, mut ctrl_rx: mpsc::Receiver<TaskCommand>, state_tx: watch::Sender<TaskState>) {
        let gate = DebounceGate::new(self.timing.quiet_period);
        let mut interval = tokio::time::interval(self.timing.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let _ = state_tx.send(TaskState::Watching);

        loop {
            tokio::select! {
                biased;
                _ = ctrl_rx.recv() => break,
                _ = interval.tick() => {
                    if !gate.should_fire(Instant::now(), self.clock.last(), self.queue.len()) {
                        continue;
                    }
                    let _ = state_tx.send(TaskState::Syncing);
                    match self.dispatcher.run_batch(&self.queue).await {
                        BatchOutcome::Completed(report) => {
                            debug!(
                                events = report.total(),
                                applied = report.applied,
                                failed = report.failed,
                                skipped = report.skipped,
                                unsupported = report.unsupported,
                                "batch complete"
                            );
                        }
                        BatchOutcome::Deferred(e) => {
                            let backoff = self.timing.retry_backoff;
                            warn!("{e}; retrying in {}s", backoff.as_secs_f64());
                            let _ = state_tx.send(TaskState::Retrying(e.to_string()));
                            tokio::select! {
                                _ = tokio::time::sleep(backoff) => {}
                                _ = ctrl_rx.recv() => break,
                            }
                        }
                    }
                    let _ = state_tx.send(TaskState::Watching);
                }
            }
        }
        debug!(pending = self.queue.len(), "sync worker stopped");
        let _ = state_tx.send(TaskState::Stopped);
    }
}

/// Spawn the dispatcher loop on the current tokio runtime.
pub fn spawn_worker<C: RemoteClient, P: FsProbe>(
    dispatcher: Dispatcher<C, P>,
    queue: Arc<ActionQueue>,
    clock: Arc<ActivityClock>,
    timing: WorkerTiming,
) -> SyncHandle {
    let (ctrl_tx, ctrl_rx) = mpsc::channel(4);
    let (state_tx, state_rx) = watch::channel(TaskState::Idle);
    let worker = SyncWorker { dispatcher, queue, clock, timing };
    let join = tokio::spawn(worker.run(ctrl_rx, state_tx));
    SyncHandle { ctrl_tx, state_rx, join }
}
