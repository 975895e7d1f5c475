//! Turns queued change events into remote operations, one batch per session.

use crate::connection::{ConnectionManager, Session};
use crate::error::ConnectError;
use crate::event::{ChangeEvent, ChangeKind};
use crate::probe::{FsProbe, PathKind};
use crate::queue::ActionQueue;
use crate::remote::{RemoteClient, RemoteOp};
use crate::utils::remote_path;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What a single event turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    /// Operations to run, in order.
    Ops(Vec<RemoteOp>),
    /// Nothing to do, e.g. a modify on a path that no longer is a file.
    Skip,
    /// Cannot be mirrored; logged once and dropped.
    Unsupported(&'static str),
}

/// Pure mapping from an event to remote operations, given the current
/// kind of the paths involved.
pub fn translate(
    event: &ChangeEvent,
    probe: &impl FsProbe,
    root: &Path,
    remote_root: &str,
) -> Translation {
    let Some(remote) = remote_path(root, remote_root, &event.path) else {
        return Translation::Unsupported("path is outside the watched folder");
    };
    match event.kind {
        ChangeKind::Create => match probe.kind(&event.path) {
            PathKind::File => Translation::Ops(vec![RemoteOp::Upload { local: event.path.clone(), remote }]),
            PathKind::Directory => Translation::Ops(vec![RemoteOp::MkDir { remote }]),
            PathKind::Missing => Translation::Skip,
        },
        ChangeKind::Delete => Translation::Ops(vec![RemoteOp::Remove { remote }]),
        ChangeKind::Modify => match probe.kind(&event.path) {
            PathKind::File => Translation::Ops(vec![RemoteOp::Upload { local: event.path.clone(), remote }]),
            PathKind::Directory | PathKind::Missing => Translation::Skip,
        },
        ChangeKind::Move => {
            let Some(dest) = event.dest_path.as_ref() else {
                return Translation::Unsupported("move without a destination");
            };
            match probe.kind(dest) {
                PathKind::Directory => Translation::Unsupported("moving folders is not supported"),
                PathKind::File => match remote_path(root, remote_root, dest) {
                    Some(dest_remote) => Translation::Ops(vec![
                        RemoteOp::Remove { remote },
                        RemoteOp::Upload { local: dest.clone(), remote: dest_remote },
                    ]),
                    None => Translation::Ops(vec![RemoteOp::Remove { remote }]),
                },
                // moved away again before the batch ran; only the old copy is stale
                PathKind::Missing => Translation::Ops(vec![RemoteOp::Remove { remote }]),
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    /// Events whose operations all succeeded.
    pub applied: usize,
    /// Events with at least one failed operation. Not re-queued.
    pub failed: usize,
    pub skipped: usize,
    pub unsupported: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.applied + self.failed + self.skipped + self.unsupported
    }
}

#[derive(Debug)]
pub enum BatchOutcome {
    /// Board unreachable; the queue was not touched.
    Deferred(ConnectError),
    Completed(BatchReport),
}

pub struct Dispatcher<C: RemoteClient, P: FsProbe> {
    root: PathBuf,
    remote_root: String,
    probe: P,
    connection: ConnectionManager<C>,
}

impl<C: RemoteClient, P: FsProbe> Dispatcher<C, P> {
    pub fn new(
        root: impl Into<PathBuf>,
        remote_root: impl Into<String>,
        probe: P,
        connection: ConnectionManager<C>,
    ) -> Self {
        Self { root: root.into(), remote_root: remote_root.into(), probe, connection }
    }

    pub fn connection(&self) -> &ConnectionManager<C> {
        &self.connection
    }

    /// Run one connect / drain / disconnect cycle.
    ///
    /// Drains the events that were queued when the session came up; anything
    /// arriving meanwhile waits for the next cycle.
    pub async fn run_batch(&mut self, queue: &ActionQueue) -> BatchOutcome {
        let session = match self.connection.acquire().await {
            Ok(session) => session,
            Err(e) => return BatchOutcome::Deferred(e),
        };

        let mut report = BatchReport::default();
        let pending = queue.len();
        debug!(pending, "draining queue");
        for _ in 0..pending {
            let Some(event) = queue.pop_front() else { break };
            debug!(kind = ?event.kind, path = %event.path.display(), "performing");
            match translate(&event, &self.probe, &self.root, &self.remote_root) {
                Translation::Ops(ops) => {
                    if apply_ops(&session, ops).await {
                        report.applied += 1;
                    } else {
                        report.failed += 1;
                    }
                }
                Translation::Skip => {
                    debug!(path = %event.path.display(), "nothing to do");
                    report.skipped += 1;
                }
                Translation::Unsupported(reason) => {
                    warn!(path = %event.target().display(), "{reason}");
                    report.unsupported += 1;
                }
            }
        }
        drop(session);

        self.connection.release().await;
        debug!(?report, "batch done");
        BatchOutcome::Completed(report)
    }
}

/// Run ops strictly in order. A failure is logged and the rest still run.
async fn apply_ops<C: RemoteClient>(session: &Session<'_, C>, ops: Vec<RemoteOp>) -> bool {
    let mut ok = true;
    for op in ops {
        let result = match &op {
            RemoteOp::Upload { local, remote } => {
                info!("Copying {remote}");
                session.put(local, remote).await
            }
            RemoteOp::MkDir { remote } => {
                info!("Creating folder {remote}");
                session.mkdir(remote).await
            }
            RemoteOp::Remove { remote } => {
                info!("Deleting {remote}");
                session.remove(remote).await
            }
        };
        if let Err(e) = result {
            debug!(?op, error = %e, "remote operation failed");
            ok = false;
        }
    }
    ok
}
