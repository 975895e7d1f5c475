//! Bridge from `notify` to [`EventIntake`].

use crate::filter::PathFilter;
use crate::intake::EventIntake;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error};
use walkdir::WalkDir;

/// How long a rename source waits for its destination half before it is
/// taken as a move out of the folder.
const RENAME_WINDOW: Duration = Duration::from_millis(100);

/// Keeps the OS watcher alive. Dropping it stops event delivery.
pub struct FolderWatcher {
    watcher: RecommendedWatcher,
    bridge: Arc<EventBridge>,
    sweeper: JoinHandle<()>,
    root: PathBuf,
}

impl FolderWatcher {
    /// Watch `root` recursively and feed every change into `intake`.
    /// Must be called inside a tokio runtime.
    pub fn start(root: &Path, intake: EventIntake, filter: PathFilter) -> notify::Result<Self> {
        let bridge = Arc::new(EventBridge::new(intake, filter));
        let handler = bridge.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => handler.forward(event),
                Err(e) => error!("watch error: {e}"),
            },
            notify::Config::default(),
        )?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        let sweeper = {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(RENAME_WINDOW);
                loop {
                    tick.tick().await;
                    bridge.expire(Instant::now());
                }
            })
        };
        debug!(root = %root.display(), "watching");
        Ok(Self { watcher, bridge, sweeper, root: root.to_path_buf() })
    }
}

impl Drop for FolderWatcher {
    fn drop(&mut self) {
        if let Err(e) = self.watcher.unwatch(&self.root) {
            debug!("unwatch {}: {e}", self.root.display());
        }
        self.sweeper.abort();
        self.bridge.flush();
    }
}

struct HeldRename {
    tracker: usize,
    path: PathBuf,
    seen: Instant,
}

/// Maps raw notifications onto intake calls.
///
/// The inotify backend reports a rename as `Name(From)`, `Name(To)` and
/// `Name(Both)` sharing one tracker. Only `Both` is forwarded, as a move.
/// A `From` is held until its partner shows up; one that never does
/// becomes a delete once [`RENAME_WINDOW`] passes or another event arrives.
pub(crate) struct EventBridge {
    intake: EventIntake,
    filter: PathFilter,
    held: Mutex<VecDeque<HeldRename>>,
}

impl EventBridge {
    pub(crate) fn new(intake: EventIntake, filter: PathFilter) -> Self {
        Self { intake, filter, held: Mutex::new(VecDeque::new()) }
    }

    fn held(&self) -> MutexGuard<'_, VecDeque<HeldRename>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn forward(&self, event: Event) {
        let tracker = event.tracker();
        let mut paths = event.paths.into_iter();
        match event.kind {
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => match (tracker, paths.next()) {
                (Some(tracker), Some(path)) => {
                    self.held().push_back(HeldRename { tracker, path, seen: Instant::now() });
                }
                (None, Some(path)) => {
                    self.flush();
                    self.delete(path);
                }
                _ => {}
            },
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                // the paired Both follows
                if tracker.is_some_and(|t| self.held().iter().any(|h| h.tracker == t)) {
                    return;
                }
                self.flush();
                paths.filter(|p| self.filter.check(p)).for_each(|p| self.intake.on_create(p));
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                if let Some(t) = tracker {
                    self.held().retain(|h| h.tracker != t);
                }
                self.flush();
                if let (Some(from), Some(to)) = (paths.next(), paths.next()) {
                    if self.filter.check(&from) || self.filter.check(&to) {
                        self.intake.on_move(from, to);
                    }
                }
            }
            EventKind::Create(_) => {
                self.flush();
                paths.filter(|p| self.filter.check(p)).for_each(|p| self.intake.on_create(p));
            }
            EventKind::Modify(_) => {
                self.flush();
                paths.filter(|p| self.filter.check(p)).for_each(|p| self.intake.on_modify(p));
            }
            EventKind::Remove(_) => {
                self.flush();
                paths.for_each(|p| self.delete(p));
            }
            EventKind::Access(_) | EventKind::Any | EventKind::Other => {}
        }
    }

    /// Turn rename sources older than the window into deletes.
    pub(crate) fn expire(&self, now: Instant) {
        let expired: Vec<PathBuf> = {
            let mut held = self.held();
            let mut out = Vec::new();
            while held.front().is_some_and(|h| now.duration_since(h.seen) >= RENAME_WINDOW) {
                if let Some(h) = held.pop_front() {
                    out.push(h.path);
                }
            }
            out
        };
        expired.into_iter().for_each(|p| self.delete(p));
    }

    /// Turn every held rename source into a delete.
    pub(crate) fn flush(&self) {
        let held: Vec<HeldRename> = self.held().drain(..).collect();
        held.into_iter().for_each(|h| self.delete(h.path));
    }

    fn delete(&self, path: PathBuf) {
        if self.filter.check(&path) {
            self.intake.on_delete(path);
        }
    }
}

/// Queue a modify for every existing regular file below `root`.
pub fn queue_existing_files(root: &Path, filter: &PathFilter, intake: &EventIntake) -> usize {
    let mut queued = 0;
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file() && filter.check(entry.path()) {
            intake.on_modify(entry.into_path());
            queued += 1;
        }
    }
    queued
}
