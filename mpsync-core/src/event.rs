use std::path::{Path, PathBuf};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Create,
    Delete,
    Modify,
    Move,
}

/// One raw filesystem notification, stamped at intake.
///
/// Immutable once queued; the dispatcher consumes each event exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: PathBuf,
    /// Only set for [`ChangeKind::Move`].
    pub dest_path: Option<PathBuf>,
    pub observed_at: Instant,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, path: PathBuf, observed_at: Instant) -> Self {
        Self { kind, path, dest_path: None, observed_at }
    }

    pub fn moved(from: PathBuf, to: PathBuf, observed_at: Instant) -> Self {
        Self { kind: ChangeKind::Move, path: from, dest_path: Some(to), observed_at }
    }

    /// The path whose current state decides the translation: the destination
    /// for moves, the event path otherwise.
    pub fn target(&self) -> &Path {
        match (&self.kind, &self.dest_path) {
            (ChangeKind::Move, Some(dest)) => dest,
            _ => &self.path,
        }
    }
}
