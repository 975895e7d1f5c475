//! Core library for mpsync – mirrors a local folder onto a MicroPython board.
//!
//! Filesystem notifications enter through [`EventIntake`] into the
//! [`ActionQueue`]. Once the [`DebounceGate`] sees a quiet period, the
//! [`Dispatcher`] opens one session through the [`ConnectionManager`],
//! replays every queued event in arrival order, and closes the session.

mod config;
mod connection;
mod dispatcher;
mod error;
mod event;
mod filter;
mod gate;
mod intake;
mod probe;
mod queue;
mod remote;
mod synchronizer;
mod task;
mod utils;
mod watcher;

pub use config::{default_port, Pattern, SyncConfig};
pub use connection::{ConnectionManager, Session, SessionState};
pub use dispatcher::{translate, BatchOutcome, BatchReport, Dispatcher, Translation};
pub use error::{ConfigError, ConnectError, SyncError};
pub use event::{ChangeEvent, ChangeKind};
pub use filter::PathFilter;
pub use gate::DebounceGate;
pub use intake::EventIntake;
pub use probe::{FsProbe, LocalFs, PathKind};
pub use queue::{ActionQueue, ActivityClock};
pub use remote::{RemoteClient, RemoteOp};
pub use synchronizer::Synchronizer;
pub use task::{spawn_worker, SyncHandle, TaskCommand, TaskState, WorkerTiming};
pub use utils::remote_path;
pub use watcher::{queue_existing_files, FolderWatcher};
