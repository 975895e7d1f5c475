use std::path::Path;

/// What a local path currently is, as far as syncing cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Directory,
    Missing,
}

pub trait FsProbe: Send + Sync + 'static {
    fn kind(&self, path: &Path) -> PathKind;
}

/// Probe backed by the local filesystem. Follows symlinks; sockets, fifos
/// and device nodes report [`PathKind::Missing`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FsProbe for LocalFs {
    fn kind(&self, path: &Path) -> PathKind {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => PathKind::File,
            Ok(meta) if meta.is_dir() => PathKind::Directory,
            _ => PathKind::Missing,
        }
    }
}
