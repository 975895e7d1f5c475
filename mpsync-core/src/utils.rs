use std::path::{Component, Path};

/// Map a local path under `root` onto the board: strip the root prefix and
/// join the remaining components with `/` below `remote_root`.
///
/// Returns `None` for paths outside the root and for the root itself.
pub fn remote_path(root: &Path, remote_root: &str, local: &Path) -> Option<String> {
    let rel = local.strip_prefix(root).ok()?;
    let mut out = String::from(remote_root.trim_end_matches('/'));
    if !out.starts_with('/') {
        out.insert(0, '/');
    }
    let mut pushed = false;
    for component in rel.components() {
        match component {
            Component::Normal(name) => {
                if !out.ends_with('/') {
                    out.push('/');
                }
                out.push_str(&name.to_string_lossy());
                pushed = true;
            }
            Component::CurDir => {}
            _ => return None,
        }
    }
    pushed.then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn strips_root_prefix() {
        let root = PathBuf::from("/home/me/proj");
        assert_eq!(
            remote_path(&root, "/", &root.join("a").join("b.txt")).as_deref(),
            Some("/a/b.txt")
        );
        assert_eq!(remote_path(&root, "/", &root.join("main.py")).as_deref(), Some("/main.py"));
    }

    #[test]
    fn relative_root() {
        let root = PathBuf::from("root");
        assert_eq!(
            remote_path(&root, "/", Path::new("root/a/b.txt")).as_deref(),
            Some("/a/b.txt")
        );
    }

    #[test]
    fn honors_remote_root() {
        let root = PathBuf::from("/src");
        assert_eq!(remote_path(&root, "/lib/", Path::new("/src/x.py")).as_deref(), Some("/lib/x.py"));
        assert_eq!(remote_path(&root, "flash", Path::new("/src/x.py")).as_deref(), Some("/flash/x.py"));
    }

    #[test]
    fn rejects_outside_and_root() {
        let root = PathBuf::from("/src");
        assert_eq!(remote_path(&root, "/", Path::new("/other/x.py")), None);
        assert_eq!(remote_path(&root, "/", Path::new("/src")), None);
        // prefix match is per component, not per character
        assert_eq!(remote_path(&root, "/", Path::new("/srcx/y.py")), None);
    }
}
