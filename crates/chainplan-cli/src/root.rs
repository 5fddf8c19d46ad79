use std::path::{Path, PathBuf};

/// Resolve the project root.
///
/// Priority:
/// 1. `--root` flag / `CHAINPLAN_ROOT` env var (passed in as `explicit`)
/// 2. Nearest ancestor of the cwd containing `.chainplan/`
/// 3. Nearest ancestor of the cwd containing `.git/`
/// 4. The cwd itself
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_root(&cwd)
}

fn find_root(start: &Path) -> PathBuf {
    [".chainplan", ".git"]
        .iter()
        .find_map(|marker| {
            start
                .ancestors()
                .find(|dir| dir.join(marker).is_dir())
                .map(Path::to_path_buf)
        })
        .unwrap_or_else(|| start.to_path_buf())
}
