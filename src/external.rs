use nix::unistd::{AccessFlags, access};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Resolve a command name to an executable file the way a typical shell would.
///
/// Behavior:
/// - Name containing a `/` (absolute, `./foo`, `bin/foo`): returned as-is if it
///   names an executable file; `search_paths` is not consulted.
/// - Bare name: each directory of `search_paths` (PATH) is tried in order and
///   the first executable `<dir>/<name>` wins. Empty entries are skipped.
/// - Empty name: `None`.
///
/// A file that exists but lacks execute permission never matches.
pub fn find_command_path(search_paths: &OsStr, name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    if name.contains('/') {
        let path = Path::new(name);
        return is_executable(path).then(|| path.to_path_buf());
    }
    find_in_path(search_paths, OsStr::new(name))
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(cmd))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    path.is_file() && access(path, AccessFlags::X_OK).is_ok()
}
