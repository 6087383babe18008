//! Q CLI binary discovery
//!
//! Resolution order: the `Q_BIN` environment override (its own failure is
//! distinct so a misconfigured override is not silently papered over by a
//! PATH hit), then PATH search for `amazonq`, then `q`.

use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::DetectError;

/// Environment variable naming the Q binary (name or path).
pub const Q_BIN_ENV: &str = "Q_BIN";

/// PATH candidates, in preference order.
const CANDIDATES: [&str; 2] = ["amazonq", "q"];

/// Locate the Q CLI binary for this process environment.
pub fn detect_q_cli() -> Result<PathBuf, DetectError> {
    let resolved = resolve(env::var_os(Q_BIN_ENV), env::var_os("PATH"))?;
    debug!(path = %resolved.display(), "resolved Q CLI binary");
    Ok(resolved)
}

/// Pure resolution over explicit override and PATH values.
fn resolve(
    override_bin: Option<OsString>,
    path_var: Option<OsString>,
) -> Result<PathBuf, DetectError> {
    if let Some(name) = override_bin.filter(|v| !v.is_empty()) {
        return lookup(Path::new(&name), path_var.as_deref())
            .ok_or(DetectError::OverrideNotFound);
    }

    CANDIDATES
        .iter()
        .find_map(|candidate| lookup(Path::new(candidate), path_var.as_deref()))
        .ok_or(DetectError::NotFound)
}

/// Resolve one name: explicit paths are taken as-is, bare names walk PATH.
fn lookup(name: &Path, path_var: Option<&OsStr>) -> Option<PathBuf> {
    if name.components().count() > 1 {
        return is_executable(name).then(|| name.to_path_buf());
    }

    env::split_paths(path_var?)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[cfg(unix)]
    fn make_executable(dir: &Path, name: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    fn path_var(dirs: &[&Path]) -> OsString {
        env::join_paths(dirs.iter().map(|d| d.to_path_buf())).unwrap()
    }

    #[test]
    #[cfg(unix)]
    fn override_wins_over_path_candidates() {
        let dir = tempfile::tempdir().unwrap();
        make_executable(dir.path(), "amazonq");
        let custom = make_executable(dir.path(), "my-q");

        let resolved = resolve(
            Some(custom.clone().into_os_string()),
            Some(path_var(&[dir.path()])),
        )
        .unwrap();
        assert_eq!(resolved, custom);
    }

    #[test]
    #[cfg(unix)]
    fn override_by_bare_name_searches_path() {
        let dir = tempfile::tempdir().unwrap();
        let custom = make_executable(dir.path(), "my-q");

        let resolved = resolve(
            Some(OsString::from("my-q")),
            Some(path_var(&[dir.path()])),
        )
        .unwrap();
        assert_eq!(resolved, custom);
    }

    #[test]
    fn unresolved_override_is_a_distinct_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve(
            Some(OsString::from("missing-q")),
            Some(dir.path().as_os_str().to_os_string()),
        )
        .unwrap_err();
        assert_eq!(err, DetectError::OverrideNotFound);
    }

    #[test]
    #[cfg(unix)]
    fn amazonq_is_preferred_over_q() {
        let dir = tempfile::tempdir().unwrap();
        let amazonq = make_executable(dir.path(), "amazonq");
        make_executable(dir.path(), "q");

        let resolved = resolve(None, Some(path_var(&[dir.path()]))).unwrap();
        assert_eq!(resolved, amazonq);
    }

    #[test]
    #[cfg(unix)]
    fn falls_back_to_q() {
        let dir = tempfile::tempdir().unwrap();
        let q = make_executable(dir.path(), "q");

        let resolved = resolve(None, Some(path_var(&[dir.path()]))).unwrap();
        assert_eq!(resolved, q);
    }

    #[test]
    #[cfg(unix)]
    fn non_executable_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("q"), "not a program").unwrap();

        let err = resolve(None, Some(path_var(&[dir.path()]))).unwrap_err();
        assert_eq!(err, DetectError::NotFound);
    }

    #[test]
    fn nothing_found_is_descriptive() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve(None, Some(dir.path().as_os_str().to_os_string())).unwrap_err();
        assert_eq!(err, DetectError::NotFound);
        assert!(err.to_string().contains("Q_BIN"));
    }

    #[test]
    fn empty_override_falls_through_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve(
            Some(OsString::new()),
            Some(dir.path().as_os_str().to_os_string()),
        )
        .unwrap_err();
        assert_eq!(err, DetectError::NotFound);
    }
}
