//! Per-user directory resolution for skilldeck.
//!
//! Two directories matter: the *state dir* (publish ledger, under the
//! platform-appropriate application-state location) and the *home dir*
//! (anchor for the four skill platform roots). Both can be overridden,
//! which tests and the `--state-dir` CLI flag rely on.

use std::{
    path::PathBuf,
    sync::RwLock,
};

static STATE_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);
static HOME_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Returns the per-user application-state directory.
///
/// Default: `directories::ProjectDirs` data dir for "skilldeck"
/// (e.g. `~/.local/share/skilldeck` on Linux), falling back to
/// `./.skilldeck` when no home directory can be resolved.
pub fn state_dir() -> PathBuf {
    if let Ok(guard) = STATE_DIR_OVERRIDE.read()
        && let Some(dir) = guard.as_ref()
    {
        return dir.clone();
    }
    if let Some(dirs) = directories::ProjectDirs::from("", "", "skilldeck") {
        return dirs.data_dir().to_path_buf();
    }
    tracing::warn!("could not resolve a user data directory, using ./.skilldeck");
    PathBuf::from(".skilldeck")
}

/// Override the state directory (tests, `--state-dir`).
pub fn set_state_dir(dir: PathBuf) {
    if let Ok(mut guard) = STATE_DIR_OVERRIDE.write() {
        *guard = Some(dir);
    }
}

/// Clear the state directory override.
pub fn clear_state_dir() {
    if let Ok(mut guard) = STATE_DIR_OVERRIDE.write() {
        *guard = None;
    }
}

/// Returns the home directory the platform skill roots hang off.
///
/// Falls back to `.` when the environment provides no home at all.
pub fn home_dir() -> PathBuf {
    if let Ok(guard) = HOME_DIR_OVERRIDE.read()
        && let Some(dir) = guard.as_ref()
    {
        return dir.clone();
    }
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Override the home directory used for platform root resolution.
pub fn set_home_dir(dir: PathBuf) {
    if let Ok(mut guard) = HOME_DIR_OVERRIDE.write() {
        *guard = Some(dir);
    }
}

/// Clear the home directory override.
pub fn clear_home_dir() {
    if let Ok(mut guard) = HOME_DIR_OVERRIDE.write() {
        *guard = None;
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_dir_override_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        set_state_dir(tmp.path().to_path_buf());
        assert_eq!(state_dir(), tmp.path());
        clear_state_dir();
        assert_ne!(state_dir(), tmp.path());
    }

    #[test]
    fn test_home_dir_override_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        set_home_dir(tmp.path().to_path_buf());
        assert_eq!(home_dir(), tmp.path());
        clear_home_dir();
    }
}
