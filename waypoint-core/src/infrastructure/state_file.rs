//! Durable coordinator state, kept in a single JSON file.
//!
//! Persistence is deliberately not atomic across an emission: the existing
//! file is renamed to `<path>_old` *before* the milestone is broadcast and
//! the fresh state is written only *after* the broadcast succeeded. A crash
//! in between leaves only the `_old` file behind, which operators must
//! resolve by hand before restarting; re-issuing from stale state would
//! double-issue an index.

use crate::domain::State;
use crate::foundation::{CoordinatorError, Result, STALE_STATE_FILE_SUFFIX};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub fn state_file_exists(path: &Path) -> bool {
    path.exists()
}

/// Path the state file is renamed to while an emission is in flight.
pub fn stale_state_path(path: &Path) -> PathBuf {
    let mut stale = path.as_os_str().to_os_string();
    stale.push(STALE_STATE_FILE_SUFFIX);
    PathBuf::from(stale)
}

pub fn load_state(path: &Path) -> Result<State> {
    if !path.exists() {
        return Err(CoordinatorError::StateFileNotFound { path: path.display().to_string() });
    }
    let bytes = fs::read(path)
        .map_err(|err| CoordinatorError::StateFileError { operation: "read".to_string(), details: err.to_string() })?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Writes the state file with owner-only permissions.
pub fn write_state(path: &Path, state: &State) -> Result<()> {
    let json = serde_json::to_vec_pretty(state)?;

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .map_err(|err| CoordinatorError::StateFileError { operation: "open".to_string(), details: err.to_string() })?;
    file.write_all(&json)
        .map_err(|err| CoordinatorError::StateFileError { operation: "write".to_string(), details: err.to_string() })?;
    file.sync_all()
        .map_err(|err| CoordinatorError::StateFileError { operation: "sync".to_string(), details: err.to_string() })?;
    Ok(())
}

/// Renames the state file to its `_old` form. A missing state file is fine
/// (first emission after bootstrap).
pub fn mark_state_stale(path: &Path) -> Result<()> {
    match fs::rename(path, stale_state_path(path)) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(CoordinatorError::StateFileError { operation: "rename".to_string(), details: err.to_string() }),
    }
}
