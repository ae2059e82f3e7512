use crate::error::RemotingError;
use crate::supervisor::endpoint::EmbeddedWorker;

use common::ErrorLocation;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::panic::Location;
use std::path::{Path, PathBuf};

use log::{debug, info};
use uuid::Uuid;

const EXECUTABLE_MODE: u32 = 0o755;

/// Resolve the executable to launch for an embedded worker.
///
/// A development-tree copy wins when present. Otherwise the embedded bytes
/// are written to `working_directory` and marked executable. An identical
/// file already there is reused untouched, which keeps a worker that another
/// session is running from being rewritten underneath it.
///
/// # Errors
///
/// Returns [`RemotingError::Install`] if the directory, file or permission
/// change cannot be made.
#[track_caller]
pub fn install_executable(
    worker: &EmbeddedWorker,
    working_directory: &Path,
) -> Result<PathBuf, RemotingError> {
    if let Some(dev_path) = worker.dev_tree_path() {
        debug!("Using development worker at {}", dev_path.display());
        return Ok(dev_path);
    }

    let location = ErrorLocation::from(Location::caller());
    let install_error = |message: &str, path: &Path, source| RemotingError::Install {
        message: message.to_string(),
        path: path.to_path_buf(),
        location,
        source,
    };

    fs::create_dir_all(working_directory)
        .map_err(|e| install_error("Failed to create working directory", working_directory, e))?;

    let target = working_directory.join(worker.file_name());

    if fs::read(&target).is_ok_and(|existing| existing == worker.bytes) {
        debug!("Worker already installed at {}", target.display());
        return Ok(target);
    }

    // Write beside the target and rename so a half-written file is never
    // launched.
    let staging = working_directory.join(format!(".{}.{}", worker.file_name(), Uuid::new_v4()));

    fs::write(&staging, worker.bytes)
        .map_err(|e| install_error("Failed to write worker executable", &staging, e))?;

    fs::set_permissions(&staging, fs::Permissions::from_mode(EXECUTABLE_MODE))
        .map_err(|e| install_error("Failed to mark worker executable", &staging, e))?;

    fs::rename(&staging, &target).map_err(|e| {
        let _ = fs::remove_file(&staging);
        install_error("Failed to move worker executable into place", &target, e)
    })?;

    info!(
        "Installed worker executable ({} bytes) at {}",
        worker.bytes.len(),
        target.display()
    );
    Ok(target)
}
