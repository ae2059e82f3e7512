use crate::{DEFAULT_SOCKET_PATH, SOCKET_FILE_PREFIX};

use std::env::temp_dir;
use std::path::{Path, PathBuf};

use log::debug;
use uuid::Uuid;

/// Where the worker executable comes from.
#[derive(Debug, Clone)]
pub enum WorkerExecutable {
    /// An executable already on disk, used as is.
    Path(PathBuf),

    /// A binary shipped inside the host, materialized on first launch.
    Embedded(EmbeddedWorker),
}

/// A worker binary carried as bytes by the host program.
///
/// The host typically obtains `bytes` with `include_bytes!`. When a file with
/// the platform name exists under `dev_tree_dir`, that file is launched
/// instead so a locally rebuilt worker can be iterated on without rebuilding
/// the host.
#[derive(Debug, Clone)]
pub struct EmbeddedWorker {
    pub base_name: &'static str,
    pub bytes: &'static [u8],
    pub dev_tree_dir: Option<PathBuf>,
}

impl EmbeddedWorker {
    pub fn new(base_name: &'static str, bytes: &'static [u8]) -> Self {
        Self {
            base_name,
            bytes,
            dev_tree_dir: None,
        }
    }

    pub fn with_dev_tree_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dev_tree_dir = Some(dir.into());
        self
    }

    /// File name of the binary for the running platform.
    pub fn file_name(&self) -> String {
        platform_executable_name(self.base_name)
    }

    /// Development-tree copy of the worker, if one exists.
    pub fn dev_tree_path(&self) -> Option<PathBuf> {
        let dir = self.dev_tree_dir.as_ref()?;
        let candidate = dir.join(self.file_name());
        candidate.is_file().then_some(candidate)
    }
}

/// Append the platform suffix the worker resources are published under.
pub fn platform_executable_name(base_name: &str) -> String {
    if cfg!(target_os = "macos") {
        format!("{base_name}.osx")
    } else {
        format!("{base_name}.linux")
    }
}

/// Pick the rendezvous socket for a new session.
///
/// The well-known `preferred` path is used when nothing occupies it;
/// otherwise another session may own it, so a random path under the temp
/// directory is chosen instead.
pub fn choose_socket_path(preferred: &Path) -> PathBuf {
    if !preferred.exists() {
        return preferred.to_path_buf();
    }

    let fallback = temp_dir().join(format!("{SOCKET_FILE_PREFIX}-{}.sock", Uuid::new_v4()));
    debug!(
        "Socket {} already in use, falling back to {}",
        preferred.display(),
        fallback.display()
    );
    fallback
}

/// The default socket choice for sessions that do not configure one.
pub fn default_socket_path() -> PathBuf {
    choose_socket_path(Path::new(DEFAULT_SOCKET_PATH))
}
