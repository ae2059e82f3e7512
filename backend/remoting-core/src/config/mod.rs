use crate::WORKING_DIRECTORY_NAME;
use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "remoting.json";
const CONFIG_VERSION: u32 = 1;

const MAX_STARTUP_TIMEOUT_MS: u64 = 600_000;
const MAX_PROBE_INTERVAL_MS: u64 = 1_000;

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Launch this executable instead of the embedded worker.
    pub executable: Option<PathBuf>,

    /// Where an embedded worker is materialized.
    pub working_directory: Option<PathBuf>,

    /// Socket to use verbatim. Without it the well-known path is used when
    /// free and a random temp path otherwise.
    pub socket_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimingConfig {
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,

    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,

    /// Per read/write deadline on every worker connection.
    #[serde(default)]
    pub call_timeout_ms: Option<u64>,

    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            startup_timeout_ms: default_startup_timeout_ms(),
            probe_interval_ms: default_probe_interval_ms(),
            call_timeout_ms: None,
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl TimingConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemotingConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub worker: WorkerConfig,

    #[serde(default)]
    pub timing: TimingConfig,
}

impl Default for RemotingConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            worker: WorkerConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_startup_timeout_ms() -> u64 {
    5_000
}
fn default_probe_interval_ms() -> u64 {
    10
}
fn default_shutdown_grace_ms() -> u64 {
    2_000
}

// ============================================
// IMPLEMENTATION
// ============================================

impl RemotingConfig {
    /// Load config from {config_dir}/remoting.json.
    ///
    /// A missing file yields the defaults. A file that exists but cannot be
    /// read, parsed or validated is an error.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read config file: {}", e);
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config: RemotingConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON: {}", e);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/remoting.json using temp file + rename.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{}.tmp", CONFIG_FILE_NAME));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first offending
    /// field.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: String| ConfigError::ValidationError {
            location: ErrorLocation::from(Location::caller()),
            field,
            reason,
        };

        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(invalid(
                "version",
                format!("{} (expected 1-{CONFIG_VERSION})", self.version),
            ));
        }

        let timing = &self.timing;

        if timing.startup_timeout_ms == 0 || timing.startup_timeout_ms > MAX_STARTUP_TIMEOUT_MS {
            return Err(invalid(
                "timing.startup_timeout_ms",
                format!(
                    "{} (must be 1-{MAX_STARTUP_TIMEOUT_MS})",
                    timing.startup_timeout_ms
                ),
            ));
        }

        if timing.probe_interval_ms == 0 || timing.probe_interval_ms > MAX_PROBE_INTERVAL_MS {
            return Err(invalid(
                "timing.probe_interval_ms",
                format!(
                    "{} (must be 1-{MAX_PROBE_INTERVAL_MS})",
                    timing.probe_interval_ms
                ),
            ));
        }

        if timing.probe_interval_ms > timing.startup_timeout_ms {
            return Err(invalid(
                "timing.probe_interval_ms",
                format!(
                    "{} exceeds startup timeout {}",
                    timing.probe_interval_ms, timing.startup_timeout_ms
                ),
            ));
        }

        if timing.call_timeout_ms == Some(0) {
            return Err(invalid(
                "timing.call_timeout_ms",
                "0 (omit the field to disable the deadline)".to_string(),
            ));
        }

        if let Some(socket) = &self.worker.socket_path {
            if socket.as_os_str().is_empty() {
                return Err(invalid(
                    "worker.socket_path",
                    "cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Where embedded workers are installed when no directory is configured.
    pub fn working_directory(&self) -> PathBuf {
        self.worker.working_directory.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(WORKING_DIRECTORY_NAME)
        })
    }
}
