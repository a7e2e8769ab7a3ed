//! Launcher configuration with validation and versioning.

use crate::server::{LauncherError, LauncherResult};

use std::panic::Location;
use std::path::Path;

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};

/// Configuration version for migration support.
/// Increment when adding new fields or changing structure.
pub const CONFIG_VERSION: u32 = 1;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8501;
const DEFAULT_PORT_RANGE_START: u16 = 8501;
const DEFAULT_PORT_RANGE_END: u16 = 8599;
const DEFAULT_MANIFEST_URL: &str = "https://releases.appshell.dev/latest.json";
const DEFAULT_UPDATE_TIMEOUT_SECS: u64 = 3;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;
const DEFAULT_READY_GRACE_MS: u64 = 3000;

const MIN_PORT: u16 = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Config file format version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Server settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Update check settings
    #[serde(default)]
    pub update: UpdateSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Startup/shutdown timeout settings
    #[serde(default)]
    pub timeouts: TimeoutSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host to bind to (always 127.0.0.1 for security)
    #[serde(default = "default_host")]
    pub host: String,

    /// Preferred port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Port range for fallback if primary port unavailable
    #[serde(default = "default_port_range")]
    pub port_range: (u16, u16),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSettings {
    /// Whether to check for a newer release at startup
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// URL of the remote version manifest
    #[serde(default = "default_manifest_url")]
    pub manifest_url: String,

    /// Timeout for the manifest fetch (seconds)
    #[serde(default = "default_update_timeout")]
    pub check_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log directory (relative to data directory)
    #[serde(default = "default_log_dir")]
    pub directory: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutSettings {
    /// How long to poll for server readiness before degrading (seconds)
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_secs: u64,

    /// Graceful shutdown timeout (seconds)
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Fixed grace delay used if the readiness probe never answers (ms)
    #[serde(default = "default_ready_grace")]
    pub ready_grace_ms: u64,
}

// === Default Value Functions ===

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_host() -> String {
    DEFAULT_HOST.into()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_port_range() -> (u16, u16) {
    (DEFAULT_PORT_RANGE_START, DEFAULT_PORT_RANGE_END)
}
fn default_true() -> bool {
    true
}
fn default_manifest_url() -> String {
    DEFAULT_MANIFEST_URL.into()
}
fn default_update_timeout() -> u64 {
    DEFAULT_UPDATE_TIMEOUT_SECS
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.into()
}
fn default_log_dir() -> String {
    DEFAULT_LOG_DIR.into()
}
fn default_startup_timeout() -> u64 {
    DEFAULT_STARTUP_TIMEOUT_SECS
}
fn default_shutdown_timeout() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_SECS
}
fn default_ready_grace() -> u64 {
    DEFAULT_READY_GRACE_MS
}

// === Default Implementations ===

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: ServerSettings::default(),
            update: UpdateSettings::default(),
            logging: LoggingSettings::default(),
            timeouts: TimeoutSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            port_range: default_port_range(),
        }
    }
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            manifest_url: default_manifest_url(),
            check_timeout_secs: default_update_timeout(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: default_log_dir(),
        }
    }
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            startup_timeout_secs: default_startup_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            ready_grace_ms: default_ready_grace(),
        }
    }
}

// === Configuration Operations ===

impl LauncherConfig {
    /// Load config from file, creating default if not exists.
    pub fn load_or_create(data_dir: &Path) -> LauncherResult<Self> {
        let config_path = data_dir.join("config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let mut config: Self =
                toml::from_str(&content).map_err(|e| LauncherError::ConfigInvalid {
                    message: e.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            // Migrate if needed
            if config.version < CONFIG_VERSION {
                config = Self::migrate(config)?;
                config.save(data_dir)?;
            }

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save(data_dir)?;
            Ok(config)
        }
    }

    /// Save config to file atomically.
    ///
    /// Uses write-to-temp-then-rename pattern to prevent
    /// partial writes if the process is interrupted.
    pub fn save(&self, data_dir: &Path) -> LauncherResult<()> {
        let config_path = data_dir.join("config.toml");
        let content = toml::to_string_pretty(self).map_err(|e| LauncherError::ConfigInvalid {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        // Write atomically via temp file
        let temp_path = config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &config_path)?;

        Ok(())
    }

    /// Migrate config from older version.
    fn migrate(mut config: Self) -> LauncherResult<Self> {
        // Version 0 -> 1: Add update and timeout settings
        if config.version == 0 {
            config.update = UpdateSettings::default();
            config.timeouts = TimeoutSettings::default();
            config.version = 1;
        }

        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> LauncherResult<()> {
        // Port must be unprivileged
        if self.server.port < MIN_PORT {
            return Err(LauncherError::ConfigInvalid {
                message: format!("Port must be >= {} (unprivileged)", MIN_PORT),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        // Port range must be ordered and unprivileged too
        if self.server.port_range.0 > self.server.port_range.1 {
            return Err(LauncherError::ConfigInvalid {
                message: "Invalid port range: start > end".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        if self.server.port_range.0 < MIN_PORT {
            return Err(LauncherError::ConfigInvalid {
                message: format!("Port range must start >= {} (unprivileged)", MIN_PORT),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        // Timeouts must all be positive
        if self.timeouts.startup_timeout_secs == 0 {
            return Err(LauncherError::ConfigInvalid {
                message: "Startup timeout must be > 0".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        if self.timeouts.shutdown_timeout_secs == 0 {
            return Err(LauncherError::ConfigInvalid {
                message: "Shutdown timeout must be > 0".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        if self.update.check_timeout_secs == 0 {
            return Err(LauncherError::ConfigInvalid {
                message: "Update check timeout must be > 0".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        // Host must be localhost for security
        if self.server.host != DEFAULT_HOST && self.server.host != "localhost" {
            return Err(LauncherError::ConfigInvalid {
                message: format!("Host must be {DEFAULT_HOST} or localhost for security"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        // Update check must have a manifest URL when enabled
        if self.update.enabled && self.update.manifest_url.is_empty() {
            return Err(LauncherError::ConfigInvalid {
                message: "Update check enabled but manifest_url is empty".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(())
    }
}
