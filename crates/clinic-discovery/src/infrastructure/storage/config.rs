//! TOML-based configuration for role election.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\ClinicDiscovery\config.toml`
//! - Linux:    `~/.config/clinicdiscovery/config.toml`
//! - macOS:    `~/Library/Application Support/ClinicDiscovery/config.toml`
//!
//! ```toml
//! [discovery]
//! bind_address = "0.0.0.0"
//! port = 8765
//! broadcast_address = "255.255.255.255"
//! beacon_period_ms = 3000
//! discovery_timeout_ms = 5000
//!
//! [server]
//! backend_port = 8000
//!
//! [logging]
//! log_level = "info"
//! ```
//!
//! Every field (and every section) has a serde default, so a missing file,
//! an empty file, and an older file without newer fields all load.
//!
//! The discovery values must match on every machine of the LAN or instances
//! will not find each other.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clinic_core::{DiscoveryTiming, BEACON_PERIOD, BROADCAST_ADDR, BROADCAST_PORT, DISCOVERY_TIMEOUT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::network::DiscoverySettings;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value parsed but is not usable (bad address, broken timing).
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Election parameters.  Must be identical across the LAN.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveryConfig {
    /// Local address the receive endpoint binds to.  `"0.0.0.0"` = all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// UDP port for beacons, used both to listen and as the beacon destination.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Destination address for beacons.
    #[serde(default = "default_broadcast_address")]
    pub broadcast_address: String,
    /// Interval between beacons while serving.
    #[serde(default = "default_beacon_period_ms")]
    pub beacon_period_ms: u64,
    /// How long to listen before electing this instance as server.
    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,
}

/// Settings for the backend this instance hosts when elected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// TCP port of the backend HTTP service, on the server and as seen by clients.
    #[serde(default = "default_backend_port")]
    pub backend_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    BROADCAST_PORT
}
fn default_broadcast_address() -> String {
    BROADCAST_ADDR.to_string()
}
fn default_beacon_period_ms() -> u64 {
    BEACON_PERIOD.as_millis() as u64
}
fn default_discovery_timeout_ms() -> u64 {
    DISCOVERY_TIMEOUT.as_millis() as u64
}
fn default_backend_port() -> u16 {
    8000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            broadcast_address: default_broadcast_address(),
            beacon_period_ms: default_beacon_period_ms(),
            discovery_timeout_ms: default_discovery_timeout_ms(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            backend_port: default_backend_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl DiscoveryConfig {
    /// Validates the section and converts it into coordinator settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unparsable addresses or a timing
    /// pair that violates the beacon-period < timeout rule.
    pub fn to_settings(&self) -> Result<DiscoverySettings, ConfigError> {
        let bind_ip = parse_ip("discovery.bind_address", &self.bind_address)?;
        let broadcast_ip = parse_ip("discovery.broadcast_address", &self.broadcast_address)?;
        let timing = DiscoveryTiming::new(
            Duration::from_millis(self.beacon_period_ms),
            Duration::from_millis(self.discovery_timeout_ms),
        )
        .map_err(|e| ConfigError::Invalid {
            field: "discovery.beacon_period_ms",
            reason: e.to_string(),
        })?;

        Ok(DiscoverySettings {
            listen_addr: SocketAddr::new(bind_ip, self.port),
            beacon_target: SocketAddr::new(broadcast_ip, self.port),
            timing,
        })
    }
}

fn parse_ip(field: &'static str, value: &str) -> Result<IpAddr, ConfigError> {
    value.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
        field,
        reason: format!("{value:?}: {e}"),
    })
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the platform config file.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory including the app subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("ClinicDiscovery"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("clinicdiscovery"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("ClinicDiscovery")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
