//! Configuration structs, defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";
const APP_DIR: &str = "shadow-walker";

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Bridge and server addressing.
    pub network: NetworkConfig,
    /// Worker polling and queue diagnostics.
    pub client: ClientConfig,
    /// Identity announced at login.
    pub profile: ProfileConfig,
    /// Logging.
    pub debug: DebugConfig,
}

/// Where the bridge listens and which server it should reach.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Host of the local bridge process.
    pub local_host: String,
    /// Port of the local bridge process.
    pub local_port: u16,
    /// `host:port` of the game server, forwarded in the handshake.
    pub remote_url: String,
    /// Largest accepted frame, in bytes after the length field.
    pub max_frame_size: u32,
    /// Disable Nagle's algorithm on the bridge socket.
    pub tcp_nodelay: bool,
    /// Send TCP keepalive packets on the bridge socket.
    pub keepalive: bool,
    /// Idle seconds before the first keepalive packet.
    pub keepalive_idle_secs: u64,
    /// Seconds between keepalive packets.
    pub keepalive_interval_secs: u64,
}

/// Worker behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Polling interval of the state machine and workers, in milliseconds.
    pub spin_interval_ms: u64,
    /// Queue length at which a backlog warning is logged. 0 disables it.
    pub queue_warning_level: usize,
}

/// Player identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProfileConfig {
    /// Display name. Letters, digits and underscores only.
    pub username: String,
    /// Stable identity sent at login.
    pub uuid: [u8; 16],
    /// Whether to announce cheats as enabled.
    pub cheated: bool,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            local_host: "127.0.0.1".to_string(),
            local_port: 6172,
            remote_url: "127.0.0.1:26676".to_string(),
            max_frame_size: 1 << 20,
            tcp_nodelay: true,
            keepalive: false,
            keepalive_idle_secs: 60,
            keepalive_interval_secs: 10,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            spin_interval_ms: 10,
            queue_warning_level: 1024,
        }
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            username: "ShadowWalker".to_string(),
            uuid: [0; 16],
            cheated: false,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Per-user config directory, e.g. `~/.config/shadow-walker` on Linux.
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or(ConfigError::NoConfigDir)
}

// --- Load / Save ---

impl Config {
    /// Load `config.ron` from `config_dir`, writing a default one if absent.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        if path.exists() {
            let config = Self::read(&path)?;
            log::info!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", path.display());
            Ok(config)
        }
    }

    /// Write this config to `config_dir/config.ron`, creating the directory.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::WriteError {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new().depth_limit(2);
        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&path, serialized)
            .map_err(|source| ConfigError::WriteError { path, source })
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&contents).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }
}
