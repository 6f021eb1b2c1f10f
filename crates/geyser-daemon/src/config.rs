//! Configuration file management.

use std::path::PathBuf;

use geyser_types::Address;
use serde::{Deserialize, Serialize};

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Pool parameters, applied only when the database holds no pool yet.
    #[serde(default)]
    pub pool: PoolSettings,
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// RPC settings.
    #[serde(default)]
    pub rpc: RpcConfig,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Label of the staked token.
    #[serde(default = "default_staking_asset")]
    pub staking_asset: String,
    /// Label of the reward token.
    #[serde(default = "default_reward_asset")]
    pub reward_asset: String,
    /// Multiplier at zero duration, in percent.
    #[serde(default = "default_floor_pct")]
    pub floor_pct: u32,
    /// Multiplier once the ramp completes, in percent.
    #[serde(default = "default_ceiling_pct")]
    pub ceiling_pct: u32,
    /// Seconds to go from floor to ceiling.
    #[serde(default = "default_ramp_duration")]
    pub ramp_duration_secs: u64,
    /// Labels of secondary reward tokens registered at creation.
    #[serde(default)]
    pub bonus_assets: Vec<String>,
    /// Hex-encoded admin address.
    #[serde(default)]
    pub admin: String,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// RPC configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Socket file name inside the data directory.
    #[serde(default = "default_socket_name")]
    pub socket_name: String,
    /// Per-subscriber event buffer.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Enable the `dev_*` commands.
    #[serde(default)]
    pub dev_commands: bool,
}

// Default value functions

fn default_staking_asset() -> String {
    "UNI-V2".to_string()
}

fn default_reward_asset() -> String {
    "AMPL".to_string()
}

fn default_floor_pct() -> u32 {
    33
}

fn default_ceiling_pct() -> u32 {
    100
}

fn default_ramp_duration() -> u64 {
    60 * geyser_types::SECONDS_PER_DAY
}

fn default_socket_name() -> String {
    "geyserd.sock".to_string()
}

fn default_event_capacity() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            staking_asset: default_staking_asset(),
            reward_asset: default_reward_asset(),
            floor_pct: default_floor_pct(),
            ceiling_pct: default_ceiling_pct(),
            ramp_duration_secs: default_ramp_duration(),
            bonus_assets: Vec::new(),
            admin: String::new(),
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            socket_name: default_socket_name(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dev_commands: false,
        }
    }
}

impl PoolSettings {
    /// Decode the configured admin address.
    pub fn admin_address(&self) -> anyhow::Result<Address> {
        if self.admin.is_empty() {
            anyhow::bail!("pool.admin is not set");
        }
        let bytes = hex::decode(&self.admin)?;
        bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("pool.admin must be 32 bytes of hex"))
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: DaemonConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    /// Get the socket path.
    pub fn socket_path(&self) -> PathBuf {
        self.data_dir().join(&self.rpc.socket_name)
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Default data directory, overridable with `GEYSER_DATA_DIR`.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("GEYSER_DATA_DIR") {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".geyser"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/geyser"))
    }
}
