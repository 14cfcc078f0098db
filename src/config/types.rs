//! Core configuration types and loading.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use super::defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Client configuration.
///
/// Top-level `watch` and `ignore` arrays must appear before any table in the
/// TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Masks monitored for presence on every connection.
    #[serde(default)]
    pub watch: Vec<String>,
    /// Masks whose messages are suppressed (and silenced where supported).
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Who we are.
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Servers to connect to.
    #[serde(default, rename = "server")]
    pub servers: Vec<ServerConfig>,
    /// Per-nick identify commands, sent once at end of MOTD.
    #[serde(default)]
    pub identify: Vec<IdentifyBlock>,
    /// Character encoding selection.
    #[serde(default)]
    pub encoding: EncodingConfig,
    /// Idle keep-alive thresholds.
    #[serde(default)]
    pub keepalive: KeepaliveConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// Look up a server block by id.
    pub fn server(&self, id: &str) -> Option<&ServerConfig> {
        self.servers.iter().find(|s| s.id == id)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(s)?;
        super::validate(&config).map_err(|errors| {
            let joined: Vec<String> = errors.iter().map(ToString::to_string).collect();
            ConfigError::Invalid(joined.join("; "))
        })?;
        Ok(config)
    }
}

/// `[identity]` block.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_nick")]
    pub nick: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_realname")]
    pub realname: String,
    #[serde(default = "default_quit_message")]
    pub quit_message: String,
    /// Ask for confirmation when a server reports a hostname that no
    /// `[[server]]` block names.
    #[serde(default)]
    pub confirm_unknown_servers: bool,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            nick: default_nick(),
            username: default_username(),
            realname: default_realname(),
            quit_message: default_quit_message(),
            confirm_unknown_servers: false,
        }
    }
}

/// `[[server]]` block.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Unique id used in logs and events.
    pub id: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub tls: bool,
    /// Sent as `PASS` before registration.
    pub password: Option<String>,
    /// Per-server encoding override.
    pub encoding: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Use the short keep-alive threshold.
    #[serde(default)]
    pub frequent_keepalive: bool,
}

/// `[[identify]]` block.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentifyBlock {
    pub nick: String,
    pub password: String,
    /// Command template; `{nick}` and `{password}` are substituted.
    #[serde(default = "default_identify_pattern")]
    pub pattern: String,
}

impl IdentifyBlock {
    /// Render the identify command line.
    pub fn render(&self, nick: &str) -> String {
        self.pattern
            .replace("{nick}", nick)
            .replace("{password}", &self.password)
    }
}

/// `[encoding]` block. Values are WHATWG encoding labels.
#[derive(Debug, Clone, Deserialize)]
pub struct EncodingConfig {
    #[serde(default = "default_encoding")]
    pub default: String,
    /// Channel name -> label.
    #[serde(default)]
    pub channels: BTreeMap<String, String>,
    /// `nick!user@host` mask -> label. Checked in key order.
    #[serde(default)]
    pub masks: BTreeMap<String, String>,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            default: default_encoding(),
            channels: BTreeMap::new(),
            masks: BTreeMap::new(),
        }
    }
}

/// `[keepalive]` block.
#[derive(Debug, Clone, Deserialize)]
pub struct KeepaliveConfig {
    #[serde(default = "default_probe_ticks")]
    pub probe_ticks: u32,
    #[serde(default = "default_frequent_probe_ticks")]
    pub frequent_probe_ticks: u32,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            probe_ticks: default_probe_ticks(),
            frequent_probe_ticks: default_frequent_probe_ticks(),
        }
    }
}
