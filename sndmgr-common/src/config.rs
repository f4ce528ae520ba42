//! Bootstrap configuration
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments (applied by the binary)
//! 2. Environment variables (applied by the binary through clap)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! A missing configuration file is not an error: the agent warns and starts
//! with built-in defaults. A file that exists but cannot be read or parsed is.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Complete agent configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub broker: BrokerConfig,
    pub sounds: SoundConfig,
    pub player: PlayerConfig,
    pub logging: LoggingConfig,
}

/// Broker connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Broker host name or address
    pub host: String,

    /// Broker port (1883 = unencrypted MQTT)
    pub port: u16,

    /// Topic prefix; the agent subscribes to `<base_topic>/#`
    pub base_topic: String,

    /// MQTT client identifier (random per process if not set)
    pub client_id: Option<String>,

    /// MQTT keep-alive interval in seconds
    pub keep_alive_secs: u64,

    /// Fixed delay between connection attempts, in milliseconds
    pub retry_interval_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            base_topic: "manager".to_string(),
            client_id: None,
            keep_alive_secs: 60,
            retry_interval_ms: 1000,
        }
    }
}

impl BrokerConfig {
    /// Wildcard subscription covering every channel
    pub fn subscription(&self) -> String {
        format!("{}/#", self.base_topic)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    /// `host:port`, for log lines
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Sound file location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    /// Sound directory; relative paths are resolved against the working
    /// directory. Defaults to `<cwd>/sounds`.
    pub dir: Option<PathBuf>,

    /// File extension appended to sound names (without the dot)
    pub extension: String,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            dir: None,
            extension: "wav".to_string(),
        }
    }
}

/// External player invoked once per playback pass
///
/// The sound file path is appended after `args`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            Self {
                program: "afplay".to_string(),
                args: Vec::new(),
            }
        } else {
            // ALSA utilities are the common denominator on Linux boards
            Self {
                program: "aplay".to_string(),
                args: vec!["-q".to_string()],
            }
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides it
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML text; absent keys take built-in defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Load from an explicit path, or from the platform default location.
    ///
    /// An explicit path must exist. Without one, the first existing default
    /// file is used and built-in defaults apply when none exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Some(path.to_path_buf())
            }
            None => default_config_path(),
        };

        match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                let content = std::fs::read_to_string(&path)?;
                Self::from_toml_str(&content)
            }
            None => {
                warn!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reject settings the agent cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.broker.host.trim().is_empty() {
            return Err(Error::Config("broker.host must not be empty".to_string()));
        }
        let base = &self.broker.base_topic;
        if base.is_empty() || base.contains(['#', '+']) || base.ends_with('/') {
            return Err(Error::Config(format!(
                "broker.base_topic '{}' must be a non-empty topic without wildcards or trailing '/'",
                base
            )));
        }
        if self.broker.retry_interval_ms == 0 {
            return Err(Error::Config(
                "broker.retry_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.sounds.extension.is_empty() || self.sounds.extension.starts_with('.') {
            return Err(Error::Config(
                "sounds.extension must be non-empty and given without the leading '.'".to_string(),
            ));
        }
        if self.player.program.trim().is_empty() {
            return Err(Error::Config("player.program must not be empty".to_string()));
        }
        Ok(())
    }
}

/// First existing default config file for the platform
///
/// Linux: `~/.config/sndmgr/config.toml`, then `/etc/sndmgr/config.toml`.
/// Elsewhere: `<config_dir>/sndmgr/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("sndmgr").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/sndmgr/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.broker.base_topic, "manager");
        assert_eq!(config.broker.subscription(), "manager/#");
        assert_eq!(config.broker.retry_interval(), Duration::from_secs(1));
        assert_eq!(config.sounds.extension, "wav");
        assert!(config.sounds.dir.is_none());
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [broker]
            host = "192.168.0.36"
            "#,
        )
        .unwrap();
        assert_eq!(config.broker.host, "192.168.0.36");
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.broker.keep_alive_secs, 60);
        assert_eq!(config.sounds, SoundConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml_str("[broker\nhost = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_toml_str("[broker]\nport = \"not a port\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validate_rejects_wildcard_base_topic() {
        let mut config = Config::default();
        config.broker.base_topic = "manager/#".to_string();
        assert!(config.validate().is_err());

        config.broker.base_topic = "manager/".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_retry_interval() {
        let mut config = Config::default();
        config.broker.retry_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_dotted_extension() {
        let mut config = Config::default();
        config.sounds.extension = ".wav".to_string();
        assert!(config.validate().is_err());
    }
}
