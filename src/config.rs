//! Configuration
//!
//! Session settings load with the following priority (highest first):
//! 1. Environment variables
//! 2. TOML configuration file
//! 3. Default values
//!
//! The configuration file follows the XDG Base Directory specification:
//! `$XDG_CONFIG_HOME/ultron/session.toml` (typically
//! `~/.config/ultron/session.toml`).
//!
//! # Example Configuration
//!
//! ```toml
//! [session]
//! command_url = "http://127.0.0.1:8000/chat"
//! push_url = "ws://127.0.0.1:8000/ws"
//! reconnect_delay_ms = 3000
//! command_timeout_secs = 30
//! event_buffer = 64
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config file at {path}: {source}")]
    Read {
        /// The path that was attempted.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Runtime settings for a session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Command endpoint receiving directive POSTs.
    pub command_url: String,
    /// Push endpoint for the persistent connection.
    pub push_url: String,
    /// Fixed delay between reconnect attempts.
    pub reconnect_delay: Duration,
    /// Deadline for a single directive round trip.
    pub command_timeout: Duration,
    /// Capacity of the channel-event queue.
    pub event_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_url: "http://127.0.0.1:8000/chat".to_string(),
            push_url: "ws://127.0.0.1:8000/ws".to_string(),
            reconnect_delay: Duration::from_millis(3000),
            command_timeout: Duration::from_secs(30),
            event_buffer: 64,
        }
    }
}

/// `[session]` table of the TOML file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct SessionToml {
    command_url: Option<String>,
    push_url: Option<String>,
    reconnect_delay_ms: Option<u64>,
    command_timeout_secs: Option<u64>,
    event_buffer: Option<usize>,
}

/// Top-level TOML file shape.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    session: SessionToml,
}

/// Default config file location under the XDG config directory.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ultron").join("session.toml"))
}

impl SessionConfig {
    /// Load configuration from all sources.
    ///
    /// Defaults are overlaid by the config file when one exists, then by
    /// environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = default_config_path() {
            if path.exists() {
                config.apply_file(&path)?;
            }
        }
        config.apply_env();
        Ok(config)
    }

    /// Load from a specific TOML file, without the environment overlay.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_file(path)?;
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&raw)?;
        let session = file.session;

        if let Some(url) = session.command_url {
            self.command_url = url;
        }
        if let Some(url) = session.push_url {
            self.push_url = url;
        }
        if let Some(ms) = session.reconnect_delay_ms {
            self.reconnect_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = session.command_timeout_secs {
            self.command_timeout = Duration::from_secs(secs);
        }
        if let Some(size) = session.event_buffer {
            self.event_buffer = size;
        }

        tracing::debug!(path = %path.display(), "applied config file");
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("ULTRON_COMMAND_URL") {
            self.command_url = url;
        }
        if let Ok(url) = std::env::var("ULTRON_PUSH_URL") {
            self.push_url = url;
        }
        if let Some(ms) = env_parse::<u64>("ULTRON_RECONNECT_MS") {
            self.reconnect_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = env_parse::<u64>("ULTRON_COMMAND_TIMEOUT_SECS") {
            self.command_timeout = Duration::from_secs(secs);
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|value| value.parse().ok())
}
