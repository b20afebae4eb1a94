// ============================
// gameofthree-client/src/config.rs
// ============================
//! Configuration management.
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::dispatcher::SessionConfig;
use crate::error::ClientError;
use crate::session::Mode;

/// Default configuration file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "gameofthree.toml";
/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "GAMEOFTHREE_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// WebSocket URL of the game server's STOMP endpoint
    pub server_url: String,
    /// Player name sent when connecting
    pub username: Option<String>,
    /// How moves are produced
    pub mode: Mode,
    /// Pause before automatic actions, in milliseconds
    pub move_delay_ms: u64,
    /// Log level
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Limit for the WebSocket and STOMP handshakes, in seconds
    pub connect_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:8080/game-of-three/websocket".to_string(),
            username: None,
            mode: Mode::Manual,
            move_delay_ms: 1000,
            log_level: "info".to_string(),
            log_json: false,
            connect_timeout_secs: 10,
        }
    }
}

impl Settings {
    /// Load from [`DEFAULT_CONFIG_FILE`] and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from a specific file and the environment; a missing file is not an error
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let settings = Self::figment(path.as_ref()).extract()?;
        Ok(settings)
    }

    /// Defaults, then the file, then `GAMEOFTHREE_*` variables
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Check the settings are usable for a connection
    pub fn validate(&self) -> Result<(), ClientError> {
        if !(self.server_url.starts_with("ws://") || self.server_url.starts_with("wss://")) {
            return Err(ClientError::Config(format!(
                "server_url must be a ws:// or wss:// URL, got `{}`",
                self.server_url
            )));
        }

        match self.username.as_deref().map(str::trim) {
            None | Some("") => {
                return Err(ClientError::Config("username is required".to_string()));
            },
            Some(_) => {},
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ClientError::Config(format!(
                "log_level must be one of {LOG_LEVELS:?}, got `{}`",
                self.log_level
            )));
        }

        if self.connect_timeout_secs == 0 {
            return Err(ClientError::Config(
                "connect_timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn move_delay(&self) -> Duration {
        Duration::from_millis(self.move_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            mode: self.mode,
            move_delay: self.move_delay(),
        }
    }
}
