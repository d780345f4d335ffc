//! Configuration type definitions.

use std::path::PathBuf;
use std::time::Duration;

use serenity::model::id::{ChannelId, GuildId, UserId};
use uuid::Uuid;

/// Last name used when the account has none (single-name accounts).
pub const DEFAULT_LAST_NAME: &str = "Resident";

/// Root configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    pub discord: DiscordConfig,
    pub grid: GridConfig,
    pub logging: LoggingConfig,
    pub relay: RelayConfig,
}

/// Discord bot configuration.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub token: String,
    pub guild_id: GuildId,
    /// Channel ids in pairing order.
    pub channels: Vec<ChannelId>,
    /// Users whose messages are never relayed.
    pub ignore: Vec<UserId>,
}

/// Grid account and group configuration.
#[derive(Debug, Clone)]
pub struct GridConfig {
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    /// Group ids in pairing order.
    pub groups: Vec<Uuid>,
    /// Agents whose messages are never relayed.
    pub ignore: Vec<Uuid>,
}

impl GridConfig {
    /// Login credentials view.
    pub fn credentials(&self) -> GridCredentials {
        GridCredentials {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            password: self.password.clone(),
        }
    }
}

/// Credentials handed to the grid client at login.
#[derive(Clone)]
pub struct GridCredentials {
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl std::fmt::Debug for GridCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridCredentials")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Raise the default log level to DEBUG.
    pub debug: bool,
    /// Chat log file, when chat logging is enabled.
    pub chat_log: Option<PathBuf>,
}

/// Relay supervisor settings.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Fixed delay between connection checks.
    pub reconnect_delay: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: crate::common::reconnect::DEFAULT_RECONNECT_DELAY,
        }
    }
}
