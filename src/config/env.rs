//! Environment-based configuration.
//!
//! Settings are read from the process environment, optionally seeded from a
//! `.env` file in the working directory:
//! - `BOT_TOKEN` - Discord bot token
//! - `DISCORD_SERVER` - Discord guild id
//! - `DISCORD_CHANNELS` - comma separated channel ids, in pairing order
//! - `SL_GROUPS` - comma separated group UUIDs, in pairing order
//! - `SL_FIRST_NAME`, `SL_LAST_NAME`, `SL_PASSWORD` - grid account
//! - `DEBUG` - debug logging
//! - `LOG_CHAT`, `CHAT_LOG_PATH` - chat log to file
//! - `DISCORD_IGNORE`, `SL_IGNORE` - sender ids never relayed
//! - `RECONNECT_DELAY_SECS` - reconnect check interval

use std::env;

use tracing::debug;

use crate::common::error::ConfigError;
use crate::config::types::Config;
use crate::config::validate::validate_settings;

pub const BOT_TOKEN: &str = "BOT_TOKEN";
pub const DISCORD_SERVER: &str = "DISCORD_SERVER";
pub const DISCORD_CHANNELS: &str = "DISCORD_CHANNELS";
pub const DISCORD_IGNORE: &str = "DISCORD_IGNORE";
pub const SL_GROUPS: &str = "SL_GROUPS";
pub const SL_FIRST_NAME: &str = "SL_FIRST_NAME";
pub const SL_LAST_NAME: &str = "SL_LAST_NAME";
pub const SL_PASSWORD: &str = "SL_PASSWORD";
pub const SL_IGNORE: &str = "SL_IGNORE";
pub const DEBUG: &str = "DEBUG";
pub const LOG_CHAT: &str = "LOG_CHAT";
pub const CHAT_LOG_PATH: &str = "CHAT_LOG_PATH";
pub const RECONNECT_DELAY_SECS: &str = "RECONNECT_DELAY_SECS";

/// Raw settings as read from the environment, before validation.
#[derive(Debug, Clone, Default)]
pub struct EnvSettings {
    pub token: Option<String>,
    pub guild: Option<String>,
    pub channels: Vec<String>,
    pub discord_ignore: Vec<String>,
    pub groups: Vec<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    pub grid_ignore: Vec<String>,
    pub debug: bool,
    pub log_chat: bool,
    pub chat_log_path: Option<String>,
    pub reconnect_delay_secs: Option<String>,
}

impl EnvSettings {
    /// Read settings through a key lookup.
    pub fn read_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let list = |key: &str| value(key).map(|v| split_list(&v)).unwrap_or_default();

        Self {
            token: value(BOT_TOKEN),
            guild: value(DISCORD_SERVER),
            channels: list(DISCORD_CHANNELS),
            discord_ignore: list(DISCORD_IGNORE),
            groups: list(SL_GROUPS),
            first_name: value(SL_FIRST_NAME),
            last_name: value(SL_LAST_NAME),
            password: value(SL_PASSWORD),
            grid_ignore: list(SL_IGNORE),
            debug: parse_flag(value(DEBUG).as_deref()),
            log_chat: parse_flag(value(LOG_CHAT).as_deref()),
            chat_log_path: value(CHAT_LOG_PATH),
            reconnect_delay_secs: value(RECONNECT_DELAY_SECS),
        }
    }
}

/// Load and validate configuration from the process environment.
///
/// A `.env` file in the working directory is loaded first when present;
/// variables already set in the environment win.
pub fn load_from_env() -> Result<Config, ConfigError> {
    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) => debug!("No .env file loaded: {}", e),
    }
    load_with(|key| env::var(key).ok())
}

/// Load and validate configuration through an arbitrary key lookup.
pub fn load_with<F>(lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    validate_settings(&EnvSettings::read_with(lookup))
}

/// Split a comma separated list, trimming whitespace and dropping empty items.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Interpret a flag value: any non-blank value turns it on, except the
/// explicit negatives `0`, `false`, `no` and `off`.
pub fn parse_flag(value: Option<&str>) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => false,
        Some(v) => !matches!(v.as_str(), "" | "0" | "false" | "no" | "off"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("a, b,c ,"), vec!["a", "b", "c"]);
        assert!(split_list(" , ").is_empty());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag(Some("1")));
        assert!(parse_flag(Some("TRUE")));
        assert!(parse_flag(Some(" yes ")));
        assert!(parse_flag(Some("enabled")));
        assert!(parse_flag(Some("debug")));
        assert!(!parse_flag(Some("0")));
        assert!(!parse_flag(Some("False")));
        assert!(!parse_flag(Some("off")));
        assert!(!parse_flag(Some("  ")));
        assert!(!parse_flag(None));
    }

    #[test]
    fn test_read_with_blank_values_are_absent() {
        let settings = EnvSettings::read_with(lookup(&[
            (BOT_TOKEN, "  "),
            (SL_LAST_NAME, ""),
            (DISCORD_CHANNELS, "1, 2"),
        ]));
        assert!(settings.token.is_none());
        assert!(settings.last_name.is_none());
        assert_eq!(settings.channels, vec!["1", "2"]);
    }

    #[test]
    fn test_load_with_full_environment() {
        let config = load_with(lookup(&[
            (BOT_TOKEN, "token"),
            (DISCORD_SERVER, "100"),
            (DISCORD_CHANNELS, "11, 12"),
            (SL_GROUPS, "71a34da3-268c-4d04-8dc9-63a69cb91bb1,6279bf98-c639-448a-96bb-00f0a7c42801"),
            (SL_FIRST_NAME, "Relay"),
            (SL_PASSWORD, "secret"),
            (DEBUG, "1"),
        ]))
        .unwrap();

        assert_eq!(config.discord.channels.len(), 2);
        assert_eq!(config.grid.groups.len(), 2);
        assert_eq!(config.grid.last_name, "Resident");
        assert!(config.logging.debug);
        assert!(config.logging.chat_log.is_none());
    }

    #[test]
    fn test_load_with_missing_token_fails() {
        let result = load_with(lookup(&[(SL_FIRST_NAME, "Relay")]));
        let err = result.unwrap_err().to_string();
        assert!(err.contains(BOT_TOKEN));
    }
}
