//! Configuration validation.
//!
//! Turns raw environment settings into a typed `Config`, collecting every
//! problem into a single error so a misconfigured deployment is fixed in one go.

use std::collections::HashSet;
use std::hash::Hash;
use std::path::PathBuf;
use std::time::Duration;

use serenity::model::id::{ChannelId, GuildId, UserId};
use uuid::Uuid;

use crate::common::chatlog::DEFAULT_CHAT_LOG;
use crate::common::error::ConfigError;
use crate::config::env::{self, EnvSettings};
use crate::config::types::*;

/// Validate raw settings and build the typed configuration.
pub fn validate_settings(settings: &EnvSettings) -> Result<Config, ConfigError> {
    let mut errors: Vec<ConfigError> = Vec::new();

    let token = required(&settings.token, env::BOT_TOKEN, &mut errors);
    let first_name = required(&settings.first_name, env::SL_FIRST_NAME, &mut errors);
    let password = required(&settings.password, env::SL_PASSWORD, &mut errors);

    let guild_id = match settings.guild.as_deref() {
        Some(raw) => parse_snowflake(raw, env::DISCORD_SERVER, &mut errors).map(GuildId::new),
        None => {
            errors.push(missing(env::DISCORD_SERVER));
            None
        }
    };

    let channels: Vec<ChannelId> = parse_all(&settings.channels, env::DISCORD_CHANNELS, &mut errors, |raw, key, errors| {
        parse_snowflake(raw, key, errors).map(ChannelId::new)
    });
    let discord_ignore: Vec<UserId> = parse_all(&settings.discord_ignore, env::DISCORD_IGNORE, &mut errors, |raw, key, errors| {
        parse_snowflake(raw, key, errors).map(UserId::new)
    });
    let groups: Vec<Uuid> = parse_all(&settings.groups, env::SL_GROUPS, &mut errors, parse_uuid);
    let grid_ignore: Vec<Uuid> = parse_all(&settings.grid_ignore, env::SL_IGNORE, &mut errors, parse_uuid);

    check_topics(&channels, settings.channels.len(), env::DISCORD_CHANNELS, &mut errors);
    check_topics(&groups, settings.groups.len(), env::SL_GROUPS, &mut errors);

    if !settings.channels.is_empty() && settings.channels.len() != settings.groups.len() {
        errors.push(invalid(
            env::SL_GROUPS,
            format!(
                "{} entries but {} has {} - topics are paired by position",
                settings.groups.len(),
                env::DISCORD_CHANNELS,
                settings.channels.len()
            ),
        ));
    }

    let reconnect_delay = match settings.reconnect_delay_secs.as_deref() {
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                errors.push(invalid(
                    env::RECONNECT_DELAY_SECS,
                    format!("expected a positive number of seconds, got '{}'", raw),
                ));
                RelayConfig::default().reconnect_delay
            }
        },
        None => RelayConfig::default().reconnect_delay,
    };

    if !errors.is_empty() {
        let lines: Vec<String> = errors.iter().map(ToString::to_string).collect();
        return Err(ConfigError::ValidationError {
            message: lines.join("\n"),
        });
    }

    // Every field below was checked above.
    let (Some(token), Some(first_name), Some(password), Some(guild_id)) =
        (token, first_name, password, guild_id)
    else {
        return Err(ConfigError::ValidationError {
            message: "incomplete configuration".to_string(),
        });
    };

    let last_name = settings
        .last_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LAST_NAME.to_string());

    let chat_log = settings.log_chat.then(|| {
        PathBuf::from(
            settings
                .chat_log_path
                .clone()
                .unwrap_or_else(|| DEFAULT_CHAT_LOG.to_string()),
        )
    });

    Ok(Config {
        discord: DiscordConfig {
            token,
            guild_id,
            channels,
            ignore: discord_ignore,
        },
        grid: GridConfig {
            first_name,
            last_name,
            password,
            groups,
            ignore: grid_ignore,
        },
        logging: LoggingConfig {
            debug: settings.debug,
            chat_log,
        },
        relay: RelayConfig { reconnect_delay },
    })
}

fn missing(key: &str) -> ConfigError {
    ConfigError::MissingKey { key: key.to_string() }
}

fn invalid(key: &str, message: String) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message,
    }
}

fn required(value: &Option<String>, key: &str, errors: &mut Vec<ConfigError>) -> Option<String> {
    if value.is_none() {
        errors.push(missing(key));
    }
    value.clone()
}

fn parse_snowflake(raw: &str, key: &str, errors: &mut Vec<ConfigError>) -> Option<u64> {
    match raw.trim().parse::<u64>() {
        Ok(id) if id != 0 => Some(id),
        _ => {
            errors.push(invalid(key, format!("invalid id '{}'", raw)));
            None
        }
    }
}

fn parse_uuid(raw: &str, key: &str, errors: &mut Vec<ConfigError>) -> Option<Uuid> {
    match Uuid::parse_str(raw.trim()) {
        Ok(id) => Some(id),
        Err(e) => {
            errors.push(invalid(key, format!("invalid UUID '{}': {}", raw, e)));
            None
        }
    }
}

fn parse_all<T, F>(raw: &[String], key: &str, errors: &mut Vec<ConfigError>, parse: F) -> Vec<T>
where
    F: Fn(&str, &str, &mut Vec<ConfigError>) -> Option<T>,
{
    raw.iter()
        .filter_map(|item| parse(item, key, errors))
        .collect()
}

fn check_topics<T: Eq + Hash>(parsed: &[T], raw_len: usize, key: &str, errors: &mut Vec<ConfigError>) {
    if raw_len == 0 {
        errors.push(missing(key));
        return;
    }
    let mut seen = HashSet::new();
    if !parsed.iter().all(|id| seen.insert(id)) {
        errors.push(invalid(key, "duplicate entries".to_string()));
    }
}
