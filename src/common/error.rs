//! Error types for the application.

use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {key}")]
    MissingKey { key: String },

    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Errors raised by a grid (virtual world) client.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("Login failed: {reason}")]
    LoginFailed { reason: String },

    #[error("Simulator connection failed: {reason}")]
    SimulatorFailed { reason: String },

    #[error("Event queue unavailable: {reason}")]
    EventQueue { reason: String },

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Group chat session for {group} failed: {reason}")]
    SessionFailed { group: String, reason: String },

    #[error("Failed to send group message: {reason}")]
    SendFailed { reason: String },

    #[error("Connection closed")]
    Closed,
}

/// Discord-related errors.
#[derive(Debug, Error)]
pub enum DiscordError {
    #[error("Failed to connect to Discord: {message}")]
    ConnectionFailed { message: String },

    #[error("Channel {channel_id} is not a text channel of guild {guild_id}")]
    ChannelNotInGuild { channel_id: u64, guild_id: u64 },

    #[error("Member not found: {user_id}")]
    MemberNotFound { user_id: u64 },

    #[error("Serenity error: {0}")]
    Serenity(#[from] serenity::Error),
}

/// Errors surfaced by an endpoint's connect/listen cycle.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    #[error("Discord error: {0}")]
    Discord(#[from] DiscordError),

    #[error("{endpoint} is not connected")]
    NotConnected { endpoint: String },
}

/// Result type alias for grid client operations.
pub type GridResult<T> = std::result::Result<T, GridError>;

/// Result type alias for Discord operations.
pub type DiscordResult<T> = std::result::Result<T, DiscordError>;

/// Result type alias for endpoint operations.
pub type EndpointResult<T> = std::result::Result<T, EndpointError>;
