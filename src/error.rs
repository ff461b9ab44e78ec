//! Error types for the alert relay.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Translation error: {0}")]
    Translate(#[from] TranslateError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Chat-sink errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send message on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Channel {name} timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },
}

/// Disruption feed errors.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Feed request failed: {0}")]
    Request(String),

    #[error("Feed timed out after {0:?}")]
    Timeout(Duration),

    #[error("Feed returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Feed payload could not be decoded: {0}")]
    Decode(String),
}

/// Translation errors. Callers degrade to the untranslated text on any of these.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("Translation request failed: {0}")]
    Request(String),

    #[error("Translation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unexpected translation response: {0}")]
    Malformed(String),

    #[error("Empty translation response")]
    Empty,
}

/// Pipeline errors raised while processing a poll cycle.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// No route-group rule covers this mode/line combination. This is a
    /// missing mapping, not a transient failure.
    #[error("Unsupported grouping for {mode} with lines {lines:?}")]
    UnmappedRoute { mode: String, lines: Vec<i64> },

    #[error("Feed fetch failed: {0}")]
    Feed(#[from] FeedError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] DatabaseError),
}

/// Result type alias for the relay.
pub type Result<T> = std::result::Result<T, Error>;
