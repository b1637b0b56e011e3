//! Error types for the score aggregator.
//!
//! Uses `thiserror` for typed errors. Nothing here is fatal to the process
//! except [`AggregatorError::ConnectionLost`] and startup failures; the
//! per-message and per-tick errors are logged and the unit of work skipped.

use crate::config::ConfigError;

/// Why an inbound payload did not produce a score.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// The payload is not a valid message envelope.
    #[error("malformed message envelope: {0}")]
    Decode(#[from] serde_json::Error),

    /// A `single.score` event arrived without a usable player name.
    #[error("scoring event has no player name")]
    MissingPlayer,
}

/// Errors raised by the aggregator's broker and scheduling paths.
#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    /// Configuration is invalid or could not be loaded.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The AMQP client reported a failure.
    #[error("broker error: {0}")]
    Broker(#[from] lapin::Error),

    /// The broker negatively acknowledged a confirmed publish.
    #[error("broker rejected publish to routing key {routing_key}")]
    PublishNacked {
        /// Routing key of the rejected publish.
        routing_key: String,
    },

    /// A publish did not complete within one broadcast interval.
    #[error("publish timed out after {after_ms} ms: {reason}")]
    PublishTimedOut {
        /// The bound that was exceeded.
        after_ms: u64,
        /// Timer error text.
        reason: String,
    },

    /// Publishing through a non-AMQP publisher failed.
    #[error("publish failed: {0}")]
    Publish(String),

    /// Serialization of an outbound message failed.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The inbound delivery stream ended; the connection is gone.
    #[error("broker connection lost")]
    ConnectionLost,
}
