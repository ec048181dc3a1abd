//! Error types for the publish/subscribe registry

use crate::subscription::SubscriptionHandle;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PubSubError>;

/// Errors returned by registry and dispatch operations.
#[derive(Debug, Error)]
pub enum PubSubError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] ArgumentError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A handler returned an error during synchronous dispatch.
    #[error("Handler {handle} for topic {topic:?} failed: {source}")]
    HandlerFailure {
        topic: String,
        handle: SubscriptionHandle,
        #[source]
        source: anyhow::Error,
    },

    #[error("Asynchronous dispatch requires a running Tokio runtime")]
    NoRuntime,
}

/// Malformed arguments rejected at the API boundary.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("Topic must be a non empty string")]
    EmptyTopic,

    #[error("Limit must be an integer >= 1")]
    ZeroLimit,
}

impl PubSubError {
    /// True for errors caused by the caller's arguments.
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

/// Reject empty topic names.
pub(crate) fn ensure_topic(topic: &str) -> Result<()> {
    if topic.is_empty() {
        return Err(ArgumentError::EmptyTopic.into());
    }
    Ok(())
}
