//! Registry configuration and validation
//!
//! # Example
//!
//! ```
//! use psub::{DispatchMode, PubSubConfig};
//!
//! let config = PubSubConfig::default()
//!     .with_dispatch(DispatchMode::Async)
//!     .with_wildcard_topic(None);
//! assert!(config.validate().is_ok());
//! ```

use crate::error::{PubSubError, Result};
use crate::WILDCARD_TOPIC;
use serde::{Deserialize, Serialize};
use std::env;

/// How `publish` runs the resolved handlers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// In subscribe order on the publishing thread; handler errors propagate.
    #[default]
    Sync,
    /// One Tokio task per handler; handler errors are logged and isolated.
    Async,
}

impl DispatchMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sync" => Some(Self::Sync),
            "async" => Some(Self::Async),
            _ => None,
        }
    }
}

/// Configuration for a `PubSub` instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PubSubConfig {
    /// Dispatch discipline, fixed for the lifetime of the registry.
    pub dispatch: DispatchMode,

    /// Topic that publishes to every topic. `None` disables the wildcard.
    pub wildcard_topic: Option<String>,
}

impl Default for PubSubConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchMode::Sync,
            wildcard_topic: Some(WILDCARD_TOPIC.to_string()),
        }
    }
}

impl PubSubConfig {
    /// Parse a JSON document and validate it.
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| PubSubError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PSUB_DISPATCH`: `sync` or `async` (default: sync)
    /// - `PSUB_WILDCARD_TOPIC`: wildcard token, empty to disable (default: `*`)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            dispatch: env::var("PSUB_DISPATCH")
                .ok()
                .and_then(|v| DispatchMode::parse(&v))
                .unwrap_or(defaults.dispatch),

            wildcard_topic: match env::var("PSUB_WILDCARD_TOPIC") {
                Ok(v) if v.is_empty() => None,
                Ok(v) => Some(v),
                Err(_) => defaults.wildcard_topic,
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if matches!(self.wildcard_topic.as_deref(), Some("")) {
            return Err(PubSubError::InvalidConfig(
                "wildcard_topic cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Builder-style method to set the dispatch discipline
    #[must_use]
    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Builder-style method to set or disable the wildcard topic
    #[must_use]
    pub fn with_wildcard_topic(mut self, topic: Option<&str>) -> Self {
        self.wildcard_topic = topic.map(str::to_string);
        self
    }

    /// True if publishing to `topic` means publishing to every topic.
    pub(crate) fn is_wildcard(&self, topic: &str) -> bool {
        self.wildcard_topic.as_deref() == Some(topic)
    }
}
