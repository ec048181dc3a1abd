//! # psub - In-Process Topic Publish/Subscribe
//!
//! Callers register handlers against string topics, publish argument lists
//! to a topic to invoke every registered handler, and cancel registrations
//! through an opaque handle or by `(topic, handler)` identity.
//!
//! ## Layout
//!
//! ```text
//!   subscribe() ──────┐                  ┌────── unsubscribe()
//!                     ▼                  ▼
//!              ┌─────────────────────────────────┐
//!              │            Registry             │
//!              │  topic  → [sub, sub, sub, ...]  │
//!              │  handle → (topic, position)     │
//!              └─────────────────────────────────┘
//!                     │ resolve + claim
//!   publish() ────────┤
//!                     ▼
//!              ┌──────────────┐   Sync:  in order, errors propagate
//!              │  Dispatcher  │
//!              └──────────────┘   Async: one Tokio task per handler
//! ```
//!
//! ## Guarantees
//!
//! - **Order:** handlers on one topic run in subscribe order (sync dispatch)
//! - **Bounded lifetimes:** `subscribe_limited(.., k)` fires exactly `k` times
//! - **Cancellation:** handle lookup is O(1) via the location index
//! - **Wildcard:** publishing to `"*"` (configurable) reaches every topic

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod bus;
pub mod config;
mod dispatcher;
pub mod error;
mod registry;
pub mod subscription;

// Re-export main types
pub use bus::PubSub;
pub use config::{DispatchMode, PubSubConfig};
pub use error::{ArgumentError, PubSubError, Result};
pub use subscription::{Handler, Remaining, SubscriptionHandle, Unsubscribe};

/// Default token that publishes to every topic.
pub const WILDCARD_TOPIC: &str = "*";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_token() {
        assert_eq!(WILDCARD_TOPIC, "*");
        assert_eq!(
            PubSubConfig::default().wildcard_topic.as_deref(),
            Some(WILDCARD_TOPIC)
        );
    }

    #[test]
    fn test_pubsub_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PubSub>();
        assert_send_sync::<PubSub<String>>();
        assert_send_sync::<Handler<u64>>();
    }
}
