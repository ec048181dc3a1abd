//! # PubSub
//!
//! The registry object callers own: subscribe, publish, unsubscribe.

use crate::config::{DispatchMode, PubSubConfig};
use crate::dispatcher;
use crate::error::{ensure_topic, Result};
use crate::registry::Registry;
use crate::subscription::{Handler, Remaining, SubscriptionHandle, Unsubscribe};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// In-process topic-based publish/subscribe registry.
///
/// Handlers receive the published arguments as `&[A]`. The registry is
/// `Send + Sync` and can be shared behind an `Arc`; a single lock guards
/// the subscription maps and is never held while a handler runs.
///
/// # Example
///
/// ```
/// use psub::{Handler, PubSub};
/// use serde_json::json;
///
/// let bus: PubSub = PubSub::new();
/// let handle = bus.subscribe("message", Handler::infallible(|args| {
///     println!("received {args:?}");
/// }))?;
///
/// assert!(bus.publish("message", [json!(1), json!("x")])?);
/// assert!(!bus.publish("other", [])?);
///
/// assert!(bus.unsubscribe(handle)?);
/// assert!(!bus.publish("message", [])?);
/// # Ok::<(), psub::PubSubError>(())
/// ```
pub struct PubSub<A = serde_json::Value> {
    registry: Mutex<Registry<A>>,
    config: PubSubConfig,
}

impl<A> PubSub<A> {
    /// Create a registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry::new()),
            config: PubSubConfig::default(),
        }
    }

    /// Create a registry with a validated configuration.
    pub fn with_config(config: PubSubConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry: Mutex::new(Registry::new()),
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &PubSubConfig {
        &self.config
    }

    /// Subscribe `handler` to `topic` until it is unsubscribed.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument(EmptyTopic)` - `topic` is empty
    pub fn subscribe(&self, topic: &str, handler: Handler<A>) -> Result<SubscriptionHandle> {
        ensure_topic(topic)?;
        Ok(self.registry.lock().insert(topic, handler, Remaining::Unbounded))
    }

    /// Subscribe `handler` to `topic` for exactly `limit` invocations.
    ///
    /// The subscription fires on invocations `1..=limit` and is removed
    /// once the last one has been claimed.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument(EmptyTopic)` - `topic` is empty
    /// - `InvalidArgument(ZeroLimit)` - `limit` is zero
    pub fn subscribe_limited(
        &self,
        topic: &str,
        handler: Handler<A>,
        limit: usize,
    ) -> Result<SubscriptionHandle> {
        ensure_topic(topic)?;
        let remaining = Remaining::limited(limit)?;
        Ok(self.registry.lock().insert(topic, handler, remaining))
    }

    /// Cancel a subscription by handle or by `(topic, handler)`.
    ///
    /// Returns `Ok(false)` when nothing matched. The `(topic, handler)` form
    /// removes only the first subscription of that exact handler.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument(EmptyTopic)` - the `(topic, handler)` form got an
    ///   empty topic
    pub fn unsubscribe<'a>(&self, target: impl Into<Unsubscribe<'a, A>>) -> Result<bool>
    where
        A: 'a,
    {
        let removed = match target.into() {
            Unsubscribe::Handle(handle) => self.registry.lock().remove(handle),
            Unsubscribe::Handler { topic, handler } => {
                ensure_topic(topic)?;
                self.registry.lock().remove_handler(topic, handler)
            }
        };
        if !removed {
            debug!("Unsubscribe matched no subscription");
        }
        Ok(removed)
    }

    /// Shorthand for the `(topic, handler)` form of `unsubscribe`.
    pub fn unsubscribe_handler(&self, topic: &str, handler: &Handler<A>) -> Result<bool> {
        self.unsubscribe((topic, handler))
    }

    /// Alias for `subscribe`.
    pub fn on(&self, topic: &str, handler: Handler<A>) -> Result<SubscriptionHandle> {
        self.subscribe(topic, handler)
    }

    /// Alias for `unsubscribe`.
    pub fn off<'a>(&self, target: impl Into<Unsubscribe<'a, A>>) -> Result<bool>
    where
        A: 'a,
    {
        self.unsubscribe(target)
    }

    /// True while `handle` identifies a live subscription.
    #[must_use]
    pub fn is_subscribed(&self, handle: SubscriptionHandle) -> bool {
        self.registry.lock().contains(handle)
    }

    /// Invocations left for a live subscription.
    #[must_use]
    pub fn remaining(&self, handle: SubscriptionHandle) -> Option<Remaining> {
        self.registry.lock().remaining(handle)
    }

    /// Number of live subscriptions on `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.registry.lock().count(topic)
    }

    /// Number of topics with at least one subscription.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.registry.lock().topic_count()
    }

    /// Number of live subscriptions across all topics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.lock().is_empty()
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        self.registry.lock().assert_consistent();
    }
}

impl<A> PubSub<A>
where
    A: Send + Sync + 'static,
{
    /// Publish `args` to every subscriber of `topic`.
    ///
    /// Publishing to the configured wildcard topic reaches every topic.
    /// Returns `Ok(true)` iff at least one subscription existed at call time.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument(EmptyTopic)` - `topic` is empty
    /// - `HandlerFailure` - a handler failed (sync dispatch only)
    /// - `NoRuntime` - async dispatch outside a Tokio runtime
    pub fn publish<I>(&self, topic: &str, args: I) -> Result<bool>
    where
        I: IntoIterator<Item = A>,
    {
        ensure_topic(topic)?;
        let wildcard = self.config.is_wildcard(topic);

        match self.config.dispatch {
            DispatchMode::Sync => {
                let args: Vec<A> = args.into_iter().collect();
                dispatcher::publish_sync(&self.registry, topic, wildcard, &args)
            }
            DispatchMode::Async => {
                let args: Arc<[A]> = args.into_iter().collect();
                dispatcher::publish_async(&self.registry, topic, wildcard, args)
            }
        }
    }

    /// Alias for `publish`.
    pub fn emit<I>(&self, topic: &str, args: I) -> Result<bool>
    where
        I: IntoIterator<Item = A>,
    {
        self.publish(topic, args)
    }
}

impl<A> Default for PubSub<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for PubSub<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.lock();
        f.debug_struct("PubSub")
            .field("config", &self.config)
            .field("topics", &registry.topic_count())
            .field("subscriptions", &registry.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ArgumentError, PubSubError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Handler<i32> {
        let log = Arc::clone(log);
        Handler::infallible(move |_| log.lock().push(name))
    }

    #[test]
    fn test_subscribe_rejects_empty_topic() {
        let bus: PubSub<i32> = PubSub::new();
        let err = bus.subscribe("", Handler::infallible(|_| {})).unwrap_err();
        assert!(matches!(
            err,
            PubSubError::InvalidArgument(ArgumentError::EmptyTopic)
        ));
        assert!(bus.is_empty());
    }

    #[test]
    fn test_subscribe_limited_rejects_zero() {
        let bus: PubSub<i32> = PubSub::new();
        let err = bus
            .subscribe_limited("m", Handler::infallible(|_| {}), 0)
            .unwrap_err();
        assert!(matches!(
            err,
            PubSubError::InvalidArgument(ArgumentError::ZeroLimit)
        ));
        assert!(bus.is_empty());
    }

    #[test]
    fn test_publish_and_unsubscribe_reject_empty_topic() {
        let bus: PubSub<i32> = PubSub::new();
        let handler: Handler<i32> = Handler::infallible(|_| {});
        assert!(bus.publish("", []).unwrap_err().is_invalid_argument());
        assert!(bus
            .unsubscribe(("", &handler))
            .unwrap_err()
            .is_invalid_argument());
    }

    #[test]
    fn test_dispatch_in_subscribe_order() {
        let bus = PubSub::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe("m", recorder(&log, "first")).unwrap();
        bus.subscribe("m", recorder(&log, "second")).unwrap();
        bus.subscribe("m", recorder(&log, "third")).unwrap();

        assert!(bus.publish("m", [1]).unwrap());
        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_order_survives_middle_removal() {
        let bus = PubSub::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe("m", recorder(&log, "a")).unwrap();
        let b = bus.subscribe("m", recorder(&log, "b")).unwrap();
        let c = bus.subscribe("m", recorder(&log, "c")).unwrap();
        bus.subscribe("m", recorder(&log, "d")).unwrap();

        assert!(bus.unsubscribe(b).unwrap());
        assert!(bus.unsubscribe(c).unwrap());
        bus.publish("m", []).unwrap();

        assert_eq!(*log.lock(), vec!["a", "d"]);
        bus.assert_consistent();
    }

    #[test]
    fn test_handle_unsubscribe_is_one_shot() {
        let bus: PubSub<i32> = PubSub::new();
        let handle = bus.subscribe("m", Handler::infallible(|_| {})).unwrap();

        assert!(bus.is_subscribed(handle));
        assert!(bus.unsubscribe(handle).unwrap());
        assert!(!bus.unsubscribe(handle).unwrap());
        assert!(!bus.off(&handle).unwrap());
        assert!(!bus.is_subscribed(handle));
    }

    #[test]
    fn test_handle_from_other_bus_is_unknown() {
        let bus_a: PubSub<i32> = PubSub::new();
        let bus_b: PubSub<i32> = PubSub::new();
        let handle = bus_a.subscribe("m", Handler::infallible(|_| {})).unwrap();
        bus_b.subscribe("m", Handler::infallible(|_| {})).unwrap();

        assert!(!bus_b.unsubscribe(handle).unwrap());
        assert_eq!(bus_b.subscriber_count("m"), 1);
    }

    #[test]
    fn test_unsubscribe_handler_removes_one_per_call() {
        let bus = PubSub::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counted = {
            let hits = Arc::clone(&hits);
            Handler::infallible(move |_: &[i32]| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        bus.subscribe("m", counted.clone()).unwrap();
        bus.subscribe("m", counted.clone()).unwrap();

        assert!(bus.unsubscribe_handler("m", &counted).unwrap());
        bus.publish("m", []).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(bus.unsubscribe_handler("m", &counted).unwrap());
        assert!(!bus.unsubscribe_handler("m", &counted).unwrap());
        assert!(!bus.publish("m", []).unwrap());
    }

    #[test]
    fn test_limited_subscription_fires_exactly_limit_times() {
        let bus = PubSub::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let handle = {
            let hits = Arc::clone(&hits);
            bus.subscribe_limited(
                "m",
                Handler::infallible(move |_: &[i32]| {
                    hits.fetch_add(1, Ordering::SeqCst);
                }),
                2,
            )
            .unwrap()
        };

        assert_eq!(bus.remaining(handle), Some(Remaining::Times(2)));
        assert!(bus.publish("m", []).unwrap());
        assert_eq!(bus.remaining(handle), Some(Remaining::Times(1)));
        assert!(bus.publish("m", []).unwrap());
        assert_eq!(bus.remaining(handle), None);
        assert!(!bus.publish("m", []).unwrap());
        assert!(!bus.publish("m", []).unwrap());

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(!bus.unsubscribe(handle).unwrap());
        assert_eq!(bus.topic_count(), 0);
    }

    #[test]
    fn test_aliases() {
        let bus = PubSub::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let handle = {
            let hits = Arc::clone(&hits);
            bus.on(
                "m",
                Handler::infallible(move |args: &[i32]| {
                    hits.fetch_add(args.len(), Ordering::SeqCst);
                }),
            )
            .unwrap()
        };

        assert!(bus.emit("m", [1, 2, 3]).unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert!(bus.off(handle).unwrap());
        assert!(!bus.emit("m", [1]).unwrap());
    }

    #[test]
    fn test_with_config_validates() {
        let config = PubSubConfig::default().with_wildcard_topic(Some(""));
        assert!(matches!(
            PubSub::<i32>::with_config(config),
            Err(PubSubError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_debug_hides_handlers() {
        let bus: PubSub<i32> = PubSub::new();
        bus.subscribe("m", Handler::infallible(|_| {})).unwrap();
        let shown = format!("{bus:?}");
        assert!(shown.contains("subscriptions: 1"));
        assert!(shown.contains("topics: 1"));
    }
}
