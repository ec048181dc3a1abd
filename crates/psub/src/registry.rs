//! # Subscription Registry
//!
//! Owns the topic → subscriptions mapping and a denormalized
//! handle → location index for O(1) handle lookup.
//!
//! ## Index Maintenance
//!
//! - Each topic's list keeps subscribe order, which is dispatch order
//! - Removing the entry at position `i` shifts every later entry down by one,
//!   so their recorded positions are decremented in the same step
//! - A list that becomes empty drops its topic key

use crate::subscription::{Handler, Remaining, Subscription, SubscriptionHandle};
use std::collections::HashMap;
use tracing::debug;

/// Where a live handle's subscription sits.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Location {
    topic: String,
    index: usize,
}

/// Handler claimed for one invocation.
pub(crate) struct Claimed<A> {
    pub(crate) handle: SubscriptionHandle,
    pub(crate) handler: Handler<A>,
}

pub(crate) struct Registry<A> {
    /// Map of topic -> subscriptions in subscribe order.
    topics: HashMap<String, Vec<Subscription<A>>>,

    /// Map of handle -> position of its subscription.
    locations: HashMap<SubscriptionHandle, Location>,
}

impl<A> Registry<A> {
    pub(crate) fn new() -> Self {
        Self {
            topics: HashMap::new(),
            locations: HashMap::new(),
        }
    }

    /// Append a subscription to `topic` and index its handle.
    pub(crate) fn insert(
        &mut self,
        topic: &str,
        handler: Handler<A>,
        remaining: Remaining,
    ) -> SubscriptionHandle {
        let handle = SubscriptionHandle::new();
        let subscriptions = self.topics.entry(topic.to_owned()).or_default();
        subscriptions.push(Subscription {
            handle,
            handler,
            remaining,
        });

        let index = subscriptions.len() - 1;
        self.locations.insert(
            handle,
            Location {
                topic: topic.to_owned(),
                index,
            },
        );

        debug!(%topic, %handle, index, ?remaining, "Subscription added");
        handle
    }

    /// Remove the subscription identified by `handle`.
    pub(crate) fn remove(&mut self, handle: SubscriptionHandle) -> bool {
        let Some(Location { topic, index }) = self.locations.get(&handle).cloned() else {
            return false;
        };
        self.remove_at(&topic, index).is_some()
    }

    /// Remove the first subscription on `topic` whose handler is `handler`.
    pub(crate) fn remove_handler(&mut self, topic: &str, handler: &Handler<A>) -> bool {
        let Some(index) = self
            .topics
            .get(topic)
            .and_then(|subs| subs.iter().position(|sub| sub.handler.same(handler)))
        else {
            return false;
        };
        self.remove_at(topic, index).is_some()
    }

    /// Handles subscribed to `topic`, in dispatch order.
    pub(crate) fn handles(&self, topic: &str) -> Vec<SubscriptionHandle> {
        self.topics
            .get(topic)
            .map(|subs| subs.iter().map(|sub| sub.handle).collect())
            .unwrap_or_default()
    }

    /// Handles of every topic, grouped per topic.
    pub(crate) fn all_handles(&self) -> Vec<(String, Vec<SubscriptionHandle>)> {
        self.topics
            .iter()
            .map(|(topic, subs)| (topic.clone(), subs.iter().map(|sub| sub.handle).collect()))
            .collect()
    }

    /// Consume one invocation of a live subscription.
    ///
    /// Returns `None` if the handle is no longer registered. A bounded
    /// subscription whose count reaches zero is removed before returning,
    /// so it can never be claimed again.
    pub(crate) fn claim(&mut self, handle: SubscriptionHandle) -> Option<Claimed<A>> {
        let Location { topic, index } = self.locations.get(&handle).cloned()?;
        let sub = self.topics.get_mut(&topic)?.get_mut(index)?;

        let claimed = Claimed {
            handle,
            handler: sub.handler.clone(),
        };
        if sub.remaining.consume() {
            self.remove_at(&topic, index);
            debug!(%topic, %handle, "Subscription expired");
        }
        Some(claimed)
    }

    pub(crate) fn remaining(&self, handle: SubscriptionHandle) -> Option<Remaining> {
        let location = self.locations.get(&handle)?;
        self.topics
            .get(&location.topic)
            .and_then(|subs| subs.get(location.index))
            .map(|sub| sub.remaining)
    }

    pub(crate) fn contains(&self, handle: SubscriptionHandle) -> bool {
        self.locations.contains_key(&handle)
    }

    pub(crate) fn count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, Vec::len)
    }

    pub(crate) fn topic_count(&self) -> usize {
        self.topics.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.locations.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Splice out one entry and shift the positions recorded after it.
    fn remove_at(&mut self, topic: &str, index: usize) -> Option<Subscription<A>> {
        let subs = self.topics.get_mut(topic)?;
        if index >= subs.len() {
            return None;
        }
        let removed = subs.remove(index);
        self.locations.remove(&removed.handle);

        for sub in &subs[index..] {
            if let Some(location) = self.locations.get_mut(&sub.handle) {
                location.index -= 1;
            }
        }
        if subs.is_empty() {
            self.topics.remove(topic);
        }

        debug!(%topic, handle = %removed.handle, index, "Subscription removed");
        Some(removed)
    }

    /// Panic unless every invariant of the two maps holds.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let mut seen = 0;
        for (topic, subs) in &self.topics {
            assert!(!subs.is_empty(), "topic {topic:?} kept an empty list");
            for (index, sub) in subs.iter().enumerate() {
                let location = self
                    .locations
                    .get(&sub.handle)
                    .expect("live subscription missing from index");
                assert_eq!(location.topic, *topic);
                assert_eq!(location.index, index);
                assert_ne!(sub.remaining, Remaining::Times(0));
                seen += 1;
            }
        }
        assert_eq!(seen, self.locations.len(), "index holds stale handles");
    }
}
