//! # Subscriptions
//!
//! Handles, handlers and the per-subscription record kept by the registry.

use crate::error::{ArgumentError, Result};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Opaque token identifying one subscription.
///
/// Handles are only minted by the registry. There is no public constructor
/// and no conversion from strings, integers or UUIDs, so a handle cannot be
/// forged or mixed up with a topic name.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(Uuid);

impl SubscriptionHandle {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionHandle({})", self.0)
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0.simple())
    }
}

type HandlerFn<A> = dyn Fn(&[A]) -> anyhow::Result<()> + Send + Sync;

/// A callable invoked with the arguments of every matching publish.
///
/// Identity is the underlying allocation: clones of a `Handler` are the same
/// handler, two handlers built from identical closures are not.
pub struct Handler<A = serde_json::Value> {
    inner: Arc<HandlerFn<A>>,
}

impl<A> Handler<A> {
    /// Wrap a fallible closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[A]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Wrap a closure that cannot fail.
    pub fn infallible<F>(f: F) -> Self
    where
        F: Fn(&[A]) + Send + Sync + 'static,
    {
        Self::new(move |args| {
            f(args);
            Ok(())
        })
    }

    /// Reference identity, used by `(topic, handler)` removal.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn call(&self, args: &[A]) -> anyhow::Result<()> {
        (self.inner)(args)
    }
}

impl<A> Clone for Handler<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> fmt::Debug for Handler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler")
            .field(&Arc::as_ptr(&self.inner).cast::<()>())
            .finish()
    }
}

/// How many more times a subscription may fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Unbounded,
    /// Always at least one while the subscription is live.
    Times(usize),
}

impl Remaining {
    pub(crate) fn limited(limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(ArgumentError::ZeroLimit.into());
        }
        Ok(Self::Times(limit))
    }

    /// Consume one invocation. Returns true when the subscription is spent.
    pub(crate) fn consume(&mut self) -> bool {
        match self {
            Self::Unbounded => false,
            Self::Times(n) => {
                *n = n.saturating_sub(1);
                *n == 0
            }
        }
    }
}

/// One handler bound to one topic.
pub(crate) struct Subscription<A> {
    pub(crate) handle: SubscriptionHandle,
    pub(crate) handler: Handler<A>,
    pub(crate) remaining: Remaining,
}

/// The two call shapes accepted by `unsubscribe`.
#[derive(Debug)]
pub enum Unsubscribe<'a, A> {
    /// Remove the subscription the handle identifies.
    Handle(SubscriptionHandle),
    /// Remove the first subscription of `handler` on `topic`.
    Handler {
        topic: &'a str,
        handler: &'a Handler<A>,
    },
}

impl<A> From<SubscriptionHandle> for Unsubscribe<'_, A> {
    fn from(handle: SubscriptionHandle) -> Self {
        Self::Handle(handle)
    }
}

impl<A> From<&SubscriptionHandle> for Unsubscribe<'_, A> {
    fn from(handle: &SubscriptionHandle) -> Self {
        Self::Handle(*handle)
    }
}

impl<'a, A> From<(&'a str, &'a Handler<A>)> for Unsubscribe<'a, A> {
    fn from((topic, handler): (&'a str, &'a Handler<A>)) -> Self {
        Self::Handler { topic, handler }
    }
}
