//! # Dispatcher
//!
//! Resolves the subscriptions a publish reaches and invokes their handlers.
//!
//! ## Disciplines
//!
//! - **Sync:** handles are snapshotted when `publish` is called. Each one is
//!   claimed just before its handler runs, so a subscription removed by an
//!   earlier handler of the same publish is skipped, and one added during
//!   the publish is not reached. The first handler error aborts the publish.
//! - **Async:** every resolved subscription is claimed up front, then each
//!   handler is spawned as its own Tokio task. Removal after `publish`
//!   returns only affects later publishes.
//!
//! In both cases the registry lock is held for resolution and claiming and
//! released before any handler runs, so handlers may call back into the bus.

use crate::error::{PubSubError, Result};
use crate::registry::{Claimed, Registry};
use crate::subscription::SubscriptionHandle;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, error, trace};

/// Subscriptions reached by one publish, grouped per topic.
type Resolved = Vec<(String, Vec<SubscriptionHandle>)>;

/// Resolve `topic`, or every topic when `wildcard` is set.
fn resolve<A>(registry: &Registry<A>, topic: &str, wildcard: bool) -> Resolved {
    if wildcard {
        return registry.all_handles();
    }
    let handles = registry.handles(topic);
    if handles.is_empty() {
        return Vec::new();
    }
    vec![(topic.to_owned(), handles)]
}

/// Run handlers in subscribe order on the calling thread.
///
/// Returns whether any subscription existed at call time.
pub(crate) fn publish_sync<A>(
    registry: &Mutex<Registry<A>>,
    topic: &str,
    wildcard: bool,
    args: &[A],
) -> Result<bool> {
    let resolved = resolve(&registry.lock(), topic, wildcard);
    if resolved.is_empty() {
        debug!(%topic, "Publish dropped (no subscribers)");
        return Ok(false);
    }

    let mut invoked = 0usize;
    for (target, handles) in resolved {
        for handle in handles {
            let claimed = registry.lock().claim(handle);
            let Some(Claimed { handle, handler }) = claimed else {
                trace!(topic = %target, %handle, "Skipping subscription removed mid-publish");
                continue;
            };

            trace!(topic = %target, %handle, "Invoking handler");
            invoked += 1;
            handler
                .call(args)
                .map_err(|source| PubSubError::HandlerFailure {
                    topic: target.clone(),
                    handle,
                    source,
                })?;
        }
    }

    debug!(%topic, invoked, "Published");
    Ok(true)
}

/// Spawn one task per handler and return without waiting for them.
///
/// Returns whether any subscription existed at call time.
pub(crate) fn publish_async<A>(
    registry: &Mutex<Registry<A>>,
    topic: &str,
    wildcard: bool,
    args: Arc<[A]>,
) -> Result<bool>
where
    A: Send + Sync + 'static,
{
    // Checked first so a missing runtime never consumes invocations
    let runtime = Handle::try_current().map_err(|_| PubSubError::NoRuntime)?;

    let claimed: Vec<(String, Claimed<A>)> = {
        let mut registry = registry.lock();
        let resolved = resolve(&registry, topic, wildcard);
        resolved
            .into_iter()
            .flat_map(|(target, handles)| handles.into_iter().map(move |h| (target.clone(), h)))
            .filter_map(|(target, handle)| registry.claim(handle).map(|c| (target, c)))
            .collect()
    };

    if claimed.is_empty() {
        debug!(%topic, "Publish dropped (no subscribers)");
        return Ok(false);
    }

    let scheduled = claimed.len();
    for (target, Claimed { handle, handler }) in claimed {
        let args = Arc::clone(&args);
        runtime.spawn(async move {
            trace!(topic = %target, %handle, "Invoking handler");
            if let Err(err) = handler.call(&args) {
                error!(
                    topic = %target,
                    %handle,
                    error = %format!("{err:#}"),
                    "Handler failed"
                );
            }
        });
    }

    debug!(%topic, scheduled, "Published");
    Ok(true)
}
