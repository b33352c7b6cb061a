//! Forwarder (spec §4.4).
//!
//! One forwarder drains one driver `Result`'s item stream (a row-count
//! stream or a mapped-record stream — both already reduced to a plain
//! `Stream<Item = Result<T>>` by [`crate::result_subscriber`]) into the
//! owning subscription, one item at a time, gated by the subscription's
//! demand counter. Per-item pacing rather than bulk demand forwarding is
//! deliberate: it bounds in-flight items to the number of active
//! forwarders regardless of how aggressively downstream requests.

use crate::error::Result;
use crate::reactive::Subscriber;
use crate::subscription::SubscriptionCore;
use futures::{Stream, StreamExt};
use std::sync::{Arc, Mutex as StdMutex};

/// Drains `stream` into `subscriber`, registering/unregistering itself in
/// `core`'s forwarder table for the duration (spec §3: "forwarders are
/// keyed by a unique monotonically increasing index").
///
/// Returns `Ok(())` on normal completion or on observing the subscription
/// already completed (cancelled or terminated by a sibling forwarder);
/// returns the upstream error otherwise, which the caller propagates to
/// the subscription's single `on_error` delivery.
pub async fn forward<S, T>(
    index: u64,
    stream: S,
    core: Arc<SubscriptionCore>,
    subscriber: Arc<StdMutex<Box<dyn Subscriber<T>>>>,
) -> Result<()>
where
    S: Stream<Item = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    core.register_forwarder(index);
    let mut upstream = Box::pin(stream);
    let outcome = 'outer: loop {
        if core.is_completed() {
            break Ok(());
        }
        core.wait_for_demand().await;
        if core.is_completed() {
            break Ok(());
        }
        match upstream.next().await {
            Some(Ok(item)) => {
                // `consume_one_if_live` can lose a race against a sibling
                // forwarder (the demand counter is shared across every
                // forwarder of the same subscription). Losing doesn't mean
                // the subscription is out of demand for good, only that this
                // particular unit was already spent elsewhere, so the item
                // already pulled off `upstream` is held onto and demand is
                // re-awaited rather than discarding it and ending the
                // forwarder early.
                loop {
                    if core.consume_one_if_live() {
                        subscriber.lock().unwrap().on_next(item);
                        continue 'outer;
                    }
                    if core.is_completed() {
                        break 'outer Ok(());
                    }
                    core.wait_for_demand().await;
                    if core.is_completed() {
                        break 'outer Ok(());
                    }
                }
            }
            Some(Err(err)) => break Err(err),
            None => break Ok(()),
        }
    };
    core.unregister_forwarder(index);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Subscription as SubscriptionTrait;
    use futures::stream;

    struct RecordingSubscriber {
        items: Arc<StdMutex<Vec<i32>>>,
    }
    impl Subscriber<i32> for RecordingSubscriber {
        fn on_subscribe(&mut self, _subscription: Arc<dyn SubscriptionTrait>) {}
        fn on_next(&mut self, item: i32) {
            self.items.lock().unwrap().push(item);
        }
        fn on_complete(&mut self) {}
        fn on_error(&mut self, _error: crate::error::Error) {}
    }

    #[tokio::test]
    async fn forwards_exactly_as_many_items_as_granted_then_blocks() {
        let core = SubscriptionCore::new();
        core.request(2);
        let items = Arc::new(StdMutex::new(Vec::new()));
        let subscriber: Arc<StdMutex<Box<dyn Subscriber<i32>>>> = Arc::new(StdMutex::new(Box::new(
            RecordingSubscriber { items: items.clone() },
        )));
        let stream_items = stream::iter(vec![Ok(1), Ok(2), Ok(3)]);
        let core_for_cancel = core.clone();
        let handle = tokio::spawn(forward(0, stream_items, core.clone(), subscriber));
        // Give the forwarder a chance to drain the two granted items, then
        // cancel so the test doesn't hang waiting on a third unit of demand
        // that never arrives.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        core_for_cancel.cancel();
        let result = handle.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(*items.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn two_forwarders_sharing_demand_retry_instead_of_dropping_a_lost_race() {
        let core = SubscriptionCore::new();
        core.request(1);
        let items = Arc::new(StdMutex::new(Vec::new()));
        let subscriber_a: Arc<StdMutex<Box<dyn Subscriber<i32>>>> = Arc::new(StdMutex::new(Box::new(
            RecordingSubscriber { items: items.clone() },
        )));
        let subscriber_b: Arc<StdMutex<Box<dyn Subscriber<i32>>>> = Arc::new(StdMutex::new(Box::new(
            RecordingSubscriber { items: items.clone() },
        )));
        let stream_a = stream::iter(vec![Ok(1)]);
        let stream_b = stream::iter(vec![Ok(2)]);
        let core_for_cancel = core.clone();
        let handle_a = tokio::spawn(forward(0, stream_a, core.clone(), subscriber_a));
        let handle_b = tokio::spawn(forward(1, stream_b, core.clone(), subscriber_b));
        // Only one unit of demand is available to start: both forwarders pull
        // their own item concurrently, exactly one wins `consume_one_if_live`,
        // and the loser must hold its already-pulled item and wait for more
        // demand rather than drop it and exit.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        core.request(1);
        // Both items are now delivered and each forwarder's upstream is
        // exhausted, but a forwarder only learns that by polling again once
        // more demand shows up, which never happens here — cancel to
        // unblock both instead of waiting on a third unit of demand.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        core_for_cancel.cancel();
        let (result_a, result_b) = tokio::join!(handle_a, handle_b);
        assert!(result_a.unwrap().is_ok());
        assert!(result_b.unwrap().is_ok());
        let mut delivered = items.lock().unwrap().clone();
        delivered.sort();
        assert_eq!(delivered, vec![1, 2]);
    }

    #[tokio::test]
    async fn stops_without_error_once_completed() {
        let core = SubscriptionCore::new();
        core.cancel();
        let items = Arc::new(StdMutex::new(Vec::new()));
        let subscriber: Arc<StdMutex<Box<dyn Subscriber<i32>>>> = Arc::new(StdMutex::new(Box::new(
            RecordingSubscriber { items: items.clone() },
        )));
        let stream_items = stream::iter(vec![Ok(1), Ok(2)]);
        let result = forward(0, stream_items, core, subscriber).await;
        assert!(result.is_ok());
        assert!(items.lock().unwrap().is_empty());
    }
}
