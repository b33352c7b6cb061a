//! Legacy blocking path (spec §4.7), behind the `blocking` feature.
//!
//! Two `Subscription` implementations that satisfy the same consumer-facing
//! contract as the non-blocking engine but execute entirely synchronously
//! inside `request()`, pumping a synchronous cursor instead of draining a
//! `Stream`. Kept in its own module and gated out by default (spec §9:
//! "keep them in a separate module behind a feature switch; do not share
//! mutable state with the non-blocking core") — neither type here touches
//! [`crate::subscription::SubscriptionCore`].
//!
//! "They use `synchronized` pumping because they do not participate in the
//! non-blocking demand pump" (spec §4.7) is realized literally: both types
//! hold their entire mutable state behind one `std::sync::Mutex`, acquired
//! for the whole duration of each `request`/`cancel` call.

use crate::demand::Demand;
use crate::error::{self, Result};
use crate::reactive::{Subscriber, Subscription};
use std::sync::{Arc, Mutex};

/// A synchronous, pull-one-at-a-time analogue of a driver row stream
/// (spec §1: "a legacy blocking code path that wraps a synchronous
/// cursor"). An external collaborator, like the non-blocking driver
/// traits; this crate ships no concrete implementation beyond its own
/// test fixture.
pub trait BlockingCursor<T>: Send {
    /// Returns the next item, or `None` at end-of-stream.
    fn fetch_next(&mut self) -> Result<Option<T>>;
    fn close(&mut self) -> Result<()>;
}

/// Opens a fresh cursor for one query execution (analogous to the
/// non-blocking path's connection-subscriber render/prepare/execute
/// sequence, but collapsed into one synchronous call).
pub trait BlockingCursorSource<T>: Send {
    fn open(&mut self) -> Result<Box<dyn BlockingCursor<T>>>;
}

/// A one-shot blocking row-count execution.
pub trait BlockingRowCountSource: Send {
    fn execute(&mut self) -> Result<u64>;
}

struct RecordState<T> {
    closed: bool,
    demand: Demand,
    cursor: Option<Box<dyn BlockingCursor<T>>>,
    source: Box<dyn BlockingCursorSource<T>>,
    subscriber: Box<dyn Subscriber<T>>,
}

/// A blocking record subscription: lazily opens a cursor on first
/// `request`, then pulls `fetch_next` in a loop while demand remains
/// (spec §4.7).
pub struct BlockingRecordSubscription<T> {
    state: Mutex<RecordState<T>>,
}

impl<T: Send + 'static> BlockingRecordSubscription<T> {
    pub fn subscribe(
        source: Box<dyn BlockingCursorSource<T>>,
        subscriber: impl Subscriber<T> + 'static,
    ) -> Arc<dyn Subscription> {
        let this = Arc::new(Self {
            state: Mutex::new(RecordState {
                closed: false,
                demand: Demand::new(),
                cursor: None,
                source,
                subscriber: Box::new(subscriber),
            }),
        });
        let handle: Arc<dyn Subscription> = this.clone();
        this.state.lock().unwrap().subscriber.on_subscribe(handle.clone());
        handle
    }

    fn close_cursor(state: &mut RecordState<T>) {
        if let Some(mut cursor) = state.cursor.take() {
            let _ = cursor.close();
        }
    }
}

impl<T: Send + 'static> Subscription for BlockingRecordSubscription<T> {
    fn request(&self, n: i64) {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return;
        }
        if n <= 0 {
            state.closed = true;
            Self::close_cursor(&mut state);
            state.subscriber.on_error(error::invalid_argument(format!(
                "request(n) called with n={n}, must be positive"
            )));
            return;
        }
        let _ = state.demand.add(n);

        if state.cursor.is_none() {
            match state.source.open() {
                Ok(cursor) => state.cursor = Some(cursor),
                Err(err) => {
                    state.closed = true;
                    state.subscriber.on_error(err);
                    return;
                }
            }
        }

        while !state.closed && state.demand.try_consume_one() {
            let outcome = state.cursor.as_mut().unwrap().fetch_next();
            match outcome {
                Ok(Some(item)) => state.subscriber.on_next(item),
                Ok(None) => {
                    state.closed = true;
                    Self::close_cursor(&mut state);
                    state.subscriber.on_complete();
                }
                Err(err) => {
                    state.closed = true;
                    Self::close_cursor(&mut state);
                    state.subscriber.on_error(err);
                }
            }
        }
    }

    fn cancel(&self) {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return;
        }
        state.closed = true;
        Self::close_cursor(&mut state);
    }
}

struct RowCountState {
    closed: bool,
    executed: bool,
    source: Box<dyn BlockingRowCountSource>,
    subscriber: Box<dyn Subscriber<u64>>,
}

/// A blocking row-count subscription: executes once and signals a single
/// `on_next` then `on_complete` (spec §4.7).
pub struct BlockingRowCountSubscription {
    state: Mutex<RowCountState>,
}

impl BlockingRowCountSubscription {
    pub fn subscribe(
        source: Box<dyn BlockingRowCountSource>,
        subscriber: impl Subscriber<u64> + 'static,
    ) -> Arc<dyn Subscription> {
        let this = Arc::new(Self {
            state: Mutex::new(RowCountState {
                closed: false,
                executed: false,
                source,
                subscriber: Box::new(subscriber),
            }),
        });
        let handle: Arc<dyn Subscription> = this.clone();
        this.state.lock().unwrap().subscriber.on_subscribe(handle.clone());
        handle
    }
}

impl Subscription for BlockingRowCountSubscription {
    fn request(&self, n: i64) {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return;
        }
        if n <= 0 {
            state.closed = true;
            state.subscriber.on_error(error::invalid_argument(format!(
                "request(n) called with n={n}, must be positive"
            )));
            return;
        }
        if state.executed {
            return;
        }
        state.executed = true;
        match state.source.execute() {
            Ok(count) => {
                state.closed = true;
                state.subscriber.on_next(count);
                state.subscriber.on_complete();
            }
            Err(err) => {
                state.closed = true;
                state.subscriber.on_error(err);
            }
        }
    }

    fn cancel(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct VecCursor(std::vec::IntoIter<i32>);
    impl BlockingCursor<i32> for VecCursor {
        fn fetch_next(&mut self) -> Result<Option<i32>> {
            Ok(self.0.next())
        }
        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    struct VecSource(Option<Vec<i32>>);
    impl BlockingCursorSource<i32> for VecSource {
        fn open(&mut self) -> Result<Box<dyn BlockingCursor<i32>>> {
            let items = self.0.take().unwrap_or_default();
            Ok(Box::new(VecCursor(items.into_iter())))
        }
    }

    #[derive(Default)]
    struct RecordingSubscriber {
        items: Vec<i32>,
        completed: bool,
        errored: bool,
    }
    impl Subscriber<i32> for RecordingSubscriber {
        fn on_subscribe(&mut self, _subscription: Arc<dyn Subscription>) {}
        fn on_next(&mut self, item: i32) {
            self.items.push(item);
        }
        fn on_complete(&mut self) {
            self.completed = true;
        }
        fn on_error(&mut self, _error: crate::error::Error) {
            self.errored = true;
        }
    }

    struct SharedSubscriber(Arc<StdMutex<RecordingSubscriber>>);
    impl Subscriber<i32> for SharedSubscriber {
        fn on_subscribe(&mut self, subscription: Arc<dyn Subscription>) {
            self.0.lock().unwrap().on_subscribe(subscription);
        }
        fn on_next(&mut self, item: i32) {
            self.0.lock().unwrap().on_next(item);
        }
        fn on_complete(&mut self) {
            self.0.lock().unwrap().on_complete();
        }
        fn on_error(&mut self, error: crate::error::Error) {
            self.0.lock().unwrap().on_error(error);
        }
    }

    #[test]
    fn pulls_all_rows_then_completes_under_unbounded_demand() {
        let shared = Arc::new(StdMutex::new(RecordingSubscriber::default()));
        let source = Box::new(VecSource(Some(vec![1, 2, 3])));
        let subscription = BlockingRecordSubscription::subscribe(source, SharedSubscriber(shared.clone()));
        subscription.request(crate::demand::UNBOUNDED);
        let state = shared.lock().unwrap();
        assert_eq!(state.items, vec![1, 2, 3]);
        assert!(state.completed);
        assert!(!state.errored);
    }

    #[test]
    fn bounded_request_yields_exactly_that_many_rows() {
        let shared = Arc::new(StdMutex::new(RecordingSubscriber::default()));
        let source = Box::new(VecSource(Some(vec![1, 2, 3])));
        let subscription = BlockingRecordSubscription::subscribe(source, SharedSubscriber(shared.clone()));
        subscription.request(2);
        let state = shared.lock().unwrap();
        assert_eq!(state.items, vec![1, 2]);
        assert!(!state.completed);
    }

    #[test]
    fn invalid_request_signals_error_and_never_opens_cursor() {
        let shared = Arc::new(StdMutex::new(RecordingSubscriber::default()));
        let source = Box::new(VecSource(Some(vec![1])));
        let subscription = BlockingRecordSubscription::subscribe(source, SharedSubscriber(shared.clone()));
        subscription.request(0);
        let state = shared.lock().unwrap();
        assert!(state.errored);
        assert!(state.items.is_empty());
    }
}
