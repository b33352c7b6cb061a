//! Coverage for the legacy blocking path (feature `blocking`) against the
//! testkit's synchronous cursor/row-count fixtures.

#![cfg(feature = "blocking")]

use std::sync::{Arc, Mutex};

use streamql_core::{BlockingRecordSubscription, BlockingRowCountSubscription, Error, Subscriber, Subscription};
use streamql_testkit::blocking::{FixedRowCount, VecCursorSource};

#[derive(Default)]
struct Recorded<T> {
    items: Vec<T>,
    completed: bool,
    errored: bool,
}

struct Recorder<T>(Arc<Mutex<Recorded<T>>>);

impl<T: Send + 'static> Subscriber<T> for Recorder<T> {
    fn on_subscribe(&mut self, _subscription: Arc<dyn Subscription>) {}
    fn on_next(&mut self, item: T) {
        self.0.lock().unwrap().items.push(item);
    }
    fn on_complete(&mut self) {
        self.0.lock().unwrap().completed = true;
    }
    fn on_error(&mut self, _error: Error) {
        self.0.lock().unwrap().errored = true;
    }
}

#[test]
fn unbounded_request_drains_every_row_then_completes() {
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let source = Box::new(VecCursorSource(Some(vec![1, 2, 3, 4])));
    let subscription = BlockingRecordSubscription::subscribe(source, Recorder(recorded.clone()));

    subscription.request(streamql_core::UNBOUNDED);

    let state = recorded.lock().unwrap();
    assert_eq!(state.items, vec![1, 2, 3, 4]);
    assert!(state.completed);
    assert!(!state.errored);
}

#[test]
fn bounded_request_yields_only_what_was_asked_for() {
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let source = Box::new(VecCursorSource(Some(vec![1, 2, 3, 4])));
    let subscription = BlockingRecordSubscription::subscribe(source, Recorder(recorded.clone()));

    subscription.request(2);

    let state = recorded.lock().unwrap();
    assert_eq!(state.items, vec![1, 2]);
    assert!(!state.completed);
}

#[test]
fn invalid_request_errors_without_opening_the_cursor() {
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let source = Box::new(VecCursorSource(Some(vec![1])));
    let subscription = BlockingRecordSubscription::subscribe(source, Recorder(recorded.clone()));

    subscription.request(-1);

    let state = recorded.lock().unwrap();
    assert!(state.items.is_empty());
    assert!(state.errored);
}

#[test]
fn row_count_subscription_emits_one_value_then_completes() {
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let source = Box::new(FixedRowCount(7));
    let subscription = BlockingRowCountSubscription::subscribe(source, Recorder(recorded.clone()));

    subscription.request(streamql_core::UNBOUNDED);

    let state = recorded.lock().unwrap();
    assert_eq!(state.items, vec![7]);
    assert!(state.completed);
}

#[test]
fn row_count_subscription_ignores_a_second_request_once_executed() {
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let source = Box::new(FixedRowCount(7));
    let subscription = BlockingRowCountSubscription::subscribe(source, Recorder(recorded.clone()));

    subscription.request(1);
    subscription.request(1);

    let state = recorded.lock().unwrap();
    assert_eq!(state.items, vec![7]);
}
