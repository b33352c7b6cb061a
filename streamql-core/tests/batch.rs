//! End-to-end coverage of the two batch execution flavours (multi-statement
//! and single-statement) through the same `Subscriber`/`Subscription`
//! demand machinery `tests/query_subscription.rs` exercises for plain
//! queries, rather than draining the raw result stream by hand.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use streamql_core::{
    spawn_multi_statement_batch, spawn_single_statement_batch, BridgeConfig, ColumnType, Error, NoDialectOverrides,
    Param, ParamAdapter, Result, Subscriber, Subscription, Value,
};
use streamql_testkit::{EchoQuery, EchoRenderer, MockDriver, MockOutcome};
use tokio::sync::Notify;

struct ValueParam(Value);
impl Param for ValueParam {
    fn set(&self, ctx: &mut ParamAdapter<'_>, index1: usize) -> Result<()> {
        ctx.set_value(index1, self.0.clone())
    }
    fn column_type(&self) -> ColumnType {
        self.0.column_type()
    }
}

#[derive(Default)]
struct Collected {
    items: Vec<u64>,
    completed: bool,
    error: Option<Error>,
}

/// Shared test double, same shape as `tests/query_subscription.rs`'s
/// `Collector`: records every signal and wakes a `Notify` once a terminal
/// one arrives.
struct Collector {
    state: Arc<std::sync::Mutex<Collected>>,
    done: Arc<Notify>,
}

impl Subscriber<u64> for Collector {
    fn on_subscribe(&mut self, _subscription: Arc<dyn Subscription>) {}

    fn on_next(&mut self, item: u64) {
        self.state.lock().unwrap().items.push(item);
    }

    fn on_complete(&mut self) {
        self.state.lock().unwrap().completed = true;
        self.done.notify_one();
    }

    fn on_error(&mut self, error: Error) {
        self.state.lock().unwrap().error = Some(error);
        self.done.notify_one();
    }
}

fn collector() -> (Collector, Arc<std::sync::Mutex<Collected>>, Arc<Notify>) {
    let state = Arc::new(std::sync::Mutex::new(Collected::default()));
    let done = Arc::new(Notify::new());
    (
        Collector {
            state: state.clone(),
            done: done.clone(),
        },
        state,
        done,
    )
}

async fn wait_done(done: &Notify) {
    tokio::time::timeout(Duration::from_secs(2), done.notified())
        .await
        .expect("batch subscription did not signal completion in time");
}

#[tokio::test]
async fn multi_statement_batch_inlines_every_query_and_replays_driver_outcomes() {
    let driver = MockDriver::returning(vec![MockOutcome::RowCount(1), MockOutcome::RowCount(1)]);
    let close_count = driver.close_count.clone();
    let queries = vec![
        EchoQuery::new("insert into widgets values (1)"),
        EchoQuery::new("insert into widgets values (2)"),
    ];
    let (collector, state, done) = collector();

    let subscription = spawn_multi_statement_batch::<MockDriver, EchoQuery>(
        Arc::new(driver),
        Arc::new(EchoRenderer),
        BridgeConfig::default(),
        queries,
        collector,
    );
    subscription.request(streamql_core::UNBOUNDED);
    wait_done(&done).await;

    let state = state.lock().unwrap();
    assert_eq!(state.items, vec![1, 1]);
    assert!(state.completed);
    assert_eq!(close_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn single_statement_batch_binds_every_row_before_one_execute() {
    let driver = MockDriver::returning(vec![MockOutcome::RowCount(2)]);
    let close_count = driver.close_count.clone();
    let query = EchoQuery::new("insert into widgets (id) values ($1)");
    let rows = vec![
        vec![Arc::new(ValueParam(Value::Int64(1))) as Arc<dyn Param>],
        vec![Arc::new(ValueParam(Value::Int64(2))) as Arc<dyn Param>],
    ];
    let (collector, state, done) = collector();

    let subscription = spawn_single_statement_batch::<MockDriver, EchoQuery>(
        Arc::new(driver),
        Arc::new(EchoRenderer),
        Arc::new(NoDialectOverrides),
        BridgeConfig::default(),
        query,
        rows,
        collector,
    );
    subscription.request(streamql_core::UNBOUNDED);
    wait_done(&done).await;

    let state = state.lock().unwrap();
    assert_eq!(state.items, vec![2]);
    assert!(state.completed);
    assert_eq!(close_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalid_request_errors_without_ever_opening_a_connection() {
    let driver = MockDriver::returning(vec![MockOutcome::RowCount(1)]);
    let close_count = driver.close_count.clone();
    let (collector, state, _done) = collector();

    let subscription = spawn_multi_statement_batch::<MockDriver, EchoQuery>(
        Arc::new(driver),
        Arc::new(EchoRenderer),
        BridgeConfig::default(),
        vec![EchoQuery::new("insert into widgets values (1)")],
        collector,
    );
    subscription.request(0);

    let state = state.lock().unwrap();
    assert!(state.items.is_empty());
    assert!(!state.completed);
    assert!(state.error.is_some());
    assert_eq!(close_count.load(Ordering::SeqCst), 0);
}
